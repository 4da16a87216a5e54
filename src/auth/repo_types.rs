use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub mail: String,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    pub is_admin: bool,
    #[serde(skip_serializing)]
    pub token: Option<String>, // last issued token, informational only
    pub created_at: OffsetDateTime,
}

/// Row to insert on registration. Admin flag and token are not part of it:
/// a new account always starts as a non-admin with no token.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nom: String,
    pub prenom: String,
    pub mail: String,
    pub login: String,
    pub password_hash: String,
}
