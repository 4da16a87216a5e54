use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

/// Columns that carry a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Login,
    Mail,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("duplicate {0:?}")]
    Duplicate(UniqueField),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Credential store. The Postgres implementation is the real one; tests
/// swap in an in-memory map.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_mail(&self, mail: &str) -> Result<Option<User>, RepoError>;
    /// Inserts a new row. A uniqueness violation is reported as
    /// [`RepoError::Duplicate`] naming the column that collided.
    async fn insert(&self, new: NewUser) -> Result<User, RepoError>;
    async fn set_token(&self, id: Uuid, token: &str) -> Result<(), RepoError>;
}

const USER_COLUMNS: &str =
    "id, nom, prenom, mail, login, password_hash, is_admin, token, created_at";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_mail(&self, mail: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE mail = $1"
        ))
        .bind(mail)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new: NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, nom, prenom, mail, login, password_hash, is_admin, token)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, NULL)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.nom)
        .bind(&new.prenom)
        .bind(&new.mail)
        .bind(&new.login)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(classify_insert_error)
    }

    async fn set_token(&self, id: Uuid, token: &str) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET token = $1 WHERE id = $2")
            .bind(token)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

fn classify_insert_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(field) = db_err.constraint().and_then(field_for_constraint) {
                return RepoError::Duplicate(field);
            }
        }
    }
    RepoError::Database(e)
}

fn field_for_constraint(name: &str) -> Option<UniqueField> {
    match name {
        "users_login_key" => Some(UniqueField::Login),
        "users_mail_key" => Some(UniqueField::Mail),
        _ => None,
    }
}
