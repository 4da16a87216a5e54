use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, RegisterRequest, UserStatusResponse,
        },
        guard::{require_bearer, AuthUser},
        jwt::JwtKeys,
        password,
        repo::{RepoError, UniqueField},
        repo_types::NewUser,
    },
    error::AppError,
    state::AppState,
};

const REGISTER_FIELDS_REQUIRED: &str = "Tous les champs sont requis.";
const LOGIN_FIELDS_REQUIRED: &str = "Identifiant et mot de passe requis.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/user-status", get(user_status))
        .route_layer(middleware::from_fn_with_state(state, require_bearer))
}

/// Whitespace-only counts as missing.
fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "unreadable register body");
        AppError::Validation(REGISTER_FIELDS_REQUIRED)
    })?;

    let RegisterRequest {
        nom,
        prenom,
        mail,
        login,
        password: plain,
    } = payload;

    if [&nom, &prenom, &mail, &login].into_iter().any(|f| is_blank(f.as_str())) || plain.is_empty() {
        warn!("register with missing fields");
        return Err(AppError::Validation(REGISTER_FIELDS_REQUIRED));
    }

    // Fast path only; the unique constraints settle races at insert time.
    if state.users.find_by_login(&login).await?.is_some() {
        warn!(login = %login, "login already taken");
        return Err(AppError::Conflict(UniqueField::Login));
    }
    if state.users.find_by_mail(&mail).await?.is_some() {
        warn!(mail = %mail, "email already registered");
        return Err(AppError::Conflict(UniqueField::Mail));
    }

    let password_hash = password::hash(plain).await.map_err(AppError::Internal)?;

    let user = state
        .users
        .insert(NewUser {
            nom,
            prenom,
            mail,
            login,
            password_hash,
        })
        .await
        .map_err(|e| {
            if let RepoError::Duplicate(field) = &e {
                warn!(field = ?field, "unique constraint hit on insert");
            }
            AppError::from(e)
        })?;

    info!(user_id = %user.id, login = %user.login, "user registered");
    Ok(Json(MessageResponse {
        message: "Utilisateur créé avec succès.",
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "unreadable login body");
        AppError::Validation(LOGIN_FIELDS_REQUIRED)
    })?;

    let login = payload.login.as_str();
    if is_blank(login) || payload.password.is_empty() {
        warn!("login with missing fields");
        return Err(AppError::Validation(LOGIN_FIELDS_REQUIRED));
    }

    let user = match state.users.find_by_login(login).await? {
        Some(u) => u,
        None => {
            password::verify_dummy(payload.password).await;
            warn!(login = %login, "login unknown handle");
            return Err(AppError::InvalidCredentials);
        }
    };

    let ok = password::verify(payload.password, user.password_hash.clone())
        .await
        .map_err(AppError::Internal)?;
    if !ok {
        warn!(login = %login, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state)
        .sign(user.id, user.is_admin)
        .map_err(AppError::Internal)?;

    state.users.set_token(user.id, &token).await?;

    info!(user_id = %user.id, login = %user.login, "user logged in");
    Ok(Json(LoginResponse {
        message: "Connexion réussie",
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn user_status(Extension(user): Extension<AuthUser>) -> Json<UserStatusResponse> {
    Json(UserStatusResponse {
        success: true,
        message: "Authentification réussie. Le token est fonctionnel.",
        user_id: user.user_id,
        is_admin: user.is_admin,
    })
}
