use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::{RepoError, UniqueField};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{}", conflict_message(.0))]
    Conflict(UniqueField),

    #[error("Identifiant ou mot de passe incorrect.")]
    InvalidCredentials,

    #[error("Accès refusé. Jeton d'authentification manquant.")]
    MissingToken,

    #[error("Jeton invalide ou expiré.")]
    InvalidToken,

    #[error("store error: {0}")]
    Store(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

const SERVER_ERROR: &str = "Erreur serveur.";

fn conflict_message(field: &UniqueField) -> &'static str {
    match field {
        UniqueField::Login => "Identifiant déjà pris.",
        UniqueField::Mail => "Adresse e-mail déjà utilisée.",
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client. Server-side failures collapse to
    /// a generic text; the detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Store(_) | AppError::Internal(_) => SERVER_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Duplicate(field) => AppError::Conflict(field),
            RepoError::Database(e) => AppError::Store(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store(e) | AppError::Internal(e) = &self {
            error!(error = ?e, "request failed");
        }
        (
            self.status(),
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::Validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Conflict(UniqueField::Login).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Store(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflicts_name_the_taken_field() {
        assert_eq!(
            AppError::Conflict(UniqueField::Login).public_message(),
            "Identifiant déjà pris."
        );
        assert_eq!(
            AppError::Conflict(UniqueField::Mail).public_message(),
            "Adresse e-mail déjà utilisée."
        );
    }

    #[test]
    fn store_errors_do_not_leak_detail() {
        let err = AppError::Store(anyhow::anyhow!("relation \"users\" does not exist"));
        assert_eq!(err.public_message(), "Erreur serveur.");
        assert!(err.to_string().contains("relation"));
    }

    #[test]
    fn error_body_serializes_as_error_field() {
        let body = ErrorResponse {
            error: "Jeton invalide ou expiré.".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "Jeton invalide ou expiré.");
    }
}
