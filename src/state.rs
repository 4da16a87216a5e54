use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::db;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database).await?;
        db::migrate(&pool).await;

        let users = Arc::new(PgUserRepo::new(pool)) as Arc<dyn UserRepo>;
        Ok(Self::from_parts(users, Arc::new(config)))
    }

    pub fn from_parts(users: Arc<dyn UserRepo>, config: Arc<AppConfig>) -> Self {
        Self { users, config }
    }

    #[cfg(test)]
    pub fn for_tests(users: Arc<dyn UserRepo>, secret: &str) -> Self {
        use crate::config::{DatabaseConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 5432,
                user: "test".into(),
                password: "test".into(),
                name: "test".into(),
            },
            jwt: JwtConfig {
                secret: secret.into(),
            },
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(users, config)
    }
}
