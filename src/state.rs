use courseboard_config::{CorsConfig, DatabaseConfig, JwtConfig};
use courseboard_db::init_db_pool;
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
}

impl AppState {
    /// State around an existing pool, with JWT and CORS settings from the
    /// environment.
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            cors_config: CorsConfig::from_env(),
        }
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let database_config = DatabaseConfig::from_env()?;
    let db = init_db_pool(&database_config).await?;

    Ok(AppState::new(db))
}
