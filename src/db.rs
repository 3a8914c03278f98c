use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::migrator::Migrator;

pub type DbPool = DatabaseConnection;

/// Pool settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://pharmacy.db?mode=rwc".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url().to_string(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

impl DbConfig {
    /// `sqlite` or `postgres`, from the URL scheme.
    pub fn backend(&self) -> &'static str {
        if self.url.starts_with("postgres") {
            "postgres"
        } else {
            "sqlite"
        }
    }

    /// Every connection to an in-memory SQLite URL opens a fresh, empty database.
    pub fn is_in_memory_sqlite(&self) -> bool {
        self.url.starts_with("sqlite") && self.url.contains(":memory:")
    }

    /// URL with any password replaced, safe to log.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        match rest.split_once('@') {
            Some((credentials, host)) => {
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}://{}:***@{}", scheme, user, host)
            }
            None => self.url.clone(),
        }
    }
}

/// Opens the connection pool described by `config`.
///
/// In-memory SQLite is pinned to a single connection so every query sees the
/// same schema and rows.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let (max_connections, min_connections) = if config.is_in_memory_sqlite() {
        if config.max_connections != 1 {
            warn!(
                requested = config.max_connections,
                "In-memory SQLite pool limited to one connection"
            );
        }
        (1, 1)
    } else {
        (config.max_connections, config.min_connections)
    };

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    gauge!("pharmacy_db.max_connections", max_connections as f64);
    info!(
        backend = config.backend(),
        url = %config.redacted_url(),
        max_connections,
        "Connecting to database"
    );

    let pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, backend = config.backend(), "Database connection failed");
        counter!("pharmacy_db.connection_failures", 1);
        ServiceError::DatabaseError(e)
    })?;

    debug!("Database pool ready");
    Ok(pool)
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// Applies every pending schema migration.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    let pending = Migrator::get_pending_migrations(pool).await?.len();
    if pending == 0 {
        debug!("Schema up to date");
        return Ok(());
    }

    info!(pending, "Applying schema migrations");
    Migrator::up(pool, None).await.map_err(|e| {
        error!(error = %e, elapsed = ?started.elapsed(), "Schema migration failed");
        ServiceError::DatabaseError(e)
    })?;
    info!(applied = pending, elapsed = ?started.elapsed(), "Schema migrations applied");
    Ok(())
}

/// Pings the database, recording latency or the failure.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    match pool.ping().await {
        Ok(()) => {
            gauge!(
                "pharmacy_db.ping_latency_ms",
                started.elapsed().as_millis() as f64
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Database ping failed");
            counter!("pharmacy_db.connection_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database pool");
    pool.close().await.map_err(ServiceError::DatabaseError)
}
