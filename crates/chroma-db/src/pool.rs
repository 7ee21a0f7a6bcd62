//! # Database Pool Management
//!
//! Configuration and connection pool for the catalog's SQLite file.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Startup Sequence                                   │
//! │                                                                         │
//! │  DbConfig::from_env() / DbConfig::new(path)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       │                                                                 │
//! │       ├── open SqlitePool (WAL, foreign keys ON)                       │
//! │       │                                                                 │
//! │       ├── Migrator::backup()       (if pending steps and enabled)      │
//! │       │                                                                 │
//! │       └── Migrator::run_pending()  (if enabled)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.products()  ← the only gateway to catalog rows                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why WAL Mode?
//! - Readers don't block the writer
//! - Better crash recovery

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations::Migrator;
use crate::normalizer::LegacyColorNormalizer;
use crate::repository::product::ProductRepository;

/// Path used for in-memory databases.
const IN_MEMORY_PATH: &str = ":memory:";

/// Name of the default backup directory, created next to the data file.
const DEFAULT_BACKUP_DIR: &str = "backups";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// Built once at startup and handed to [`Database::new`]. Nothing in this
/// crate reads configuration from anywhere else.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/catalog.db")
///     .backup_dir("/path/to/backups")
///     .max_connections(2);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Where pre-migration backups are written.
    /// Default: `backups/` next to the database file
    pub backup_dir: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 4 (single-user desktop load)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps them open.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Whether to back up the data file before applying migrations.
    /// Default: true
    pub backup_before_migrate: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let database_path = path.into();
        let backup_dir = default_backup_dir(&database_path);
        DbConfig {
            database_path,
            backup_dir,
            max_connections: 4,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
            backup_before_migrate: true,
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection that never idles out: the database lives exactly
    /// as long as that connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
            backup_before_migrate: false,
        }
    }

    /// Creates a configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CHROMA_DB_PATH`: database file (default: `default_path` argument)
    /// - `CHROMA_BACKUP_DIR`: backup directory
    /// - `CHROMA_MAX_CONNECTIONS`: pool size
    /// - `CHROMA_SKIP_MIGRATIONS`: `1`/`true` disables migrations on connect
    /// - `CHROMA_SKIP_BACKUP`: `1`/`true` disables the pre-migration backup
    pub fn from_env(default_path: impl Into<PathBuf>) -> Self {
        let path = std::env::var("CHROMA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_path.into());

        DbConfig::new(path).with_env_overrides()
    }

    /// Applies the non-path environment variables listed on
    /// [`DbConfig::from_env`] to an existing configuration.
    ///
    /// For callers that take the database path from somewhere else, such as
    /// a command-line flag.
    pub fn with_env_overrides(self) -> Self {
        let mut config = self;

        if let Ok(dir) = std::env::var("CHROMA_BACKUP_DIR") {
            config.backup_dir = PathBuf::from(dir);
        }

        if let Ok(max) = std::env::var("CHROMA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(max) if max > 0 => config.max_connections = max,
                _ => warn!(value = %max, "Ignoring invalid CHROMA_MAX_CONNECTIONS"),
            }
        }

        if env_flag("CHROMA_SKIP_MIGRATIONS") {
            config.run_migrations = false;
        }

        if env_flag("CHROMA_SKIP_BACKUP") {
            config.backup_before_migrate = false;
        }

        config
    }

    /// Sets the backup directory.
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets whether to back up before migrating.
    pub fn backup_before_migrate(mut self, backup: bool) -> Self {
        self.backup_before_migrate = backup;
        self
    }

    /// True for `:memory:` databases.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}

fn default_backup_dir(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .map(|parent| parent.join(DEFAULT_BACKUP_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR))
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing migrator and repository access.
///
/// Cheap to clone: clones share the pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./catalog.db")).await?;
/// let products = db.products().search("dragon").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    config: DbConfig,
}

impl Database {
    /// Opens the database and brings the schema up to date.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (cascading deletes depend on it)
    /// 3. Creates the connection pool
    /// 4. Backs up the file and runs pending migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection, backup or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path?mode=rwc creates the file if missing
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has foreign keys disabled by default for backwards
            // compatibility; cascades need them on every connection.
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(Option::<Duration>::None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool, config };

        if db.config.run_migrations {
            db.prepare_schema().await?;
        }

        Ok(db)
    }

    /// Backs up (when configured and needed) and runs pending migrations.
    ///
    /// ## When To Call
    /// - Automatically called by `new()` if `run_migrations` is true
    /// - Manually call when migrations are disabled in config
    pub async fn prepare_schema(&self) -> DbResult<()> {
        let migrator = self.migrator();

        if self.config.backup_before_migrate && migrator.has_pending().await? {
            if let Some(path) = migrator.backup().await? {
                info!(backup = %path.display(), "Pre-migration backup written");
            }
        }

        let report = migrator.run_pending().await?;
        info!(
            from = report.from_version,
            to = report.to_version,
            "Schema ready"
        );
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the configuration this database was opened with.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Returns the schema migrator.
    pub fn migrator(&self) -> Migrator {
        Migrator::new(self.pool.clone(), &self.config)
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the legacy color normalizer, wired to the product repository.
    pub fn legacy_normalizer(&self) -> LegacyColorNormalizer {
        LegacyColorNormalizer::new(self.products())
    }

    /// Closes the database connection pool.
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(
            db.migrator().current_version().await.unwrap(),
            Migrator::latest_version()
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_skipping_migrations_leaves_schema_empty() {
        let config = DbConfig::in_memory().run_migrations(false);
        let db = Database::new(config).await.unwrap();

        assert_eq!(db.migrator().current_version().await.unwrap(), 0);
        // No schema: repository queries fail loudly.
        assert!(db.products().list_all().await.is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/catalog/test.db")
            .max_connections(10)
            .min_connections(2)
            .backup_before_migrate(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.backup_before_migrate);
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/catalog/backups"));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
