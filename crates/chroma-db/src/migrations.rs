//! # Schema Migrations
//!
//! Versioned, idempotent schema steps for the catalog database.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current_version()  ← MAX(version) FROM schema_versions (0 if none)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  backup()           ← timestamped copy of the data file                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  run_pending()                                                         │
//! │       ├── v1 products              ✓ (already applied)                 │
//! │       ├── v2 color tables          ✓ (already applied)                 │
//! │       ├── v3 indexes               ⬜ apply + log version 3             │
//! │       ├── v4 piece details         ⬜ apply + log version 4             │
//! │       └── v5 piece flags           ✗ FAILS → stop, report [3, 4]       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules for Steps
//! 1. Versions are contiguous: each step is exactly one above the previous
//! 2. Tables and indexes use `IF NOT EXISTS`
//! 3. Columns are added through [`Operation::AddColumn`], which checks
//!    `pragma_table_info` first, so a half-applied step can run again
//! 4. **NEVER** modify an existing step - always add a new one

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult, MigrationError};
use crate::pool::DbConfig;

// =============================================================================
// Migration Steps
// =============================================================================

/// One schema change inside a step.
#[derive(Debug)]
enum Operation {
    /// A single idempotent statement (`CREATE ... IF NOT EXISTS`).
    Sql(&'static str),
    /// `ALTER TABLE ... ADD COLUMN`, skipped when the column exists.
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
}

/// A numbered step that moves the schema from `version - 1` to `version`.
#[derive(Debug)]
struct MigrationStep {
    version: i64,
    description: &'static str,
    operations: &'static [Operation],
}

const fn add_column(
    table: &'static str,
    column: &'static str,
    definition: &'static str,
) -> Operation {
    Operation::AddColumn {
        table,
        column,
        definition,
    }
}

static MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        version: 1,
        description: "create products table",
        operations: &[Operation::Sql(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id            TEXT PRIMARY KEY NOT NULL,
                name          TEXT NOT NULL,
                description   TEXT NOT NULL DEFAULT '',
                weight        REAL NOT NULL DEFAULT 0,
                legacy_color  TEXT,
                print_time    INTEGER NOT NULL DEFAULT 0,
                material      TEXT NOT NULL DEFAULT 'PLA',
                extruder_temp INTEGER NOT NULL DEFAULT 210,
                bed_temp      INTEGER NOT NULL DEFAULT 60,
                image_path    TEXT,
                guide         TEXT NOT NULL DEFAULT '',
                created_at    TEXT NOT NULL,
                modified_at   TEXT NOT NULL
            )
            "#,
        )],
    },
    MigrationStep {
        version: 2,
        description: "create color specification and piece tables",
        operations: &[
            Operation::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS color_specifications (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    product_id   TEXT NOT NULL
                                 REFERENCES products(id) ON DELETE CASCADE,
                    color_hex    TEXT NOT NULL,
                    color_name   TEXT,
                    color_weight REAL NOT NULL DEFAULT 0,
                    extra_time   INTEGER NOT NULL DEFAULT 0,
                    notes        TEXT NOT NULL DEFAULT ''
                )
                "#,
            ),
            Operation::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS color_pieces (
                    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
                    color_specification_id INTEGER NOT NULL
                                           REFERENCES color_specifications(id) ON DELETE CASCADE,
                    piece_name             TEXT NOT NULL
                )
                "#,
            ),
        ],
    },
    MigrationStep {
        version: 3,
        description: "create search and grouping indexes",
        operations: &[
            Operation::Sql("CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)"),
            Operation::Sql("CREATE INDEX IF NOT EXISTS idx_products_material ON products(material)"),
            Operation::Sql(
                "CREATE INDEX IF NOT EXISTS idx_color_specifications_hex ON color_specifications(color_hex)",
            ),
            Operation::Sql(
                "CREATE INDEX IF NOT EXISTS idx_color_specifications_product ON color_specifications(product_id)",
            ),
            Operation::Sql(
                "CREATE INDEX IF NOT EXISTS idx_color_pieces_specification ON color_pieces(color_specification_id)",
            ),
        ],
    },
    MigrationStep {
        version: 4,
        description: "add piece print and assembly details",
        operations: &[
            add_column("color_pieces", "piece_weight", "REAL"),
            add_column("color_pieces", "piece_description", "TEXT"),
            add_column("color_pieces", "piece_print_time", "INTEGER"),
            add_column("color_pieces", "orientation", "TEXT"),
            add_column("color_pieces", "requires_supports", "INTEGER NOT NULL DEFAULT 0"),
            add_column("color_pieces", "difficulty", "TEXT"),
            add_column("color_pieces", "postprocess_notes", "TEXT"),
            add_column("color_pieces", "assembly_order", "INTEGER"),
            add_column("color_pieces", "joint_type", "TEXT"),
            add_column("color_pieces", "fit_tolerance", "REAL"),
        ],
    },
    MigrationStep {
        version: 5,
        description: "add piece metadata flags",
        operations: &[
            add_column("color_pieces", "is_critical", "INTEGER NOT NULL DEFAULT 0"),
            add_column("color_pieces", "is_decorative", "INTEGER NOT NULL DEFAULT 0"),
            add_column("color_pieces", "is_functional", "INTEGER NOT NULL DEFAULT 0"),
            add_column("color_pieces", "allows_alternate_colors", "INTEGER NOT NULL DEFAULT 0"),
        ],
    },
];

// =============================================================================
// Reports
// =============================================================================

/// Outcome of a successful migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Schema version before the run.
    pub from_version: i64,
    /// Schema version after the run.
    pub to_version: i64,
    /// Versions applied by this run, ascending. Empty when up to date.
    pub applied: Vec<i64>,
}

/// One row of the version log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AppliedVersion {
    pub version: i64,
    pub applied_at: DateTime<Utc>,
}

// =============================================================================
// Migrator
// =============================================================================

/// Tracks and advances the schema version of one database.
///
/// ## Usage
/// ```rust,ignore
/// let migrator = db.migrator();
/// migrator.backup().await?;
/// let report = migrator.run_pending().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Migrator {
    pool: SqlitePool,
    database_path: PathBuf,
    backup_dir: PathBuf,
    in_memory: bool,
}

impl Migrator {
    /// Creates a migrator for the database described by `config`.
    pub fn new(pool: SqlitePool, config: &DbConfig) -> Self {
        Migrator {
            pool,
            database_path: config.database_path.clone(),
            backup_dir: config.backup_dir.clone(),
            in_memory: config.is_in_memory(),
        }
    }

    /// Highest version any known step produces.
    pub fn latest_version() -> i64 {
        MIGRATIONS.last().map(|step| step.version).unwrap_or(0)
    }

    /// Reads the current schema version.
    ///
    /// Creates the `schema_versions` log on first use; an empty log means
    /// version 0.
    pub async fn current_version(&self) -> DbResult<i64> {
        self.ensure_version_table().await?;

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_versions")
            .fetch_one(&self.pool)
            .await?;

        Ok(version.unwrap_or(0))
    }

    /// True when at least one step has not been applied yet.
    pub async fn has_pending(&self) -> DbResult<bool> {
        Ok(self.current_version().await? < Self::latest_version())
    }

    /// Returns the version log, oldest first.
    pub async fn history(&self) -> DbResult<Vec<AppliedVersion>> {
        self.ensure_version_table().await?;

        let rows = sqlx::query_as::<_, AppliedVersion>(
            "SELECT version, applied_at FROM schema_versions ORDER BY version ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Applies every step newer than the current version.
    ///
    /// ## Failure
    /// Stops at the first failing step and returns [`DbError::Migration`]
    /// naming that step and the versions applied before it. Later steps are
    /// never attempted. Each step commits on its own, so the database stays
    /// at the last successful version.
    pub async fn run_pending(&self) -> DbResult<MigrationReport> {
        self.migrate_to(Self::latest_version()).await
    }

    /// Applies steps up to and including `target`.
    pub async fn migrate_to(&self, target: i64) -> DbResult<MigrationReport> {
        let from_version = self.current_version().await?;
        let latest = Self::latest_version();

        if from_version > latest {
            return Err(MigrationError {
                version: from_version,
                step: "version check".to_string(),
                reason: format!(
                    "database schema version {} is newer than supported version {}",
                    from_version, latest
                ),
                applied: Vec::new(),
            }
            .into());
        }

        info!(from_version, target, "Checking for pending migrations");

        let mut applied = Vec::new();

        for step in MIGRATIONS
            .iter()
            .filter(|step| step.version > from_version && step.version <= target)
        {
            match self.apply(step).await {
                Ok(()) => {
                    info!(version = step.version, step = step.description, "Migration applied");
                    applied.push(step.version);
                }
                Err(err) => {
                    warn!(
                        version = step.version,
                        step = step.description,
                        error = %err,
                        "Migration failed, stopping"
                    );
                    return Err(MigrationError {
                        version: step.version,
                        step: step.description.to_string(),
                        reason: err.to_string(),
                        applied,
                    }
                    .into());
                }
            }
        }

        let to_version = applied.last().copied().unwrap_or(from_version);

        if applied.is_empty() {
            debug!(version = to_version, "Schema already up to date");
        }

        Ok(MigrationReport {
            from_version,
            to_version,
            applied,
        })
    }

    /// Copies the data file into the backup directory.
    ///
    /// ## Returns
    /// * `Ok(Some(path))` - Backup written
    /// * `Ok(None)` - Nothing to back up (in-memory, missing, empty, or no
    ///   tables yet)
    ///
    /// Restoring is a manual step: stop the application and copy the file
    /// back over the database path.
    pub async fn backup(&self) -> DbResult<Option<PathBuf>> {
        if self.in_memory {
            debug!("In-memory database, skipping backup");
            return Ok(None);
        }

        let size = match tokio::fs::metadata(&self.database_path).await {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DbError::Backup {
                    path: self.database_path.clone(),
                    source,
                })
            }
        };

        if size == 0 || !self.has_user_tables().await? {
            debug!("Fresh database, nothing to back up");
            return Ok(None);
        }

        // Fold the WAL into the main file so a plain copy is complete.
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;

        let target = self
            .backup_dir
            .join(backup_file_name(&self.database_path, Utc::now()));

        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|source| DbError::Backup {
                path: self.backup_dir.clone(),
                source,
            })?;

        tokio::fs::copy(&self.database_path, &target)
            .await
            .map_err(|source| DbError::Backup {
                path: target.clone(),
                source,
            })?;

        info!(backup = %target.display(), bytes = size, "Database backed up");
        Ok(Some(target))
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn ensure_version_table(&self) -> DbResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_versions (
                version    INTEGER PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_user_tables(&self) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
              AND name != 'schema_versions'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Applies one step and logs its version in a single transaction.
    async fn apply(&self, step: &MigrationStep) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for operation in step.operations {
            match operation {
                Operation::Sql(sql) => {
                    sqlx::query(sql).execute(&mut *tx).await?;
                }
                Operation::AddColumn {
                    table,
                    column,
                    definition,
                } => {
                    if column_exists(&mut tx, table, column).await? {
                        debug!(table, column, "Column already present, skipping");
                        continue;
                    }
                    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
                    sqlx::query(&sql).execute(&mut *tx).await?;
                }
            }
        }

        sqlx::query("INSERT INTO schema_versions (version, applied_at) VALUES (?1, ?2)")
            .bind(step.version)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}

async fn column_exists(conn: &mut SqliteConnection, table: &str, column: &str) -> DbResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")
            .bind(table)
            .bind(column)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

/// `catalog.db` → `catalog-backup-20260131-142501-123.db`
fn backup_file_name(database_path: &Path, at: DateTime<Utc>) -> String {
    let stem = database_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    let stamp = at.format("%Y%m%d-%H%M%S-%3f");

    match database_path.extension() {
        Some(ext) => format!("{}-backup-{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}-backup-{}", stem, stamp),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
