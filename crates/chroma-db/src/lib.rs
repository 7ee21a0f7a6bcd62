//! # chroma-db: Database Layer for Chroma
//!
//! This crate provides database access for the Chroma catalog.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Chroma Data Flow                                 │
//! │                                                                         │
//! │  UI layer / chroma CLI                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     chroma-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repository   │    │  Migrator    │  │   │
//! │  │   │   (pool.rs)   │    │ (product.rs)  │    │ (5 steps)    │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ ProductRepo   │    │ versions log │  │   │
//! │  │   │ DbConfig      │◄───│               │    │ backups      │  │   │
//! │  │   └───────────────┘    └───────▲───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                        ┌───────┴───────┐                        │   │
//! │  │                        │  Normalizer   │  legacy color → spec   │   │
//! │  │                        └───────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   products ─< color_specifications ─< color_pieces              │   │
//! │  │   schema_versions                                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Configuration, connection pool, startup sequence
//! - [`migrations`] - Versioned schema steps and pre-migration backups
//! - [`repository`] - Product repository
//! - [`normalizer`] - One-shot legacy color conversion
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chroma_db::{Database, DbConfig};
//!
//! // Opens the file, backs it up and runs pending migrations
//! let db = Database::new(DbConfig::new("path/to/catalog.db")).await?;
//!
//! let dragons = db.products().search("dragon").await?;
//! let stats = db.products().statistics().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod normalizer;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, MigrationError};
pub use migrations::{AppliedVersion, MigrationReport, Migrator};
pub use normalizer::{LegacyColorNormalizer, NormalizationFailure, NormalizationReport};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::product::{CatalogStatistics, ColorUsage, MaterialCount, ProductRepository};
