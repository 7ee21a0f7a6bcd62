//! # chroma-core: Catalog Domain for Chroma
//!
//! Entities for a catalog of 3D-printed products. Each product is printed
//! in pieces, and each piece is assigned to a filament color.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Chroma Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          UI / export collaborators (not in this workspace)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Product values                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ chroma-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  product  │  │   types   │  │ validation│  │  legacy   │  │   │
//! │  │   │  Product  │  │ HexColor  │  │   rules   │  │ color name│  │   │
//! │  │   │ ColorSpec │  │ Material  │  │  ranges   │  │  lookup   │  │   │
//! │  │   │   Piece   │  │Difficulty │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    chroma-db (Storage Layer)                    │   │
//! │  │          SQLite schema, migrations, product repository          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`product`] - Product, ColorSpecification, Piece and derived totals
//! - [`types`] - HexColor and the closed enumerations
//! - [`validation`] - Field rules checked before any write
//! - [`legacy`] - Color name lookup for legacy normalization only
//! - [`error`] - Validation error type
//!
//! ## Example Usage
//!
//! ```rust
//! use chroma_core::{ColorSpecification, HexColor, Piece, Product};
//!
//! let mut product = Product::new("Bracket");
//! product.print_time_minutes = 90;
//! product.color_specifications.push(
//!     ColorSpecification::new(HexColor::parse("#000000").unwrap())
//!         .with_weight(20.0)
//!         .with_piece(Piece::named("arm")),
//! );
//! product.color_specifications.push(
//!     ColorSpecification::new(HexColor::parse("#FFFFFF").unwrap())
//!         .with_weight(5.0)
//!         .with_extra_time(12),
//! );
//!
//! assert_eq!(product.total_weight(), 25.0);
//! assert_eq!(product.total_time(), 102);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod legacy;
pub mod product;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ValidationError, ValidationResult};
pub use product::{ColorGroup, ColorSpecification, Piece, Product};
pub use types::{Difficulty, HexColor, JointType, Material, PieceFlags};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of product and piece names, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of a search term, in characters.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Accepted extruder temperatures in °C, inclusive.
pub const EXTRUDER_TEMP_RANGE: (i64, i64) = (150, 320);

/// Accepted bed temperatures in °C, inclusive. 0 is an unheated bed.
pub const BED_TEMP_RANGE: (i64, i64) = (0, 130);

/// Extruder temperature for new products (PLA).
pub const DEFAULT_EXTRUDER_TEMP: i64 = 210;

/// Bed temperature for new products (PLA).
pub const DEFAULT_BED_TEMP: i64 = 60;
