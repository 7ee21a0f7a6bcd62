//! # Catalog Entities
//!
//! The three-level catalog model and the values derived from it.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Product "Dragon"                                                      │
//! │  ├── ColorSpecification #2E7D32 "verde"   48.0 g   +0 min              │
//! │  │   ├── Piece "body"                                                  │
//! │  │   └── Piece "tail"                                                  │
//! │  ├── ColorSpecification #FFD600 "amarillo" 12.0 g  +15 min             │
//! │  │   └── Piece "wings"                                                 │
//! │  └── ColorSpecification #000000 "negro"    2.5 g   +15 min             │
//! │      └── Piece "eyes"                                                  │
//! │                                                                         │
//! │  total_weight() = 48.0 + 12.0 + 2.5          = 62.5 g                  │
//! │  total_time()   = base + 15 + 15             (first color is loaded    │
//! │                                               at start, no switch)     │
//! │  primary_color() = #2E7D32                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product owns its color specifications and a specification owns its
//! pieces. Deleting the parent deletes the children, in memory and in
//! storage alike.
//!
//! Everything here is a pure function of already-loaded data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationResult;
use crate::types::{Difficulty, HexColor, JointType, Material, PieceFlags};
use crate::validation::{
    validate_bed_temp, validate_extruder_temp, validate_minutes, validate_name, validate_weight,
};
use crate::{DEFAULT_BED_TEMP, DEFAULT_EXTRUDER_TEMP};

// =============================================================================
// Piece
// =============================================================================

/// A named sub-component of a product, printed in its specification's color.
///
/// Only `name` is required. The remaining attributes are print and assembly
/// hints and may all be left at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Piece {
    /// Row id, assigned on insert. `None` until persisted.
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    /// Informational only. Not summed into any total.
    pub weight_grams: Option<f64>,
    pub print_time_minutes: Option<i64>,
    pub difficulty: Option<Difficulty>,
    /// Recommended orientation on the build plate, e.g. "flat side down".
    pub orientation: Option<String>,
    pub requires_supports: bool,
    pub joint_type: Option<JointType>,
    /// Position in the assembly sequence, 1-based by convention.
    pub assembly_order: Option<i64>,
    pub postprocess_notes: Option<String>,
    pub fit_tolerance_mm: Option<f64>,
    pub flags: PieceFlags,
}

impl Piece {
    /// A piece that carries nothing but its name.
    pub fn named(name: impl Into<String>) -> Self {
        Piece {
            name: name.into(),
            ..Piece::default()
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("piece_name", &self.name)?;
        if let Some(weight) = self.weight_grams {
            validate_weight("piece_weight", weight)?;
        }
        if let Some(minutes) = self.print_time_minutes {
            validate_minutes("piece_print_time", minutes)?;
        }
        if let Some(tolerance) = self.fit_tolerance_mm {
            validate_weight("fit_tolerance", tolerance)?;
        }
        Ok(())
    }
}

// =============================================================================
// Color Specification
// =============================================================================

/// A weighted group of pieces sharing one filament color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ColorSpecification {
    /// Row id, assigned on insert. `None` until persisted.
    pub id: Option<i64>,
    pub color_hex: HexColor,
    pub color_name: Option<String>,
    /// Ordered; the order is preserved through storage.
    pub pieces: Vec<Piece>,
    /// Filament attributed to this color, in grams.
    pub weight_grams: f64,
    /// Time added by switching to this color mid-print, in minutes.
    pub extra_time_minutes: i64,
    pub notes: String,
}

impl ColorSpecification {
    /// Creates a specification with no pieces, weight or notes.
    pub fn new(color_hex: HexColor) -> Self {
        ColorSpecification {
            id: None,
            color_hex,
            color_name: None,
            pieces: Vec::new(),
            weight_grams: 0.0,
            extra_time_minutes: 0,
            notes: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.color_name = Some(name.into());
        self
    }

    pub fn with_weight(mut self, grams: f64) -> Self {
        self.weight_grams = grams;
        self
    }

    pub fn with_extra_time(mut self, minutes: i64) -> Self {
        self.extra_time_minutes = minutes;
        self
    }

    pub fn with_piece(mut self, piece: Piece) -> Self {
        self.pieces.push(piece);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Piece names in their stored order.
    pub fn piece_names(&self) -> Vec<&str> {
        self.pieces.iter().map(|p| p.name.as_str()).collect()
    }

    /// Sum of per-piece weights, for pieces that record one.
    ///
    /// Returns `None` when no piece carries weight data.
    pub fn pieces_weight(&self) -> Option<f64> {
        let weights: Vec<f64> = self.pieces.iter().filter_map(|p| p.weight_grams).collect();
        if weights.is_empty() {
            None
        } else {
            Some(weights.iter().sum())
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        // Re-parse: the value may have been built by hand or deserialized.
        HexColor::parse(self.color_hex.as_str())?;
        validate_weight("color_weight", self.weight_grams)?;
        validate_minutes("extra_time", self.extra_time_minutes)?;
        for piece in &self.pieces {
            piece.validate()?;
        }
        Ok(())
    }
}

/// All specifications of one product sharing a hex value, merged.
///
/// Storage allows the same hex twice on a product; display and export treat
/// them as one logical color. This is that view.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ColorGroup {
    pub color_hex: HexColor,
    /// First non-empty name among the merged specifications.
    pub color_name: Option<String>,
    pub weight_grams: f64,
    pub extra_time_minutes: i64,
    pub piece_names: Vec<String>,
    pub specification_count: usize,
}

// =============================================================================
// Product
// =============================================================================

/// One manufacturable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// UUID v4, assigned on insert and immutable afterwards.
    pub id: Option<String>,

    pub name: String,

    pub description: String,

    /// Declared weight. Superseded by color specifications once any exist.
    pub weight_grams: f64,

    /// Old single free-text color. Kept for products not yet normalized.
    pub legacy_color: Option<String>,

    /// Heaviest first when loaded from storage.
    pub color_specifications: Vec<ColorSpecification>,

    /// Base print time in minutes, before any color switches.
    pub print_time_minutes: i64,

    pub material: Material,

    pub extruder_temp_c: i64,

    pub bed_temp_c: i64,

    /// Reference into the image store; the file itself is not managed here.
    pub image_path: Option<String>,

    /// Free-text print guide.
    pub guide: String,

    /// Set once, on insert.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Refreshed on every persisted change.
    #[ts(as = "String")]
    pub modified_at: DateTime<Utc>,
}

impl Product {
    /// Creates an unsaved product with default print settings.
    ///
    /// ## Example
    /// ```rust
    /// use chroma_core::{Material, Product};
    ///
    /// let product = Product::new("Bracket");
    /// assert!(product.id.is_none());
    /// assert_eq!(product.material, Material::Pla);
    /// assert_eq!(product.total_weight(), 0.0);
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Product {
            id: None,
            name: name.into(),
            description: String::new(),
            weight_grams: 0.0,
            legacy_color: None,
            color_specifications: Vec::new(),
            print_time_minutes: 0,
            material: Material::default(),
            extruder_temp_c: DEFAULT_EXTRUDER_TEMP,
            bed_temp_c: DEFAULT_BED_TEMP,
            image_path: None,
            guide: String::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Validates the product and every nested specification and piece.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_weight("weight", self.weight_grams)?;
        validate_minutes("print_time", self.print_time_minutes)?;
        validate_extruder_temp(self.extruder_temp_c)?;
        validate_bed_temp(self.bed_temp_c)?;
        for spec in &self.color_specifications {
            spec.validate()?;
        }
        Ok(())
    }

    pub fn has_color_specifications(&self) -> bool {
        !self.color_specifications.is_empty()
    }

    /// True when the product still relies on the old free-text color.
    pub fn uses_legacy_color(&self) -> bool {
        !self.has_color_specifications()
            && self
                .legacy_color
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }

    // -------------------------------------------------------------------------
    // Derived values
    // -------------------------------------------------------------------------

    /// Total filament weight in grams.
    ///
    /// Sum of the recorded specification weights when any specification
    /// exists, otherwise the legacy declared weight.
    pub fn total_weight(&self) -> f64 {
        if self.color_specifications.is_empty() {
            return self.weight_grams;
        }

        self.color_specifications
            .iter()
            .map(|spec| spec.weight_grams)
            .sum()
    }

    /// Total print time in minutes.
    ///
    /// Base time plus the switch time of every color after the first. The
    /// first color is loaded when the print starts. Saturates at `i64::MAX`.
    pub fn total_time(&self) -> i64 {
        self.color_specifications
            .iter()
            .skip(1)
            .fold(self.print_time_minutes, |total, spec| {
                total.saturating_add(spec.extra_time_minutes)
            })
    }

    /// The heaviest specification; the earliest one wins a tie.
    pub fn primary_color(&self) -> Option<&ColorSpecification> {
        self.color_specifications.iter().fold(None, |best, spec| match best {
            Some(current) if current.weight_grams >= spec.weight_grams => Some(current),
            _ => Some(spec),
        })
    }

    /// Total number of pieces across all specifications.
    pub fn piece_count(&self) -> usize {
        self.color_specifications.iter().map(|s| s.pieces.len()).sum()
    }

    /// Specifications merged by hex, in first-seen order.
    pub fn color_groups(&self) -> Vec<ColorGroup> {
        let mut groups: Vec<ColorGroup> = Vec::new();

        for spec in &self.color_specifications {
            let pieces = spec.pieces.iter().map(|p| p.name.clone());

            match groups.iter_mut().find(|g| g.color_hex == spec.color_hex) {
                Some(group) => {
                    group.weight_grams += spec.weight_grams;
                    group.extra_time_minutes += spec.extra_time_minutes;
                    group.piece_names.extend(pieces);
                    group.specification_count += 1;
                    if group.color_name.is_none() {
                        group.color_name = spec.color_name.clone();
                    }
                }
                None => groups.push(ColorGroup {
                    color_hex: spec.color_hex.clone(),
                    color_name: spec.color_name.clone(),
                    weight_grams: spec.weight_grams,
                    extra_time_minutes: spec.extra_time_minutes,
                    piece_names: pieces.collect(),
                    specification_count: 1,
                }),
            }
        }

        groups
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
