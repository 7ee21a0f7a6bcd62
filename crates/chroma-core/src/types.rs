//! # Value Types
//!
//! Small closed types shared by the catalog entities.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Value Types                                     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    HexColor     │   │    Material     │   │   Difficulty    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  "#FF0000"      │   │  PLA, PETG,     │   │  easy < medium  │       │
//! │  │  canonical,     │   │  ABS, ASA, TPU, │   │  < hard         │       │
//! │  │  validated      │   │  NYLON, PC,     │   │  < expert       │       │
//! │  └─────────────────┘   │  RESIN          │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │   JointType     │   │   PieceFlags    │                              │
//! │  │  ─────────────  │   │  ─────────────  │                              │
//! │  │  snap_fit, glue │   │  critical       │                              │
//! │  │  screw, magnets │   │  decorative     │                              │
//! │  │  solder,        │   │  functional     │                              │
//! │  │  friction_fit   │   │  alt. colors    │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every enum here round-trips through its `as_str()` form, which is also
//! the form stored in SQLite. Parsing an unknown string is an error, never
//! a silent fallback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Hex Color
// =============================================================================

/// A filament color as a canonical `#RRGGBB` string (uppercase digits).
///
/// ## Accepted Input
/// - `#ff0000`, `#FF0000`, `ff0000` → `#FF0000`
/// - `#f00`, `red`, `#GG0000` → rejected
///
/// Only the leading marker and letter case are normalized. Anything else
/// is rejected rather than guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export)]
pub struct HexColor(String);

impl HexColor {
    /// Parses and canonicalizes a hex color.
    ///
    /// ## Example
    /// ```rust
    /// use chroma_core::HexColor;
    ///
    /// let red = HexColor::parse("ff0000").unwrap();
    /// assert_eq!(red.as_str(), "#FF0000");
    /// assert!(HexColor::parse("#F00").is_err());
    /// ```
    pub fn parse(input: &str) -> ValidationResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(ValidationError::required("color_hex"));
        }

        if digits.len() != 6 {
            return Err(ValidationError::invalid_format(
                "color_hex",
                format!("expected 6 hex digits, got '{}'", input),
            ));
        }

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::invalid_format(
                "color_hex",
                format!("'{}' contains non-hex characters", input),
            ));
        }

        Ok(HexColor(format!("#{}", digits.to_ascii_uppercase())))
    }

    /// Neutral gray, used when a legacy color name cannot be resolved.
    pub fn neutral_gray() -> Self {
        HexColor("#808080".to_string())
    }

    /// Returns the canonical `#RRGGBB` form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HexColor::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

// =============================================================================
// Material
// =============================================================================

/// Filament material a product is printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Material {
    #[default]
    Pla,
    Petg,
    Abs,
    Asa,
    Tpu,
    Nylon,
    Pc,
    Resin,
}

impl Material {
    /// Every material, in display order.
    pub const ALL: [Material; 8] = [
        Material::Pla,
        Material::Petg,
        Material::Abs,
        Material::Asa,
        Material::Tpu,
        Material::Nylon,
        Material::Pc,
        Material::Resin,
    ];

    /// Stored / displayed name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Material::Pla => "PLA",
            Material::Petg => "PETG",
            Material::Abs => "ABS",
            Material::Asa => "ASA",
            Material::Tpu => "TPU",
            Material::Nylon => "NYLON",
            Material::Pc => "PC",
            Material::Resin => "RESIN",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Material {
    type Err = ValidationError;

    /// Case-insensitive: "petg" and "PETG" both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Material::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| not_allowed("material", s, Material::ALL.iter().map(Material::as_str)))
    }
}

// =============================================================================
// Difficulty
// =============================================================================

/// How hard a piece is to print. Ordered: `Easy < Medium < Hard < Expert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| not_allowed("difficulty", s, Difficulty::ALL.iter().map(Difficulty::as_str)))
    }
}

// =============================================================================
// Joint Type
// =============================================================================

/// How a piece is assembled onto the rest of the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum JointType {
    SnapFit,
    Glue,
    Screw,
    Magnets,
    Solder,
    FrictionFit,
}

impl JointType {
    pub const ALL: [JointType; 6] = [
        JointType::SnapFit,
        JointType::Glue,
        JointType::Screw,
        JointType::Magnets,
        JointType::Solder,
        JointType::FrictionFit,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            JointType::SnapFit => "snap_fit",
            JointType::Glue => "glue",
            JointType::Screw => "screw",
            JointType::Magnets => "magnets",
            JointType::Solder => "solder",
            JointType::FrictionFit => "friction_fit",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JointType::ALL
            .iter()
            .copied()
            .find(|j| j.as_str() == s)
            .ok_or_else(|| not_allowed("joint_type", s, JointType::ALL.iter().map(JointType::as_str)))
    }
}

// =============================================================================
// Piece Flags
// =============================================================================

/// Metadata flags attached to a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PieceFlags {
    /// Structural piece; a failed print here fails the product.
    pub critical: bool,
    pub decorative: bool,
    pub functional: bool,
    /// The piece may be printed in a color other than its specification's.
    pub allows_alternate_colors: bool,
}

fn not_allowed<'a>(
    field: &str,
    value: &str,
    allowed: impl Iterator<Item = &'a str>,
) -> ValidationError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        value: value.to_string(),
        allowed: allowed.map(str::to_string).collect(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
