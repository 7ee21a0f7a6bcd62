//! # Validation Module
//!
//! Input validation for catalog entities.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI forms                                                     │
//! │  └── Immediate user feedback (out of scope here)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Entity validation (THIS MODULE)                              │
//! │  ├── Required names, length limits                                     │
//! │  ├── Temperature ranges                                                │
//! │  └── Non-negative weights and times                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hex colors are validated by [`HexColor::parse`](crate::HexColor::parse).

use crate::error::{ValidationError, ValidationResult};
use crate::{BED_TEMP_RANGE, EXTRUDER_TEMP_RANGE, MAX_NAME_LENGTH, MAX_SEARCH_LENGTH};

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or piece name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 200 characters
///
/// ## Example
/// ```rust
/// use chroma_core::validation::validate_name;
///
/// assert!(validate_name("name", "Bracket").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a search term and returns it trimmed.
///
/// ## Rules
/// - Can be empty (means "everything")
/// - Maximum 100 characters
pub fn validate_search_term(term: &str) -> ValidationResult<String> {
    let term = term.trim();

    if term.chars().count() > MAX_SEARCH_LENGTH {
        return Err(ValidationError::TooLong {
            field: "search term".to_string(),
            max: MAX_SEARCH_LENGTH,
        });
    }

    Ok(term.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a weight in grams: finite and `>= 0`.
pub fn validate_weight(field: &str, grams: f64) -> ValidationResult<()> {
    if !grams.is_finite() {
        return Err(ValidationError::invalid_format(field, "must be a finite number"));
    }

    if grams < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a duration in minutes: `>= 0`.
pub fn validate_minutes(field: &str, minutes: i64) -> ValidationResult<()> {
    if minutes < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates the extruder temperature (°C).
///
/// ```rust
/// use chroma_core::validation::validate_extruder_temp;
///
/// assert!(validate_extruder_temp(210).is_ok());
/// assert!(validate_extruder_temp(90).is_err());
/// ```
pub fn validate_extruder_temp(celsius: i64) -> ValidationResult<()> {
    validate_range("extruder_temp", celsius, EXTRUDER_TEMP_RANGE)
}

/// Validates the bed temperature (°C). Zero means an unheated bed.
pub fn validate_bed_temp(celsius: i64) -> ValidationResult<()> {
    validate_range("bed_temp", celsius, BED_TEMP_RANGE)
}

fn validate_range(field: &str, value: i64, (min, max): (i64, i64)) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
