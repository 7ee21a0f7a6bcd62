//! # Legacy Color Names
//!
//! Best-effort translation of the old free-text color field into a hex code.
//!
//! ## Lookup Order
//! ```text
//! "  Rojo Mate "
//!       │  trim + lowercase
//!       ▼
//! "rojo mate" ── exact match in table? ──────────── yes → hex
//!       │ no
//!       ▼
//! first table entry where "rojo mate" contains the key
//! or the key contains "rojo mate" ───────────────── yes → hex ("rojo")
//!       │ no
//!       ▼
//! #808080 (neutral gray)
//! ```
//!
//! This is a one-shot upgrade heuristic. Wrong matches are expected and
//! accepted here; nothing outside legacy normalization should call it.

use crate::types::HexColor;

/// Name of the single placeholder piece created for a normalized product.
pub const WHOLE_PRODUCT_PIECE: &str = "Whole product";

/// Note attached to specifications created by legacy normalization.
pub const AUTO_MIGRATED_NOTE: &str = "Auto-migrated from legacy color field";

/// Known color names, Spanish and English.
///
/// Order matters for the substring pass: compound names come before the
/// single words they contain.
const COLOR_TABLE: &[(&str, &str)] = &[
    // Compound names
    ("verde oscuro", "#006400"),
    ("verde claro", "#90EE90"),
    ("azul marino", "#000080"),
    ("azul claro", "#ADD8E6"),
    ("azul cielo", "#87CEEB"),
    ("gris oscuro", "#404040"),
    ("gris claro", "#D3D3D3"),
    ("rojo oscuro", "#8B0000"),
    ("dark green", "#006400"),
    ("light green", "#90EE90"),
    ("navy blue", "#000080"),
    ("light blue", "#ADD8E6"),
    ("sky blue", "#87CEEB"),
    ("dark gray", "#404040"),
    ("light gray", "#D3D3D3"),
    ("dark red", "#8B0000"),
    // Spanish
    ("rojo", "#FF0000"),
    ("verde", "#00FF00"),
    ("azul", "#0000FF"),
    ("amarillo", "#FFFF00"),
    ("naranja", "#FFA500"),
    ("morado", "#800080"),
    ("violeta", "#EE82EE"),
    ("rosa", "#FFC0CB"),
    ("marron", "#8B4513"),
    ("marrón", "#8B4513"),
    ("negro", "#000000"),
    ("blanco", "#FFFFFF"),
    ("gris", "#808080"),
    ("dorado", "#FFD700"),
    ("plateado", "#C0C0C0"),
    ("turquesa", "#40E0D0"),
    ("beige", "#F5F5DC"),
    ("transparente", "#F0F0F0"),
    // English
    ("red", "#FF0000"),
    ("green", "#00FF00"),
    ("blue", "#0000FF"),
    ("yellow", "#FFFF00"),
    ("orange", "#FFA500"),
    ("purple", "#800080"),
    ("violet", "#EE82EE"),
    ("pink", "#FFC0CB"),
    ("brown", "#8B4513"),
    ("black", "#000000"),
    ("white", "#FFFFFF"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("gold", "#FFD700"),
    ("silver", "#C0C0C0"),
    ("turquoise", "#40E0D0"),
    ("transparent", "#F0F0F0"),
];

/// Resolves a legacy color name to a hex color.
///
/// ## Example
/// ```rust
/// use chroma_core::legacy::resolve_color_name;
///
/// assert_eq!(resolve_color_name("Rojo").as_str(), "#FF0000");
/// assert_eq!(resolve_color_name("azul marino").as_str(), "#000080");
/// assert_eq!(resolve_color_name("something odd").as_str(), "#808080");
/// ```
pub fn resolve_color_name(name: &str) -> HexColor {
    let candidate = name.trim().to_lowercase();

    if candidate.is_empty() {
        return HexColor::neutral_gray();
    }

    let exact = COLOR_TABLE.iter().find(|(key, _)| *key == candidate);

    let found = exact.or_else(|| {
        COLOR_TABLE
            .iter()
            .find(|(key, _)| candidate.contains(key) || key.contains(candidate.as_str()))
    });

    found
        .and_then(|(_, hex)| HexColor::parse(hex).ok())
        .unwrap_or_else(HexColor::neutral_gray)
}
