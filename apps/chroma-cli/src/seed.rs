//! # Seed Data Generator
//!
//! Populates an empty catalog with sample products for development.
//!
//! ## Generated Products
//! Names come from a few catalog families (figures, household, tools,
//! spare parts), each combined with a size variant:
//! - 1 to 3 color specifications, heaviest first
//! - One or two pieces per color
//! - Material, print time and temperatures derived from the index
//! - Every seventh product carries only a legacy color name, so
//!   `chroma normalize` has something to convert
//!
//! The data is deterministic: the same count always yields the same catalog
//! (ids and timestamps aside).

use std::time::Instant;

use chroma_core::{ColorSpecification, Difficulty, HexColor, Material, Piece, Product};
use chroma_db::Database;
use tracing::{info, warn};

use crate::error::CliResult;

/// Product families for realistic sample data.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "Figures",
        &["Dragon", "Owl", "Octopus", "Fox", "Turtle", "Knight", "Robot", "Cat"],
    ),
    (
        "Household",
        &["Vase", "Planter", "Coaster", "Lamp Shade", "Soap Dish", "Key Hook"],
    ),
    (
        "Tools",
        &["Cable Clip", "Spool Holder", "Tool Tray", "Bit Organizer", "Phone Stand"],
    ),
    (
        "Spare Parts",
        &["Hinge", "Knob", "Bracket", "Gear", "Fan Duct", "Drawer Handle"],
    ),
];

const SIZES: &[(&str, f64)] = &[("Mini", 0.5), ("Standard", 1.0), ("Large", 2.0), ("XL", 3.5)];

/// Palette: (hex, Spanish name).
const PALETTE: &[(&str, &str)] = &[
    ("#000000", "negro"),
    ("#FFFFFF", "blanco"),
    ("#FF0000", "rojo"),
    ("#2E7D32", "verde"),
    ("#0000FF", "azul"),
    ("#FFD600", "amarillo"),
    ("#FFA500", "naranja"),
    ("#808080", "gris"),
];

const PIECE_NAMES: &[&str] = &["body", "base", "lid", "arm", "detail", "insert"];

/// Generates up to `count` products into an empty catalog.
///
/// Returns the number of products created; 0 when the catalog already has
/// products.
pub async fn run(db: &Database, count: usize) -> CliResult<usize> {
    let repo = db.products();

    let existing = repo.count().await?;
    if existing > 0 {
        warn!(existing, "Catalog is not empty, skipping seed");
        return Ok(0);
    }

    let start = Instant::now();
    let mut generated = 0;

    let variants = FAMILIES
        .iter()
        .flat_map(|(_, names)| names.iter())
        .flat_map(|name| SIZES.iter().map(move |size| (*name, *size)));

    for (index, (name, (size, scale))) in variants.take(count).enumerate() {
        let mut product = generate_product(index, name, size, scale)?;

        if let Err(e) = repo.create(&mut product).await {
            warn!(name = %product.name, error = %e, "Failed to insert product");
            continue;
        }

        generated += 1;
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");
    Ok(generated)
}

/// Builds one sample product.
fn generate_product(index: usize, name: &str, size: &str, scale: f64) -> CliResult<Product> {
    let mut product = Product::new(format!("{} {}", name, size));
    product.description = format!("Sample {} ({} size)", name.to_lowercase(), size.to_lowercase());
    product.material = Material::ALL[index % Material::ALL.len()];
    product.print_time_minutes = ((30 + (index * 37) % 300) as f64 * scale).round() as i64;
    product.extruder_temp_c = 200 + (index % 5) as i64 * 10;
    product.bed_temp_c = 50 + (index % 4) as i64 * 10;
    product.guide = "0.2 mm layers, 15% infill".to_string();

    let base_weight = (10 + (index * 13) % 90) as f64 * scale;

    if index % 7 == 6 {
        let (_, legacy) = PALETTE[index % PALETTE.len()];
        product.legacy_color = Some(legacy.to_string());
        product.weight_grams = base_weight;
        return Ok(product);
    }

    let colors = 1 + index % 3;
    for slot in 0..colors {
        let (hex, color_name) = PALETTE[(index + slot * 3) % PALETTE.len()];
        // Each later color carries a smaller share of the filament.
        let weight = (base_weight / (slot + 1) as f64 * 10.0).round() / 10.0;

        let mut spec = ColorSpecification::new(HexColor::parse(hex)?)
            .with_name(color_name)
            .with_weight(weight)
            .with_extra_time(if slot == 0 { 0 } else { 10 + slot as i64 * 5 });

        for p in 0..(1 + (index + slot) % 2) {
            let mut piece = Piece::named(PIECE_NAMES[(index + slot + p) % PIECE_NAMES.len()]);
            piece.difficulty = Some(Difficulty::ALL[(index + p) % Difficulty::ALL.len()]);
            piece.assembly_order = Some(p as i64 + 1);
            spec = spec.with_piece(piece);
        }

        product.color_specifications.push(spec);
    }

    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_products_are_valid() {
        for index in 0..40 {
            let product = generate_product(index, "Dragon", "Large", 2.0).unwrap();
            assert!(product.validate().is_ok(), "product {} invalid", index);
        }
    }

    #[test]
    fn test_every_seventh_product_is_legacy() {
        let legacy = generate_product(6, "Owl", "Mini", 0.5).unwrap();
        assert!(legacy.uses_legacy_color());

        let modern = generate_product(5, "Owl", "Mini", 0.5).unwrap();
        assert!(modern.has_color_specifications());
    }

    #[tokio::test]
    async fn test_seed_skips_non_empty_catalog() {
        let db = Database::new(chroma_db::DbConfig::in_memory()).await.unwrap();

        assert_eq!(run(&db, 12).await.unwrap(), 12);
        assert_eq!(db.products().count().await.unwrap(), 12);
        assert_eq!(run(&db, 12).await.unwrap(), 0);
    }
}
