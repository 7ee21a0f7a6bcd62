//! # Legacy Color Normalizer
//!
//! One-shot batch conversion of the old free-text color field into a color
//! specification. Invoked explicitly, never on startup.
//!
//! ## Decision Per Product
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  has color specifications? ── yes ──► already_normalized (untouched)   │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  non-empty legacy color?   ── no ───► without_legacy_color (untouched) │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  ColorSpecification {                                                  │
//! │      color_hex:  resolve_color_name(legacy)                            │
//! │      color_name: legacy (trimmed)                                      │
//! │      weight:     product.weight_grams                                  │
//! │      pieces:     ["Whole product"]                                     │
//! │      extra_time: 0                                                     │
//! │      notes:      "Auto-migrated from legacy color field"               │
//! │  }                                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  repository.update()  ──  ok ──► migrated                              │
//! │                       └─ err ──► failures (logged, run continues)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Running it twice is safe: the second run finds every converted product
//! already normalized. The legacy field itself is kept.

use serde::Serialize;
use tracing::{debug, info, warn};

use chroma_core::legacy::{resolve_color_name, AUTO_MIGRATED_NOTE, WHOLE_PRODUCT_PIECE};
use chroma_core::{ColorSpecification, Piece, Product};

use crate::error::DbResult;
use crate::repository::product::ProductRepository;

/// Summary of one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationReport {
    /// Products converted by this run.
    pub migrated: usize,
    /// Products that already had color specifications.
    pub already_normalized: usize,
    /// Products with neither specifications nor a legacy color.
    pub without_legacy_color: usize,
    /// Products whose conversion failed to persist.
    pub failures: Vec<NormalizationFailure>,
}

impl NormalizationReport {
    /// Number of products examined.
    pub fn total(&self) -> usize {
        self.migrated + self.already_normalized + self.without_legacy_color + self.failures.len()
    }
}

/// A product the normalizer could not convert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationFailure {
    pub product_id: String,
    pub product_name: String,
    pub reason: String,
}

/// Converts legacy single-color products through the product repository.
#[derive(Debug, Clone)]
pub struct LegacyColorNormalizer {
    products: ProductRepository,
}

impl LegacyColorNormalizer {
    pub fn new(products: ProductRepository) -> Self {
        LegacyColorNormalizer { products }
    }

    /// Runs the conversion over every product.
    ///
    /// Only loading the catalog can fail the whole run. A product that fails
    /// to save is recorded in [`NormalizationReport::failures`] and the run
    /// moves on.
    pub async fn run(&self) -> DbResult<NormalizationReport> {
        let products = self.products.list_all().await?;
        let mut report = NormalizationReport::default();

        info!(products = products.len(), "Starting legacy color normalization");

        for mut product in products {
            if product.has_color_specifications() {
                report.already_normalized += 1;
                continue;
            }

            let Some(specification) = specification_from_legacy(&product) else {
                debug!(name = %product.name, "No legacy color, leaving product untouched");
                report.without_legacy_color += 1;
                continue;
            };

            let hex = specification.color_hex.clone();
            product.color_specifications.push(specification);

            match self.products.update(&mut product).await {
                Ok(()) => {
                    info!(
                        name = %product.name,
                        legacy_color = product.legacy_color.as_deref().unwrap_or_default(),
                        hex = %hex,
                        "Normalized legacy color"
                    );
                    report.migrated += 1;
                }
                Err(err) => {
                    warn!(
                        name = %product.name,
                        error = %err,
                        "Failed to normalize legacy color"
                    );
                    report.failures.push(NormalizationFailure {
                        product_id: product.id.clone().unwrap_or_default(),
                        product_name: product.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            migrated = report.migrated,
            already_normalized = report.already_normalized,
            without_legacy_color = report.without_legacy_color,
            failed = report.failures.len(),
            "Legacy color normalization finished"
        );

        Ok(report)
    }
}

/// Builds the single specification replacing a product's legacy color.
///
/// `None` when the product has no usable legacy color.
fn specification_from_legacy(product: &Product) -> Option<ColorSpecification> {
    let legacy = product.legacy_color.as_deref()?.trim();
    if legacy.is_empty() {
        return None;
    }

    Some(
        ColorSpecification::new(resolve_color_name(legacy))
            .with_name(legacy)
            .with_weight(product.weight_grams)
            .with_extra_time(0)
            .with_piece(Piece::named(WHOLE_PRODUCT_PIECE))
            .with_notes(AUTO_MIGRATED_NOTE),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chroma_core::HexColor;

    #[test]
    fn test_specification_from_legacy() {
        let mut product = Product::new("Bracket");
        product.weight_grams = 12.5;
        product.legacy_color = Some("  Rojo ".to_string());

        let spec = specification_from_legacy(&product).unwrap();
        assert_eq!(spec.color_hex.as_str(), "#FF0000");
        assert_eq!(spec.color_name.as_deref(), Some("Rojo"));
        assert_eq!(spec.weight_grams, 12.5);
        assert_eq!(spec.extra_time_minutes, 0);
        assert_eq!(spec.piece_names(), vec![WHOLE_PRODUCT_PIECE]);
        assert_eq!(spec.notes, AUTO_MIGRATED_NOTE);
    }

    #[test]
    fn test_blank_legacy_color_is_skipped() {
        let mut product = Product::new("Bracket");
        assert!(specification_from_legacy(&product).is_none());

        product.legacy_color = Some("   ".to_string());
        assert!(specification_from_legacy(&product).is_none());
    }

    #[tokio::test]
    async fn test_run_counts_each_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut legacy = Product::new("Legacy");
        legacy.legacy_color = Some("azul".to_string());
        legacy.weight_grams = 20.0;
        repo.create(&mut legacy).await.unwrap();

        let mut modern = Product::new("Modern");
        modern.legacy_color = Some("rojo".to_string());
        modern
            .color_specifications
            .push(ColorSpecification::new(HexColor::parse("#00FF00").unwrap()).with_weight(3.0));
        repo.create(&mut modern).await.unwrap();

        let mut bare = Product::new("Bare");
        repo.create(&mut bare).await.unwrap();

        let report = db.legacy_normalizer().run().await.unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.already_normalized, 1);
        assert_eq!(report.without_legacy_color, 1);
        assert!(report.failures.is_empty());
        assert_eq!(report.total(), 3);

        let legacy = repo.get(legacy.id.as_deref().unwrap()).await.unwrap().unwrap();
        assert_eq!(legacy.color_specifications.len(), 1);
        assert_eq!(legacy.color_specifications[0].color_hex.as_str(), "#0000FF");
        assert_eq!(legacy.total_weight(), 20.0);
        assert_eq!(legacy.legacy_color.as_deref(), Some("azul"));

        // The existing specification was not replaced.
        let modern = repo.get(modern.id.as_deref().unwrap()).await.unwrap().unwrap();
        assert_eq!(modern.color_specifications[0].color_hex.as_str(), "#00FF00");

        let again = db.legacy_normalizer().run().await.unwrap();
        assert_eq!(again.migrated, 0);
        assert_eq!(again.already_normalized, 2);
        assert_eq!(again.without_legacy_color, 1);
    }

    #[tokio::test]
    async fn test_failed_product_does_not_stop_the_run() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut broken = Product::new("A");
        broken.legacy_color = Some("negro".to_string());
        let broken_id = repo.create(&mut broken).await.unwrap();

        let mut healthy = Product::new("B");
        healthy.legacy_color = Some("blanco".to_string());
        let healthy_id = repo.create(&mut healthy).await.unwrap();

        sqlx::query("UPDATE products SET extruder_temp = 999 WHERE id = ?1")
            .bind(&broken_id)
            .execute(db.pool())
            .await
            .unwrap();

        let report = db.legacy_normalizer().run().await.unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.failures.len(), 1);

        let failure = &report.failures[0];
        assert_eq!(failure.product_id, broken_id);
        assert_eq!(failure.product_name, "A");
        assert!(failure.reason.contains("extruder_temp"), "{}", failure.reason);

        let broken = repo.get(&broken_id).await.unwrap().unwrap();
        assert!(broken.color_specifications.is_empty());

        let healthy = repo.get(&healthy_id).await.unwrap().unwrap();
        assert_eq!(healthy.color_specifications.len(), 1);
        assert_eq!(healthy.color_specifications[0].color_hex.as_str(), "#FFFFFF");
    }
}
