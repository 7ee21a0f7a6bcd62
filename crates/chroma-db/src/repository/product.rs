//! # Product Repository
//!
//! Database operations for the product aggregate: a product row, its color
//! specifications and their pieces.
//!
//! ## Key Operations
//! - CRUD with replace-all-children updates
//! - Case-insensitive substring search
//! - Color usage and catalog statistics via aggregate queries
//!
//! ## Replace-All-Children Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    update(&mut product)                                 │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   ├── SELECT created_at FROM products WHERE id = ?     (NotFound?)     │
//! │   ├── UPDATE products SET ..., modified_at = now                       │
//! │   ├── DELETE FROM color_specifications WHERE product_id = ?            │
//! │   │        └── ON DELETE CASCADE removes their color_pieces            │
//! │   ├── INSERT color_specifications   (one per in-memory spec)           │
//! │   └── INSERT color_pieces           (one per piece, in order)          │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  The in-memory value at the time of the call is exactly what is        │
//! │  stored. There are no partial patches.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Load Order
//! Specifications come back heaviest first (ties by insertion order) and
//! pieces in insertion order. `create` and `update` sort the caller's value
//! the same way, so the caller's copy matches what `get` returns.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use chroma_core::validation::validate_search_term;
use chroma_core::{
    ColorSpecification, Difficulty, HexColor, JointType, Material, Piece, PieceFlags, Product,
    ValidationError,
};

use crate::error::{DbError, DbResult};

// =============================================================================
// Query Results
// =============================================================================

/// One hex value as used across the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorUsage {
    pub color_hex: HexColor,
    /// One of the names recorded for this hex, if any was.
    pub color_name: Option<String>,
    /// Distinct products with at least one specification in this color.
    pub product_count: i64,
}

/// Product count for one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialCount {
    pub material: Material,
    pub count: i64,
}

/// Catalog-wide figures, computed in SQL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStatistics {
    pub total_products: i64,
    /// Most common material first.
    pub products_by_material: Vec<MaterialCount>,
    /// Mean base print time in minutes. 0 for an empty catalog.
    pub average_print_time: f64,
    pub distinct_color_count: i64,
    /// Mean number of distinct hex values per product. 0 for an empty catalog.
    pub average_colors_per_product: f64,
}

// =============================================================================
// Rows
// =============================================================================

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, weight, legacy_color, print_time, material,
    extruder_temp, bed_temp, image_path, guide, created_at, modified_at
"#;

const SPECIFICATION_COLUMNS: &str = r#"
    id, color_hex, color_name, color_weight, extra_time, notes
"#;

const PIECE_COLUMNS: &str = r#"
    id, piece_name, piece_description, piece_weight, piece_print_time,
    orientation, requires_supports, difficulty, postprocess_notes,
    assembly_order, joint_type, fit_tolerance,
    is_critical, is_decorative, is_functional, allows_alternate_colors
"#;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: String,
    weight: f64,
    legacy_color: Option<String>,
    print_time: i64,
    material: String,
    extruder_temp: i64,
    bed_temp: i64,
    image_path: Option<String>,
    guide: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, color_specifications: Vec<ColorSpecification>) -> DbResult<Product> {
        Ok(Product {
            material: parse_stored("products.material", &self.material)?,
            id: Some(self.id),
            name: self.name,
            description: self.description,
            weight_grams: self.weight,
            legacy_color: self.legacy_color,
            color_specifications,
            print_time_minutes: self.print_time,
            extruder_temp_c: self.extruder_temp,
            bed_temp_c: self.bed_temp,
            image_path: self.image_path,
            guide: self.guide,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SpecificationRow {
    id: i64,
    color_hex: String,
    color_name: Option<String>,
    color_weight: f64,
    extra_time: i64,
    notes: String,
}

impl SpecificationRow {
    fn into_specification(self, pieces: Vec<Piece>) -> DbResult<ColorSpecification> {
        Ok(ColorSpecification {
            id: Some(self.id),
            color_hex: parse_stored("color_specifications.color_hex", &self.color_hex)?,
            color_name: self.color_name,
            pieces,
            weight_grams: self.color_weight,
            extra_time_minutes: self.extra_time,
            notes: self.notes,
        })
    }
}

#[derive(Debug, FromRow)]
struct PieceRow {
    id: i64,
    piece_name: String,
    piece_description: Option<String>,
    piece_weight: Option<f64>,
    piece_print_time: Option<i64>,
    orientation: Option<String>,
    requires_supports: bool,
    difficulty: Option<String>,
    postprocess_notes: Option<String>,
    assembly_order: Option<i64>,
    joint_type: Option<String>,
    fit_tolerance: Option<f64>,
    is_critical: bool,
    is_decorative: bool,
    is_functional: bool,
    allows_alternate_colors: bool,
}

impl TryFrom<PieceRow> for Piece {
    type Error = DbError;

    fn try_from(row: PieceRow) -> DbResult<Self> {
        let difficulty = row
            .difficulty
            .as_deref()
            .map(|v| parse_stored::<Difficulty>("color_pieces.difficulty", v))
            .transpose()?;
        let joint_type = row
            .joint_type
            .as_deref()
            .map(|v| parse_stored::<JointType>("color_pieces.joint_type", v))
            .transpose()?;

        Ok(Piece {
            id: Some(row.id),
            name: row.piece_name,
            description: row.piece_description,
            weight_grams: row.piece_weight,
            print_time_minutes: row.piece_print_time,
            difficulty,
            orientation: row.orientation,
            requires_supports: row.requires_supports,
            joint_type,
            assembly_order: row.assembly_order,
            postprocess_notes: row.postprocess_notes,
            fit_tolerance_mm: row.fit_tolerance,
            flags: PieceFlags {
                critical: row.is_critical,
                decorative: row.is_decorative,
                functional: row.is_functional,
                allows_alternate_colors: row.allows_alternate_colors,
            },
        })
    }
}

#[derive(Debug, FromRow)]
struct ColorUsageRow {
    color_hex: String,
    color_name: Option<String>,
    product_count: i64,
}

#[derive(Debug, FromRow)]
struct MaterialCountRow {
    material: String,
    product_count: i64,
}

/// Parses a stored enumeration or hex value, mapping failure to corruption.
fn parse_stored<T: FromStr>(column: &str, value: &str) -> DbResult<T> {
    value.parse().map_err(|_| DbError::corrupt(column, value))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the product aggregate.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let mut product = Product::new("Dragon");
/// let id = repo.create(&mut product).await?;
///
/// let loaded = repo.get(&id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Inserts a product with all of its specifications and pieces.
    ///
    /// A fresh UUID is always generated; any id already on the value is
    /// replaced. The id, timestamps and child row ids are written back into
    /// `product`.
    ///
    /// ## Returns
    /// * `Ok(id)` - The new product id
    /// * `Err(DbError::Validation)` - Product rejected before any write
    pub async fn create(&self, product: &mut Product) -> DbResult<String> {
        product.validate()?;

        let id = Uuid::new_v4().to_string();
        let now = timestamp();

        debug!(id = %id, name = %product.name, "Creating product");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, weight, legacy_color, print_time,
                material, extruder_temp, bed_temp, image_path, guide,
                created_at, modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.weight_grams)
        .bind(&product.legacy_color)
        .bind(product.print_time_minutes)
        .bind(product.material.as_str())
        .bind(product.extruder_temp_c)
        .bind(product.bed_temp_c)
        .bind(&product.image_path)
        .bind(&product.guide)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_specifications(&mut tx, &id, &mut product.color_specifications).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        product.id = Some(id.clone());
        product.created_at = now;
        product.modified_at = now;
        sort_for_load(&mut product.color_specifications);

        debug!(
            id = %id,
            specifications = product.color_specifications.len(),
            pieces = product.piece_count(),
            "Product created"
        );
        Ok(id)
    }

    /// Overwrites a stored product with the in-memory value.
    ///
    /// Every existing specification (and, by cascade, piece) is deleted and
    /// the current set is inserted again with new row ids.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::Validation)` - No id, or product rejected
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &mut Product) -> DbResult<()> {
        let id = product
            .id
            .clone()
            .ok_or_else(|| ValidationError::required("id"))?;
        product.validate()?;

        debug!(id = %id, "Updating product");

        let now = timestamp();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let created_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM products WHERE id = ?1")
                .bind(&id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(created_at) = created_at else {
            return Err(DbError::not_found("Product", &id));
        };

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                weight = ?4,
                legacy_color = ?5,
                print_time = ?6,
                material = ?7,
                extruder_temp = ?8,
                bed_temp = ?9,
                image_path = ?10,
                guide = ?11,
                modified_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.weight_grams)
        .bind(&product.legacy_color)
        .bind(product.print_time_minutes)
        .bind(product.material.as_str())
        .bind(product.extruder_temp_c)
        .bind(product.bed_temp_c)
        .bind(&product.image_path)
        .bind(&product.guide)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM color_specifications WHERE product_id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        insert_specifications(&mut tx, &id, &mut product.color_specifications).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        product.created_at = created_at;
        product.modified_at = now;
        sort_for_load(&mut product.color_specifications);

        Ok(())
    }

    /// Deletes a product; its specifications and pieces go with it.
    ///
    /// ## Returns
    /// * `Ok(true)` - A row was removed
    /// * `Ok(false)` - No product had that id
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a fully hydrated product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Lists every product, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY name, id", PRODUCT_COLUMNS);
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate_all(rows).await
    }

    /// Case-insensitive substring search over name, description, legacy
    /// color and material, ordered by name.
    ///
    /// `%`, `_` and `\` in the term match themselves. An empty term lists
    /// everything.
    ///
    /// Case folding is SQLite's `LOWER`, which only folds ASCII letters:
    /// `"dragón"` finds "Dragón" but `"DRAGÓN"` and `"águila"` do not find
    /// "Águila Dragón".
    ///
    /// ## Example
    /// ```rust,ignore
    /// let dragons = repo.search("drag").await?;
    /// let petg = repo.search("petg").await?;
    /// ```
    pub async fn search(&self, term: &str) -> DbResult<Vec<Product>> {
        let term = validate_search_term(term)?;

        if term.is_empty() {
            return self.list_all().await;
        }

        debug!(term = %term, "Searching products");

        let pattern = format!("%{}%", escape_like(&term));
        let sql = format!(
            r#"
            SELECT {} FROM products
            WHERE LOWER(name) LIKE LOWER(?1) ESCAPE '\'
               OR LOWER(description) LIKE LOWER(?1) ESCAPE '\'
               OR LOWER(COALESCE(legacy_color, '')) LIKE LOWER(?1) ESCAPE '\'
               OR LOWER(material) LIKE LOWER(?1) ESCAPE '\'
            ORDER BY name, id
            "#,
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        self.hydrate_all(rows).await
    }

    /// Products with at least one specification in exactly this color.
    ///
    /// `hex` is parsed strictly (`#RRGGBB` or `RRGGBB`, any case); color
    /// names are not accepted here.
    pub async fn find_by_color(&self, hex: &str) -> DbResult<Vec<Product>> {
        let hex = HexColor::parse(hex)?;

        debug!(hex = %hex, "Finding products by color");

        let sql = format!(
            r#"
            SELECT {} FROM products
            WHERE id IN (
                SELECT product_id FROM color_specifications WHERE color_hex = ?1
            )
            ORDER BY name, id
            "#,
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(hex.as_str())
            .fetch_all(&self.pool)
            .await?;

        self.hydrate_all(rows).await
    }

    /// Gets one color specification with its pieces.
    pub async fn get_color_specification(&self, id: i64) -> DbResult<Option<ColorSpecification>> {
        let sql = format!(
            "SELECT {} FROM color_specifications WHERE id = ?1",
            SPECIFICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, SpecificationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let pieces = self.load_pieces(row.id).await?;
                Ok(Some(row.into_specification(pieces)?))
            }
            None => Ok(None),
        }
    }

    /// Gets one piece.
    pub async fn get_piece(&self, id: i64) -> DbResult<Option<Piece>> {
        let sql = format!("SELECT {} FROM color_pieces WHERE id = ?1", PIECE_COLUMNS);
        let row = sqlx::query_as::<_, PieceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Piece::try_from).transpose()
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Aggregates
    // -------------------------------------------------------------------------

    /// Every hex value in use, with how many products use it.
    ///
    /// Most used first; ties ordered by hex.
    pub async fn available_colors(&self) -> DbResult<Vec<ColorUsage>> {
        let rows = sqlx::query_as::<_, ColorUsageRow>(
            r#"
            SELECT
                color_hex,
                MAX(color_name) AS color_name,
                COUNT(DISTINCT product_id) AS product_count
            FROM color_specifications
            GROUP BY color_hex
            ORDER BY product_count DESC, color_hex ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> DbResult<ColorUsage> {
                Ok(ColorUsage {
                    color_hex: parse_stored("color_specifications.color_hex", &row.color_hex)?,
                    color_name: row.color_name,
                    product_count: row.product_count,
                })
            })
            .collect()
    }

    /// Catalog-wide statistics.
    ///
    /// Runs one aggregate query per figure; no product is loaded.
    pub async fn statistics(&self) -> DbResult<CatalogStatistics> {
        let total_products = self.count().await?;

        let material_rows = sqlx::query_as::<_, MaterialCountRow>(
            r#"
            SELECT material, COUNT(*) AS product_count
            FROM products
            GROUP BY material
            ORDER BY product_count DESC, material ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let products_by_material = material_rows
            .into_iter()
            .map(|row| -> DbResult<MaterialCount> {
                Ok(MaterialCount {
                    material: parse_stored("products.material", &row.material)?,
                    count: row.product_count,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        let average_print_time: Option<f64> =
            sqlx::query_scalar("SELECT AVG(print_time) FROM products")
                .fetch_one(&self.pool)
                .await?;

        let distinct_color_count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT color_hex) FROM color_specifications")
                .fetch_one(&self.pool)
                .await?;

        let average_colors_per_product: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(color_count) FROM (
                SELECT COUNT(DISTINCT cs.color_hex) AS color_count
                FROM products p
                LEFT JOIN color_specifications cs ON cs.product_id = p.id
                GROUP BY p.id
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogStatistics {
            total_products,
            products_by_material,
            average_print_time: average_print_time.unwrap_or(0.0),
            distinct_color_count,
            average_colors_per_product: average_colors_per_product.unwrap_or(0.0),
        })
    }

    // -------------------------------------------------------------------------
    // Hydration
    // -------------------------------------------------------------------------

    async fn hydrate_all(&self, rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(self.hydrate(row).await?);
        }
        Ok(products)
    }

    async fn hydrate(&self, row: ProductRow) -> DbResult<Product> {
        let specifications = self.load_specifications(&row.id).await?;
        row.into_product(specifications)
    }

    async fn load_specifications(&self, product_id: &str) -> DbResult<Vec<ColorSpecification>> {
        let sql = format!(
            r#"
            SELECT {} FROM color_specifications
            WHERE product_id = ?1
            ORDER BY color_weight DESC, id ASC
            "#,
            SPECIFICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SpecificationRow>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        let mut specifications = Vec::with_capacity(rows.len());
        for row in rows {
            let pieces = self.load_pieces(row.id).await?;
            specifications.push(row.into_specification(pieces)?);
        }
        Ok(specifications)
    }

    async fn load_pieces(&self, specification_id: i64) -> DbResult<Vec<Piece>> {
        let sql = format!(
            "SELECT {} FROM color_pieces WHERE color_specification_id = ?1 ORDER BY id ASC",
            PIECE_COLUMNS
        );
        let rows = sqlx::query_as::<_, PieceRow>(&sql)
            .bind(specification_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Piece::try_from).collect()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Inserts specifications and their pieces, stamping the new row ids.
async fn insert_specifications(
    conn: &mut SqliteConnection,
    product_id: &str,
    specifications: &mut [ColorSpecification],
) -> DbResult<()> {
    for spec in specifications.iter_mut() {
        let result = sqlx::query(
            r#"
            INSERT INTO color_specifications (
                product_id, color_hex, color_name, color_weight, extra_time, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(product_id)
        .bind(spec.color_hex.as_str())
        .bind(&spec.color_name)
        .bind(spec.weight_grams)
        .bind(spec.extra_time_minutes)
        .bind(&spec.notes)
        .execute(&mut *conn)
        .await?;

        let spec_id = result.last_insert_rowid();
        spec.id = Some(spec_id);

        for piece in spec.pieces.iter_mut() {
            piece.id = Some(insert_piece(conn, spec_id, piece).await?);
        }
    }
    Ok(())
}

async fn insert_piece(conn: &mut SqliteConnection, spec_id: i64, piece: &Piece) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO color_pieces (
            color_specification_id, piece_name, piece_description, piece_weight,
            piece_print_time, orientation, requires_supports, difficulty,
            postprocess_notes, assembly_order, joint_type, fit_tolerance,
            is_critical, is_decorative, is_functional, allows_alternate_colors
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(spec_id)
    .bind(&piece.name)
    .bind(&piece.description)
    .bind(piece.weight_grams)
    .bind(piece.print_time_minutes)
    .bind(&piece.orientation)
    .bind(piece.requires_supports)
    .bind(piece.difficulty.map(|d| d.as_str()))
    .bind(&piece.postprocess_notes)
    .bind(piece.assembly_order)
    .bind(piece.joint_type.map(|j| j.as_str()))
    .bind(piece.fit_tolerance_mm)
    .bind(piece.flags.critical)
    .bind(piece.flags.decorative)
    .bind(piece.flags.functional)
    .bind(piece.flags.allows_alternate_colors)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Current time at the precision stored and compared in tests.
fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Orders specifications the way `get` returns them. Stable, so equal
/// weights keep insertion (id) order.
fn sort_for_load(specifications: &mut [ColorSpecification]) {
    specifications.sort_by(|a, b| {
        b.weight_grams
            .partial_cmp(&a.weight_grams)
            .unwrap_or(Ordering::Equal)
    });
}

/// Escapes LIKE wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        (db, repo)
    }

    fn hex(s: &str) -> HexColor {
        HexColor::parse(s).unwrap()
    }

    fn dragon() -> Product {
        let mut wing = Piece::named("wings");
        wing.difficulty = Some(Difficulty::Hard);
        wing.joint_type = Some(JointType::SnapFit);
        wing.requires_supports = true;
        wing.weight_grams = Some(6.0);
        wing.fit_tolerance_mm = Some(0.2);
        wing.assembly_order = Some(2);
        wing.flags.decorative = true;

        let mut product = Product::new("Dragon");
        product.description = "Articulated dragon".to_string();
        product.material = Material::Petg;
        product.print_time_minutes = 240;
        product.color_specifications = vec![
            ColorSpecification::new(hex("#2E7D32"))
                .with_name("verde")
                .with_weight(48.0)
                .with_piece(Piece::named("body"))
                .with_piece(Piece::named("tail")),
            ColorSpecification::new(hex("#FFD600"))
                .with_name("amarillo")
                .with_weight(12.0)
                .with_extra_time(15)
                .with_piece(wing),
        ];
        product
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_sort_for_load_is_stable() {
        let mut specs = vec![
            ColorSpecification::new(hex("#000001")).with_weight(1.0),
            ColorSpecification::new(hex("#000002")).with_weight(5.0),
            ColorSpecification::new(hex("#000003")).with_weight(1.0),
        ];
        sort_for_load(&mut specs);
        let order: Vec<&str> = specs.iter().map(|s| s.color_hex.as_str()).collect();
        assert_eq!(order, vec!["#000002", "#000001", "#000003"]);
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let (_db, repo) = repo().await;
        let mut product = dragon();

        let id = repo.create(&mut product).await.unwrap();
        assert_eq!(product.id.as_deref(), Some(id.as_str()));
        assert!(product.color_specifications.iter().all(|s| s.id.is_some()));

        let loaded = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded, product);
        assert_eq!(loaded.color_specifications[1].pieces[0].difficulty, Some(Difficulty::Hard));
        assert!(loaded.color_specifications[1].pieces[0].flags.decorative);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (_db, repo) = repo().await;
        assert!(repo.get("no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_orders_specifications_heaviest_first() {
        let (_db, repo) = repo().await;
        let mut product = Product::new("Flag");
        product.color_specifications = vec![
            ColorSpecification::new(hex("#FF0000")).with_weight(2.0),
            ColorSpecification::new(hex("#0000FF")).with_weight(9.0),
            ColorSpecification::new(hex("#FFFFFF")).with_weight(2.0),
        ];

        let id = repo.create(&mut product).await.unwrap();
        let loaded = repo.get(&id).await.unwrap().unwrap();

        let order: Vec<&str> = loaded
            .color_specifications
            .iter()
            .map(|s| s.color_hex.as_str())
            .collect();
        assert_eq!(order, vec!["#0000FF", "#FF0000", "#FFFFFF"]);
        assert_eq!(loaded.primary_color().unwrap().color_hex.as_str(), "#0000FF");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_product() {
        let (_db, repo) = repo().await;
        let mut product = Product::new("   ");

        let err = repo.create(&mut product).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_children() {
        let (_db, repo) = repo().await;
        let mut product = dragon();
        let id = repo.create(&mut product).await.unwrap();
        let created_at = product.created_at;
        let old_spec_ids: Vec<i64> = product
            .color_specifications
            .iter()
            .filter_map(|s| s.id)
            .collect();

        product.name = "Dragon v2".to_string();
        product.color_specifications =
            vec![ColorSpecification::new(hex("#000000")).with_weight(30.0)];
        repo.update(&mut product).await.unwrap();

        let loaded = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Dragon v2");
        assert_eq!(loaded.color_specifications.len(), 1);
        assert_eq!(loaded.created_at, created_at);
        assert!(loaded.modified_at >= created_at);
        assert_eq!(loaded, product);

        for spec_id in old_spec_ids {
            assert!(repo.get_color_specification(spec_id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let (_db, repo) = repo().await;

        let mut unsaved = Product::new("Ghost");
        let err = repo.update(&mut unsaved).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::Required { .. })));

        unsaved.id = Some("does-not-exist".to_string());
        let err = repo.update(&mut unsaved).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (_db, repo) = repo().await;
        let mut product = dragon();
        let id = repo.create(&mut product).await.unwrap();

        let spec_id = product.color_specifications[0].id.unwrap();
        let piece_id = product.color_specifications[0].pieces[0].id.unwrap();
        assert!(repo.get_piece(piece_id).await.unwrap().is_some());

        assert!(repo.delete(&id).await.unwrap());
        assert!(!repo.delete(&id).await.unwrap());

        assert!(repo.get(&id).await.unwrap().is_none());
        assert!(repo.get_color_specification(spec_id).await.unwrap().is_none());
        assert!(repo.get_piece(piece_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_material_is_reported() {
        let (db, repo) = repo().await;
        let mut product = Product::new("Widget");
        let id = repo.create(&mut product).await.unwrap();

        sqlx::query("UPDATE products SET material = 'WOOD' WHERE id = ?1")
            .bind(&id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = repo.get(&id).await.unwrap_err();
        assert!(matches!(err, DbError::CorruptData { ref value, .. } if value == "WOOD"));
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back() {
        let (db, repo) = repo().await;
        let mut product = Product::new("Dragon");
        product.color_specifications =
            vec![ColorSpecification::new(hex("#000000")).with_weight(10.0)];
        let id = repo.create(&mut product).await.unwrap();

        sqlx::query(
            r#"
            CREATE TRIGGER reject_pieces BEFORE INSERT ON color_pieces
            BEGIN SELECT RAISE(ABORT, 'pieces rejected'); END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        product.name = "Wyvern".to_string();
        product.color_specifications = vec![ColorSpecification::new(hex("#FF0000"))
            .with_weight(5.0)
            .with_piece(Piece::named("wing"))];
        assert!(repo.update(&mut product).await.is_err());

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Dragon");
        assert_eq!(stored.color_specifications.len(), 1);
        assert_eq!(stored.color_specifications[0].color_hex.as_str(), "#000000");
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing() {
        let (db, repo) = repo().await;

        sqlx::query(
            r#"
            CREATE TRIGGER reject_pieces BEFORE INSERT ON color_pieces
            BEGIN SELECT RAISE(ABORT, 'pieces rejected'); END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let mut product = dragon();
        assert!(repo.create(&mut product).await.is_err());
        assert!(product.id.is_none());
        assert_eq!(repo.count().await.unwrap(), 0);

        let specs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM color_specifications")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(specs, 0);
    }

    #[tokio::test]
    async fn test_search_folds_ascii_case_only() {
        let (_db, repo) = repo().await;
        let mut product = Product::new("Águila Dragón");
        repo.create(&mut product).await.unwrap();

        assert_eq!(repo.search("dragón").await.unwrap().len(), 1);
        assert_eq!(repo.search("ÁGUILA").await.unwrap().len(), 1);
        assert!(repo.search("DRAGÓN").await.unwrap().is_empty());
        assert!(repo.search("águila").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orphan_specification_is_rejected() {
        let (db, _repo) = repo().await;

        let result = sqlx::query(
            "INSERT INTO color_specifications (product_id, color_hex) VALUES ('missing', '#000000')",
        )
        .execute(db.pool())
        .await;

        let err: DbError = result.unwrap_err().into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
