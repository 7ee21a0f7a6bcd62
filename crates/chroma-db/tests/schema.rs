//! Integration tests for file-backed databases: migrations, backups and the
//! legacy color upgrade path

use std::path::Path;

use chroma_core::legacy::{AUTO_MIGRATED_NOTE, WHOLE_PRODUCT_PIECE};
use chroma_core::Product;
use chroma_db::{Database, DbConfig, Migrator};
use tempfile::TempDir;

fn config(dir: &Path) -> DbConfig {
    DbConfig::new(dir.join("catalog.db"))
}

#[tokio::test]
async fn fresh_file_is_migrated_without_backup() {
    let dir = TempDir::new().unwrap();

    let db = Database::new(config(dir.path())).await.unwrap();

    assert_eq!(
        db.migrator().current_version().await.unwrap(),
        Migrator::latest_version()
    );
    // Nothing worth backing up on a fresh install.
    assert!(!dir.path().join("backups").exists());

    db.close().await;
}

#[tokio::test]
async fn reopening_is_idempotent_and_keeps_data() {
    let dir = TempDir::new().unwrap();

    let db = Database::new(config(dir.path())).await.unwrap();
    let mut product = Product::new("Bracket");
    let id = db.products().create(&mut product).await.unwrap();
    db.close().await;

    let db = Database::new(config(dir.path()).backup_before_migrate(false))
        .await
        .unwrap();
    let report = db.migrator().run_pending().await.unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.from_version, Migrator::latest_version());

    let history = db.migrator().history().await.unwrap();
    assert_eq!(history.len() as i64, Migrator::latest_version());

    assert_eq!(db.products().get(&id).await.unwrap(), Some(product));
    db.close().await;
}

#[tokio::test]
async fn backup_copies_a_populated_file() {
    let dir = TempDir::new().unwrap();

    let db = Database::new(config(dir.path())).await.unwrap();
    db.products()
        .create(&mut Product::new("Bracket"))
        .await
        .unwrap();

    let backup = db.migrator().backup().await.unwrap().unwrap();
    assert!(backup.starts_with(dir.path().join("backups")));

    let file_name = backup.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("catalog-backup-"), "{}", file_name);
    assert!(file_name.ends_with(".db"), "{}", file_name);
    db.close().await;

    // The copy is a complete database on its own.
    let copy = Database::new(DbConfig::new(&backup).run_migrations(false))
        .await
        .unwrap();
    assert_eq!(copy.products().count().await.unwrap(), 1);
    copy.close().await;
}

#[tokio::test]
async fn legacy_database_is_upgraded_and_normalized() {
    let dir = TempDir::new().unwrap();

    // A catalog from before color specifications existed.
    let db = Database::new(config(dir.path()).run_migrations(false))
        .await
        .unwrap();
    let migrator = db.migrator();
    migrator.migrate_to(1).await.unwrap();

    sqlx::query(
        r#"
        INSERT INTO products (id, name, weight, legacy_color, created_at, modified_at)
        VALUES ('legacy-1', 'Bracket', 12.5, 'rojo',
                '2020-01-01T00:00:00+00:00', '2020-01-01T00:00:00+00:00')
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    assert!(migrator.has_pending().await.unwrap());
    let backup = migrator.backup().await.unwrap();
    assert!(backup.is_some());

    let report = migrator.run_pending().await.unwrap();
    assert_eq!(report.from_version, 1);
    assert_eq!(report.applied, vec![2, 3, 4, 5]);

    // Upgraded but not yet normalized.
    let before = db.products().get("legacy-1").await.unwrap().unwrap();
    assert!(before.uses_legacy_color());
    assert_eq!(before.total_weight(), 12.5);

    let normalized = db.legacy_normalizer().run().await.unwrap();
    assert_eq!(normalized.migrated, 1);

    let after = db.products().get("legacy-1").await.unwrap().unwrap();
    assert_eq!(after.color_specifications.len(), 1);
    let spec = &after.color_specifications[0];
    assert_eq!(spec.color_hex.as_str(), "#FF0000");
    assert_eq!(spec.color_name.as_deref(), Some("rojo"));
    assert_eq!(spec.weight_grams, 12.5);
    assert_eq!(spec.extra_time_minutes, 0);
    assert_eq!(spec.piece_names(), vec![WHOLE_PRODUCT_PIECE]);
    assert_eq!(spec.notes, AUTO_MIGRATED_NOTE);
    assert_eq!(after.total_weight(), 12.5);
    assert_eq!(after.created_at, before.created_at);

    let again = db.legacy_normalizer().run().await.unwrap();
    assert_eq!(again.migrated, 0);
    assert_eq!(again.already_normalized, 1);
    assert_eq!(
        db.products().get("legacy-1").await.unwrap().unwrap(),
        after
    );

    db.close().await;
}
