//! Integration tests for catalog queries: search, colors and statistics

use chroma_core::{
    ColorSpecification, Difficulty, HexColor, JointType, Material, Piece, PieceFlags, Product,
};
use chroma_db::{Database, DbConfig, DbError, MaterialCount, ProductRepository};

async fn open() -> (Database, ProductRepository) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let repo = db.products();
    (db, repo)
}

fn spec(hex: &str, grams: f64) -> ColorSpecification {
    ColorSpecification::new(HexColor::parse(hex).unwrap()).with_weight(grams)
}

fn product(name: &str, material: Material, minutes: i64, specs: Vec<ColorSpecification>) -> Product {
    let mut product = Product::new(name);
    product.material = material;
    product.print_time_minutes = minutes;
    product.color_specifications = specs;
    product
}

fn names(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn search_matches_every_text_column_case_insensitively() {
    let (_db, repo) = open().await;

    let mut dragon = product("Dragon", Material::Petg, 240, vec![]);
    dragon.description = "Articulated, prints as one part".to_string();
    repo.create(&mut dragon).await.unwrap();

    let mut vase = product("Vase", Material::Pla, 90, vec![]);
    vase.legacy_color = Some("Azul".to_string());
    repo.create(&mut vase).await.unwrap();

    let mut cube = product("100% infill cube", Material::Pla, 30, vec![]);
    repo.create(&mut cube).await.unwrap();

    assert_eq!(names(&repo.search("DRAG").await.unwrap()), vec!["Dragon"]);
    assert_eq!(names(&repo.search("articulated").await.unwrap()), vec!["Dragon"]);
    assert_eq!(names(&repo.search("petg").await.unwrap()), vec!["Dragon"]);
    assert_eq!(names(&repo.search("azul").await.unwrap()), vec!["Vase"]);
    assert_eq!(
        names(&repo.search("pla").await.unwrap()),
        vec!["100% infill cube", "Vase"]
    );

    // Wildcards match literally.
    assert_eq!(names(&repo.search("%").await.unwrap()), vec!["100% infill cube"]);
    assert!(repo.search("_").await.unwrap().is_empty());

    assert!(repo.search("zebra").await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_search_lists_everything_by_name() {
    let (_db, repo) = open().await;

    for name in ["Vase", "Bracket", "Dragon"] {
        repo.create(&mut Product::new(name)).await.unwrap();
    }

    let all = repo.search("   ").await.unwrap();
    assert_eq!(names(&all), vec!["Bracket", "Dragon", "Vase"]);
    assert_eq!(all, repo.list_all().await.unwrap());
}

#[tokio::test]
async fn overlong_search_term_is_rejected() {
    let (_db, repo) = open().await;

    let err = repo.search(&"x".repeat(101)).await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
}

#[tokio::test]
async fn find_by_color_returns_distinct_products() {
    let (_db, repo) = open().await;

    // Same hex twice on one product.
    let mut a = product(
        "Alpha",
        Material::Pla,
        10,
        vec![spec("#000000", 5.0), spec("#000000", 2.0)],
    );
    let mut b = product("Beta", Material::Pla, 10, vec![spec("#000000", 1.0)]);
    let mut c = product("Gamma", Material::Pla, 10, vec![spec("#FFFFFF", 1.0)]);
    for p in [&mut a, &mut b, &mut c] {
        repo.create(p).await.unwrap();
    }

    let black = repo.find_by_color("000000").await.unwrap();
    assert_eq!(names(&black), vec!["Alpha", "Beta"]);
    assert_eq!(black[0].color_specifications.len(), 2);

    assert!(repo.find_by_color("#123456").await.unwrap().is_empty());

    let err = repo.find_by_color("black").await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
}

#[tokio::test]
async fn available_colors_count_distinct_products() {
    let (_db, repo) = open().await;

    let mut a = product(
        "A",
        Material::Pla,
        10,
        vec![
            spec("#000000", 5.0).with_name("negro"),
            spec("#000000", 1.0),
        ],
    );
    let mut b = product("B", Material::Pla, 10, vec![spec("#000000", 3.0)]);
    let mut c = product(
        "C",
        Material::Pla,
        10,
        vec![spec("#000000", 3.0), spec("#FFFFFF", 1.0).with_name("blanco")],
    );
    for p in [&mut a, &mut b, &mut c] {
        repo.create(p).await.unwrap();
    }

    let colors = repo.available_colors().await.unwrap();
    let summary: Vec<(&str, i64)> = colors
        .iter()
        .map(|c| (c.color_hex.as_str(), c.product_count))
        .collect();
    assert_eq!(summary, vec![("#000000", 3), ("#FFFFFF", 1)]);
    assert_eq!(colors[0].color_name.as_deref(), Some("negro"));
    assert_eq!(colors[1].color_name.as_deref(), Some("blanco"));
}

#[tokio::test]
async fn statistics_on_empty_catalog() {
    let (_db, repo) = open().await;

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_products, 0);
    assert!(stats.products_by_material.is_empty());
    assert_eq!(stats.average_print_time, 0.0);
    assert_eq!(stats.distinct_color_count, 0);
    assert_eq!(stats.average_colors_per_product, 0.0);
}

#[tokio::test]
async fn statistics_aggregate_the_catalog() {
    let (_db, repo) = open().await;

    let mut products = vec![
        product("A", Material::Pla, 60, vec![spec("#000000", 5.0)]),
        product("B", Material::Pla, 120, vec![spec("#000000", 5.0)]),
        product(
            "C",
            Material::Petg,
            90,
            vec![spec("#000000", 5.0), spec("#FFFFFF", 1.0)],
        ),
        product("D", Material::Abs, 30, vec![]),
    ];
    for p in products.iter_mut() {
        repo.create(p).await.unwrap();
    }

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_products, 4);
    assert_eq!(
        stats.products_by_material,
        vec![
            MaterialCount { material: Material::Pla, count: 2 },
            MaterialCount { material: Material::Abs, count: 1 },
            MaterialCount { material: Material::Petg, count: 1 },
        ]
    );
    assert_eq!(stats.average_print_time, 75.0);
    assert_eq!(stats.distinct_color_count, 2);
    assert_eq!(stats.average_colors_per_product, 1.0);
}

#[tokio::test]
async fn rich_piece_attributes_survive_storage() {
    let (_db, repo) = open().await;

    let hinge = Piece {
        id: None,
        name: "hinge".to_string(),
        description: Some("Print-in-place hinge".to_string()),
        weight_grams: Some(3.25),
        print_time_minutes: Some(42),
        difficulty: Some(Difficulty::Expert),
        orientation: Some("on its side".to_string()),
        requires_supports: true,
        joint_type: Some(JointType::FrictionFit),
        assembly_order: Some(3),
        postprocess_notes: Some("Break free before first use".to_string()),
        fit_tolerance_mm: Some(0.15),
        flags: PieceFlags {
            critical: true,
            decorative: false,
            functional: true,
            allows_alternate_colors: true,
        },
    };

    let mut box_ = product(
        "Hinged box",
        Material::Asa,
        180,
        vec![spec("#FF6F00", 40.0)
            .with_notes("matte")
            .with_piece(Piece::named("lid"))
            .with_piece(hinge.clone())
            .with_piece(Piece::named("base"))],
    );
    let id = repo.create(&mut box_).await.unwrap();

    let loaded = repo.get(&id).await.unwrap().unwrap();
    let pieces = &loaded.color_specifications[0].pieces;
    assert_eq!(
        loaded.color_specifications[0].piece_names(),
        vec!["lid", "hinge", "base"]
    );

    let stored = &pieces[1];
    assert_eq!(stored, &Piece { id: stored.id, ..hinge });
    assert_eq!(loaded.color_specifications[0].pieces_weight(), Some(3.25));
    assert_eq!(loaded.total_weight(), 40.0);

    let by_id = repo.get_piece(stored.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(&by_id, stored);
}
