//! # Seed Data Generator
//!
//! Populates the database with the demo tea and snack menu.
//!
//! ## Usage
//! ```bash
//! # Seed ./gaon_wali_chai.db
//! cargo run -p chai-db --bin seed
//!
//! # Specify database path
//! cargo run -p chai-db --bin seed -- --db ./data/chai.db
//! ```
//!
//! Seeding is skipped when the database already has products.

use anyhow::Context;
use chai_core::{Category, Product, ProductSize, ProductVariant};
use chai_db::{CatalogRepository, Database, DbConfig};
use std::env;
use uuid::Uuid;

struct MenuItem {
    name: &'static str,
    description: &'static str,
    featured: bool,
    /// (size name, price in rupees)
    sizes: &'static [(&'static str, i64)],
    /// (add-on name, price in rupees)
    variants: &'static [(&'static str, i64)],
}

/// (category, items) in display order.
const MENU: &[(&str, &[MenuItem])] = &[
    (
        "Kulhad Tea",
        &[
            MenuItem {
                name: "Kulhad Chai",
                description: "Traditional Indian tea served in earthen kulhad",
                featured: true,
                sizes: &[("Small", 50), ("Medium", 70), ("Large", 90)],
                variants: &[("Extra Sugar", 5), ("Elaichi", 10), ("Ginger", 10)],
            },
            MenuItem {
                name: "Masala Chai",
                description: "Spiced Indian tea with aromatic masala blend",
                featured: true,
                sizes: &[("Small", 60), ("Medium", 80), ("Large", 100)],
                variants: &[],
            },
        ],
    ),
    (
        "Snacks",
        &[
            MenuItem {
                name: "Samosa",
                description: "Crispy fried pastry with spiced potato filling",
                featured: true,
                sizes: &[("Regular", 20)],
                variants: &[("Extra Chutney", 5)],
            },
            MenuItem {
                name: "Pakora",
                description: "Mixed vegetable fritters",
                featured: false,
                sizes: &[("Regular", 30)],
                variants: &[],
            },
        ],
    ),
    (
        "Desserts",
        &[MenuItem {
            name: "Gulab Jamun",
            description: "Sweet milk-based dumpling in sugar syrup",
            featured: false,
            sizes: &[("2 Pieces", 40), ("4 Pieces", 70)],
            variants: &[],
        }],
    ),
    (
        "Shakes",
        &[MenuItem {
            name: "Mango Shake",
            description: "Refreshing mango flavored milkshake",
            featured: true,
            sizes: &[("Regular", 80), ("Large", 100)],
            variants: &[("Extra Thick", 15), ("Less Sugar", 0)],
        }],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./gaon_wali_chai.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Gaon Wali Chai Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./gaon_wali_chai.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Gaon Wali Chai Seed Data Generator");
    println!("=====================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let existing = catalog.count_products().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut products = 0;
    for (category_idx, (category_name, items)) in MENU.iter().enumerate() {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: category_name.to_string(),
            icon: Some("https://via.placeholder.com/100".to_string()),
            sort_order: category_idx as i64 + 1,
            is_active: true,
        };
        catalog
            .insert_category(&category)
            .await
            .with_context(|| format!("inserting category {}", category.name))?;

        for (item_idx, item) in items.iter().enumerate() {
            insert_item(&catalog, &category.id, item, item_idx as i64 + 1)
                .await
                .with_context(|| format!("inserting product {}", item.name))?;
            products += 1;
        }
        println!("  {} ({} items)", category_name, items.len());
    }

    println!();
    println!("✓ Seeded {} categories, {} products", MENU.len(), products);
    db.close().await;
    Ok(())
}

async fn insert_item(
    catalog: &CatalogRepository,
    category_id: &str,
    item: &MenuItem,
    sort_order: i64,
) -> anyhow::Result<()> {
    let product_id = Uuid::new_v4().to_string();
    let base_price = item.sizes.iter().map(|(_, price)| *price).min().unwrap_or(0);

    catalog
        .insert_product(&Product {
            id: product_id.clone(),
            category_id: category_id.to_string(),
            name: item.name.to_string(),
            description: Some(item.description.to_string()),
            base_price_paise: base_price * 100,
            image: Some("https://via.placeholder.com/300".to_string()),
            is_featured: item.featured,
            is_available: true,
            sort_order,
        })
        .await?;

    for (name, price) in item.sizes {
        catalog
            .insert_size(&ProductSize {
                id: Uuid::new_v4().to_string(),
                product_id: product_id.clone(),
                name: name.to_string(),
                price_paise: price * 100,
                is_available: true,
            })
            .await?;
    }

    for (name, price) in item.variants {
        catalog
            .insert_variant(&ProductVariant {
                id: Uuid::new_v4().to_string(),
                product_id: product_id.clone(),
                name: name.to_string(),
                price_paise: price * 100,
                image: Some("https://via.placeholder.com/100".to_string()),
                is_available: true,
            })
            .await?;
    }

    Ok(())
}
