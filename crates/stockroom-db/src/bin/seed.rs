//! # Seed Data Generator
//!
//! Populates a development database with a store, an admin account and a
//! catalog of categories, subcategories and items.
//!
//! ## Usage
//! ```bash
//! # Default: 5 categories × 4 subcategories × 10 items
//! cargo run -p stockroom-db --bin seed
//!
//! # Fewer items per subcategory
//! cargo run -p stockroom-db --bin seed -- --items 3
//!
//! # Specify database path and admin credentials
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db --email me@shop.io --password hunter22
//! ```
//!
//! Each item has:
//! - Unique SKU: `{CATEGORY}-{SUB}-{INDEX}`
//! - Price between 1.99 and 9.99 plus a size addon
//! - Cost at 60-80% of price
//! - Stock 0 - 100, min stock 10

use std::env;

use stockroom_core::catalog::{NewItem, StoreRef};
use stockroom_core::{Category, NewUser, Role, StoreInput};
use stockroom_db::{Database, DbConfig};

/// Category code, name, and its subcategories.
const CATALOG: &[(&str, &str, &[&str])] = &[
    ("BEV", "Beverages", &["Soft Drinks", "Water", "Juice", "Energy"]),
    ("SNK", "Snacks", &["Chips", "Candy", "Cookies", "Nuts"]),
    ("DRY", "Dairy", &["Milk", "Cheese", "Yogurt", "Butter"]),
    ("FRZ", "Frozen", &["Ice Cream", "Meals", "Vegetables", "Breakfast"]),
    ("GRO", "Grocery", &["Pasta", "Rice", "Canned", "Baking"]),
];

/// Size variants for items, with price addon in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("Family", 350),
    ("Multipack", 500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut items_per_subcategory: usize = 10;
    let mut db_path = String::from("./stockroom_dev.db");
    let mut email = String::from("admin@stockroom.local");
    let mut password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--items" | "-n" => {
                if i + 1 < args.len() {
                    items_per_subcategory = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--email" => {
                if i + 1 < args.len() {
                    email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --items <N>        Items per subcategory (default: 10)");
                println!("  -d, --db <PATH>        Database file path (default: ./stockroom_dev.db)");
                println!("      --email <EMAIL>    Admin email (default: admin@stockroom.local)");
                println!("      --password <PW>    Admin password (default: admin123)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockroom Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Items per subcategory: {}", items_per_subcategory);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().count().await? > 0 {
        println!("⚠ Database already has users");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let store = db
        .stores()
        .create(&StoreInput {
            name: Some("Main Store".to_string()),
            code: Some("MAIN".to_string()),
            ..StoreInput::default()
        })
        .await?;
    println!("✓ Store {} ({})", store.name, store.code);

    let admin = db
        .users()
        .create(
            &NewUser {
                name: "Administrator".to_string(),
                email: email.clone(),
                password,
                stores: vec![store.id.clone()],
                ..NewUser::default()
            },
            Role::Admin,
        )
        .await?;
    println!("✓ Admin {}", admin.email);

    println!();
    println!("Generating catalog...");

    let store_ref = StoreRef {
        id: store.id.clone(),
        name: store.name.clone(),
    };
    let start = std::time::Instant::now();
    let mut generated = 0;

    for (category_idx, (code, name, subcategories)) in CATALOG.iter().enumerate() {
        let mut category = Category::new(name, None, &store.id, Some(admin.id.clone()))?;

        for (sub_idx, sub_name) in subcategories.iter().enumerate() {
            let sub_id = category.add_subcategory(sub_name, None)?.id.clone();

            for item_idx in 0..items_per_subcategory {
                let seed = category_idx * 1000 + sub_idx * 100 + item_idx;
                let item = generate_item(code, sub_name, item_idx, seed);
                category.add_item(Some(&sub_id), item, Some(&store_ref))?;
                generated += 1;
            }
        }

        if let Err(e) = db.categories().create(&mut category).await {
            eprintln!("Failed to insert {}: {}", category.name, e);
            continue;
        }
        println!("  {} ✓", category.name);
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);

    let summary = db.dashboard().summary(&store.id).await?;
    println!(
        "  {} categories, {} low stock, {} out of stock",
        summary.category_count, summary.low_stock_count, summary.out_of_stock_count
    );

    println!();
    println!("✓ Seed complete! Sign in as {}", email);

    Ok(())
}

/// Builds one item with deterministic pseudo-random figures.
fn generate_item(code: &str, subcategory: &str, index: usize, seed: usize) -> NewItem {
    let (size, price_addon) = SIZES[index % SIZES.len()];
    let sub_code: String = subcategory
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    let price_cents = 199 + ((seed * 17) % 800) as i64 + price_addon;
    let cost_pct = 60 + (seed % 20) as i64;

    NewItem {
        name: format!("{} {} #{}", subcategory, size, index + 1),
        sku: format!("{}-{}-{:03}", code, sub_code, index),
        price_cents,
        cost_cents: price_cents * cost_pct / 100,
        stock: (seed % 101) as i64,
        min_stock: 10,
        barcode: Some(format!("590{:010}", seed)),
        ..NewItem::default()
    }
}
