//! # Demo Catalog Seeder
//!
//! Populates a database with a small demo catalog for local development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Unit items (`un`) are sold by whole count; bulk items (`kg`, `m`) take
//! fractional quantities such as `0.375`.

use std::env;

use anyhow::{Context, Result};
use tally_db::{Database, DbConfig, NewProduct};

/// (sku, name, unit, price in cents, tax rate in bps)
const DEMO_PRODUCTS: &[(&str, &str, &str, i64, u32)] = &[
    ("COFFEE-250", "Ground coffee 250g", "un", 1890, 1200),
    ("RICE-5KG", "Rice 5kg", "un", 2599, 0),
    ("BEANS-1KG", "Black beans 1kg", "un", 849, 0),
    ("MILK-1L", "Whole milk 1L", "un", 549, 700),
    ("BREAD-FR", "French bread", "kg", 1490, 0),
    ("CHEESE-MZ", "Mozzarella cheese", "kg", 4990, 1200),
    ("HAM-CK", "Cooked ham", "kg", 3690, 1200),
    ("BANANA", "Banana", "kg", 699, 0),
    ("SODA-2L", "Cola soda 2L", "un", 999, 2000),
    ("WATER-500", "Mineral water 500ml", "un", 250, 1800),
    ("ROPE-NY", "Nylon rope", "m", 320, 1700),
    ("BAG-REUSE", "Reusable bag", "un", 400, 0),
];

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");

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
                println!("Tally POS demo catalog seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {other}");
            }
        }
        i += 1;
    }

    println!("Tally POS demo catalog seeder");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("failed to open database at {db_path}"))?;
    println!("✓ Connected, migrations applied");

    let products = db.products();
    let existing = products.count().await?;
    if existing > 0 {
        println!("⚠ Database already has {existing} products, skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut inserted = 0;
    for &(sku, name, unit, price_cents, tax_rate_bps) in DEMO_PRODUCTS {
        let product = products
            .insert(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                unit_label: unit.to_string(),
                price_cents,
                tax_rate_bps,
            })
            .await
            .with_context(|| format!("failed to insert {sku}"))?;

        println!("  {}  {:<24} {:>8} / {}", product.id, product.name, product.price(), product.unit_label);
        inserted += 1;
    }

    println!();
    println!("✓ Seeded {inserted} products");

    db.close().await;
    Ok(())
}
