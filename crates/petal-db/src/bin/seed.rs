//! # Seed Data Generator
//!
//! Populates a database with a demo flower catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./petal_dev.db with 2 packages of every flower
//! cargo run -p petal-db --bin seed
//!
//! # More stock, plus a bench batch per flower
//! cargo run -p petal-db --bin seed -- --packages 5 --batches
//!
//! # Specify database path
//! cargo run -p petal-db --bin seed -- --db ./data/petal.db
//! ```
//!
//! Each flower gets a per-stem price, a cost of roughly 40% of it, a
//! package size and care intervals typical for the variety.

use chrono::Utc;
use petal_core::units::{to_stems, StockUnit};
use petal_core::StockAdjustment;
use petal_db::{Database, DbConfig, NewProduct};
use std::env;

/// (name, price per stem in cents, stems per package, water days, cut days)
const FLOWERS: &[(&str, i64, i64, i64, i64)] = &[
    ("Red Rose", 250, 10, 2, 3),
    ("White Rose", 250, 10, 2, 3),
    ("Pink Tulip", 180, 5, 1, 2),
    ("Yellow Tulip", 180, 5, 1, 2),
    ("Stargazer Lily", 400, 5, 2, 4),
    ("Sunflower", 300, 5, 1, 3),
    ("Carnation", 120, 20, 3, 5),
    ("Gerbera Daisy", 200, 10, 1, 2),
    ("Hydrangea", 650, 3, 1, 2),
    ("Eucalyptus", 90, 10, 4, 7),
    ("Baby's Breath", 80, 25, 3, 5),
    ("Peony", 700, 5, 1, 2),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut packages: i64 = 2;
    let mut with_batches = false;
    let mut db_path = String::from("./petal_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--packages" | "-p" => {
                if i + 1 < args.len() {
                    packages = args[i + 1].parse().unwrap_or(2);
                    i += 1;
                }
            }
            "--batches" | "-b" => with_batches = true,
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Petal Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --packages <N>  Packages restocked per flower (default: 2)");
                println!("  -b, --batches       Also put one package of each flower on the bench");
                println!("  -d, --db <PATH>     Database file path (default: ./petal_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Petal Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Packages: {}", packages);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list_active().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating catalog...");
    let start = std::time::Instant::now();
    let mut stems_total = 0;

    for (name, price, per_package, water, cut) in FLOWERS {
        let product = db
            .products()
            .create(
                NewProduct::new(*name, *price, price * 2 / 5)
                    .units_per_package(*per_package)
                    .care_days(*water, *cut),
            )
            .await?;

        if packages > 0 {
            let stems = to_stems(&product, packages, StockUnit::Package)?;
            db.stock()
                .adjust(&StockAdjustment::restock(&product.id, stems).with_note("seed"))
                .await?;
            stems_total += stems;

            if with_batches {
                db.batches()
                    .create(&product.id, product.units_per_package, Utc::now())
                    .await?;
            }
        }

        println!("  {:<16} {:>3} stems/pkg", product.name, product.units_per_package);
    }

    println!();
    println!(
        "✓ Created {} products ({} stems) in {:?}",
        FLOWERS.len(),
        stems_total,
        start.elapsed()
    );
    if with_batches {
        let batches = db.batches().list_active().await?;
        println!("✓ {} batches on the bench", batches.len());
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
