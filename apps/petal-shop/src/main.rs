//! # Petal Workshop CLI
//!
//! Quick answers for the back room without opening the till.
//!
//! ```bash
//! petal-shop tasks                      # due water changes and cuts
//! petal-shop stock <product_id>         # current stems
//! petal-shop products                   # active catalog
//! petal-shop ledger [limit]             # latest income/expense entries
//! petal-shop complete <batch_id> water  # mark a task done
//! ```
//!
//! Configuration comes from `petal.toml` and `PETAL_*` variables; see
//! `petal_shop::state::ShopConfig`.

use chrono::Utc;
use petal_core::{Money, TaskKind};
use petal_shop::{init_tracing, ApiError, ApiResult, Shop, ShopConfig};
use std::env;
use std::process::ExitCode;
use tracing::info;

const USAGE: &str = "\
Usage: petal-shop <COMMAND>

Commands:
  tasks                          Due and overdue maintenance tasks
  stock <product_id>             Current stock in stems
  products                       Active products
  ledger [limit]                 Most recent transactions (default: 20)
  complete <batch_id> <water|cut>
                                 Mark a maintenance task done
  help                           Show this help message";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || matches!(args[0].as_str(), "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let config = ShopConfig::load_or_default(None);
    init_tracing(&config.logging.filter);

    match run(config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ShopConfig, args: &[String]) -> ApiResult<()> {
    let shop = Shop::open(config).await?;
    info!(shop = %shop.config().shop.name, command = %args[0], "Workshop CLI");
    let money = |cents: i64| shop.config().format_money(Money::from_cents(cents));

    match (args[0].as_str(), &args[1..]) {
        ("tasks", []) => {
            let now = Utc::now();
            let tasks = shop.list_due_tasks(now).await?;
            if tasks.is_empty() {
                println!("Nothing due. 🌷");
            }
            for task in tasks.iter() {
                println!(
                    "{:<12} {:<36} due {}{}",
                    task.kind.as_str(),
                    task.batch_id,
                    task.due_at.format("%Y-%m-%d %H:%M"),
                    if task.overdue { "  OVERDUE" } else { "" }
                );
            }
        }
        ("stock", [product_id]) => {
            println!("{}", shop.stock(product_id).await?);
        }
        ("products", []) => {
            for p in shop.products().await? {
                println!(
                    "{:<36} {:<20} {:>5} stems  {:>9}/stem  pkg {:>3}",
                    p.id,
                    p.name,
                    p.stock,
                    money(p.price_cents),
                    p.units_per_package
                );
            }
        }
        ("ledger", rest) if rest.len() <= 1 => {
            let limit = match rest.first() {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| ApiError::validation(format!("invalid limit: {}", raw)))?,
                None => 20,
            };
            for entry in shop.ledger(limit).await? {
                println!(
                    "{}  {:<8} {:>10}  {}",
                    entry.date.format("%Y-%m-%d %H:%M"),
                    format!("{:?}", entry.kind).to_lowercase(),
                    money(entry.signed_amount().cents()),
                    entry.description
                );
            }
        }
        ("complete", [batch_id, kind]) => {
            let kind: TaskKind = kind.parse()?;
            let batch = shop.complete_task(batch_id, kind, Utc::now()).await?;
            println!("✓ {} done for batch {}", kind.as_str(), batch.id);
        }
        _ => {
            return Err(ApiError::validation(format!(
                "unrecognised command: {}\n\n{}",
                args.join(" "),
                USAGE
            )))
        }
    }

    Ok(())
}
