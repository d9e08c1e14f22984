//! pickup-sheet CLI - look up a customer and fill the pickup-slip template

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use pickup_sheet::delivery::default_strategies;
use pickup_sheet::selection::{resolve, IndexSelector, PromptSelector, Selector};
use pickup_sheet::{Config, CustomerRecord, LookupOutcome, PickupService, ShipmentInput, Temperature};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "pickup-sheet")]
#[command(author, version, about = "Look up a customer and fill the pickup-slip template")]
struct Cli {
    /// Config file (default: <config dir>/pickup-sheet/config.toml)
    #[arg(long, global = true, env = "PICKUP_SHEET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List customers whose key cell contains the keyword
    Search {
        keyword: String,
    },

    /// Generate a pickup slip for one customer
    Generate {
        /// Look the customer up by keyword
        #[arg(short, long, required_unless_present = "name", conflicts_with = "name")]
        keyword: Option<String>,

        /// Enter the customer by hand instead of searching
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "", requires = "name")]
        phone: String,

        #[arg(long, default_value = "", requires = "name")]
        address: String,

        #[arg(long, default_value = "", requires = "name")]
        extra: String,

        /// Product name
        #[arg(short, long)]
        product: String,

        /// Quantity, written as entered
        #[arg(short, long)]
        count: String,

        /// 常温 (ambient) or 冷藏 (chilled)
        #[arg(short, long, default_value = "常温")]
        temperature: String,

        /// Pick the n-th match (1-based) instead of prompting
        #[arg(long)]
        pick: Option<usize>,

        /// Only print the output path instead of opening the file
        #[arg(long)]
        no_open: bool,

        /// Date written into the slip, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pickup_sheet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Search { keyword } => search(&PickupService::new(config), &keyword),
        Commands::Generate {
            keyword,
            name,
            phone,
            address,
            extra,
            product,
            count,
            temperature,
            pick,
            no_open,
            date,
        } => {
            let service = PickupService::new(config);
            let record = match (keyword, name) {
                (Some(keyword), _) => find_customer(&service, &keyword, pick)?,
                (None, Some(name)) => CustomerRecord::new(name, phone, address, extra),
                (None, None) => bail!("Either --keyword or --name is required"),
            };
            let temperature: Temperature = temperature.parse()?;
            let shipment = ShipmentInput::new(product, count, temperature);
            generate(&service, &record, &shipment, date, no_open)
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn search(service: &PickupService, keyword: &str) -> Result<()> {
    match service.search(keyword)? {
        LookupOutcome::NoMatch => println!("No customer matches '{keyword}'"),
        LookupOutcome::Unique(record) => print_record(1, &record.name, &record),
        LookupOutcome::Ambiguous(results) => {
            for (index, (key, record)) in results.iter().enumerate() {
                print_record(index + 1, key, record);
            }
        }
    }
    Ok(())
}

fn print_record(number: usize, key: &str, record: &CustomerRecord) {
    println!("{number:>3}. {key}");
    for (label, value) in [("phone", &record.phone), ("address", &record.address), ("extra", &record.extra)] {
        if !value.is_empty() {
            println!("     {label}: {value}");
        }
    }
}

fn find_customer(service: &PickupService, keyword: &str, pick: Option<usize>) -> Result<CustomerRecord> {
    let outcome = service.search(keyword)?;
    if outcome == LookupOutcome::NoMatch {
        bail!("No customer matches '{keyword}'");
    }

    let mut selector: Box<dyn Selector> = match pick {
        Some(number) => Box::new(IndexSelector(number)),
        None => Box::new(PromptSelector::new(io::stdin().lock(), io::stderr())),
    };
    resolve(outcome, selector.as_mut()).ok_or_else(|| match pick {
        Some(number) => anyhow!("No match number {number} for '{keyword}'"),
        None => anyhow!("No customer selected"),
    })
}

fn generate(
    service: &PickupService,
    record: &CustomerRecord,
    shipment: &ShipmentInput,
    date: Option<NaiveDate>,
    no_open: bool,
) -> Result<()> {
    let now = Local::now().naive_local();
    let now = match date {
        Some(date) => date.and_time(now.time()),
        None => now,
    };

    let document = service.generate(record, shipment, now)?;
    let mut strategies = default_strategies(!no_open);
    let delivery = service.deliver(&document, &mut strategies);
    if !delivery.is_delivered() {
        eprintln!("Written to {}", document.path.display());
        for failure in &delivery.failures {
            eprintln!("  {}: {}", failure.strategy, failure.error);
        }
    }
    Ok(())
}
