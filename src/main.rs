use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::*;

mod joins;
mod records;
mod report_builder;
mod reports;
mod source;
#[cfg(test)]
mod test_data;
mod writer;

use report_builder::{ReportBuilder, ReportConfig, ReportStatus};

/// Vehicle sales reports out of a SQLite database, written as CSV files
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The path to the sales database
    #[arg(long, env = "CARLOT_DB", default_value = "vehicle_crm.sqlite")]
    db: PathBuf,

    /// First sale date (inclusive) of the new customers report
    #[arg(long, default_value = "2020-01-01")]
    new_since: NaiveDate,

    /// Last sale date (inclusive) of the old customers report
    #[arg(long, default_value = "2016-01-01")]
    old_until: NaiveDate,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Number of sales and total value per vehicle brand
    SalesByBrand { output: PathBuf },
    /// Latest purchase of the customers who bought on or after --new-since
    NewCustomers { output: PathBuf },
    /// Latest purchase, up to --old-until, of the customers who bought by then
    OldCustomers { output: PathBuf },
    /// First and most common brand of the customers who bought more than once
    NextVehicle { output: PathBuf },
    /// Every report, into a directory
    All { dir: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    debug!("{:?}", args);

    let builder = ReportBuilder::new(
        &args.db,
        ReportConfig {
            new_customers_since: args.new_since,
            old_customers_until: args.old_until,
        },
    );

    let status = match args.command {
        Command::SalesByBrand { output } => builder.sales_by_brand(output)?,
        Command::NewCustomers { output } => builder.new_customers(output)?,
        Command::OldCustomers { output } => builder.old_customers(output)?,
        Command::NextVehicle { output } => builder.next_vehicle(output)?,
        Command::All { dir } => builder.all(dir)?,
    };

    if status != ReportStatus::Written {
        std::process::exit(status.code());
    }

    Ok(())
}
