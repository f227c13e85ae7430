use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::*;

use crate::{
    reports::{CustomersByLatestPurchase, NextVehicles, Report, SalesByBrand},
    source::DataSource,
    writer,
};

/// Cut-off dates of the customer reports, both inclusive
#[derive(Clone, Copy, Debug)]
pub struct ReportConfig {
    pub new_customers_since: NaiveDate,
    pub old_customers_until: NaiveDate,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            new_customers_since: NaiveDate::from_ymd_opt(2020, 1, 1)
                .expect("Invariant: 2020-01-01 is a valid date"),
            old_customers_until: NaiveDate::from_ymd_opt(2016, 1, 1)
                .expect("Invariant: 2016-01-01 is a valid date"),
        }
    }
}

/// Outcome of a report that could be built
/// Ordered from best to worst
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportStatus {
    Written = 0,
    WriteFailed = 1,
}

impl ReportStatus {
    /// Process exit code
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Builds the reports out of a sales database
/// Holds no connection, every report opens and closes its own
pub struct ReportBuilder {
    dbname: PathBuf,
    config: ReportConfig,
}

impl ReportBuilder {
    /// A missing database is only logged here, the reports will fail when they open it
    pub fn new<P: AsRef<Path>>(dbname: P, config: ReportConfig) -> Self {
        let dbname = dbname.as_ref().to_path_buf();
        if !dbname.exists() {
            error!("Database {} does not exist", dbname.display());
        }

        Self { dbname, config }
    }

    pub fn sales_by_brand<P: AsRef<Path>>(&self, filename: P) -> anyhow::Result<ReportStatus> {
        self.run(&SalesByBrand, filename)
    }

    pub fn new_customers<P: AsRef<Path>>(&self, filename: P) -> anyhow::Result<ReportStatus> {
        let report = CustomersByLatestPurchase::new_customers(self.config.new_customers_since);
        self.run(&report, filename)
    }

    pub fn old_customers<P: AsRef<Path>>(&self, filename: P) -> anyhow::Result<ReportStatus> {
        let report = CustomersByLatestPurchase::old_customers(self.config.old_customers_until);
        self.run(&report, filename)
    }

    pub fn next_vehicle<P: AsRef<Path>>(&self, filename: P) -> anyhow::Result<ReportStatus> {
        self.run(&NextVehicles, filename)
    }

    /// Writes every report into `dir`, named after the report
    /// Returns the worst status, stops at the first fatal error
    pub fn all<P: AsRef<Path>>(&self, dir: P) -> anyhow::Result<ReportStatus> {
        let dir = dir.as_ref();
        let new_customers = CustomersByLatestPurchase::new_customers(self.config.new_customers_since);
        let old_customers = CustomersByLatestPurchase::old_customers(self.config.old_customers_until);

        let statuses = [
            self.run_into(&SalesByBrand, dir)?,
            self.run_into(&new_customers, dir)?,
            self.run_into(&old_customers, dir)?,
            self.run_into(&NextVehicles, dir)?,
        ];

        Ok(statuses
            .iter()
            .copied()
            .max()
            .unwrap_or(ReportStatus::Written))
    }

    fn run_into<R: Report>(&self, report: &R, dir: &Path) -> anyhow::Result<ReportStatus> {
        self.run(report, dir.join(format!("{}.csv", report.name())))
    }

    /// Builds `report` and writes it into `filename`
    /// Only write failures are turned into a status, anything else is an error
    pub fn run<R: Report, P: AsRef<Path>>(
        &self,
        report: &R,
        filename: P,
    ) -> anyhow::Result<ReportStatus> {
        let filename = filename.as_ref();

        // the database is closed before writing
        let rows = {
            let source = DataSource::open(&self.dbname)?;
            report.build(&source)?
        };

        match writer::write_report(filename, &rows) {
            Ok(()) => {
                info!(
                    "Report {} written to {} ({} rows)",
                    report.name(),
                    filename.display(),
                    rows.len()
                );
                Ok(ReportStatus::Written)
            }
            Err(err) => {
                error!("Can't write report {}. {:#}", report.name(), err);
                Ok(ReportStatus::WriteFailed)
            }
        }
    }
}
