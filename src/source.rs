/// Reads the sales tables from a SQLite database
/// Every report opens its own handle and loads fresh copies of the tables it needs
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use log::*;
use rusqlite::{
    types::{Type, ValueRef},
    Connection, OpenFlags, Row,
};
use rust_decimal::{prelude::FromPrimitive, Decimal};

use crate::records::{Customer, Invoice, Sale, Vehicle, VehicleModel};

/// A read-only handle on the sales database
/// The connection is closed when the handle is dropped
pub struct DataSource {
    path: PathBuf,
    conn: Connection,
}

impl DataSource {
    /// Opens an existing database, never creates one
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Cannot open database {}", path.display()))?;

        info!("Opened database {}", path.display());
        Ok(Self { path, conn })
    }

    pub fn sales(&self) -> anyhow::Result<Vec<Sale>> {
        let raw = self.load(
            "Sales",
            "SELECT sale_id, invoice_id, customer_id, vehicle_id, sale_dt FROM Sales",
            |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )?;

        let mut sales = Vec::with_capacity(raw.len());
        for (sale_id, invoice_id, customer_id, vehicle_id, sale_dt) in raw {
            let sale_id = match sale_id {
                Some(id) => id,
                None => {
                    debug!("Skipping a sale without sale_id");
                    continue;
                }
            };
            let sale_dt = match sale_dt {
                Some(text) => Some(
                    parse_sale_date(&text)
                        .with_context(|| format!("Sale {} has a malformed sale_dt", sale_id))?,
                ),
                None => None,
            };

            sales.push(Sale {
                sale_id,
                invoice_id,
                customer_id,
                vehicle_id,
                sale_dt,
            });
        }

        Ok(sales)
    }

    pub fn invoices(&self) -> anyhow::Result<Vec<Invoice>> {
        self.load_keyed(
            "Invoices",
            "SELECT invoice_id, price FROM Invoices",
            |invoice_id, row| {
                Ok(Invoice {
                    invoice_id,
                    price: decimal_column(row, 1)?,
                })
            },
        )
    }

    pub fn vehicles(&self) -> anyhow::Result<Vec<Vehicle>> {
        self.load_keyed(
            "Vehicles",
            "SELECT vehicle_id, vehicle_model_id, vehicle_year FROM Vehicles",
            |vehicle_id, row| {
                Ok(Vehicle {
                    vehicle_id,
                    vehicle_model_id: row.get(1)?,
                    vehicle_year: row.get(2)?,
                })
            },
        )
    }

    pub fn vehicle_models(&self) -> anyhow::Result<Vec<VehicleModel>> {
        self.load_keyed(
            "Vehicle_models",
            "SELECT vehicle_model_id, brand_name, model_name FROM Vehicle_models",
            |vehicle_model_id, row| {
                Ok(VehicleModel {
                    vehicle_model_id,
                    brand_name: row.get(1)?,
                    model_name: row.get(2)?,
                })
            },
        )
    }

    pub fn customers(&self) -> anyhow::Result<Vec<Customer>> {
        self.load_keyed(
            "Customers",
            "SELECT customer_id, customer_name FROM Customers",
            |customer_id, row| {
                Ok(Customer {
                    customer_id,
                    customer_name: row.get(1)?,
                })
            },
        )
    }

    /// Loads a table whose first selected column is its primary key
    /// Rows with a NULL key cannot be joined and are skipped
    fn load_keyed<T, F>(&self, table: &str, sql: &str, mut map: F) -> anyhow::Result<Vec<T>>
    where
        F: FnMut(i64, &Row<'_>) -> rusqlite::Result<T>,
    {
        let rows = self.load(table, sql, |row| match row.get::<_, Option<i64>>(0)? {
            Some(key) => map(key, row).map(Some),
            None => Ok(None),
        })?;

        let total = rows.len();
        let rows: Vec<T> = rows.into_iter().flatten().collect();
        if rows.len() < total {
            debug!(
                "Skipped {} rows of {} without a primary key",
                total - rows.len(),
                table
            );
        }

        Ok(rows)
    }

    fn load<T, F>(&self, table: &str, sql: &str, map: F) -> anyhow::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Cannot query table {} in {}", table, self.path.display()))?;

        let rows = stmt
            .query_map([], map)?
            .collect::<rusqlite::Result<Vec<T>>>()
            .with_context(|| format!("Cannot read table {}", table))?;

        info!("Loaded {} rows from {}", rows.len(), table);
        Ok(rows)
    }
}

impl Drop for DataSource {
    fn drop(&mut self) {
        info!("Closed database {}", self.path.display());
    }
}

/// Reads a numeric column as an exact decimal, whatever the storage class
fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let conversion_failure = |ty: Type, msg: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
    };

    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(value) => Ok(Some(Decimal::from(value))),
        ValueRef::Real(value) => Decimal::from_f64(value)
            .map(Some)
            .ok_or_else(|| conversion_failure(Type::Real, format!("{} is not a decimal", value))),
        ValueRef::Text(text) => {
            let text = String::from_utf8_lossy(text);
            text.trim()
                .parse::<Decimal>()
                .map(Some)
                .map_err(|err| conversion_failure(Type::Text, format!("{}: {}", text, err)))
        }
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "price".to_string(),
            Type::Blob,
        )),
    }
}

/// Parses a stored sale date, keeping only the calendar day
/// Accepts `YYYY-MM-DD` and ISO date-times with a space or `T` separator
pub fn parse_sale_date(text: &str) -> anyhow::Result<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|datetime| datetime.date())
        .ok_or_else(|| anyhow::anyhow!("Cannot parse date '{}'", text))
}
