//! Throw-away SQLite databases for the tests

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE Customers (customer_id INTEGER, customer_name TEXT);
    CREATE TABLE Invoices (invoice_id INTEGER, price REAL);
    CREATE TABLE Vehicle_models (vehicle_model_id INTEGER, brand_name TEXT, model_name TEXT);
    CREATE TABLE Vehicles (vehicle_id INTEGER, vehicle_model_id INTEGER, vehicle_year INTEGER);
    CREATE TABLE Sales (sale_id INTEGER, invoice_id INTEGER, customer_id INTEGER, vehicle_id INTEGER, sale_dt TEXT);
";

/*  A small showroom:
    - Alice buys a Toyota in 2019 and a Honda in 2021
    - Bob buys a Ford at the end of 2015 and a Toyota on 2020-01-01
    - Carol buys a Ford in 2012 and a Honda on 2016-01-01
    - Dave buys a Toyota in 2010, and in 2022 a vehicle missing from the Vehicles table
    - Erin buys a Honda, a Toyota and another Honda in 2018-2019
    - Frank buys a single Toyota on 2016-01-02
*/
const SHOWROOM: &str = "
    INSERT INTO Customers VALUES
        (1, 'Alice'), (2, 'Bob'), (3, 'Carol'), (4, 'Dave'), (5, 'Erin'), (6, 'Frank');
    INSERT INTO Vehicle_models VALUES
        (1, 'Toyota', 'Corolla'), (2, 'Honda', 'Civic'), (3, 'Ford', 'Focus');
    INSERT INTO Vehicles VALUES
        (1, 1, 2019), (2, 2, 2021), (3, 3, 2015), (4, 1, 2020), (5, 2, 2016), (6, 3, 2014), (7, 1, 2010);
    INSERT INTO Invoices VALUES
        (1, 20000), (2, 31000.5), (3, 15000), (4, 22000), (5, 18000), (6, 12000),
        (7, 9000), (8, 25000), (9, 21000), (10, 30000), (11, 19000), (12, 5000);
    INSERT INTO Sales VALUES
        (1, 1, 1, 1, '2019-05-01'),
        (2, 2, 1, 2, '2021-03-01'),
        (3, 3, 2, 3, '2015-12-24 10:15:00'),
        (4, 4, 2, 4, '2020-01-01'),
        (5, 5, 3, 5, '2016-01-01'),
        (6, 6, 3, 6, '2012-06-30'),
        (7, 7, 4, 7, '2010-02-14'),
        (8, 8, 4, 99, '2022-08-01'),
        (9, 9, 5, 2, '2018-03-10'),
        (10, 10, 5, 4, '2018-09-10'),
        (11, 11, 5, 5, '2019-01-10'),
        (12, 12, 6, 1, '2016-01-02');
";

/// A database file living as long as the value
pub struct TestDatabase {
    path: PathBuf,
    // removes the file on drop
    _dir: TempDir,
}

impl TestDatabase {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn create(sql: &str) -> TestDatabase {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vehicle_crm.sqlite");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(sql).unwrap();

    TestDatabase { path, _dir: dir }
}

/// A database file without any table
pub fn empty_database() -> TestDatabase {
    // writing the header makes sqlite create the file
    create("PRAGMA user_version = 1;")
}

/// The five tables, filled in by `rows`
pub fn database(rows: &str) -> TestDatabase {
    create(&format!("{}{}", SCHEMA, rows))
}

pub fn showroom() -> TestDatabase {
    database(SHOWROOM)
}

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
