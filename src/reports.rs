use chrono::NaiveDate;
use hashbrown::HashMap;
use log::*;
use rust_decimal::Decimal;

use crate::{
    joins::{self, JoinedSale},
    records::{
        BrandSales, Customer, CustomerId, Invoice, LatestPurchase, NextVehicle, ReportRow, Sale,
        Vehicle, VehicleModel,
    },
    source::DataSource,
};

pub trait Report {
    type Row: ReportRow;

    /// Name of the report, also the stem of its default file name
    fn name(&self) -> &'static str;

    /// Loads the tables the report needs from `source` and builds the rows, in output order
    fn build(&self, source: &DataSource) -> anyhow::Result<Vec<Self::Row>>;
}

/// Number of sales and their total value per vehicle brand
pub struct SalesByBrand;

impl Report for SalesByBrand {
    type Row = BrandSales;

    fn name(&self) -> &'static str {
        "sales_by_brand"
    }

    fn build(&self, source: &DataSource) -> anyhow::Result<Vec<BrandSales>> {
        let sales = source.sales()?;
        let invoices = source.invoices()?;
        let vehicles = source.vehicles()?;
        let models = source.vehicle_models()?;

        Ok(sales_by_brand(&sales, &invoices, &vehicles, &models))
    }
}

/// Sorted by number of sales, then total value, both descending
pub fn sales_by_brand(
    sales: &[Sale],
    invoices: &[Invoice],
    vehicles: &[Vehicle],
    models: &[VehicleModel],
) -> Vec<BrandSales> {
    let joined = joins::drop_incomplete(joins::join_sales(sales, invoices, vehicles, models));

    let mut brands: HashMap<&str, BrandSales> = HashMap::new();
    for row in &joined {
        let (brand, price) = match (row.brand_name(), row.party.price) {
            (Some(brand), Some(price)) => (brand, price),
            _ => continue,
        };

        let entry = brands.entry(brand).or_insert_with(|| BrandSales {
            vehicle_brand: brand.to_string(),
            n_sales: 0,
            total_value: Decimal::ZERO,
        });
        entry.n_sales += 1;
        entry.total_value += price;
    }

    let mut report: Vec<BrandSales> = brands.into_iter().map(|(_, brand)| brand).collect();
    // the brand name only breaks the remaining ties, to always produce the same file
    report.sort_by(|a, b| {
        b.n_sales
            .cmp(&a.n_sales)
            .then_with(|| b.total_value.cmp(&a.total_value))
            .then_with(|| a.vehicle_brand.cmp(&b.vehicle_brand))
    });

    report
}

/// Which sale dates a customer report looks at, bounds are inclusive
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SaleWindow {
    Since(NaiveDate),
    Until(NaiveDate),
}

impl SaleWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            SaleWindow::Since(first) => date >= first,
            SaleWindow::Until(last) => date <= last,
        }
    }
}

/// The latest purchase of every customer within a window of sale dates
pub struct CustomersByLatestPurchase {
    name: &'static str,
    window: SaleWindow,
}

impl CustomersByLatestPurchase {
    /// Customers who bought a vehicle on or after `since`
    pub fn new_customers(since: NaiveDate) -> Self {
        Self {
            name: "new_customers",
            window: SaleWindow::Since(since),
        }
    }

    /// Customers who bought a vehicle on or before `until`
    pub fn old_customers(until: NaiveDate) -> Self {
        Self {
            name: "old_customers",
            window: SaleWindow::Until(until),
        }
    }
}

impl Report for CustomersByLatestPurchase {
    type Row = LatestPurchase;

    fn name(&self) -> &'static str {
        self.name
    }

    fn build(&self, source: &DataSource) -> anyhow::Result<Vec<LatestPurchase>> {
        let sales = source.sales()?;
        let customers = source.customers()?;
        let vehicles = source.vehicles()?;
        let models = source.vehicle_models()?;

        Ok(latest_purchases(
            self.window,
            &sales,
            &customers,
            &vehicles,
            &models,
        ))
    }
}

/// Sorted by customer name
/// A customer with several sales on the latest day reports the one with the lowest sale id
pub fn latest_purchases(
    window: SaleWindow,
    sales: &[Sale],
    customers: &[Customer],
    vehicles: &[Vehicle],
    models: &[VehicleModel],
) -> Vec<LatestPurchase> {
    let joined = joins::drop_incomplete(joins::join_sales(sales, customers, vehicles, models));

    let mut latest: HashMap<CustomerId, &JoinedSale<Customer>> = HashMap::new();
    for row in &joined {
        let sale_dt = match row.sale_dt() {
            Some(sale_dt) if window.contains(sale_dt) => sale_dt,
            _ => continue,
        };

        let customer_id = row.party.customer_id;
        let replace = match latest.get(&customer_id) {
            Some(current) => {
                (sale_dt, std::cmp::Reverse(row.sale.sale_id))
                    > (
                        current.sale_dt().unwrap_or(sale_dt),
                        std::cmp::Reverse(current.sale.sale_id),
                    )
            }
            None => true,
        };
        if replace {
            latest.insert(customer_id, row);
        }
    }
    debug!(
        "{} customers with a purchase in {:?}",
        latest.len(),
        window
    );

    let mut report: Vec<(CustomerId, LatestPurchase)> = latest
        .into_iter()
        .filter_map(|(customer_id, row)| {
            let purchase = LatestPurchase {
                customer_name: row.party.customer_name.clone()?,
                vehicle_brand: row.brand_name()?.to_string(),
                vehicle_model: row.model_name()?.to_string(),
                vehicle_year: row.vehicle_year()?,
                sale_dt: row.sale_dt()?,
            };
            Some((customer_id, purchase))
        })
        .collect();
    report.sort_by(|(a_id, a), (b_id, b)| {
        a.customer_name
            .cmp(&b.customer_name)
            .then_with(|| a_id.cmp(b_id))
    });

    report.into_iter().map(|(_, purchase)| purchase).collect()
}

/// First and most common vehicle brand of the customers who bought more than one vehicle
pub struct NextVehicles;

impl Report for NextVehicles {
    type Row = NextVehicle;

    fn name(&self) -> &'static str {
        "next_vehicle"
    }

    fn build(&self, source: &DataSource) -> anyhow::Result<Vec<NextVehicle>> {
        let sales = source.sales()?;
        let customers = source.customers()?;
        let vehicles = source.vehicles()?;
        let models = source.vehicle_models()?;

        Ok(next_vehicles(&sales, &customers, &vehicles, &models))
    }
}

/// Sorted by first vehicle brand, customers without any known brand come last
/// Rows with missing vehicles are kept, their brand is just unknown
pub fn next_vehicles(
    sales: &[Sale],
    customers: &[Customer],
    vehicles: &[Vehicle],
    models: &[VehicleModel],
) -> Vec<NextVehicle> {
    let joined = joins::join_sales(sales, customers, vehicles, models);

    let mut history: HashMap<CustomerId, Vec<&JoinedSale<Customer>>> = HashMap::new();
    for row in &joined {
        history
            .entry(row.party.customer_id)
            .or_insert_with(Vec::new)
            .push(row);
    }
    history.retain(|_, purchases| purchases.len() > 1);
    debug!("{} customers bought more than one vehicle", history.len());

    let mut report: Vec<(CustomerId, NextVehicle)> = history
        .into_iter()
        .map(|(customer_id, mut purchases)| {
            // undated sales go last
            purchases.sort_by_key(|row| (row.sale_dt().is_none(), row.sale_dt()));

            let brands: Vec<Option<&str>> =
                purchases.iter().map(|row| row.brand_name()).collect();
            let dates: Vec<NaiveDate> = purchases.iter().filter_map(|row| row.sale_dt()).collect();

            let row = NextVehicle {
                // the earliest purchase with a known brand
                first_veh_brand: brands.iter().flatten().next().map(|brand| brand.to_string()),
                most_common_second_veh_brand: most_common(&brands).map(str::to_string),
                avg_days_between_sales: avg_days_between(&dates),
            };
            (customer_id, row)
        })
        .collect();
    report.sort_by(|(a_id, a), (b_id, b)| {
        let a_brand = (a.first_veh_brand.is_none(), &a.first_veh_brand);
        let b_brand = (b.first_veh_brand.is_none(), &b.first_veh_brand);
        a_brand.cmp(&b_brand).then_with(|| a_id.cmp(b_id))
    });

    report.into_iter().map(|(_, row)| row).collect()
}

/// Most frequent known brand, ties go to the brand seen first
fn most_common<'a>(brands: &[Option<&'a str>]) -> Option<&'a str> {
    // (brand, count) in order of first appearance
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for brand in brands.iter().flatten() {
        match counts.iter_mut().find(|(seen, _)| seen == brand) {
            Some((_, count)) => *count += 1,
            None => counts.push((brand, 1)),
        }
    }

    let mut mode: Option<(&'a str, usize)> = None;
    for (brand, count) in counts {
        if mode.map_or(true, |(_, best)| count > best) {
            mode = Some((brand, count));
        }
    }

    mode.map(|(brand, _)| brand)
}

/// Mean gap between consecutive sorted dates, rounded to the nearest day
fn avg_days_between(dates: &[NaiveDate]) -> Option<i64> {
    if dates.len() < 2 {
        return None;
    }

    let gaps = (dates.len() - 1) as i64;
    let total: i64 = dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .sum();

    // gaps are never negative, so adding half a divisor rounds half away from zero
    Some((total + gaps / 2) / gaps)
}
