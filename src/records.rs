use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

pub type SaleId = i64;
pub type InvoiceId = i64;
pub type CustomerId = i64;
pub type VehicleId = i64;
pub type VehicleModelId = i64;

/// A row of the `Sales` table
/// Foreign keys are optional since the store does not enforce them
#[derive(Clone, Debug, PartialEq)]
pub struct Sale {
    pub sale_id: SaleId,
    pub invoice_id: Option<InvoiceId>,
    pub customer_id: Option<CustomerId>,
    pub vehicle_id: Option<VehicleId>,
    pub sale_dt: Option<NaiveDate>,
}

/// A row of the `Invoices` table
#[derive(Clone, Debug, PartialEq)]
pub struct Invoice {
    pub invoice_id: InvoiceId,
    pub price: Option<Decimal>,
}

/// A row of the `Vehicles` table
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub vehicle_id: VehicleId,
    pub vehicle_model_id: Option<VehicleModelId>,
    pub vehicle_year: Option<i32>,
}

/// A row of the `Vehicle_models` table
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleModel {
    pub vehicle_model_id: VehicleModelId,
    pub brand_name: Option<String>,
    pub model_name: Option<String>,
}

/// A row of the `Customers` table
#[derive(Clone, Debug, PartialEq)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
}

/// A row that can be written as a line of a report
/// `COLUMNS` is the header, in the same order the fields are serialized
pub trait ReportRow: Serialize {
    const COLUMNS: &'static [&'static str];
}

/// Sales of a single vehicle brand
#[derive(Serialize, Debug, PartialEq)]
pub struct BrandSales {
    pub vehicle_brand: String,
    pub n_sales: u64,
    pub total_value: Decimal,
}

impl ReportRow for BrandSales {
    const COLUMNS: &'static [&'static str] = &["vehicle_brand", "n_sales", "total_value"];
}

/// The latest purchase of a customer within a date window
#[derive(Serialize, Debug, PartialEq)]
pub struct LatestPurchase {
    pub customer_name: String,
    pub vehicle_brand: String,
    pub vehicle_model: String,
    pub vehicle_year: i32,
    pub sale_dt: NaiveDate,
}

impl ReportRow for LatestPurchase {
    const COLUMNS: &'static [&'static str] = &[
        "customer_name",
        "vehicle_brand",
        "vehicle_model",
        "vehicle_year",
        "sale_dt",
    ];
}

/// Purchase history of a returning customer
/// Brands are optional since this report keeps rows with missing vehicles
#[derive(Serialize, Debug, PartialEq)]
pub struct NextVehicle {
    pub first_veh_brand: Option<String>,
    /// Most common brand over all the purchases of the customer
    pub most_common_second_veh_brand: Option<String>,
    pub avg_days_between_sales: Option<i64>,
}

impl ReportRow for NextVehicle {
    const COLUMNS: &'static [&'static str] = &[
        "first_veh_brand",
        "most_common_second_veh_brand",
        "avg_days_between_sales",
    ];
}
