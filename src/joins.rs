use std::hash::Hash;

use chrono::NaiveDate;
use hashbrown::HashMap;
use log::*;

use crate::records::{Customer, Invoice, Sale, Vehicle, VehicleModel};

/// A table joined to `Sales` with an inner join
/// Sales without a matching row in the table are left out of the join
pub trait Party {
    const TABLE: &'static str;

    /// Primary key of the row
    fn key(&self) -> i64;

    /// The foreign key a sale holds into this table
    fn sale_key(sale: &Sale) -> Option<i64>;

    /// Names of the columns of this row holding NULL
    fn null_columns(&self, nulls: &mut Vec<&'static str>);
}

impl Party for Invoice {
    const TABLE: &'static str = "Invoices";

    fn key(&self) -> i64 {
        self.invoice_id
    }

    fn sale_key(sale: &Sale) -> Option<i64> {
        sale.invoice_id
    }

    fn null_columns(&self, nulls: &mut Vec<&'static str>) {
        if self.price.is_none() {
            nulls.push("price");
        }
    }
}

impl Party for Customer {
    const TABLE: &'static str = "Customers";

    fn key(&self) -> i64 {
        self.customer_id
    }

    fn sale_key(sale: &Sale) -> Option<i64> {
        sale.customer_id
    }

    fn null_columns(&self, nulls: &mut Vec<&'static str>) {
        if self.customer_name.is_none() {
            nulls.push("customer_name");
        }
    }
}

/// A sale with its invoice or customer, and its vehicle and model when they are known
#[derive(Debug)]
pub struct JoinedSale<'a, P> {
    pub sale: &'a Sale,
    pub party: &'a P,
    pub vehicle: Option<&'a Vehicle>,
    pub model: Option<&'a VehicleModel>,
}

impl<'a, P: Party> JoinedSale<'a, P> {
    pub fn sale_dt(&self) -> Option<NaiveDate> {
        self.sale.sale_dt
    }

    pub fn brand_name(&self) -> Option<&'a str> {
        self.model.and_then(|model| model.brand_name.as_deref())
    }

    pub fn model_name(&self) -> Option<&'a str> {
        self.model.and_then(|model| model.model_name.as_deref())
    }

    pub fn vehicle_year(&self) -> Option<i32> {
        self.vehicle.and_then(|vehicle| vehicle.vehicle_year)
    }

    /// Names of all the joined columns holding NULL, an absent vehicle or model
    /// makes all of its columns NULL
    pub fn null_columns(&self) -> Vec<&'static str> {
        let mut nulls = Vec::new();

        let sale = self.sale;
        for (column, value) in [
            ("invoice_id", sale.invoice_id),
            ("customer_id", sale.customer_id),
            ("vehicle_id", sale.vehicle_id),
        ] {
            if value.is_none() {
                nulls.push(column);
            }
        }
        if sale.sale_dt.is_none() {
            nulls.push("sale_dt");
        }

        self.party.null_columns(&mut nulls);

        match self.vehicle {
            Some(vehicle) => {
                if vehicle.vehicle_model_id.is_none() {
                    nulls.push("vehicle_model_id");
                }
                if vehicle.vehicle_year.is_none() {
                    nulls.push("vehicle_year");
                }
            }
            None => nulls.extend(["vehicle_model_id", "vehicle_year"]),
        }

        match self.model {
            Some(model) => {
                if model.brand_name.is_none() {
                    nulls.push("brand_name");
                }
                if model.model_name.is_none() {
                    nulls.push("model_name");
                }
            }
            None => nulls.extend(["brand_name", "model_name"]),
        }

        nulls
    }
}

/// Indexes the rows of a table by primary key
/// On duplicate keys the first row wins
pub fn index_by_key<'a, T, K, F>(table: &str, rows: &'a [T], key: F) -> HashMap<K, &'a T>
where
    K: Hash + Eq + Copy + std::fmt::Debug,
    F: Fn(&T) -> K,
{
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        let k = key(row);
        if index.contains_key(&k) {
            warn!("Duplicate key {:?} in {}, keeping the first row", k, table);
            continue;
        }
        index.insert(k, row);
    }

    index
}

/// Joins every sale to `parties` (inner join), then to its vehicle and the vehicle model (left joins)
/// Keeps the order of `sales`
pub fn join_sales<'a, P: Party>(
    sales: &'a [Sale],
    parties: &'a [P],
    vehicles: &'a [Vehicle],
    models: &'a [VehicleModel],
) -> Vec<JoinedSale<'a, P>> {
    let parties = index_by_key(P::TABLE, parties, |party| party.key());
    let vehicles = index_by_key("Vehicles", vehicles, |vehicle| vehicle.vehicle_id);
    let models = index_by_key("Vehicle_models", models, |model| model.vehicle_model_id);

    let joined: Vec<JoinedSale<'a, P>> = sales
        .iter()
        .filter_map(|sale| {
            let party = *parties.get(&P::sale_key(sale)?)?;
            let vehicle = sale
                .vehicle_id
                .and_then(|id| vehicles.get(&id).copied());
            let model = vehicle
                .and_then(|vehicle| vehicle.vehicle_model_id)
                .and_then(|id| models.get(&id).copied());

            Some(JoinedSale {
                sale,
                party,
                vehicle,
                model,
            })
        })
        .collect();

    debug!(
        "Joined {} of {} sales with {}",
        joined.len(),
        sales.len(),
        P::TABLE
    );
    joined
}

/// Drops the joined rows holding NULL in any column
pub fn drop_incomplete<'a, P: Party>(rows: Vec<JoinedSale<'a, P>>) -> Vec<JoinedSale<'a, P>> {
    let total = rows.len();
    let mut null_counts: HashMap<&'static str, usize> = HashMap::new();

    let complete: Vec<JoinedSale<'a, P>> = rows
        .into_iter()
        .filter(|row| {
            let nulls = row.null_columns();
            for column in &nulls {
                *null_counts.entry(*column).or_insert(0) += 1;
            }
            nulls.is_empty()
        })
        .collect();

    if complete.len() < total {
        let mut null_counts: Vec<(&str, usize)> = null_counts.into_iter().collect();
        null_counts.sort_unstable();
        debug!(
            "Dropped {} of {} joined rows with null values: {:?}",
            total - complete.len(),
            total,
            null_counts
        );
    }

    complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::ymd;

    fn sale(sale_id: i64, customer_id: Option<i64>, vehicle_id: Option<i64>) -> Sale {
        Sale {
            sale_id,
            invoice_id: Some(sale_id),
            customer_id,
            vehicle_id,
            sale_dt: Some(ymd(2020, 1, 1)),
        }
    }

    fn customer(customer_id: i64, name: &str) -> Customer {
        Customer {
            customer_id,
            customer_name: Some(name.to_string()),
        }
    }

    fn vehicles() -> Vec<Vehicle> {
        vec![
            Vehicle {
                vehicle_id: 1,
                vehicle_model_id: Some(1),
                vehicle_year: Some(2019),
            },
            // the model is not in the models table
            Vehicle {
                vehicle_id: 2,
                vehicle_model_id: Some(42),
                vehicle_year: Some(2020),
            },
        ]
    }

    fn models() -> Vec<VehicleModel> {
        vec![VehicleModel {
            vehicle_model_id: 1,
            brand_name: Some("Toyota".to_string()),
            model_name: Some("Corolla".to_string()),
        }]
    }

    #[test]
    fn test_inner_and_left_joins() {
        let sales = vec![
            sale(1, Some(1), Some(1)),
            sale(2, Some(1), Some(2)),
            sale(3, Some(1), None),
            // unknown customer
            sale(4, Some(9), Some(1)),
            sale(5, None, Some(1)),
        ];
        let customers = vec![customer(1, "Alice")];
        let vehicles = vehicles();
        let models = models();

        let joined = join_sales(&sales, &customers, &vehicles, &models);
        let ids: Vec<i64> = joined.iter().map(|row| row.sale.sale_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(joined[0].brand_name(), Some("Toyota"));
        assert_eq!(joined[0].model_name(), Some("Corolla"));
        assert_eq!(joined[0].vehicle_year(), Some(2019));
        assert!(joined[0].null_columns().is_empty());

        assert_eq!(joined[1].vehicle_year(), Some(2020));
        assert_eq!(joined[1].null_columns(), vec!["brand_name", "model_name"]);

        assert_eq!(
            joined[2].null_columns(),
            vec![
                "vehicle_id",
                "vehicle_model_id",
                "vehicle_year",
                "brand_name",
                "model_name"
            ]
        );
    }

    #[test]
    fn test_drop_incomplete() {
        let sales = vec![
            sale(1, Some(1), Some(1)),
            sale(2, Some(1), Some(2)),
            sale(3, Some(2), Some(1)),
        ];
        let customers = vec![
            customer(1, "Alice"),
            Customer {
                customer_id: 2,
                customer_name: None,
            },
        ];
        let vehicles = vehicles();
        let models = models();

        let complete = drop_incomplete(join_sales(&sales, &customers, &vehicles, &models));
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].sale.sale_id, 1);
    }

    #[test]
    fn test_duplicate_keys_keep_first_row() {
        let customers = vec![customer(1, "Alice"), customer(1, "Impostor")];
        let index = index_by_key("Customers", &customers, |customer| customer.customer_id);
        assert_eq!(index.len(), 1);
        assert_eq!(index[&1].customer_name.as_deref(), Some("Alice"));
    }
}
