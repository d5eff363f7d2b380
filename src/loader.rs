//! Dataset loader
//!
//! Reads the seven source CSVs from a data directory. Loading is all or
//! nothing: the first missing file, bad header or unparseable row aborts with
//! a [`PipelineError`] naming the dataset.

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    CostBreakdown, DeliveryRecord, FeedbackRecord, FleetAsset, Order, RouteRecord, WarehouseRecord,
};
use crate::schema::{validate_headers, DatasetId};

/// All seven source tables, rows in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub orders: Vec<Order>,
    pub delivery: Vec<DeliveryRecord>,
    pub routes: Vec<RouteRecord>,
    pub fleet: Vec<FleetAsset>,
    pub warehouse: Vec<WarehouseRecord>,
    pub feedback: Vec<FeedbackRecord>,
    pub costs: Vec<CostBreakdown>,
}

impl Datasets {
    pub fn row_count(&self, dataset: DatasetId) -> usize {
        match dataset {
            DatasetId::Orders => self.orders.len(),
            DatasetId::Delivery => self.delivery.len(),
            DatasetId::Routes => self.routes.len(),
            DatasetId::Fleet => self.fleet.len(),
            DatasetId::Warehouse => self.warehouse.len(),
            DatasetId::Feedback => self.feedback.len(),
            DatasetId::Costs => self.costs.len(),
        }
    }
}

/// Path of `dataset` inside `dir`
pub fn source_path(dir: &Path, dataset: DatasetId) -> PathBuf {
    dir.join(dataset.file_name())
}

/// Load every dataset from `dir`
pub fn load_datasets(dir: &Path) -> PipelineResult<Datasets> {
    info!("Loading datasets from {:?}", dir);

    let datasets = Datasets {
        orders: read_table(dir, DatasetId::Orders)?,
        delivery: read_table(dir, DatasetId::Delivery)?,
        routes: read_table(dir, DatasetId::Routes)?,
        fleet: read_table(dir, DatasetId::Fleet)?,
        warehouse: read_table(dir, DatasetId::Warehouse)?,
        feedback: read_table(dir, DatasetId::Feedback)?,
        costs: read_table(dir, DatasetId::Costs)?,
    };

    info!(
        "Loaded {} orders, {} deliveries, {} routes, {} costs, {} vehicles, {} warehouse rows, {} feedback rows",
        datasets.orders.len(),
        datasets.delivery.len(),
        datasets.routes.len(),
        datasets.costs.len(),
        datasets.fleet.len(),
        datasets.warehouse.len(),
        datasets.feedback.len()
    );

    Ok(datasets)
}

/// Read one dataset, checking its header before deserializing rows
pub fn read_table<T: DeserializeOwned>(dir: &Path, dataset: DatasetId) -> PipelineResult<Vec<T>> {
    let path = source_path(dir, dataset);
    let load_err = |source: csv::Error| PipelineError::Load {
        dataset,
        path: path.clone(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(&path)
        .map_err(load_err)?;

    let headers = reader.headers().map_err(load_err)?.clone();
    validate_headers(dataset, headers.iter())?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(load_err)?;

    debug!("Read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_all_datasets() {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());

        let datasets = load_datasets(dir.path()).unwrap();
        assert_eq!(datasets.orders.len(), 4);
        assert_eq!(datasets.delivery.len(), 3);
        assert_eq!(datasets.routes.len(), 3);
        assert_eq!(datasets.costs.len(), 4);
        assert_eq!(datasets.fleet.len(), 3);
        assert_eq!(datasets.warehouse.len(), 3);
        assert_eq!(datasets.feedback.len(), 2);
    }

    #[test]
    fn test_rows_keep_file_order_and_values() {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());

        let datasets = load_datasets(dir.path()).unwrap();
        let ids: Vec<&str> = datasets.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, ["ORD001", "ORD002", "ORD003", "ORD004"]);
        assert_eq!(datasets.orders[0].order_value, Some(1000.0));
        assert_eq!(datasets.orders[0].customer_id, None);
        assert_eq!(datasets.routes[1].route.as_deref(), Some("Pune-Chennai"));
    }

    #[test]
    fn test_empty_numeric_cell_is_missing() {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());

        let datasets = load_datasets(dir.path()).unwrap();
        let ord4 = datasets.costs.iter().find(|c| c.order_id == "ORD004").unwrap();
        assert_eq!(ord4.overhead, None);
        assert_eq!(ord4.fuel, Some(1000.0));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());
        fs::remove_file(dir.path().join("routes_distance.csv")).unwrap();

        match load_datasets(dir.path()) {
            Err(PipelineError::Load { dataset, path, .. }) => {
                assert_eq!(dataset, DatasetId::Routes);
                assert!(path.ends_with("routes_distance.csv"));
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());
        fs::write(
            dir.path().join("cost_breakdown.csv"),
            "Order_ID,Fuel_Cost,Labor_Cost\nORD001,1,2\n",
        )
        .unwrap();

        match load_datasets(dir.path()) {
            Err(PipelineError::Schema { dataset, column }) => {
                assert_eq!(dataset, DatasetId::Costs);
                assert_eq!(column, "Vehicle_Maintenance");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_value_is_load_error() {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());
        fs::write(
            dir.path().join("orders.csv"),
            "Order_ID,Order_Value_INR\nORD001,not-a-number\n",
        )
        .unwrap();

        let err = load_datasets(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Load {
                dataset: DatasetId::Orders,
                ..
            }
        ));
    }
}
