//! Dataset identifiers, source file names and required columns
//!
//! Headers are checked against these lists before any row is parsed, so a
//! renamed or dropped column fails the load instead of surfacing later as a
//! silently missing value.

use serde::Serialize;
use std::fmt;

use crate::error::{PipelineError, PipelineResult};

/// The seven cost components summed into Total_Cost, in column order
pub const COST_COMPONENTS: [&str; 7] = [
    "Fuel_Cost",
    "Labor_Cost",
    "Vehicle_Maintenance",
    "Insurance",
    "Packaging_Cost",
    "Technology_Platform_Fee",
    "Other_Overhead",
];

/// Orders whose cost-to-order-value ratio exceeds this are cost leakages
pub const DEFAULT_LEAKAGE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetId {
    Orders,
    Delivery,
    Routes,
    Fleet,
    Warehouse,
    Feedback,
    Costs,
}

impl DatasetId {
    pub const ALL: [DatasetId; 7] = [
        DatasetId::Orders,
        DatasetId::Delivery,
        DatasetId::Routes,
        DatasetId::Fleet,
        DatasetId::Warehouse,
        DatasetId::Feedback,
        DatasetId::Costs,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            DatasetId::Orders => "orders.csv",
            DatasetId::Delivery => "delivery_performance.csv",
            DatasetId::Routes => "routes_distance.csv",
            DatasetId::Fleet => "vehicle_fleet.csv",
            DatasetId::Warehouse => "warehouse_inventory.csv",
            DatasetId::Feedback => "customer_feedback.csv",
            DatasetId::Costs => "cost_breakdown.csv",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            DatasetId::Orders => &["Order_ID", "Order_Value_INR"],
            DatasetId::Delivery => &[
                "Order_ID",
                "Promised_Delivery_Days",
                "Actual_Delivery_Days",
                "Delivery_Status",
                "Customer_Rating",
            ],
            DatasetId::Routes => &[
                "Order_ID",
                "Route",
                "Distance_KM",
                "Fuel_Consumption_L",
                "Toll_Charges_INR",
                "Traffic_Delay_Minutes",
            ],
            DatasetId::Fleet => &[
                "Vehicle_ID",
                "Vehicle_Type",
                "Age_Years",
                "Fuel_Efficiency_KM_per_L",
                "CO2_Emissions_Kg_per_KM",
            ],
            DatasetId::Warehouse => &["Location", "Product_Category", "Storage_Cost_per_Unit"],
            DatasetId::Feedback => &["Order_ID", "Rating", "Would_Recommend"],
            DatasetId::Costs => &[
                "Order_ID",
                COST_COMPONENTS[0],
                COST_COMPONENTS[1],
                COST_COMPONENTS[2],
                COST_COMPONENTS[3],
                COST_COMPONENTS[4],
                COST_COMPONENTS[5],
                COST_COMPONENTS[6],
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetId::Orders => "orders",
            DatasetId::Delivery => "delivery",
            DatasetId::Routes => "routes",
            DatasetId::Fleet => "fleet",
            DatasetId::Warehouse => "warehouse",
            DatasetId::Feedback => "feedback",
            DatasetId::Costs => "costs",
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that every required column of `dataset` appears in `headers`
pub fn validate_headers<'a, I>(dataset: DatasetId, headers: I) -> PipelineResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = headers.into_iter().map(str::trim).collect();
    for column in dataset.required_columns() {
        if !present.contains(column) {
            return Err(PipelineError::Schema {
                dataset,
                column,
            });
        }
    }
    Ok(())
}
