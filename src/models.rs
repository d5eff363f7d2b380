use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Order row from `orders.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Order_Value_INR")]
    pub order_value: Option<f64>,
    #[serde(rename = "Customer_ID", default)]
    pub customer_id: Option<String>,
    #[serde(rename = "Order_Date", default)]
    pub order_date: Option<String>,
    #[serde(rename = "Customer_Segment", default)]
    pub customer_segment: Option<String>,
    #[serde(rename = "Priority", default)]
    pub priority: Option<String>,
    #[serde(rename = "Product_Category", default)]
    pub product_category: Option<String>,
    #[serde(rename = "Origin", default)]
    pub origin: Option<String>,
    #[serde(rename = "Destination", default)]
    pub destination: Option<String>,
}

impl Order {
    /// Parsed order date, if present and in `YYYY-MM-DD` form
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.order_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    }
}

/// Delivery status designation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryStatus {
    OnTime,
    SlightlyDelayed,
    SeverelyDelayed,
    Delayed,
    Other(String),
}

impl DeliveryStatus {
    pub fn is_delayed(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::SlightlyDelayed | DeliveryStatus::SeverelyDelayed | DeliveryStatus::Delayed
        )
    }

    pub fn label(&self) -> &str {
        match self {
            DeliveryStatus::OnTime => "On-Time",
            DeliveryStatus::SlightlyDelayed => "Slightly-Delayed",
            DeliveryStatus::SeverelyDelayed => "Severely-Delayed",
            DeliveryStatus::Delayed => "Delayed",
            DeliveryStatus::Other(s) => s,
        }
    }
}

impl From<&str> for DeliveryStatus {
    fn from(s: &str) -> Self {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match normalized.as_str() {
            "on-time" | "ontime" => DeliveryStatus::OnTime,
            "slightly-delayed" => DeliveryStatus::SlightlyDelayed,
            "severely-delayed" => DeliveryStatus::SeverelyDelayed,
            "delayed" | "late" => DeliveryStatus::Delayed,
            _ => DeliveryStatus::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for DeliveryStatus {
    fn from(s: String) -> Self {
        DeliveryStatus::from(s.as_str())
    }
}

impl From<DeliveryStatus> for String {
    fn from(status: DeliveryStatus) -> Self {
        status.label().to_string()
    }
}

/// Delivery performance row from `delivery_performance.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Carrier", default)]
    pub carrier: Option<String>,
    #[serde(rename = "Promised_Delivery_Days")]
    pub promised_days: Option<f64>,
    #[serde(rename = "Actual_Delivery_Days")]
    pub actual_days: Option<f64>,
    #[serde(rename = "Delivery_Status")]
    pub status: DeliveryStatus,
    #[serde(rename = "Quality_Issue", default)]
    pub quality_issue: Option<String>,
    #[serde(rename = "Customer_Rating")]
    pub customer_rating: Option<f64>,
    #[serde(rename = "Delivery_Cost_INR", default)]
    pub delivery_cost: Option<f64>,
}

/// Route row from `routes_distance.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Route")]
    pub route: Option<String>,
    #[serde(rename = "Distance_KM")]
    pub distance_km: Option<f64>,
    #[serde(rename = "Fuel_Consumption_L")]
    pub fuel_consumption_l: Option<f64>,
    #[serde(rename = "Toll_Charges_INR")]
    pub toll_charges: Option<f64>,
    #[serde(rename = "Traffic_Delay_Minutes")]
    pub traffic_delay_minutes: Option<f64>,
    #[serde(rename = "Weather_Impact", default)]
    pub weather_impact: Option<String>,
}

/// Per-order cost components from `cost_breakdown.csv`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Fuel_Cost")]
    pub fuel: Option<f64>,
    #[serde(rename = "Labor_Cost")]
    pub labor: Option<f64>,
    #[serde(rename = "Vehicle_Maintenance")]
    pub maintenance: Option<f64>,
    #[serde(rename = "Insurance")]
    pub insurance: Option<f64>,
    #[serde(rename = "Packaging_Cost")]
    pub packaging: Option<f64>,
    #[serde(rename = "Technology_Platform_Fee")]
    pub platform_fee: Option<f64>,
    #[serde(rename = "Other_Overhead")]
    pub overhead: Option<f64>,
}

impl CostBreakdown {
    /// Components in `COST_COMPONENTS` order
    pub fn components(&self) -> [Option<f64>; 7] {
        [
            self.fuel,
            self.labor,
            self.maintenance,
            self.insurance,
            self.packaging,
            self.platform_fee,
            self.overhead,
        ]
    }

    /// All seven components, or `None` if any is missing
    pub fn complete_components(&self) -> Option<[f64; 7]> {
        let c = self.components();
        Some([c[0]?, c[1]?, c[2]?, c[3]?, c[4]?, c[5]?, c[6]?])
    }
}

/// Vehicle row from `vehicle_fleet.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetAsset {
    #[serde(rename = "Vehicle_ID")]
    pub vehicle_id: String,
    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: String,
    #[serde(rename = "Capacity_KG", default)]
    pub capacity_kg: Option<f64>,
    #[serde(rename = "Fuel_Efficiency_KM_per_L")]
    pub fuel_efficiency: Option<f64>,
    #[serde(rename = "Current_Location", default)]
    pub current_location: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Age_Years")]
    pub age_years: Option<f64>,
    #[serde(rename = "CO2_Emissions_Kg_per_KM")]
    pub co2_emissions: Option<f64>,
}

/// Warehouse inventory row from `warehouse_inventory.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRecord {
    #[serde(rename = "Warehouse_ID", default)]
    pub warehouse_id: Option<String>,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Current_Stock_Units", default)]
    pub current_stock_units: Option<f64>,
    #[serde(rename = "Reorder_Level", default)]
    pub reorder_level: Option<f64>,
    #[serde(rename = "Storage_Cost_per_Unit")]
    pub storage_cost_per_unit: Option<f64>,
}

/// Would-recommend answer on a feedback form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recommendation {
    Yes,
    No,
    Maybe,
    Other(String),
}

impl From<&str> for Recommendation {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "y" | "1" => Recommendation::Yes,
            "no" | "false" | "n" | "0" => Recommendation::No,
            "maybe" => Recommendation::Maybe,
            _ => Recommendation::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for Recommendation {
    fn from(s: String) -> Self {
        Recommendation::from(s.as_str())
    }
}

impl From<Recommendation> for String {
    fn from(r: Recommendation) -> Self {
        match r {
            Recommendation::Yes => "Yes".to_string(),
            Recommendation::No => "No".to_string(),
            Recommendation::Maybe => "Maybe".to_string(),
            Recommendation::Other(s) => s,
        }
    }
}

/// Customer feedback row from `customer_feedback.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Feedback_Date", default)]
    pub feedback_date: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: Option<f64>,
    #[serde(rename = "Would_Recommend")]
    pub would_recommend: Recommendation,
    #[serde(rename = "Issue_Category", default)]
    pub issue_category: Option<String>,
}

/// One row of the merged order view: the order plus its left-joined
/// delivery, route and cost rows and the three derived columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub delivery: Option<DeliveryRecord>,
    pub route: Option<RouteRecord>,
    pub costs: Option<CostBreakdown>,
    #[serde(rename = "Total_Cost")]
    pub total_cost: Option<f64>,
    #[serde(rename = "Cost_to_OrderValue")]
    pub cost_to_order_value: Option<f64>,
    #[serde(rename = "Delivery_Delay")]
    pub delivery_delay: Option<f64>,
}

impl MergedOrder {
    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route.as_ref().and_then(|r| r.route.as_deref())
    }

    pub fn carrier(&self) -> Option<&str> {
        self.delivery.as_ref().and_then(|d| d.carrier.as_deref())
    }

    pub fn status(&self) -> Option<&DeliveryStatus> {
        self.delivery.as_ref().map(|d| &d.status)
    }

    pub fn customer_rating(&self) -> Option<f64> {
        self.delivery.as_ref().and_then(|d| d.customer_rating)
    }
}

/// A merged order paired with its (optional) customer feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackCost {
    #[serde(flatten)]
    pub order: MergedOrder,
    pub feedback: Option<FeedbackRecord>,
}
