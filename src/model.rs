//! Cost prediction model
//!
//! A random forest of CART regression trees fit on the seven cost components
//! to estimate Total_Cost. Each tree is grown on a bootstrap sample drawn from
//! a seeded RNG, so a given configuration always produces the same forest.
//! Predictions are used as a benchmark: orders whose booked Total_Cost strays
//! far from the estimate are flagged for invoice review.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ForestConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::MergedOrder;
use crate::schema::COST_COMPONENTS;
use crate::stats::mean;

const N_FEATURES: usize = COST_COMPONENTS.len();

/// Deviation above which an order's booked cost is flagged (10%)
pub const DEFAULT_ANOMALY_TOLERANCE: f64 = 0.10;

type Features = [f64; N_FEATURES];

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression tree stored as a flat arena; node 0 is the root
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, x: &Features) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a [Features],
    y: &'a [f64],
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl TreeBuilder<'_> {
    /// Grow a tree over `indices`. Pending nodes are kept on a work stack
    /// rather than the call stack; depth is bounded only by `max_depth`.
    fn build(&self, indices: Vec<usize>) -> Tree {
        let mut nodes = vec![Node::Leaf(0.0)];
        let mut pending = vec![(indices, 0usize, 0usize)];

        while let Some((indices, depth, slot)) = pending.pop() {
            let n = indices.len();
            let node_mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / n as f64;

            let depth_reached = self.max_depth.is_some_and(|d| depth >= d);
            let pure = indices.iter().all(|&i| self.y[i] == self.y[indices[0]]);
            if n < self.min_samples_split.max(2) || depth_reached || pure {
                nodes[slot] = Node::Leaf(node_mean);
                continue;
            }

            let Some((feature, threshold)) = self.best_split(&indices) else {
                nodes[slot] = Node::Leaf(node_mean);
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| self.x[i][feature] <= threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf(0.0));
            nodes.push(Node::Leaf(0.0));
            nodes[slot] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };
            pending.push((right_rows, depth + 1, right));
            pending.push((left_rows, depth + 1, left));
        }

        Tree { nodes }
    }

    /// Feature and threshold minimising the summed squared error of the two
    /// children, or `None` when every feature is constant over `indices`
    fn best_split(&self, indices: &[usize]) -> Option<(usize, f64)> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();

        let mut best: Option<(f64, usize, f64)> = None;
        let mut sorted = indices.to_vec();

        for feature in 0..N_FEATURES {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 1..n {
                let prev = sorted[k - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev] * self.y[prev];

                let lo = self.x[prev][feature];
                let hi = self.x[sorted[k]][feature];
                if lo == hi {
                    continue;
                }

                let left_n = k as f64;
                let right_n = (n - k) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n)
                    + (right_sq - right_sum * right_sum / right_n);

                if best.map_or(true, |(best_sse, _, _)| sse < best_sse) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid < hi { mid } else { lo };
                    best = Some((sse, feature, threshold));
                }
            }
        }

        best.map(|(_, feature, threshold)| (feature, threshold))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub trees: usize,
    pub training_rows: usize,
    pub r_squared: Option<f64>,
    pub mean_absolute_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostPrediction {
    pub order_id: String,
    pub total_cost: Option<f64>,
    pub predicted_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceAnomaly {
    pub order_id: String,
    pub total_cost: f64,
    pub predicted_cost: f64,
    /// (actual - predicted) / predicted
    pub deviation: f64,
}

pub struct CostModel {
    trees: Vec<Tree>,
    training_rows: usize,
}

/// Feature vector of a merged row, if all seven components are present
pub fn features_of(row: &MergedOrder) -> Option<Features> {
    row.costs.as_ref().and_then(|c| c.complete_components())
}

impl CostModel {
    /// Fit on every merged row with complete components and a Total_Cost
    pub fn fit(rows: &[MergedOrder], config: ForestConfig) -> PipelineResult<Self> {
        let (x, y): (Vec<Features>, Vec<f64>) = rows
            .iter()
            .filter_map(|row| Some((features_of(row)?, row.total_cost?)))
            .unzip();

        let skipped = rows.len() - x.len();
        if skipped > 0 {
            debug!("Skipping {} rows with incomplete costs when fitting", skipped);
        }

        Self::fit_matrix(&x, &y, config)
    }

    pub fn fit_matrix(x: &[Features], y: &[f64], config: ForestConfig) -> PipelineResult<Self> {
        if x.is_empty() {
            return Err(PipelineError::Model(
                "no rows with complete cost components to fit on".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(PipelineError::Model(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let builder = TreeBuilder {
            x,
            y,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
        };

        let n = x.len();
        let trees: Vec<Tree> = (0..config.n_estimators.max(1))
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                builder.build(sample)
            })
            .collect();

        info!("Fit cost model: {} trees on {} rows", trees.len(), n);

        Ok(Self {
            trees,
            training_rows: n,
        })
    }

    pub fn predict(&self, x: &Features) -> f64 {
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }

    /// One prediction per row; `None` where a component is missing
    pub fn predict_rows(&self, rows: &[MergedOrder]) -> Vec<Option<f64>> {
        rows.iter()
            .map(|row| features_of(row).map(|x| self.predict(&x)))
            .collect()
    }

    pub fn predictions(&self, rows: &[MergedOrder]) -> Vec<CostPrediction> {
        rows.iter()
            .zip(self.predict_rows(rows))
            .map(|(row, predicted_cost)| CostPrediction {
                order_id: row.order.order_id.clone(),
                total_cost: row.total_cost,
                predicted_cost,
            })
            .collect()
    }

    /// Fit quality over the rows that have both a prediction and a Total_Cost
    pub fn summary(&self, rows: &[MergedOrder]) -> ModelSummary {
        let pairs: Vec<(f64, f64)> = rows
            .iter()
            .zip(self.predict_rows(rows))
            .filter_map(|(row, p)| Some((row.total_cost?, p?)))
            .collect();

        let actual_mean = mean(pairs.iter().map(|(a, _)| Some(*a)));
        let r_squared = actual_mean.and_then(|m| {
            let ss_tot: f64 = pairs.iter().map(|(a, _)| (a - m).powi(2)).sum();
            let ss_res: f64 = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum();
            (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot)
        });

        ModelSummary {
            trees: self.trees.len(),
            training_rows: self.training_rows,
            r_squared,
            mean_absolute_error: mean(pairs.iter().map(|(a, p)| Some((a - p).abs()))),
        }
    }

    /// Orders whose booked Total_Cost deviates from the prediction by more
    /// than `tolerance` (relative), largest deviation first
    pub fn invoice_anomalies(&self, rows: &[MergedOrder], tolerance: f64) -> Vec<InvoiceAnomaly> {
        let mut anomalies: Vec<InvoiceAnomaly> = rows
            .iter()
            .zip(self.predict_rows(rows))
            .filter_map(|(row, predicted)| {
                let total_cost = row.total_cost?;
                let predicted_cost = predicted?;
                if predicted_cost == 0.0 {
                    return None;
                }
                let deviation = (total_cost - predicted_cost) / predicted_cost;
                (deviation.abs() > tolerance).then(|| InvoiceAnomaly {
                    order_id: row.order.order_id.clone(),
                    total_cost,
                    predicted_cost,
                    deviation,
                })
            })
            .collect();

        anomalies.sort_by(|a, b| b.deviation.abs().total_cmp(&a.deviation.abs()));
        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::loader::Datasets;
    use crate::models::{CostBreakdown, Order};
    use crate::pipeline::MetricsPipeline;
    use std::sync::Arc;

    fn comonotone(n: usize) -> (Vec<Features>, Vec<f64>) {
        let x: Vec<Features> = (0..n)
            .map(|i| {
                let v = i as f64;
                [10.0 * v, 5.0 * v, 2.0 * v, v, 0.5 * v, 0.5 * v, v]
            })
            .collect();
        let y = x.iter().map(|r| r.iter().sum()).collect();
        (x, y)
    }

    fn small_forest() -> ForestConfig {
        ForestConfig {
            n_estimators: 25,
            ..ForestConfig::default()
        }
    }

    fn merged_rows(totals: &[(f64, Option<f64>)]) -> Vec<MergedOrder> {
        let datasets = Datasets {
            orders: (0..totals.len())
                .map(|i| Order {
                    order_id: format!("ORD{:03}", i),
                    order_value: Some(1000.0),
                    customer_id: None,
                    order_date: None,
                    customer_segment: None,
                    priority: None,
                    product_category: None,
                    origin: None,
                    destination: None,
                })
                .collect(),
            costs: totals
                .iter()
                .enumerate()
                .map(|(i, (fuel, overhead))| CostBreakdown {
                    order_id: format!("ORD{:03}", i),
                    fuel: Some(*fuel),
                    labor: Some(10.0),
                    maintenance: Some(10.0),
                    insurance: Some(10.0),
                    packaging: Some(10.0),
                    platform_fee: Some(10.0),
                    overhead: *overhead,
                })
                .collect(),
            ..Datasets::default()
        };
        MetricsPipeline::build(Arc::new(datasets), PipelineConfig::default())
            .merged()
            .to_vec()
    }

    #[test]
    fn test_constant_target_predicts_constant() {
        let (x, _) = comonotone(10);
        let y = vec![42.0; 10];
        let model = CostModel::fit_matrix(&x, &y, small_forest()).unwrap();
        assert_eq!(model.predict(&x[3]), 42.0);
        assert_eq!(model.predict(&[1e6; 7]), 42.0);
    }

    #[test]
    fn test_predictions_stay_within_target_range() {
        let (x, y) = comonotone(30);
        let model = CostModel::fit_matrix(&x, &y, small_forest()).unwrap();
        let lo = y.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for row in &x {
            let p = model.predict(row);
            assert!(p >= lo && p <= hi, "{} outside [{}, {}]", p, lo, hi);
        }
        assert!(model.predict(&[-1.0; 7]) >= lo);
        assert!(model.predict(&[1e9; 7]) <= hi);
    }

    #[test]
    fn test_monotone_for_comonotone_inputs() {
        let (x, y) = comonotone(20);
        let model = CostModel::fit_matrix(&x, &y, small_forest()).unwrap();
        let predictions: Vec<f64> = x.iter().map(|r| model.predict(r)).collect();
        for pair in predictions.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-9, "{:?}", predictions);
        }
        assert!(predictions[19] > predictions[0]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = comonotone(15);
        let a = CostModel::fit_matrix(&x, &y, small_forest()).unwrap();
        let b = CostModel::fit_matrix(&x, &y, small_forest()).unwrap();
        let row = [33.0, 16.0, 7.0, 3.0, 1.5, 1.5, 3.0];
        assert_eq!(a.predict(&row), b.predict(&row));
    }

    #[test]
    fn test_skewed_targets_fit_on_a_small_stack() {
        // doubling targets make every best split peel off the top row,
        // so the tree is about as deep as the sample has distinct rows
        let handle = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(|| {
                let n = 500;
                let x: Vec<Features> = (0..n).map(|i| [i as f64; N_FEATURES]).collect();
                let y: Vec<f64> = (0..n).map(|i| 2f64.powi(i as i32)).collect();
                let config = ForestConfig {
                    n_estimators: 1,
                    ..ForestConfig::default()
                };
                let model = CostModel::fit_matrix(&x, &y, config).unwrap();
                let predictions: Vec<f64> = x.iter().map(|r| model.predict(r)).collect();
                (predictions, y)
            })
            .unwrap();

        let (predictions, y) = handle.join().unwrap();
        for pair in predictions.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(predictions[0] >= y[0]);
        assert!(predictions[499] <= y[499]);
        assert!(predictions[499] > predictions[0]);
    }

    #[test]
    fn test_fit_without_rows_is_an_error() {
        let err = CostModel::fit_matrix(&[], &[], ForestConfig::default()).err();
        assert!(matches!(err, Some(PipelineError::Model(_))));

        let rows = merged_rows(&[(1.0, None)]);
        assert!(CostModel::fit(&rows, ForestConfig::default()).is_err());
    }

    #[test]
    fn test_fit_skips_incomplete_rows() {
        let rows = merged_rows(&[(100.0, Some(10.0)), (200.0, None), (300.0, Some(10.0))]);
        let model = CostModel::fit(&rows, small_forest()).unwrap();
        let summary = model.summary(&rows);
        assert_eq!(summary.training_rows, 2);
        assert_eq!(summary.trees, 25);

        let predictions = model.predict_rows(&rows);
        assert!(predictions[0].is_some());
        assert!(predictions[1].is_none());
        assert!(predictions[2].is_some());
    }

    #[test]
    fn test_model_fits_training_data_closely() {
        let totals: Vec<(f64, Option<f64>)> = (1..=40).map(|i| (i as f64 * 25.0, Some(10.0))).collect();
        let rows = merged_rows(&totals);
        let model = CostModel::fit(&rows, ForestConfig::default()).unwrap();
        let summary = model.summary(&rows);
        assert!(summary.r_squared.unwrap() > 0.9, "{:?}", summary);
    }

    #[test]
    fn test_invoice_anomalies_flag_outliers() {
        let totals: Vec<(f64, Option<f64>)> = (1..=20).map(|i| (i as f64 * 10.0, Some(10.0))).collect();
        let mut rows = merged_rows(&totals);
        let model = CostModel::fit(&rows, ForestConfig::default()).unwrap();

        // booked cost far above what the components predict
        rows[10].total_cost = rows[10].total_cost.map(|t| t * 5.0);
        let anomalies = model.invoice_anomalies(&rows, DEFAULT_ANOMALY_TOLERANCE);
        assert!(!anomalies.is_empty());
        assert_eq!(anomalies[0].order_id, "ORD010");
        assert!(anomalies[0].deviation > 1.0);
    }
}
