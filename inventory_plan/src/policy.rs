//! Reorder-point policy evaluated independently per cohort

use crate::{PlanError, Result};
use demand_forecast::weekly::{cohort_series, CohortSeries};
use demand_forecast::{Cohort, WeeklyAggregate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Stock above this multiple of the reorder point counts as excess
pub const EXCESS_FACTOR: f64 = 1.5;

/// Policy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub safety_stock_multiplier: f64,
    pub lead_time_weeks: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            safety_stock_multiplier: 1.5,
            lead_time_weeks: 2,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.safety_stock_multiplier > 0.0 && self.safety_stock_multiplier.is_finite()) {
            return Err(PlanError::InvalidParameter(format!(
                "safety_stock_multiplier must be positive, got {}",
                self.safety_stock_multiplier
            )));
        }
        if self.lead_time_weeks == 0 {
            return Err(PlanError::InvalidParameter(
                "lead_time_weeks must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Classification of a cohort's current stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockStatus {
    Critical,
    Low,
    Optimal,
    Excess,
}

impl StockStatus {
    /// Classify a stock level. Branch order is significant: when the safety
    /// stock exceeds the reorder point, stock between the two is CRITICAL.
    pub fn classify(current_stock: f64, safety_stock: f64, reorder_point: f64) -> Self {
        if current_stock < safety_stock {
            StockStatus::Critical
        } else if current_stock < reorder_point {
            StockStatus::Low
        } else if current_stock > EXCESS_FACTOR * reorder_point {
            StockStatus::Excess
        } else {
            StockStatus::Optimal
        }
    }

    /// Rank, 1 being the most urgent
    pub fn priority(self) -> u8 {
        match self {
            StockStatus::Critical => 1,
            StockStatus::Low => 2,
            StockStatus::Optimal => 3,
            StockStatus::Excess => 4,
        }
    }

    pub fn stockout_risk(self) -> StockoutRisk {
        match self {
            StockStatus::Critical => StockoutRisk::High,
            StockStatus::Low => StockoutRisk::Medium,
            StockStatus::Optimal | StockStatus::Excess => StockoutRisk::Low,
        }
    }

    pub fn needs_reorder(self) -> bool {
        matches!(self, StockStatus::Critical | StockStatus::Low)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::Critical => "CRITICAL",
            StockStatus::Low => "LOW",
            StockStatus::Optimal => "OPTIMAL",
            StockStatus::Excess => "EXCESS",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Likelihood of running out before replenishment arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockoutRisk {
    High,
    Medium,
    Low,
}

impl StockoutRisk {
    pub fn as_str(self) -> &'static str {
        match self {
            StockoutRisk::High => "HIGH",
            StockoutRisk::Medium => "MEDIUM",
            StockoutRisk::Low => "LOW",
        }
    }
}

impl fmt::Display for StockoutRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reorder decision for one cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryPlanRow {
    #[serde(flatten)]
    pub cohort: Cohort,
    #[serde(rename = "Avg_Weekly_Demand")]
    pub avg_weekly_demand: f64,
    #[serde(rename = "Std_Weekly_Demand")]
    pub std_weekly_demand: f64,
    /// Latest stock reading; `None` when the cohort never reported one
    #[serde(rename = "Current_Stock")]
    pub current_stock: Option<f64>,
    pub lead_time_demand: f64,
    pub safety_stock: f64,
    pub reorder_point: f64,
    #[serde(rename = "Stock_Status")]
    pub stock_status: StockStatus,
    #[serde(rename = "Stockout_Risk")]
    pub stockout_risk: StockoutRisk,
    #[serde(rename = "Recommended_Order_Qty")]
    pub recommended_order_qty: f64,
    #[serde(rename = "Priority")]
    pub priority: u8,
}

/// Applies the reorder policy to weekly demand
#[derive(Debug, Clone, Default)]
pub struct InventoryPolicy {
    config: PolicyConfig,
}

impl InventoryPolicy {
    pub fn new(config: PolicyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// The policy as a total function of the demand statistics.
    ///
    /// Without a stock reading no comparison holds, so the cohort falls
    /// through to OPTIMAL and nothing is ordered.
    pub fn decide(
        &self,
        cohort: Cohort,
        avg_weekly_demand: f64,
        std_weekly_demand: f64,
        current_stock: Option<f64>,
    ) -> InventoryPlanRow {
        let lead_time = self.config.lead_time_weeks as f64;

        let lead_time_demand = avg_weekly_demand * lead_time;
        let safety_stock = self.config.safety_stock_multiplier * std_weekly_demand * lead_time.sqrt();
        let reorder_point = lead_time_demand + safety_stock;

        let stock_status = current_stock.map_or(StockStatus::Optimal, |stock| {
            StockStatus::classify(stock, safety_stock, reorder_point)
        });
        let recommended_order_qty = match current_stock {
            Some(stock) if stock_status.needs_reorder() => {
                (reorder_point + lead_time_demand - stock).max(0.0)
            }
            _ => 0.0,
        };

        InventoryPlanRow {
            cohort,
            avg_weekly_demand,
            std_weekly_demand,
            current_stock,
            lead_time_demand,
            safety_stock,
            reorder_point,
            stock_status,
            stockout_risk: stock_status.stockout_risk(),
            recommended_order_qty,
            priority: stock_status.priority(),
        }
    }

    /// Evaluate one cohort's weekly series
    pub fn evaluate(&self, series: &CohortSeries) -> Result<InventoryPlanRow> {
        let avg = demand_math::mean(&series.sales)
            .ok_or_else(|| PlanError::EmptyHistory(series.cohort.clone()))?;
        // A single week has no spread
        let std = demand_math::sample_std(&series.sales).unwrap_or(0.0);

        let current_stock = series.latest_stock();
        if current_stock.is_none() {
            warn!(cohort = %series.cohort, "no stock readings, status left at OPTIMAL");
        }

        let row = self.decide(series.cohort.clone(), avg, std, current_stock);
        debug!(
            cohort = %row.cohort,
            status = %row.stock_status,
            reorder_point = row.reorder_point,
            order = row.recommended_order_qty,
            "evaluated cohort"
        );
        Ok(row)
    }

    /// One plan row per cohort, in cohort order
    pub fn plan(&self, weekly: &[WeeklyAggregate]) -> Result<Vec<InventoryPlanRow>> {
        if weekly.is_empty() {
            return Err(PlanError::MissingWeeklyAggregate);
        }

        let series = cohort_series(weekly);
        let rows = series
            .par_iter()
            .map(|s| self.evaluate(s))
            .collect::<Result<Vec<_>>>()?;

        info!(
            cohorts = rows.len(),
            reorders = rows.iter().filter(|r| r.stock_status.needs_reorder()).count(),
            "computed inventory plan"
        );
        Ok(rows)
    }
}
