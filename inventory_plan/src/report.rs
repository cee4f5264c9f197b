//! Plan tables and the status summary

use crate::policy::{InventoryPlanRow, StockStatus};
use crate::Result;
use demand_forecast::export::write_csv;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const INVENTORY_FILE: &str = "inventory_recommendations.csv";
pub const DASHBOARD_FILE: &str = "dashboard_data.csv";

/// Plan rows as a data frame with the exported column names
pub fn plan_frame(rows: &[InventoryPlanRow]) -> Result<DataFrame> {
    let column = |name: &str, value: fn(&InventoryPlanRow) -> f64| {
        Series::new(name, rows.iter().map(value).collect::<Vec<_>>())
    };

    Ok(DataFrame::new(vec![
        Series::new(
            "Product",
            rows.iter().map(|r| r.cohort.product.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Region",
            rows.iter().map(|r| r.cohort.region.as_str()).collect::<Vec<_>>(),
        ),
        column("Avg_Weekly_Demand", |r| r.avg_weekly_demand),
        column("Std_Weekly_Demand", |r| r.std_weekly_demand),
        Series::new(
            "Current_Stock",
            rows.iter().map(|r| r.current_stock).collect::<Vec<_>>(),
        ),
        column("lead_time_demand", |r| r.lead_time_demand),
        column("safety_stock", |r| r.safety_stock),
        column("reorder_point", |r| r.reorder_point),
        Series::new(
            "Stock_Status",
            rows.iter().map(|r| r.stock_status.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Stockout_Risk",
            rows.iter().map(|r| r.stockout_risk.as_str()).collect::<Vec<_>>(),
        ),
        column("Recommended_Order_Qty", |r| r.recommended_order_qty),
        Series::new(
            "Priority",
            rows.iter().map(|r| r.priority as u32).collect::<Vec<_>>(),
        ),
    ])?)
}

/// Rows ordered by priority, most urgent first; ties keep cohort order
pub fn dashboard_rows(rows: &[InventoryPlanRow]) -> Vec<InventoryPlanRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.priority);
    sorted
}

/// Write the plan and the priority-sorted dashboard into `dir`
pub fn write_plan<P: AsRef<Path>>(rows: &[InventoryPlanRow], dir: P) -> Result<()> {
    let dir = dir.as_ref();
    write_csv(&mut plan_frame(rows)?, dir.join(INVENTORY_FILE))?;
    write_csv(&mut plan_frame(&dashboard_rows(rows))?, dir.join(DASHBOARD_FILE))?;
    Ok(())
}

/// Cohort counts per stock status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSummary {
    pub counts: BTreeMap<StockStatus, usize>,
    pub total_order_qty: f64,
}

impl StatusSummary {
    pub fn from_rows(rows: &[InventoryPlanRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            *summary.counts.entry(row.stock_status).or_default() += 1;
            summary.total_order_qty += row.recommended_order_qty;
        }
        summary
    }

    pub fn count(&self, status: StockStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn cohorts(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inventory Status Summary:")?;
        for status in [
            StockStatus::Critical,
            StockStatus::Low,
            StockStatus::Optimal,
            StockStatus::Excess,
        ] {
            writeln!(f, "  {:<9} {}", status, self.count(status))?;
        }
        writeln!(f, "  Total order quantity: {:.1}", self.total_order_qty)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::InventoryPolicy;
    use demand_forecast::Cohort;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<InventoryPlanRow> {
        let policy = InventoryPolicy::default();
        vec![
            policy.decide(Cohort::new("A", "North"), 10.0, 2.0, Some(500.0)),
            policy.decide(Cohort::new("B", "North"), 10.0, 2.0, Some(0.0)),
            policy.decide(Cohort::new("C", "North"), 10.0, 2.0, Some(22.0)),
            policy.decide(Cohort::new("D", "North"), 10.0, 2.0, Some(1.0)),
        ]
    }

    #[test]
    fn test_dashboard_is_sorted_by_priority() {
        let sorted = dashboard_rows(&rows());
        let order: Vec<&str> = sorted.iter().map(|r| r.cohort.product.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "C", "A"]);
    }

    #[test]
    fn test_summary_counts() {
        let summary = StatusSummary::from_rows(&rows());
        assert_eq!(summary.count(StockStatus::Critical), 2);
        assert_eq!(summary.count(StockStatus::Low), 1);
        assert_eq!(summary.count(StockStatus::Optimal), 0);
        assert_eq!(summary.cohorts(), 4);
        assert!(summary.to_string().contains("CRITICAL"));
    }

    #[test]
    fn test_plan_frame_layout() {
        let df = plan_frame(&rows()).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 12);
        assert_eq!(df.get_column_names()[8], "Stock_Status");
    }

    #[test]
    fn test_unknown_stock_is_exported_as_null() {
        let mut rows = rows();
        rows.push(InventoryPolicy::default().decide(Cohort::new("E", "North"), 10.0, 2.0, None));

        let df = plan_frame(&rows).unwrap();
        assert_eq!(df.column("Current_Stock").unwrap().null_count(), 1);
    }
}
