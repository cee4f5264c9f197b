//! Weekly aggregation of featured daily rows

use crate::data::Cohort;
use crate::features::{FeaturedRecord, RollingStats};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Demand of one cohort in one calendar week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub cohort: Cohort,
    pub week_start: NaiveDate,
    /// Sum of daily quantities
    pub weekly_sales: f64,
    /// Last stock reading of the week, if any
    pub stock_level: Option<f64>,
    /// Week means of the daily rolling features, keyed by window length
    pub rolling: BTreeMap<usize, RollingStats>,
    pub days_observed: usize,
}

#[derive(Default)]
struct WeekAccumulator {
    sales: f64,
    stock_level: Option<f64>,
    days: usize,
    // window -> (mean sum, mean count, std sum, std count)
    rolling: BTreeMap<usize, (f64, usize, f64, usize)>,
}

impl WeekAccumulator {
    fn push(&mut self, record: &FeaturedRecord) {
        self.sales += record.base.sale.quantity_sold;
        self.days += 1;
        if let Some(stock) = record.base.sale.stock_level {
            self.stock_level = Some(stock);
        }

        for (&window, stats) in &record.rolling {
            let slot = self.rolling.entry(window).or_default();
            if let Some(mean) = stats.mean {
                slot.0 += mean;
                slot.1 += 1;
            }
            if let Some(std) = stats.std {
                slot.2 += std;
                slot.3 += 1;
            }
        }
    }

    fn finish(self, cohort: Cohort, week_start: NaiveDate) -> WeeklyAggregate {
        let average = |sum: f64, count: usize| (count > 0).then(|| sum / count as f64);

        WeeklyAggregate {
            cohort,
            week_start,
            weekly_sales: self.sales,
            stock_level: self.stock_level,
            rolling: self
                .rolling
                .into_iter()
                .map(|(w, (ms, mc, ss, sc))| {
                    (
                        w,
                        RollingStats {
                            mean: average(ms, mc),
                            std: average(ss, sc),
                        },
                    )
                })
                .collect(),
            days_observed: self.days,
        }
    }
}

/// Collapses daily rows into one row per observed (cohort, week)
#[derive(Debug)]
pub struct WeeklyAggregator;

impl WeeklyAggregator {
    /// Aggregate rows ordered by cohort and date.
    ///
    /// Weeks without any daily row are not synthesised. Output is ordered by
    /// cohort and week start.
    pub fn aggregate(records: &[FeaturedRecord]) -> Vec<WeeklyAggregate> {
        let mut weeks: BTreeMap<(Cohort, NaiveDate), WeekAccumulator> = BTreeMap::new();

        for record in records {
            let key = (
                record.base.sale.cohort.clone(),
                week_start(record.base.sale.date),
            );
            weeks.entry(key).or_default().push(record);
        }

        let weekly: Vec<WeeklyAggregate> = weeks
            .into_iter()
            .map(|((cohort, start), acc)| acc.finish(cohort, start))
            .collect();

        info!(weeks = weekly.len(), "aggregated weekly demand");
        weekly
    }
}

/// One cohort's weekly history as parallel columns
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSeries {
    pub cohort: Cohort,
    pub weeks: Vec<NaiveDate>,
    pub sales: Vec<f64>,
    pub stock: Vec<Option<f64>>,
}

impl CohortSeries {
    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// Most recent stock reading, scanning back from the latest week
    pub fn latest_stock(&self) -> Option<f64> {
        self.stock.iter().rev().find_map(|s| *s)
    }
}

/// Split weekly rows into per-cohort series ordered by week
pub fn cohort_series(weekly: &[WeeklyAggregate]) -> Vec<CohortSeries> {
    let mut grouped: BTreeMap<&Cohort, Vec<&WeeklyAggregate>> = BTreeMap::new();
    for row in weekly {
        grouped.entry(&row.cohort).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(cohort, mut rows)| {
            rows.sort_by_key(|r| r.week_start);
            CohortSeries {
                cohort: cohort.clone(),
                weeks: rows.iter().map(|r| r.week_start).collect(),
                sales: rows.iter().map(|r| r.weekly_sales).collect(),
                stock: rows.iter().map(|r| r.stock_level).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::CleanRecord;
    use crate::data::SalesRecord;
    use crate::features::FeatureBuilder;
    use approx::assert_relative_eq;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn featured(cohort: &Cohort, days: &[(NaiveDate, f64, Option<f64>)]) -> Vec<FeaturedRecord> {
        let rows: Vec<CleanRecord> = days
            .iter()
            .enumerate()
            .map(|(seq, &(d, q, s))| CleanRecord {
                seq,
                sale: SalesRecord::new(d, cohort.clone(), q, s),
            })
            .collect();
        FeatureBuilder::default().build(&rows).unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(date(1, 1)), date(1, 1));
        assert_eq!(week_start(date(1, 7)), date(1, 1));
        assert_eq!(week_start(date(1, 10)), date(1, 8));
    }

    #[test]
    fn test_weekly_sums_and_last_stock() {
        let cohort = Cohort::new("P1", "North");
        let rows = featured(
            &cohort,
            &[
                (date(1, 1), 3.0, Some(50.0)),
                (date(1, 3), 4.0, Some(46.0)),
                (date(1, 5), 5.0, None),
                (date(1, 9), 6.0, Some(40.0)),
            ],
        );

        let weekly = WeeklyAggregator::aggregate(&rows);

        assert_eq!(weekly.len(), 2);
        assert_relative_eq!(weekly[0].weekly_sales, 12.0);
        assert_eq!(weekly[0].stock_level, Some(46.0));
        assert_eq!(weekly[0].days_observed, 3);
        // only the third row of the first week has a 7-row mean
        assert_relative_eq!(weekly[0].rolling[&7].mean.unwrap(), 4.0);
        assert_eq!(weekly[1].week_start, date(1, 8));
        assert_relative_eq!(weekly[1].rolling[&7].mean.unwrap(), 4.5);
    }

    #[test]
    fn test_gaps_are_not_filled() {
        let cohort = Cohort::new("P1", "North");
        let rows = featured(&cohort, &[(date(1, 1), 1.0, None), (date(1, 22), 2.0, None)]);

        let weekly = WeeklyAggregator::aggregate(&rows);
        let series = cohort_series(&weekly);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].weeks, vec![date(1, 1), date(1, 22)]);
        assert_eq!(series[0].latest_stock(), None);
    }
}
