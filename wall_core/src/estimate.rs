//! # Cost Estimation
//!
//! Materials and labor estimate for the structure currently in the graph.
//! Every column and every block is counted once, whatever its position.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::estimate::{estimate, CostRates};
//! use wall_core::graph::StructureGraph;
//!
//! let mut graph = StructureGraph::new();
//! let a = graph.add_column(0.0, 0.0);
//! let b = graph.add_column(1.5, 0.0);
//! graph.add_block(a, b, 0.205).unwrap();
//!
//! let cost = estimate(&graph, &CostRates::default());
//! assert_eq!(cost.materials_cost, 2.0 * 10000.0 + 800.0);
//! assert_eq!(cost.labor_minutes, 2.0 * 40.0 + 3.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{WallError, WallResult};
use crate::graph::StructureGraph;

const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;
/// Months are counted as 30 days.
const MINUTES_PER_MONTH: u64 = 30 * MINUTES_PER_DAY;

/// Unit prices and unit labor times.
///
/// Prices are in one (unspecified) currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRates {
    /// Price per column
    pub column_price: f64,
    /// Price per block
    pub block_price: f64,
    /// Labor minutes to set one column
    pub column_minutes: f64,
    /// Labor minutes to lay one block
    pub block_minutes: f64,
    /// Labor price per hour
    pub hourly_rate: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        CostRates {
            column_price: 10000.0,
            block_price: 800.0,
            column_minutes: 40.0,
            block_minutes: 3.0,
            hourly_rate: 2000.0,
        }
    }
}

impl CostRates {
    /// Reject negative or non-finite rates.
    pub fn validate(&self) -> WallResult<()> {
        let fields = [
            ("column_price", self.column_price),
            ("block_price", self.block_price),
            ("column_minutes", self.column_minutes),
            ("block_minutes", self.block_minutes),
            ("hourly_rate", self.hourly_rate),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(WallError::invalid_input(
                    field,
                    value.to_string(),
                    "Rate must be a finite, non-negative number",
                ));
            }
        }
        Ok(())
    }
}

/// Result of [`estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub column_count: usize,
    pub block_count: usize,
    pub materials_cost: f64,
    pub labor_minutes: f64,
    pub labor_cost: f64,
    pub total_cost: f64,
}

impl CostEstimate {
    /// Labor time split into whole months, days, hours and minutes.
    pub fn labor_breakdown(&self) -> LaborBreakdown {
        LaborBreakdown::from_minutes(self.labor_minutes)
    }
}

/// Compute the estimate for every column and block in the graph.
pub fn estimate(graph: &StructureGraph, rates: &CostRates) -> CostEstimate {
    let column_count = graph.column_count();
    let block_count = graph.block_count();
    let (columns, blocks) = (column_count as f64, block_count as f64);

    let materials_cost = rates.column_price * columns + rates.block_price * blocks;
    let labor_minutes = rates.column_minutes * columns + rates.block_minutes * blocks;
    let labor_cost = labor_minutes / MINUTES_PER_HOUR as f64 * rates.hourly_rate;

    CostEstimate {
        column_count,
        block_count,
        materials_cost,
        labor_minutes,
        labor_cost,
        total_cost: materials_cost + labor_cost,
    }
}

/// A duration in whole calendar-ish units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaborBreakdown {
    pub months: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl LaborBreakdown {
    /// Split a minute count, carrying each remainder to the next smaller unit.
    ///
    /// Fractional minutes are rounded to the nearest whole minute; negative
    /// or non-finite input yields zero.
    pub fn from_minutes(total: f64) -> Self {
        let total = if total.is_finite() && total > 0.0 {
            total.round() as u64
        } else {
            0
        };
        LaborBreakdown {
            months: total / MINUTES_PER_MONTH,
            days: total % MINUTES_PER_MONTH / MINUTES_PER_DAY,
            hours: total % MINUTES_PER_DAY / MINUTES_PER_HOUR,
            minutes: total % MINUTES_PER_HOUR,
        }
    }

    /// Total minutes represented.
    pub fn total_minutes(&self) -> u64 {
        self.months * MINUTES_PER_MONTH
            + self.days * MINUTES_PER_DAY
            + self.hours * MINUTES_PER_HOUR
            + self.minutes
    }
}
