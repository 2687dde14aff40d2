//! Human-readable rendering of a [`PlanReport`].
//!
//! Rendering only ever shows head and tail samples; the structured data on
//! the report stays complete.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use super::{AggregateCheck, BuildAction, BuildEvent, NumericAnomaly, PlanReport, Shipment};
use crate::optimizer::{SolveStatus, VariantKind};

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            BuildAction::Open => write!(f, "Build a facility at location {}.", self.facility + 1),
            BuildAction::Chargers { slow, fast } => write!(
                f,
                "Build {} slow charger and {} fast charger at location {}.",
                slow,
                fast,
                self.facility + 1
            ),
        }
    }
}

impl fmt::Display for Shipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Demand point {} receives {:.2} of its demand {:.2} ({:.2} %) from location {}.",
            self.customer + 1,
            self.amount,
            self.demand,
            self.share * 100.0,
            self.facility + 1
        )
    }
}

/// Head and tail of `lines` joined by a `...` separator.
///
/// Short lists are printed whole.
pub fn sample_lines<T: ToString>(lines: &[T], sample: usize) -> Vec<String> {
    if lines.len() <= sample * 2 {
        return lines.iter().map(ToString::to_string).collect();
    }
    lines[..sample]
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once("...".to_string()))
        .chain(lines[lines.len() - sample..].iter().map(ToString::to_string))
        .collect()
}

/// Compact, serialisable view of a report for the JSON summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub variant: VariantKind,
    pub status: SolveStatus,
    pub objective_value: f64,
    pub wall_time_ms: f64,
    pub iterations: Option<u64>,
    pub nodes: Option<u64>,
    pub construction_sites: usize,
    pub shipments: usize,
    pub aggregate: AggregateCheck,
    pub anomalies: Vec<NumericAnomaly>,
}

impl PlanReport {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            variant: self.variant,
            status: self.status,
            objective_value: self.objective_value,
            wall_time_ms: self.diagnostics.wall_time.as_secs_f64() * 1000.0,
            iterations: self.diagnostics.iterations,
            nodes: self.diagnostics.nodes,
            construction_sites: self.construction_sites(),
            shipments: self.shipments.len(),
            aggregate: self.aggregate,
            anomalies: self.anomalies.clone(),
        }
    }

    /// Multi-line printout with `sample` head/tail lines per section
    pub fn render(&self, sample: usize) -> String {
        let mut out = vec![
            format!("Status: {}", self.status),
            format!("Objective value = {}", self.objective_value),
            format!(
                "Problem solved in {:.3} milliseconds",
                self.diagnostics.wall_time.as_secs_f64() * 1000.0
            ),
        ];
        if let Some(iterations) = self.diagnostics.iterations {
            out.push(format!("Problem solved in {} iterations", iterations));
        }
        if let Some(nodes) = self.diagnostics.nodes {
            out.push(format!("Problem solved in {} branch-and-bound nodes", nodes));
        }

        out.extend(sample_lines(&self.builds, sample));
        out.push(format!("Number of construction sites: {}", self.construction_sites()));

        out.push(format!(
            "Total demand: {:.2}, realized demand: {:.2}",
            self.aggregate.total_demand, self.aggregate.realized_demand
        ));
        if let Some(supply) = self.aggregate.total_supply {
            out.push(format!("Total supply: {:.2}", supply));
        }

        out.extend(sample_lines(&self.shipments, sample));
        if !self.anomalies.is_empty() {
            out.push(format!("Anomalies: {}", self.anomalies.len()));
            out.extend(sample_lines(&self.anomalies, sample));
        }
        out.iter().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(3, 5, vec!["1", "2", "3"])]
    #[case(10, 5, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"])]
    #[case(12, 2, vec!["1", "2", "...", "11", "12"])]
    fn test_sample_lines(#[case] len: usize, #[case] sample: usize, #[case] expected: Vec<&str>) {
        let lines: Vec<usize> = (1..=len).collect();
        assert_eq!(sample_lines(&lines, sample), expected);
    }

    #[test]
    fn test_build_event_lines_are_one_based() {
        let open = BuildEvent {
            facility: 0,
            action: BuildAction::Open,
        };
        assert_eq!(open.to_string(), "Build a facility at location 1.");

        let chargers = BuildEvent {
            facility: 41,
            action: BuildAction::Chargers { slow: 2, fast: 0 },
        };
        assert_eq!(
            chargers.to_string(),
            "Build 2 slow charger and 0 fast charger at location 42."
        );
    }

    #[test]
    fn test_shipment_line() {
        let shipment = Shipment {
            customer: 2,
            facility: 0,
            amount: 12.99,
            demand: 25.98,
            share: 0.5,
        };
        assert_eq!(
            shipment.to_string(),
            "Demand point 3 receives 12.99 of its demand 25.98 (50.00 %) from location 1."
        );
    }
}
