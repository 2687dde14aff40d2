//! Solution post-processing: solved values to build events, shipments,
//! aggregate checks and numerically safe artifacts.

pub mod artifact;
pub mod numeric;
pub mod report;

pub use artifact::*;
pub use numeric::*;
pub use report::*;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::ChargerType;
use crate::optimizer::{
    FacilityModel, PlanningProblem, SolveStatus, SolvedModel, SolverDiagnostics, Variant,
    VariantKind,
};

/// What gets built at a facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BuildAction {
    /// The open indicator solved to 1
    Open,
    /// Chargers added on top of the committed ones
    Chargers { slow: i64, fast: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildEvent {
    pub facility: usize,
    #[serde(flatten)]
    pub action: BuildAction,
}

/// A non-zero flow from a facility to a customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Shipment {
    pub customer: usize,
    pub facility: usize,
    /// Delivered quantity, truncated to [`TRUNCATION_DIGITS`] decimals
    pub amount: f64,
    /// Customer demand, for reporting
    pub demand: f64,
    /// Share of the customer's demand served by this facility
    pub share: f64,
}

/// Solved state of one facility
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FacilityOutcome {
    pub facility: usize,
    pub open: bool,
    /// Total slow chargers after the solve (committed plus built)
    pub slow: u32,
    /// Total fast chargers after the solve (committed plus built)
    pub fast: u32,
    /// Truncated sum of inbound flows
    pub inbound: f64,
    /// Truncated available capacity; `None` for uncapacitated facilities
    pub capacity: Option<f64>,
}

/// Totals of a solve.
///
/// `total_supply` may legitimately exceed the demand: the model minimises
/// cost, not spare capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateCheck {
    pub total_demand: f64,
    pub realized_demand: f64,
    pub total_supply: Option<f64>,
}

impl AggregateCheck {
    pub fn excess_supply(&self) -> Option<f64> {
        self.total_supply.map(|supply| supply - self.realized_demand)
    }

    pub fn demand_conserved(&self) -> bool {
        (self.realized_demand - self.total_demand).abs()
            <= DEMAND_TOLERANCE * self.total_demand.max(1.0)
    }
}

/// Data-integrity warnings found while post-processing.
///
/// They point at a model or solver defect; the affected values are reported
/// unchanged and sibling records are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NumericAnomaly {
    #[error("Assignment {customer}->{facility} is negative after truncation: {value}")]
    NegativeAssignment {
        customer: usize,
        facility: usize,
        value: f64,
    },
    #[error("Customer {customer} receives {delivered} but demands {demand}")]
    DemandMismatch {
        customer: usize,
        demand: f64,
        delivered: f64,
    },
    #[error("Facility {facility} ships {inbound} with capacity {capacity}")]
    CapacityExceeded {
        facility: usize,
        inbound: f64,
        capacity: f64,
    },
    #[error("Facility {facility} solved {solved} {charger} chargers, below the {committed} committed")]
    BelowCommitted {
        facility: usize,
        charger: ChargerType,
        solved: f64,
        committed: u32,
    },
    #[error("Facility {facility} has a non-integral {charger} count {value}")]
    NonIntegralCount {
        facility: usize,
        charger: ChargerType,
        value: f64,
    },
    #[error("Solved values break model row '{constraint}'")]
    RowViolated { constraint: String },
    #[error("Record {row} is negative after truncation: {value}")]
    NegativeRecord { row: usize, value: f64 },
}

/// Structured result of one solve
#[derive(Debug, Clone, PartialEq)]
pub struct PlanReport {
    pub variant: VariantKind,
    pub status: SolveStatus,
    pub objective_value: f64,
    pub diagnostics: SolverDiagnostics,
    pub builds: Vec<BuildEvent>,
    pub shipments: Vec<Shipment>,
    pub facilities: Vec<FacilityOutcome>,
    pub aggregate: AggregateCheck,
    pub anomalies: Vec<NumericAnomaly>,
    num_facilities: usize,
    /// Raw solved assignment values, customer-major
    assignments: Vec<f64>,
}

impl PlanReport {
    pub fn is_suboptimal(&self) -> bool {
        self.status == SolveStatus::Feasible
    }

    /// Raw solved assignment value (a fraction in the uncapacitated variant)
    pub fn assignment(&self, customer: usize, facility: usize) -> f64 {
        self.assignments[customer * self.num_facilities + facility]
    }

    pub fn num_customers(&self) -> usize {
        if self.num_facilities == 0 {
            0
        } else {
            self.assignments.len() / self.num_facilities
        }
    }

    pub fn num_facilities(&self) -> usize {
        self.num_facilities
    }

    /// Facilities reported as construction sites
    pub fn construction_sites(&self) -> usize {
        self.builds.len()
    }
}

pub struct PostProcessor;

impl PostProcessor {
    pub fn process(problem: &PlanningProblem, handle: &FacilityModel, solved: &SolvedModel) -> PlanReport {
        let num_customers = problem.num_customers();
        let num_facilities = problem.num_facilities();
        let fractional = matches!(problem.variant, Variant::Uncapacitated { .. });
        let mut anomalies: Vec<NumericAnomaly> = solved
            .violated_rows
            .iter()
            .map(|constraint| NumericAnomaly::RowViolated {
                constraint: constraint.clone(),
            })
            .collect();

        let assignments: Vec<f64> = (0..num_customers)
            .flat_map(|customer| {
                handle
                    .customer_assignments(customer)
                    .iter()
                    .map(|var| solved.value(*var))
                    .collect::<Vec<_>>()
            })
            .collect();
        let raw = |customer: usize, facility: usize| assignments[customer * num_facilities + facility];

        // Delivered quantity of a pair
        let delivered = |customer: usize, facility: usize| {
            let value = raw(customer, facility);
            if fractional {
                value * problem.customers[customer].demand
            } else {
                value
            }
        };

        // Negative guard and shipment events
        let mut shipments = Vec::new();
        for customer in 0..num_customers {
            let demand = problem.customers[customer].demand;
            for facility in 0..num_facilities {
                let value = raw(customer, facility);
                let truncated = truncate(value, TRUNCATION_DIGITS);
                if truncated < -NEGATIVE_TOLERANCE {
                    anomalies.push(NumericAnomaly::NegativeAssignment {
                        customer,
                        facility,
                        value: truncated,
                    });
                }
                if value > SHIPMENT_EPSILON {
                    let quantity = delivered(customer, facility);
                    shipments.push(Shipment {
                        customer,
                        facility,
                        amount: truncate(quantity, TRUNCATION_DIGITS),
                        demand,
                        share: if fractional {
                            value
                        } else if demand > 0.0 {
                            value / demand
                        } else {
                            0.0
                        },
                    });
                }
            }

            let served: f64 = (0..num_facilities).map(|f| delivered(customer, f)).sum();
            if (served - demand).abs() > DEMAND_TOLERANCE * demand.max(1.0) {
                anomalies.push(NumericAnomaly::DemandMismatch {
                    customer,
                    demand,
                    delivered: served,
                });
            }
        }

        // Facility decisions, build-out and capacity checks
        let mut builds = Vec::new();
        let mut facilities = Vec::with_capacity(num_facilities);
        for (facility, site) in problem.facilities.iter().enumerate() {
            let inbound = truncated_sum(
                (0..num_customers).map(|customer| raw(customer, facility)),
                TRUNCATION_DIGITS,
            );
            let mut outcome = FacilityOutcome {
                facility,
                open: false,
                slow: 0,
                fast: 0,
                inbound,
                capacity: None,
            };

            match &problem.variant {
                Variant::Uncapacitated { .. } | Variant::Capacitated { .. } => {
                    outcome.open = handle
                        .open(facility)
                        .map(|var| solved.value(var) > 0.5)
                        .unwrap_or(false);
                    if outcome.open {
                        builds.push(BuildEvent {
                            facility,
                            action: BuildAction::Open,
                        });
                    }
                    if let Some(capacity) = problem.facility_capacity(facility) {
                        let available = if outcome.open { capacity } else { 0.0 };
                        outcome.capacity = Some(truncate(available, TRUNCATION_DIGITS));
                    }
                }
                Variant::ChargerBuildOut { chargers } => {
                    let mut totals = [0u32; 2];
                    let mut deltas = [0i64; 2];
                    for (slot, charger) in [ChargerType::Slow, ChargerType::Fast].into_iter().enumerate() {
                        let value = handle
                            .charger_count(facility, charger)
                            .map(|var| solved.value(var))
                            .unwrap_or(0.0);
                        let count = value.round();
                        if (value - count).abs() > 1e-6 {
                            anomalies.push(NumericAnomaly::NonIntegralCount {
                                facility,
                                charger,
                                value,
                            });
                        }
                        let committed = site.existing(charger);
                        if count < f64::from(committed) {
                            anomalies.push(NumericAnomaly::BelowCommitted {
                                facility,
                                charger,
                                solved: value,
                                committed,
                            });
                        }
                        totals[slot] = count.max(0.0) as u32;
                        deltas[slot] = count as i64 - i64::from(committed);
                    }
                    outcome.slow = totals[0];
                    outcome.fast = totals[1];
                    outcome.capacity = Some(truncate(
                        chargers.capacity_of(f64::from(totals[0]), f64::from(totals[1])),
                        TRUNCATION_DIGITS,
                    ));
                    if deltas[0] > 0 || deltas[1] > 0 {
                        builds.push(BuildEvent {
                            facility,
                            action: BuildAction::Chargers {
                                slow: deltas[0],
                                fast: deltas[1],
                            },
                        });
                    }
                }
            }

            if let Some(capacity) = outcome.capacity {
                // Summing truncated terms can still round up by a few ulps
                if outcome.inbound > capacity + f64::EPSILON * capacity.max(1.0) * 8.0 {
                    anomalies.push(NumericAnomaly::CapacityExceeded {
                        facility,
                        inbound: outcome.inbound,
                        capacity,
                    });
                }
            }
            facilities.push(outcome);
        }

        let realized_demand = (0..num_customers)
            .flat_map(|customer| (0..num_facilities).map(move |facility| (customer, facility)))
            .map(|(customer, facility)| delivered(customer, facility))
            .sum();
        let total_supply = match problem.variant {
            Variant::Uncapacitated { .. } => None,
            _ => Some(facilities.iter().filter_map(|f| f.capacity).sum()),
        };
        let aggregate = AggregateCheck {
            total_demand: problem.total_demand(),
            realized_demand,
            total_supply,
        };

        for anomaly in &anomalies {
            warn!(%anomaly, "numeric anomaly in solved values");
        }
        debug!(
            construction_sites = builds.len(),
            shipments = shipments.len(),
            total_demand = aggregate.total_demand,
            total_supply = ?aggregate.total_supply,
            "solution post-processed"
        );

        PlanReport {
            variant: problem.variant.kind(),
            status: solved.status,
            objective_value: solved.objective_value,
            diagnostics: solved.diagnostics,
            builds,
            shipments,
            facilities,
            aggregate,
            anomalies,
            num_facilities,
            assignments,
        }
    }
}
