//! Multi-period build-out planning.
//!
//! Periods are solved in order with the charger build-out model. The
//! charger counts solved for one period become the committed counts of the
//! next, so infrastructure only ever grows.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{error, info, info_span, warn};

use crate::domain::{ChargerSpec, Customer, Facility};
use crate::optimizer::{FacilityOptimizer, PlanError, PlanningProblem, ShippingCost, Variant};
use crate::postprocess::{NumericAnomaly, PlanReport, ResultRecord};

/// What to do when a period does not produce a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed period
    #[default]
    Abort,
    /// Record the failure and carry the last known infrastructure forward
    Continue,
}

/// Demand of one planning period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDemand {
    pub period: String,
    pub customers: Vec<Customer>,
}

impl PeriodDemand {
    pub fn new(period: impl Into<String>, customers: Vec<Customer>) -> Self {
        Self {
            period: period.into(),
            customers,
        }
    }
}

#[derive(Debug)]
pub struct PeriodPlan {
    pub period: String,
    pub outcome: Result<PlanReport, PlanError>,
    /// Infrastructure at the end of the period
    pub facilities: Vec<Facility>,
}

#[derive(Debug, Default)]
pub struct PlanRun {
    pub periods: Vec<PeriodPlan>,
    /// Infrastructure after the last processed period
    pub facilities: Vec<Facility>,
}

impl PlanRun {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PlanError)> {
        self.periods
            .iter()
            .filter_map(|p| p.outcome.as_ref().err().map(|e| (p.period.as_str(), e)))
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Result records of every successful period, in period order
    pub fn records(&self) -> Vec<ResultRecord> {
        self.periods
            .iter()
            .filter_map(|p| p.outcome.as_ref().ok().map(|report| report.to_records(&p.period)))
            .flatten()
            .collect()
    }
}

/// Carry solved charger counts into the committed counts of `facilities`.
///
/// A facility whose counts solved below its committed ones (reported as an
/// anomaly) keeps its previous infrastructure unchanged.
pub fn roll_forward(facilities: &[Facility], report: &PlanReport) -> Vec<Facility> {
    facilities
        .iter()
        .zip(&report.facilities)
        .map(|(facility, outcome)| {
            let below_committed = report.anomalies.iter().any(|anomaly| {
                matches!(anomaly, NumericAnomaly::BelowCommitted { facility: index, .. } if *index == outcome.facility)
            });
            if below_committed {
                warn!(facility = outcome.facility, "keeping committed chargers of facility");
                facility.clone()
            } else {
                Facility {
                    existing_slow: outcome.slow,
                    existing_fast: outcome.fast,
                    ..facility.clone()
                }
            }
        })
        .collect()
}

pub struct Planner {
    pub optimizer: FacilityOptimizer,
    pub chargers: ChargerSpec,
    pub shipping: ShippingCost,
    pub failure_policy: FailurePolicy,
}

impl Planner {
    pub fn new(optimizer: FacilityOptimizer, chargers: ChargerSpec) -> Self {
        Self {
            optimizer,
            chargers,
            shipping: ShippingCost::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_shipping(mut self, shipping: ShippingCost) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn run<I>(&self, facilities: Vec<Facility>, periods: I) -> PlanRun
    where
        I: IntoIterator<Item = PeriodDemand>,
    {
        let mut run = PlanRun {
            periods: Vec::new(),
            facilities,
        };

        for PeriodDemand { period, customers } in periods {
            let _span = info_span!("period", %period).entered();
            let problem = PlanningProblem::new(
                run.facilities.clone(),
                customers,
                Variant::ChargerBuildOut {
                    chargers: self.chargers,
                },
            )
            .with_shipping(self.shipping.clone());

            let outcome = self.optimizer.optimize(&problem);
            let failed = match &outcome {
                Ok(report) => {
                    run.facilities = roll_forward(&run.facilities, report);
                    info!(
                        objective = report.objective_value,
                        construction_sites = report.construction_sites(),
                        "period planned"
                    );
                    false
                }
                Err(e) => {
                    error!(error = %e, policy = %self.failure_policy, "period failed");
                    true
                }
            };
            run.periods.push(PeriodPlan {
                period,
                outcome,
                facilities: run.facilities.clone(),
            });

            if failed && self.failure_policy == FailurePolicy::Abort {
                warn!("aborting remaining periods");
                break;
            }
        }
        run
    }
}
