use itertools::iproduct;

use super::builder::FacilityModel;
use super::model::{ModelError, ObjectiveSense};
use super::solver::SolverSession;
use super::types::{PlanningProblem, Variant};
use crate::domain::ChargerType;

/// Linear cost function of a facility-location model.
///
/// Setup or build costs plus per-unit shipping costs, minimised. The
/// demand-prediction error term of the scoring function is not part of the
/// objective: exact ground-truth demand is unknown at planning time.
pub struct ObjectiveAssembler;

impl ObjectiveAssembler {
    pub fn assemble(
        problem: &PlanningProblem,
        handle: &FacilityModel,
        session: &mut SolverSession<'_>,
    ) -> Result<(), ModelError> {
        let model = session.model_mut();
        model.set_sense(ObjectiveSense::Minimize);

        match &problem.variant {
            Variant::Uncapacitated { setup_cost } | Variant::Capacitated { setup_cost, .. } => {
                for facility in 0..problem.num_facilities() {
                    if let Some(open) = handle.open(facility) {
                        model.set_objective_coefficient(open, setup_cost.for_facility(facility))?;
                    }
                }
            }
            Variant::ChargerBuildOut { chargers } => {
                for facility in 0..problem.num_facilities() {
                    for charger in [ChargerType::Slow, ChargerType::Fast] {
                        if let Some(count) = handle.charger_count(facility, charger) {
                            model.set_objective_coefficient(count, chargers.cost(charger))?;
                        }
                    }
                }
            }
        }

        for (customer, facility) in iproduct!(0..problem.num_customers(), 0..problem.num_facilities()) {
            model.set_objective_coefficient(
                handle.assignment(customer, facility),
                problem.shipping_cost(customer, facility),
            )?;
        }
        Ok(())
    }
}
