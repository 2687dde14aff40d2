//! Model builder: decision variables and constraints of the three
//! facility-location variants, built by one parameterised routine.

use itertools::iproduct;
use tracing::debug;

use super::constraints::LinearConstraint;
use super::model::{LinearModel, ModelError, VarId, VariableDef};
use super::solver::SolverSession;
use super::types::{PlanningProblem, Variant, VariantKind};
use super::PlanError;
use crate::domain::ChargerType;

/// Variable handles of a built facility-location model.
///
/// Assignments are stored densely, customer-major, since every customer can
/// be served by every facility.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityModel {
    kind: VariantKind,
    num_customers: usize,
    num_facilities: usize,
    assignments: Vec<VarId>,
    open: Vec<VarId>,
    slow: Vec<VarId>,
    fast: Vec<VarId>,
}

impl FacilityModel {
    pub fn kind(&self) -> VariantKind {
        self.kind
    }

    pub fn num_customers(&self) -> usize {
        self.num_customers
    }

    pub fn num_facilities(&self) -> usize {
        self.num_facilities
    }

    /// Flow (or fraction, in the uncapacitated variant) from `facility` to `customer`
    pub fn assignment(&self, customer: usize, facility: usize) -> VarId {
        self.assignments[customer * self.num_facilities + facility]
    }

    /// Assignment variables of one customer, in facility order
    pub fn customer_assignments(&self, customer: usize) -> &[VarId] {
        let start = customer * self.num_facilities;
        &self.assignments[start..start + self.num_facilities]
    }

    /// Assignment variables flowing into one facility, in customer order
    pub fn facility_assignments(&self, facility: usize) -> impl Iterator<Item = VarId> + '_ {
        (0..self.num_customers).map(move |customer| self.assignment(customer, facility))
    }

    /// Open indicator of a facility, if the variant has one
    pub fn open(&self, facility: usize) -> Option<VarId> {
        self.open.get(facility).copied()
    }

    /// Charger-count variable of a facility, if the variant has one
    pub fn charger_count(&self, facility: usize, charger: ChargerType) -> Option<VarId> {
        match charger {
            ChargerType::Slow => self.slow.get(facility).copied(),
            ChargerType::Fast => self.fast.get(facility).copied(),
        }
    }
}

/// Builds [`FacilityModel`]s into a [`SolverSession`]
pub struct ModelBuilder;

impl ModelBuilder {
    /// Validate `problem` and add its variables and constraints to `session`
    pub fn build(problem: &PlanningProblem, session: &mut SolverSession<'_>) -> Result<FacilityModel, PlanError> {
        problem.validate()?;

        let num_customers = problem.num_customers();
        let num_facilities = problem.num_facilities();
        let model = session.model_mut();

        let mut handle = FacilityModel {
            kind: problem.variant.kind(),
            num_customers,
            num_facilities,
            assignments: Vec::with_capacity(num_customers * num_facilities),
            open: Vec::new(),
            slow: Vec::new(),
            fast: Vec::new(),
        };

        // Fractions in the uncapacitated variant, quantities otherwise
        let assignment_upper = match problem.variant {
            Variant::Uncapacitated { .. } => 1.0,
            _ => f64::INFINITY,
        };
        for (customer, facility) in iproduct!(0..num_customers, 0..num_facilities) {
            let var = model.add_variable(VariableDef::continuous(
                format!("assign_{}_{}", customer, facility),
                0.0,
                assignment_upper,
            ))?;
            handle.assignments.push(var);
        }

        match &problem.variant {
            Variant::Uncapacitated { .. } => {
                handle.open = Self::add_open_indicators(problem, model)?;
                for (customer, c) in problem.customers.iter().enumerate() {
                    // A customer without demand needs no service at all
                    let share = if c.demand > 0.0 { 1.0 } else { 0.0 };
                    model.add_constraint(LinearConstraint::equal(
                        format!("demand_{}", customer),
                        handle.customer_assignments(customer).iter().map(|var| (*var, 1.0)),
                        share,
                    ))?;
                }
                for (customer, facility) in iproduct!(0..num_customers, 0..num_facilities) {
                    model.add_constraint(LinearConstraint::less_or_equal(
                        format!("ship_{}_{}", customer, facility),
                        [
                            (handle.assignment(customer, facility), 1.0),
                            (handle.open[facility], -1.0),
                        ],
                        0.0,
                    ))?;
                }
            }
            Variant::Capacitated { .. } => {
                handle.open = Self::add_open_indicators(problem, model)?;
                Self::add_demand_rows(problem, &handle, model)?;
                for (customer, facility) in iproduct!(0..num_customers, 0..num_facilities) {
                    // Big-M linearisation with the customer's own demand as M
                    model.add_constraint(LinearConstraint::less_or_equal(
                        format!("ship_{}_{}", customer, facility),
                        [
                            (handle.assignment(customer, facility), 1.0),
                            (handle.open[facility], -problem.customers[customer].demand),
                        ],
                        0.0,
                    ))?;
                }
                for facility in 0..num_facilities {
                    let capacity = problem.facility_capacity(facility).unwrap_or_default();
                    let inbound = handle.facility_assignments(facility).map(|var| (var, 1.0));
                    model.add_constraint(LinearConstraint::less_or_equal(
                        format!("capacity_{}", facility),
                        inbound.chain([(handle.open[facility], -capacity)]),
                        0.0,
                    ))?;
                }
            }
            Variant::ChargerBuildOut { chargers } => {
                for (facility, site) in problem.facilities.iter().enumerate() {
                    // Committed chargers are never removed
                    let slow = model.add_variable(VariableDef::integer(
                        format!("slow_{}", facility),
                        f64::from(site.existing_slow),
                        f64::from(site.max_units(ChargerType::Slow)),
                    ))?;
                    let fast = model.add_variable(VariableDef::integer(
                        format!("fast_{}", facility),
                        f64::from(site.existing_fast),
                        f64::from(site.max_units(ChargerType::Fast)),
                    ))?;
                    handle.slow.push(slow);
                    handle.fast.push(fast);

                    model.add_constraint(LinearConstraint::less_or_equal(
                        format!("slots_{}", facility),
                        [(slow, 1.0), (fast, 1.0)],
                        f64::from(site.max_slots),
                    ))?;
                }
                for facility in 0..num_facilities {
                    let inbound = handle.facility_assignments(facility).map(|var| (var, 1.0));
                    model.add_constraint(LinearConstraint::less_or_equal(
                        format!("capacity_{}", facility),
                        inbound.chain([
                            (handle.slow[facility], -chargers.slow_capacity),
                            (handle.fast[facility], -chargers.fast_capacity),
                        ]),
                        0.0,
                    ))?;
                }
                Self::add_demand_rows(problem, &handle, model)?;
            }
        }

        debug!(
            variant = %handle.kind,
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "facility model built"
        );
        Ok(handle)
    }

    fn add_open_indicators(
        problem: &PlanningProblem,
        model: &mut LinearModel,
    ) -> Result<Vec<VarId>, ModelError> {
        (0..problem.num_facilities())
            .map(|facility| model.add_variable(VariableDef::binary(format!("open_{}", facility))))
            .collect()
    }

    /// Every customer receives exactly its demand
    fn add_demand_rows(
        problem: &PlanningProblem,
        handle: &FacilityModel,
        model: &mut LinearModel,
    ) -> Result<(), ModelError> {
        for (customer, c) in problem.customers.iter().enumerate() {
            model.add_constraint(LinearConstraint::equal(
                format!("demand_{}", customer),
                handle.customer_assignments(customer).iter().map(|var| (*var, 1.0)),
                c.demand,
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargerSpec, ConfigurationError, Customer, Facility};
    use crate::optimizer::constraints::Relation;
    use crate::optimizer::model::VariableType;
    use crate::optimizer::solver::{MockSolverBackend, SolverSettings};
    use crate::optimizer::types::{FacilityCapacity, SetupCost};
    use rstest::rstest;

    fn facilities() -> Vec<Facility> {
        vec![
            Facility::new((0.0, 0.0), 5).with_existing(1, 2),
            Facility::new((4.0, 0.0), 6),
            Facility::new((0.0, 4.0), 3).with_existing(0, 3),
        ]
    }

    fn customers() -> Vec<Customer> {
        vec![Customer::new((1.0, 1.0), 100.0), Customer::new((3.0, 1.0), 150.0)]
    }

    fn build(variant: Variant) -> (FacilityModel, LinearModel) {
        let backend = MockSolverBackend::new();
        let mut session = SolverSession::open(&backend, SolverSettings::default());
        let problem = PlanningProblem::new(facilities(), customers(), variant);
        let handle = ModelBuilder::build(&problem, &mut session).unwrap();
        (handle, session.model().clone())
    }

    fn constraint<'a>(
        model: &'a LinearModel,
        name: &str,
    ) -> &'a LinearConstraint {
        model
            .constraints()
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("missing constraint {}", name))
    }

    #[rstest]
    // 6 assignments + 3 open; 2 demand rows + 6 shipping rows
    #[case(Variant::Uncapacitated { setup_cost: SetupCost::Uniform(1.0) }, 9, 8)]
    // 6 assignments + 3 open; 2 demand + 6 shipping + 3 capacity rows
    #[case(Variant::Capacitated { setup_cost: SetupCost::Uniform(1.0), capacity: FacilityCapacity::Uniform(500.0) }, 9, 11)]
    // 6 assignments + 3 slow + 3 fast; 3 slot + 3 capacity + 2 demand rows
    #[case(Variant::ChargerBuildOut { chargers: ChargerSpec::default() }, 12, 8)]
    fn test_model_sizes(#[case] variant: Variant, #[case] variables: usize, #[case] constraints: usize) {
        let (_, model) = build(variant);
        assert_eq!(model.num_variables(), variables);
        assert_eq!(model.num_constraints(), constraints);
    }

    #[test]
    fn test_uncapacitated_uses_fractions() {
        let (handle, model) = build(Variant::Uncapacitated {
            setup_cost: SetupCost::Uniform(1.0),
        });
        let assign = model.variable(handle.assignment(1, 2));
        assert_eq!(assign.variable_type, VariableType::Continuous);
        assert_eq!(assign.upper_bound, 1.0);
        assert_eq!(model.variable(handle.open(0).unwrap()).variable_type, VariableType::Binary);

        let demand = constraint(&model, "demand_1");
        assert_eq!(demand.relation, Relation::Equal);
        assert_eq!(demand.rhs, 1.0);
        assert_eq!(demand.terms.len(), 3);

        let ship = constraint(&model, "ship_1_2");
        assert_eq!(ship.terms, vec![(handle.assignment(1, 2), 1.0), (handle.open(2).unwrap(), -1.0)]);
    }

    #[test]
    fn test_uncapacitated_zero_demand_customer_needs_no_service() {
        let backend = MockSolverBackend::new();
        let mut session = SolverSession::open(&backend, SolverSettings::default());
        let problem = PlanningProblem::new(
            facilities(),
            vec![Customer::new((1.0, 1.0), 0.0)],
            Variant::Uncapacitated {
                setup_cost: SetupCost::Uniform(1.0),
            },
        );
        ModelBuilder::build(&problem, &mut session).unwrap();
        assert_eq!(constraint(session.model(), "demand_0").rhs, 0.0);
    }

    #[test]
    fn test_capacitated_big_m_uses_customer_demand() {
        let (handle, model) = build(Variant::Capacitated {
            setup_cost: SetupCost::Uniform(1.0),
            capacity: FacilityCapacity::Uniform(500.0),
        });
        assert!(model.variable(handle.assignment(0, 0)).upper_bound.is_infinite());

        let ship = constraint(&model, "ship_1_0");
        assert_eq!(ship.terms[1], (handle.open(0).unwrap(), -150.0));

        let capacity = constraint(&model, "capacity_2");
        assert_eq!(capacity.terms.len(), 3);
        assert_eq!(capacity.terms.last(), Some(&(handle.open(2).unwrap(), -500.0)));
        assert_eq!(constraint(&model, "demand_0").rhs, 100.0);
    }

    #[test]
    fn test_build_out_bounds_respect_existing_and_slots() {
        let (handle, model) = build(Variant::ChargerBuildOut {
            chargers: ChargerSpec::default(),
        });
        assert!(handle.open(0).is_none());

        let slow = model.variable(handle.charger_count(0, ChargerType::Slow).unwrap());
        assert_eq!(slow.variable_type, VariableType::Integer);
        assert_eq!((slow.lower_bound, slow.upper_bound), (1.0, 3.0));
        let fast = model.variable(handle.charger_count(0, ChargerType::Fast).unwrap());
        assert_eq!((fast.lower_bound, fast.upper_bound), (2.0, 4.0));

        // Site fully occupied by fast chargers: slow is pinned to zero
        let slow_full = model.variable(handle.charger_count(2, ChargerType::Slow).unwrap());
        assert_eq!((slow_full.lower_bound, slow_full.upper_bound), (0.0, 0.0));

        assert_eq!(constraint(&model, "slots_1").rhs, 6.0);
        let capacity = constraint(&model, "capacity_1");
        assert_eq!(
            &capacity.terms[2..],
            &[
                (handle.charger_count(1, ChargerType::Slow).unwrap(), -200.0),
                (handle.charger_count(1, ChargerType::Fast).unwrap(), -400.0)
            ]
        );
        assert_eq!(constraint(&model, "demand_1").rhs, 150.0);
    }

    #[test]
    fn test_assignment_grid_is_customer_major() {
        let (handle, _) = build(Variant::ChargerBuildOut {
            chargers: ChargerSpec::default(),
        });
        assert_eq!(handle.assignment(0, 0).index(), 0);
        assert_eq!(handle.assignment(0, 2).index(), 2);
        assert_eq!(handle.assignment(1, 0).index(), 3);
        let column: Vec<_> = handle.facility_assignments(1).collect();
        assert_eq!(column, vec![handle.assignment(0, 1), handle.assignment(1, 1)]);
    }

    #[test]
    fn test_invalid_input_fails_before_any_variable_is_created() {
        let backend = MockSolverBackend::new();
        let mut session = SolverSession::open(&backend, SolverSettings::default());
        let problem = PlanningProblem::new(
            facilities(),
            vec![Customer::new((1.0, 1.0), -3.0)],
            Variant::ChargerBuildOut {
                chargers: ChargerSpec::default(),
            },
        );
        let err = ModelBuilder::build(&problem, &mut session).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Configuration(ConfigurationError::InvalidDemand { index: 0, .. })
        ));
        assert_eq!(session.model().num_variables(), 0);
    }
}
