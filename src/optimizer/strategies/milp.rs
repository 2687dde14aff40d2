//! MILP backend
//!
//! Translates a [`LinearModel`] into `good_lp` objects and solves it with the
//! `microlp` engine (simplex plus branch-and-bound for integer variables).
//! Being pure Rust, it needs no system solver library.

use tracing::warn;

use crate::optimizer::model::LinearModel;
use crate::optimizer::solver::{SolveOutcome, SolverBackend, SolverError, SolverSettings};

/// Backend built on `good_lp` + `microlp`
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpBackend;

impl MilpBackend {
    pub fn new() -> Self {
        Self
    }

    #[cfg(feature = "optimization")]
    fn solve_milp(&self, model: &LinearModel) -> Result<SolveOutcome, SolverError> {
        use good_lp::{
            constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
            SolverModel, Variable,
        };

        use crate::optimizer::constraints::Relation;
        use crate::optimizer::model::{ObjectiveSense, VariableType};
        use crate::optimizer::solver::{SolveStatus, SolvedModel, SolverDiagnostics};

        let mut problem_vars = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|def| {
                let mut definition = variable().name(def.name.clone());
                definition = match def.variable_type {
                    VariableType::Continuous => definition,
                    VariableType::Integer => definition.integer(),
                    VariableType::Binary => definition.binary(),
                };
                if def.lower_bound.is_finite() {
                    definition = definition.min(def.lower_bound);
                }
                if def.upper_bound.is_finite() {
                    definition = definition.max(def.upper_bound);
                }
                problem_vars.add(definition)
            })
            .collect();

        let objective: Expression = model
            .objective_coefficients()
            .iter()
            .zip(&handles)
            .filter(|(coefficient, _)| **coefficient != 0.0)
            .map(|(coefficient, var)| *coefficient * *var)
            .sum();

        let unsolved = match model.sense() {
            ObjectiveSense::Minimize => problem_vars.minimise(objective),
            ObjectiveSense::Maximize => problem_vars.maximise(objective),
        };
        let mut problem = unsolved.using(microlp);

        for row in model.constraints() {
            let lhs: Expression = row
                .terms
                .iter()
                .map(|(var, coefficient)| *coefficient * handles[var.index()])
                .sum();
            let rhs = row.rhs;
            problem = problem.with(match row.relation {
                Relation::Equal => constraint!(lhs == rhs),
                Relation::LessOrEqual => constraint!(lhs <= rhs),
                Relation::GreaterOrEqual => constraint!(lhs >= rhs),
            });
        }

        match problem.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|var| solution.value(*var)).collect();
                let objective_value = model.evaluate_objective(&values);
                // microlp either proves optimality or fails; it has no limits to hit
                Ok(SolveOutcome::Solved(SolvedModel::new(
                    SolveStatus::Optimal,
                    objective_value,
                    values,
                )))
            }
            Err(ResolutionError::Infeasible) => Ok(SolveOutcome::Infeasible {
                diagnostics: SolverDiagnostics::default(),
            }),
            Err(ResolutionError::Unbounded) => Err(SolverError::Unbounded),
            Err(other) => Err(SolverError::Backend(other.to_string())),
        }
    }

    #[cfg(not(feature = "optimization"))]
    fn solve_milp(&self, _model: &LinearModel) -> Result<SolveOutcome, SolverError> {
        Err(SolverError::Unsupported {
            backend: self.name(),
            feature: "solving without the 'optimization' feature",
        })
    }
}

impl SolverBackend for MilpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn supports_integers(&self) -> bool {
        true
    }

    fn solve(&self, model: &LinearModel, settings: &SolverSettings) -> Result<SolveOutcome, SolverError> {
        if let Some(limit) = settings.time_limit {
            // microlp exposes no time or node limit; the solve always runs to completion
            warn!(
                limit_seconds = limit.as_secs_f64(),
                "time limit is not supported by the microlp backend and will be ignored"
            );
        }
        self.solve_milp(model)
    }
}

#[cfg(all(test, feature = "optimization"))]
mod tests {
    use super::*;
    use crate::optimizer::constraints::LinearConstraint;
    use crate::optimizer::model::{ObjectiveSense, VariableDef};
    use crate::optimizer::solver::SolveStatus;

    fn solved(outcome: SolveOutcome) -> crate::optimizer::solver::SolvedModel {
        match outcome {
            SolveOutcome::Solved(solved) => solved,
            other => panic!("expected a solution, got {:?}", other),
        }
    }

    #[test]
    fn test_continuous_lp() {
        // min x + 2y  s.t. x + y = 10, x <= 4
        let mut model = LinearModel::new(ObjectiveSense::Minimize);
        let x = model.add_variable(VariableDef::continuous("x", 0.0, f64::INFINITY)).unwrap();
        let y = model.add_variable(VariableDef::continuous("y", 0.0, f64::INFINITY)).unwrap();
        model.set_objective_coefficient(x, 1.0).unwrap();
        model.set_objective_coefficient(y, 2.0).unwrap();
        model
            .add_constraint(LinearConstraint::equal("sum", [(x, 1.0), (y, 1.0)], 10.0))
            .unwrap();
        model
            .add_constraint(LinearConstraint::less_or_equal("cap", [(x, 1.0)], 4.0))
            .unwrap();

        let solved = solved(MilpBackend::new().solve(&model, &SolverSettings::default()).unwrap());
        assert_eq!(solved.status, SolveStatus::Optimal);
        assert!((solved.value(x) - 4.0).abs() < 1e-6);
        assert!((solved.value(y) - 6.0).abs() < 1e-6);
        assert!((solved.objective_value - 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_integer_rounding_up() {
        // Cover 250 units with 200-unit chargers: two are needed
        let mut model = LinearModel::new(ObjectiveSense::Minimize);
        let n = model.add_variable(VariableDef::integer("n", 0.0, 10.0)).unwrap();
        model.set_objective_coefficient(n, 600.0).unwrap();
        model
            .add_constraint(LinearConstraint::greater_or_equal("cover", [(n, 200.0)], 250.0))
            .unwrap();

        let solved = solved(MilpBackend::new().solve(&model, &SolverSettings::default()).unwrap());
        assert!((solved.value(n) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_maximisation() {
        let mut model = LinearModel::new(ObjectiveSense::Maximize);
        let x = model.add_variable(VariableDef::continuous("x", 0.0, 3.5)).unwrap();
        model.set_objective_coefficient(x, 1.0).unwrap();

        let solved = solved(MilpBackend::new().solve(&model, &SolverSettings::default()).unwrap());
        assert!((solved.value(x) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_model() {
        let mut model = LinearModel::new(ObjectiveSense::Minimize);
        let x = model.add_variable(VariableDef::continuous("x", 0.0, 1.0)).unwrap();
        model
            .add_constraint(LinearConstraint::equal("too_much", [(x, 1.0)], 5.0))
            .unwrap();

        let outcome = MilpBackend::new().solve(&model, &SolverSettings::default()).unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible { .. }));
    }
}
