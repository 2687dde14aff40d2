//! Capability boundary around an external LP/MIP engine.
//!
//! Everything above this module talks to [`SolverBackend`] only, so a
//! different engine can be plugged in without touching the model builder or
//! the post-processor. A [`SolverSession`] owns the model of exactly one
//! solve: it is opened, filled by the builder and the objective assembler,
//! and consumed by [`SolverSession::solve`].

use std::time::{Duration, Instant};
use serde::Serialize;
use strum::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::model::{LinearModel, ObjectiveSense, VarId};

/// Relative slack allowed when re-checking solved values against the rows
pub const ROW_TOLERANCE: f64 = 1e-6;

/// Resource limits handed to the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverSettings {
    /// Wall-clock limit; engines that cannot enforce it ignore it
    pub time_limit: Option<Duration>,
}

/// Status of a solve that produced usable values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Proven optimal
    Optimal,
    /// Feasible but not proven optimal (time or node limit reached)
    Feasible,
}

/// Counters reported by the engine. Reporting only, never used for control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverDiagnostics {
    pub wall_time: Duration,
    pub iterations: Option<u64>,
    pub nodes: Option<u64>,
}

/// Values of a successful solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedModel {
    pub status: SolveStatus,
    pub objective_value: f64,
    pub diagnostics: SolverDiagnostics,
    /// Names of model rows the returned values break, filled by the session
    pub violated_rows: Vec<String>,
    values: Vec<f64>,
}

impl SolvedModel {
    pub fn new(status: SolveStatus, objective_value: f64, values: Vec<f64>) -> Self {
        Self {
            status,
            objective_value,
            diagnostics: SolverDiagnostics::default(),
            violated_rows: Vec::new(),
            values,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: SolverDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Solved value of a variable
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Terminal result of a solve.
///
/// Values only exist in the [`SolveOutcome::Solved`] case, so an infeasible
/// model cannot be queried for (meaningless) variable values.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Solved(SolvedModel),
    Infeasible { diagnostics: SolverDiagnostics },
}

impl SolveOutcome {
    fn diagnostics_mut(&mut self) -> &mut SolverDiagnostics {
        match self {
            SolveOutcome::Solved(solved) => &mut solved.diagnostics,
            SolveOutcome::Infeasible { diagnostics } => diagnostics,
        }
    }
}

/// Failures of the engine itself
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("Objective is unbounded")]
    Unbounded,
    #[error("Backend '{backend}' does not support {feature}")]
    Unsupported {
        backend: &'static str,
        feature: &'static str,
    },
    #[error("Backend returned {actual} values for {expected} variables")]
    ValueCountMismatch { expected: usize, actual: usize },
    #[error("Solver failure: {0}")]
    Backend(String),
}

/// An external linear / mixed-integer solving engine
#[cfg_attr(test, mockall::automock)]
pub trait SolverBackend {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Whether integer and binary variables are honoured
    fn supports_integers(&self) -> bool;

    /// Solve `model` to completion or to the limits in `settings`
    fn solve(&self, model: &LinearModel, settings: &SolverSettings) -> Result<SolveOutcome, SolverError>;
}

/// Explicit per-solve session owning the model handed to the engine
pub struct SolverSession<'a> {
    backend: &'a dyn SolverBackend,
    settings: SolverSettings,
    model: LinearModel,
}

impl<'a> SolverSession<'a> {
    pub fn open(backend: &'a dyn SolverBackend, settings: SolverSettings) -> Self {
        Self {
            backend,
            settings,
            model: LinearModel::new(ObjectiveSense::Minimize),
        }
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut LinearModel {
        &mut self.model
    }

    /// Hand the model to the engine and close the session
    pub fn solve(self) -> Result<SolveOutcome, SolverError> {
        let backend = self.backend.name();
        if self.model.has_integer_variables() && !self.backend.supports_integers() {
            return Err(SolverError::Unsupported {
                backend,
                feature: "integer variables",
            });
        }

        debug!(
            backend,
            variables = self.model.num_variables(),
            constraints = self.model.num_constraints(),
            "handing model to solver"
        );

        let started = Instant::now();
        let mut outcome = self.backend.solve(&self.model, &self.settings)?;
        outcome.diagnostics_mut().wall_time = started.elapsed();

        match &mut outcome {
            SolveOutcome::Solved(solved) => {
                if solved.values.len() != self.model.num_variables() {
                    return Err(SolverError::ValueCountMismatch {
                        expected: self.model.num_variables(),
                        actual: solved.values.len(),
                    });
                }
                let violated: Vec<String> = self
                    .model
                    .violated_constraints(&solved.values, ROW_TOLERANCE)
                    .map(|row| row.name.clone())
                    .collect();
                if !violated.is_empty() {
                    warn!(backend, rows = ?violated, "solved values break model rows");
                }
                solved.violated_rows = violated;
                info!(
                    backend,
                    status = %solved.status,
                    objective = solved.objective_value,
                    wall_ms = solved.diagnostics.wall_time.as_secs_f64() * 1000.0,
                    iterations = ?solved.diagnostics.iterations,
                    nodes = ?solved.diagnostics.nodes,
                    "solve finished"
                );
            }
            SolveOutcome::Infeasible { .. } => {
                warn!(backend, "model is infeasible");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::constraints::LinearConstraint;
    use crate::optimizer::model::VariableDef;

    fn session_with_integer(backend: &dyn SolverBackend) -> SolverSession<'_> {
        let mut session = SolverSession::open(backend, SolverSettings::default());
        session
            .model_mut()
            .add_variable(VariableDef::integer("n", 0.0, 3.0))
            .unwrap();
        session
    }

    #[test]
    fn test_integer_model_rejected_by_lp_only_backend() {
        let mut backend = MockSolverBackend::new();
        backend.expect_name().return_const("lp-only");
        backend.expect_supports_integers().return_const(false);
        backend.expect_solve().never();

        let err = session_with_integer(&backend).solve().unwrap_err();
        assert_eq!(
            err,
            SolverError::Unsupported {
                backend: "lp-only",
                feature: "integer variables"
            }
        );
    }

    #[test]
    fn test_value_count_is_checked() {
        let mut backend = MockSolverBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_supports_integers().return_const(true);
        backend
            .expect_solve()
            .returning(|_, _| Ok(SolveOutcome::Solved(SolvedModel::new(SolveStatus::Optimal, 0.0, vec![]))));

        let err = session_with_integer(&backend).solve().unwrap_err();
        assert_eq!(err, SolverError::ValueCountMismatch { expected: 1, actual: 0 });
    }

    #[test]
    fn test_session_passes_settings_and_fills_wall_time() {
        let mut backend = MockSolverBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_supports_integers().return_const(true);
        backend
            .expect_solve()
            .withf(|model, settings| {
                model.num_variables() == 1 && settings.time_limit == Some(Duration::from_secs(5))
            })
            .times(1)
            .returning(|_, _| {
                Ok(SolveOutcome::Solved(
                    SolvedModel::new(SolveStatus::Feasible, 3.0, vec![2.0]).with_diagnostics(
                        SolverDiagnostics {
                            nodes: Some(12),
                            ..SolverDiagnostics::default()
                        },
                    ),
                ))
            });

        let mut session = SolverSession::open(
            &backend,
            SolverSettings {
                time_limit: Some(Duration::from_secs(5)),
            },
        );
        let n = session
            .model_mut()
            .add_variable(VariableDef::integer("n", 0.0, 3.0))
            .unwrap();

        match session.solve().unwrap() {
            SolveOutcome::Solved(solved) => {
                assert_eq!(solved.status, SolveStatus::Feasible);
                assert_eq!(solved.value(n), 2.0);
                assert_eq!(solved.diagnostics.nodes, Some(12));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_broken_rows_are_recorded() {
        let mut backend = MockSolverBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_supports_integers().return_const(true);
        backend
            .expect_solve()
            .returning(|_, _| Ok(SolveOutcome::Solved(SolvedModel::new(SolveStatus::Optimal, 0.0, vec![3.0]))));

        let mut session = session_with_integer(&backend);
        let n = VarId::new(0);
        session
            .model_mut()
            .add_constraint(LinearConstraint::less_or_equal("cap", [(n, 1.0)], 2.0))
            .unwrap();
        session
            .model_mut()
            .add_constraint(LinearConstraint::greater_or_equal("floor", [(n, 1.0)], 1.0))
            .unwrap();

        match session.solve().unwrap() {
            SolveOutcome::Solved(solved) => assert_eq!(solved.violated_rows, vec!["cap"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_backend_errors_propagate() {
        let mut backend = MockSolverBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_supports_integers().return_const(true);
        backend
            .expect_solve()
            .returning(|_, _| Err(SolverError::Backend("crashed".to_string())));

        let err = session_with_integer(&backend).solve().unwrap_err();
        assert_eq!(err.to_string(), "Solver failure: crashed");
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(SolveStatus::Optimal.to_string(), "OPTIMAL");
        assert_eq!(SolveStatus::Feasible.to_string(), "FEASIBLE");
    }
}
