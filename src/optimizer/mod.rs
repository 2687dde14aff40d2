//! Facility-location optimisation: model construction, objective assembly and
//! the solver capability boundary.

pub mod builder;
pub mod constraints;
pub mod model;
pub mod objective;
pub mod solver;
pub mod strategies;
pub mod types;

pub use builder::*;
pub use constraints::*;
pub use model::*;
pub use objective::*;
pub use solver::*;
pub use strategies::*;
pub use types::*;

use thiserror::Error;
use tracing::{instrument, warn};

use crate::domain::ConfigurationError;
use crate::postprocess::{PlanReport, PostProcessor};

/// Why a single solve did not produce a plan
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Invalid planning input: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Model construction failed: {0}")]
    Model(#[from] ModelError),
    #[error("No feasible plan exists for the given capacities and demands")]
    Infeasible { diagnostics: SolverDiagnostics },
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Runs the build → assemble → solve → post-process pipeline for one problem
pub struct FacilityOptimizer {
    pub backend: Box<dyn SolverBackend>,
    pub settings: SolverSettings,
}

impl Default for FacilityOptimizer {
    fn default() -> Self {
        Self::new(Box::new(MilpBackend::new()), SolverSettings::default())
    }
}

impl FacilityOptimizer {
    pub fn new(backend: Box<dyn SolverBackend>, settings: SolverSettings) -> Self {
        Self { backend, settings }
    }

    #[instrument(
        skip_all,
        fields(
            variant = %problem.variant.kind(),
            facilities = problem.num_facilities(),
            customers = problem.num_customers(),
        )
    )]
    pub fn optimize(&self, problem: &PlanningProblem) -> Result<PlanReport, PlanError> {
        let mut session = SolverSession::open(self.backend.as_ref(), self.settings.clone());
        let handle = ModelBuilder::build(problem, &mut session)?;
        ObjectiveAssembler::assemble(problem, &handle, &mut session)?;

        match session.solve()? {
            SolveOutcome::Solved(solved) => {
                if solved.status == SolveStatus::Feasible {
                    warn!(
                        objective = solved.objective_value,
                        "solver stopped before proving optimality; plan is usable but flagged"
                    );
                }
                Ok(PostProcessor::process(problem, &handle, &solved))
            }
            SolveOutcome::Infeasible { diagnostics } => Err(PlanError::Infeasible { diagnostics }),
        }
    }
}
