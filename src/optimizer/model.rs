//! Solver-agnostic representation of a linear / mixed-integer program.
//!
//! A [`LinearModel`] is what crosses the solver capability boundary: typed,
//! bounded variables, linear constraints and a linear objective with a sense.
//! Backends translate it into their native objects.

use std::fmt;
use strum::Display;
use thiserror::Error;

use super::constraints::LinearConstraint;

/// Handle of a variable inside a [`LinearModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the variable in the model (and in solved value vectors)
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Domain of a decision variable
///
/// Not every backend supports every type, see
/// [`SolverBackend::supports_integers`](super::SolverBackend::supports_integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    Continuous,
    Integer,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl VariableDef {
    pub fn continuous(name: impl Into<String>, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            name: name.into(),
            variable_type: VariableType::Continuous,
            lower_bound,
            upper_bound,
        }
    }

    pub fn integer(name: impl Into<String>, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            name: name.into(),
            variable_type: VariableType::Integer,
            lower_bound,
            upper_bound,
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

/// Errors raised while assembling a [`LinearModel`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Variable '{name}' has invalid bounds [{lower}, {upper}]")]
    InvalidVariableBounds { name: String, lower: f64, upper: f64 },
    #[error("Constraint '{constraint}' references unknown variable {var}")]
    UnknownVariable { constraint: String, var: VarId },
    #[error("Constraint '{constraint}' has a non-finite coefficient or right-hand side")]
    NonFiniteConstraint { constraint: String },
    #[error("Objective coefficient {coefficient} for {var} is invalid")]
    InvalidObjectiveCoefficient { var: VarId, coefficient: f64 },
}

/// A linear / mixed-integer program
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<f64>,
    sense: ObjectiveSense,
}

impl LinearModel {
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            sense,
            ..Self::default()
        }
    }

    /// Add a variable, returning its handle
    pub fn add_variable(&mut self, def: VariableDef) -> Result<VarId, ModelError> {
        let lower = def.lower_bound;
        let upper = def.upper_bound;
        if lower.is_nan() || upper.is_nan() || lower > upper || lower == f64::INFINITY {
            return Err(ModelError::InvalidVariableBounds {
                name: def.name,
                lower,
                upper,
            });
        }
        let id = VarId(self.variables.len());
        self.variables.push(def);
        self.objective.push(0.0);
        Ok(id)
    }

    /// Add a constraint after checking it only references variables of this model
    pub fn add_constraint(&mut self, constraint: LinearConstraint) -> Result<usize, ModelError> {
        if let Some((var, _)) = constraint
            .terms
            .iter()
            .find(|(var, _)| var.index() >= self.variables.len())
        {
            return Err(ModelError::UnknownVariable {
                constraint: constraint.name.clone(),
                var: *var,
            });
        }
        let finite = constraint.rhs.is_finite()
            && constraint.terms.iter().all(|(_, coefficient)| coefficient.is_finite());
        if !finite {
            return Err(ModelError::NonFiniteConstraint {
                constraint: constraint.name,
            });
        }
        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    /// Set (overwrite) the objective coefficient of a variable
    pub fn set_objective_coefficient(&mut self, var: VarId, coefficient: f64) -> Result<(), ModelError> {
        if !coefficient.is_finite() || var.index() >= self.objective.len() {
            return Err(ModelError::InvalidObjectiveCoefficient { var, coefficient });
        }
        self.objective[var.index()] = coefficient;
        Ok(())
    }

    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &VariableDef {
        &self.variables[var.index()]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective_coefficients(&self) -> &[f64] {
        &self.objective
    }

    pub fn objective_coefficient(&self, var: VarId) -> f64 {
        self.objective[var.index()]
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .iter()
            .any(|v| v.variable_type != VariableType::Continuous)
    }

    /// Objective value at `values`
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .map(|(coefficient, value)| coefficient * value)
            .sum()
    }

    /// Constraints violated by `values` beyond `tolerance`
    pub fn violated_constraints<'a>(
        &'a self,
        values: &'a [f64],
        tolerance: f64,
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(values, tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variables_assigns_dense_ids() {
        let mut model = LinearModel::new(ObjectiveSense::Minimize);
        let x = model
            .add_variable(VariableDef::continuous("x", 0.0, f64::INFINITY))
            .unwrap();
        let y = model.add_variable(VariableDef::binary("y")).unwrap();
        assert_eq!(x.index(), 0);
        assert_eq!(y.index(), 1);
        assert_eq!(model.num_variables(), 2);
        assert!(model.has_integer_variables());
        assert_eq!(model.variable(y).upper_bound, 1.0);
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        let mut model = LinearModel::default();
        let err = model
            .add_variable(VariableDef::integer("slow", 5.0, 3.0))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidVariableBounds { .. }));
        assert_eq!(model.num_variables(), 0);
    }

    #[test]
    fn test_constraint_with_unknown_variable_is_rejected() {
        let mut model = LinearModel::default();
        model
            .add_variable(VariableDef::continuous("x", 0.0, 1.0))
            .unwrap();
        let err = model
            .add_constraint(LinearConstraint::equal("bad", [(VarId::new(4), 1.0)], 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownVariable {
                constraint: "bad".to_string(),
                var: VarId::new(4)
            }
        );
    }

    #[test]
    fn test_non_finite_constraint_is_rejected() {
        let mut model = LinearModel::default();
        let x = model
            .add_variable(VariableDef::continuous("x", 0.0, 1.0))
            .unwrap();
        let err = model
            .add_constraint(LinearConstraint::less_or_equal("inf", [(x, 1.0)], f64::INFINITY))
            .unwrap_err();
        assert!(matches!(err, ModelError::NonFiniteConstraint { .. }));
    }

    #[test]
    fn test_objective_evaluation() {
        let mut model = LinearModel::default();
        let x = model
            .add_variable(VariableDef::continuous("x", 0.0, 10.0))
            .unwrap();
        let y = model
            .add_variable(VariableDef::integer("y", 0.0, 10.0))
            .unwrap();
        model.set_objective_coefficient(x, 2.0).unwrap();
        model.set_objective_coefficient(y, 600.0).unwrap();
        assert_eq!(model.evaluate_objective(&[3.0, 1.0]), 606.0);
        assert!(model.set_objective_coefficient(y, f64::NAN).is_err());
    }

    #[test]
    fn test_violated_constraints() {
        let mut model = LinearModel::default();
        let x = model
            .add_variable(VariableDef::continuous("x", 0.0, 10.0))
            .unwrap();
        model
            .add_constraint(LinearConstraint::less_or_equal("cap", [(x, 1.0)], 5.0))
            .unwrap();
        model
            .add_constraint(LinearConstraint::equal("demand", [(x, 1.0)], 7.0))
            .unwrap();
        let values = [7.0];
        let violated: Vec<_> = model
            .violated_constraints(&values, 1e-9)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(violated, vec!["cap"]);
    }
}
