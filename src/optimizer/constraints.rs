use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::VarId;

/// Relational operator between the linear terms and the right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Equal => write!(f, "="),
            Relation::LessOrEqual => write!(f, "<="),
            Relation::GreaterOrEqual => write!(f, ">="),
        }
    }
}

/// A linear constraint `Σ coefficient·variable <relation> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        Self {
            name: name.into(),
            terms: terms.into_iter().collect(),
            relation,
            rhs,
        }
    }

    pub fn equal(
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        rhs: f64,
    ) -> Self {
        Self::new(name, terms, Relation::Equal, rhs)
    }

    pub fn less_or_equal(
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        rhs: f64,
    ) -> Self {
        Self::new(name, terms, Relation::LessOrEqual, rhs)
    }

    pub fn greater_or_equal(
        name: impl Into<String>,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        rhs: f64,
    ) -> Self {
        Self::new(name, terms, Relation::GreaterOrEqual, rhs)
    }

    /// Left-hand side evaluated at `values` (indexed by variable id)
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * values[var.index()])
            .sum()
    }

    /// Whether `values` satisfies the constraint up to `tolerance`, taken
    /// relative to `max(1, |rhs|)`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        let tolerance = tolerance * self.rhs.abs().max(1.0);
        match self.relation {
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
            Relation::LessOrEqual => lhs <= self.rhs + tolerance,
            Relation::GreaterOrEqual => lhs >= self.rhs - tolerance,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        if self.terms.is_empty() {
            write!(f, "0")?;
        }
        for (position, (var, coefficient)) in self.terms.iter().enumerate() {
            if position > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}*{}", coefficient, var)?;
        }
        write!(f, " {} {}", self.relation, self.rhs)
    }
}
