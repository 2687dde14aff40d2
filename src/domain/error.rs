use thiserror::Error;

/// Malformed or inconsistent planning input.
///
/// Raised before any solver object is created; a problem that fails these
/// checks is never handed to a solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("No candidate facilities supplied")]
    NoFacilities,
    #[error("Facility {index} has a non-finite coordinate")]
    FacilityCoordinate { index: usize },
    #[error("Customer {index} has a non-finite coordinate")]
    CustomerCoordinate { index: usize },
    #[error("Customer {index} has invalid demand {demand} (must be finite and non-negative)")]
    InvalidDemand { index: usize, demand: f64 },
    #[error(
        "Facility {index} has {existing} committed chargers but only {max_slots} slots"
    )]
    SlotOverflow {
        index: usize,
        existing: u32,
        max_slots: u32,
    },
    #[error("Invalid {field}: {value} (must be finite and non-negative)")]
    InvalidParameter { field: &'static str, value: f64 },
    #[error("Table '{table}' has {actual} entries, expected {expected}")]
    DimensionMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Reject negative, NaN and infinite parameters
pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter { field, value })
    }
}
