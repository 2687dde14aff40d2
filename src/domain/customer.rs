use serde::{Deserialize, Serialize};

use super::{ConfigurationError, Point};

/// A demand point with a fixed requirement for the planning period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub location: Point,
    pub demand: f64,
}

impl Customer {
    pub fn new(location: impl Into<Point>, demand: f64) -> Self {
        Self {
            location: location.into(),
            demand,
        }
    }

    /// Check the record at position `index` of the customer table
    pub fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        if !self.location.is_finite() {
            return Err(ConfigurationError::CustomerCoordinate { index });
        }
        if !self.demand.is_finite() || self.demand < 0.0 {
            return Err(ConfigurationError::InvalidDemand {
                index,
                demand: self.demand,
            });
        }
        Ok(())
    }
}

/// Sum of all customer demands
pub fn total_demand(customers: &[Customer]) -> f64 {
    customers.iter().map(|c| c.demand).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_demand_is_valid() {
        assert!(Customer::new((0.0, 0.0), 0.0).validate(0).is_ok());
    }

    #[test]
    fn test_negative_demand_is_rejected() {
        let err = Customer::new((0.0, 0.0), -5.0).validate(4).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidDemand {
                index: 4,
                demand: -5.0
            }
        );
    }

    #[test]
    fn test_nan_coordinate_is_rejected() {
        let err = Customer::new((f64::NAN, 0.0), 1.0).validate(1).unwrap_err();
        assert_eq!(err, ConfigurationError::CustomerCoordinate { index: 1 });
    }

    #[test]
    fn test_total_demand() {
        let customers = [
            Customer::new((0.0, 0.0), 100.0),
            Customer::new((1.0, 0.0), 150.0),
        ];
        assert_eq!(total_demand(&customers), 250.0);
    }
}
