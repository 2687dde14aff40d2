use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{check_non_negative, ConfigurationError, Point};

/// Charger unit types that can be installed in a parking slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChargerType {
    Slow,
    Fast,
}

/// Per-unit capacity and build cost of each charger type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargerSpec {
    pub slow_capacity: f64,
    pub slow_cost: f64,
    pub fast_capacity: f64,
    pub fast_cost: f64,
}

impl Default for ChargerSpec {
    fn default() -> Self {
        Self::from_base_cost(200.0, 400.0, 600.0, Self::FAST_COST_MULTIPLIER)
    }
}

impl ChargerSpec {
    /// Fast chargers deliver twice the capacity for 1.5 times the price
    pub const FAST_COST_MULTIPLIER: f64 = 1.5;

    /// Derive the fast unit cost as a multiple of the slow unit cost
    pub fn from_base_cost(
        slow_capacity: f64,
        fast_capacity: f64,
        slow_cost: f64,
        fast_cost_multiplier: f64,
    ) -> Self {
        Self {
            slow_capacity,
            slow_cost,
            fast_capacity,
            fast_cost: slow_cost * fast_cost_multiplier,
        }
    }

    pub fn cost(&self, charger: ChargerType) -> f64 {
        match charger {
            ChargerType::Slow => self.slow_cost,
            ChargerType::Fast => self.fast_cost,
        }
    }

    /// Capacity delivered by a mix of chargers
    pub fn capacity_of(&self, slow: f64, fast: f64) -> f64 {
        slow * self.slow_capacity + fast * self.fast_capacity
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_non_negative("slow_capacity", self.slow_capacity)?;
        check_non_negative("slow_cost", self.slow_cost)?;
        check_non_negative("fast_capacity", self.fast_capacity)?;
        check_non_negative("fast_cost", self.fast_cost)?;
        Ok(())
    }
}

/// A candidate supply site (parking lot) with a bounded number of slots.
///
/// `existing_slow`/`existing_fast` are chargers already committed in an
/// earlier period. They are lower bounds for the build-out and are never
/// removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub location: Point,
    pub max_slots: u32,
    pub existing_slow: u32,
    pub existing_fast: u32,
}

impl Facility {
    pub fn new(location: impl Into<Point>, max_slots: u32) -> Self {
        Self {
            location: location.into(),
            max_slots,
            existing_slow: 0,
            existing_fast: 0,
        }
    }

    pub fn with_existing(mut self, slow: u32, fast: u32) -> Self {
        self.existing_slow = slow;
        self.existing_fast = fast;
        self
    }

    pub fn existing(&self, charger: ChargerType) -> u32 {
        match charger {
            ChargerType::Slow => self.existing_slow,
            ChargerType::Fast => self.existing_fast,
        }
    }

    /// Total committed chargers of both types
    pub fn committed(&self) -> u64 {
        u64::from(self.existing_slow) + u64::from(self.existing_fast)
    }

    /// Largest count of `charger` the site can hold next to the committed
    /// chargers of the other type
    pub fn max_units(&self, charger: ChargerType) -> u32 {
        match charger {
            ChargerType::Slow => self.max_slots.saturating_sub(self.existing_fast),
            ChargerType::Fast => self.max_slots.saturating_sub(self.existing_slow),
        }
    }

    /// Capacity of the chargers that are already installed
    pub fn existing_capacity(&self, chargers: &ChargerSpec) -> f64 {
        chargers.capacity_of(f64::from(self.existing_slow), f64::from(self.existing_fast))
    }

    /// Check the record at position `index` of the facility table
    pub fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        if !self.location.is_finite() {
            return Err(ConfigurationError::FacilityCoordinate { index });
        }
        if self.committed() > u64::from(self.max_slots) {
            return Err(ConfigurationError::SlotOverflow {
                index,
                existing: self.existing_slow.saturating_add(self.existing_fast),
                max_slots: self.max_slots,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_charger_spec() {
        let spec = ChargerSpec::default();
        assert_eq!(spec.slow_capacity, 200.0);
        assert_eq!(spec.fast_capacity, 400.0);
        assert_eq!(spec.slow_cost, 600.0);
        assert_eq!(spec.fast_cost, 900.0);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_charger_spec_rejects_negative_capacity() {
        let spec = ChargerSpec {
            slow_capacity: -1.0,
            ..ChargerSpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::InvalidParameter { field: "slow_capacity", .. })
        ));
    }

    #[test]
    fn test_capacity_of_mix() {
        let spec = ChargerSpec::default();
        assert_eq!(spec.capacity_of(2.0, 1.0), 800.0);
        assert_eq!(spec.cost(ChargerType::Slow), 600.0);
    }

    #[test]
    fn test_slot_bounds() {
        let facility = Facility::new((0.0, 0.0), 10).with_existing(3, 2);
        assert_eq!(facility.max_units(ChargerType::Slow), 8);
        assert_eq!(facility.max_units(ChargerType::Fast), 7);
        assert_eq!(facility.existing(ChargerType::Fast), 2);
    }

    #[test]
    fn test_slot_overflow_is_rejected() {
        let facility = Facility::new((0.0, 0.0), 4).with_existing(3, 2);
        assert_eq!(
            facility.validate(7),
            Err(ConfigurationError::SlotOverflow {
                index: 7,
                existing: 5,
                max_slots: 4
            })
        );
    }

    #[test]
    fn test_capacities() {
        let spec = ChargerSpec::default();
        let facility = Facility::new((0.0, 0.0), 5).with_existing(1, 1);
        assert_eq!(facility.existing_capacity(&spec), 600.0);
    }

    #[test]
    fn test_charger_type_tags() {
        assert_eq!(ChargerType::Slow.to_string(), "slow");
        assert_eq!("fast".parse::<ChargerType>().unwrap(), ChargerType::Fast);
    }
}
