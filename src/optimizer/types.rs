use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::domain::{check_non_negative, ChargerSpec, ConfigurationError, Customer, Facility};

/// Fixed cost of opening a facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SetupCost {
    /// Same cost for every facility
    Uniform(f64),
    /// One entry per facility, in facility order
    PerFacility(Vec<f64>),
}

impl SetupCost {
    pub fn for_facility(&self, facility: usize) -> f64 {
        match self {
            SetupCost::Uniform(cost) => *cost,
            SetupCost::PerFacility(costs) => costs[facility],
        }
    }

    fn validate(&self, num_facilities: usize) -> Result<(), ConfigurationError> {
        match self {
            SetupCost::Uniform(cost) => check_non_negative("setup_cost", *cost),
            SetupCost::PerFacility(costs) => {
                if costs.len() != num_facilities {
                    return Err(ConfigurationError::DimensionMismatch {
                        table: "setup_cost",
                        expected: num_facilities,
                        actual: costs.len(),
                    });
                }
                costs
                    .iter()
                    .try_for_each(|cost| check_non_negative("setup_cost", *cost))
            }
        }
    }
}

/// Capacity of an open facility in the capacitated variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCapacity {
    /// Same capacity for every facility
    Uniform(f64),
    /// One entry per facility, in facility order
    PerFacility(Vec<f64>),
    /// Capacity of the chargers already installed at each facility
    FromChargers(ChargerSpec),
}

impl FacilityCapacity {
    pub fn for_facility(&self, index: usize, facility: &Facility) -> f64 {
        match self {
            FacilityCapacity::Uniform(capacity) => *capacity,
            FacilityCapacity::PerFacility(capacities) => capacities[index],
            FacilityCapacity::FromChargers(chargers) => facility.existing_capacity(chargers),
        }
    }

    fn validate(&self, num_facilities: usize) -> Result<(), ConfigurationError> {
        match self {
            FacilityCapacity::Uniform(capacity) => check_non_negative("capacity", *capacity),
            FacilityCapacity::PerFacility(capacities) => {
                if capacities.len() != num_facilities {
                    return Err(ConfigurationError::DimensionMismatch {
                        table: "capacity",
                        expected: num_facilities,
                        actual: capacities.len(),
                    });
                }
                capacities
                    .iter()
                    .try_for_each(|capacity| check_non_negative("capacity", *capacity))
            }
            FacilityCapacity::FromChargers(chargers) => chargers.validate(),
        }
    }
}

/// Per-unit cost of shipping from a facility to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingCost {
    /// Euclidean distance times a per-unit-distance factor
    Euclidean { cost_per_distance: f64 },
    /// Externally supplied table, customer-major: `table[customer][facility]`
    Table(Vec<Vec<f64>>),
}

impl Default for ShippingCost {
    fn default() -> Self {
        ShippingCost::Euclidean {
            cost_per_distance: 1.0,
        }
    }
}

/// Model variant selected for a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Variant {
    /// Binary open indicator, assignment fractions in [0, 1]
    Uncapacitated { setup_cost: SetupCost },
    /// Binary open indicator, assignment flows bounded by a fixed capacity
    Capacitated {
        setup_cost: SetupCost,
        capacity: FacilityCapacity,
    },
    /// Integer slow/fast charger counts on top of the committed chargers
    ChargerBuildOut { chargers: ChargerSpec },
}

/// Tag of a [`Variant`], used in logs and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VariantKind {
    Uncapacitated,
    Capacitated,
    ChargerBuildOut,
}

impl Variant {
    pub fn kind(&self) -> VariantKind {
        match self {
            Variant::Uncapacitated { .. } => VariantKind::Uncapacitated,
            Variant::Capacitated { .. } => VariantKind::Capacitated,
            Variant::ChargerBuildOut { .. } => VariantKind::ChargerBuildOut,
        }
    }

    /// Variants that carry a binary open indicator per facility
    pub fn has_open_indicator(&self) -> bool {
        !matches!(self, Variant::ChargerBuildOut { .. })
    }
}

/// Immutable input of one solve
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningProblem {
    pub facilities: Vec<Facility>,
    pub customers: Vec<Customer>,
    pub variant: Variant,
    pub shipping: ShippingCost,
}

impl PlanningProblem {
    pub fn new(facilities: Vec<Facility>, customers: Vec<Customer>, variant: Variant) -> Self {
        Self {
            facilities,
            customers,
            variant,
            shipping: ShippingCost::default(),
        }
    }

    pub fn with_shipping(mut self, shipping: ShippingCost) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn num_facilities(&self) -> usize {
        self.facilities.len()
    }

    pub fn num_customers(&self) -> usize {
        self.customers.len()
    }

    pub fn total_demand(&self) -> f64 {
        crate::domain::total_demand(&self.customers)
    }

    /// Per-unit shipping cost between a customer and a facility
    pub fn shipping_cost(&self, customer: usize, facility: usize) -> f64 {
        match &self.shipping {
            ShippingCost::Euclidean { cost_per_distance } => {
                let from = &self.customers[customer].location;
                let to = &self.facilities[facility].location;
                cost_per_distance * from.distance_to(to)
            }
            ShippingCost::Table(table) => table[customer][facility],
        }
    }

    /// Capacity of `facility` when open; `None` outside the capacitated variant
    pub fn facility_capacity(&self, facility: usize) -> Option<f64> {
        match &self.variant {
            Variant::Capacitated { capacity, .. } => {
                Some(capacity.for_facility(facility, &self.facilities[facility]))
            }
            _ => None,
        }
    }

    /// Check every precondition of model construction
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.facilities.is_empty() {
            return Err(ConfigurationError::NoFacilities);
        }
        for (index, facility) in self.facilities.iter().enumerate() {
            facility.validate(index)?;
        }
        for (index, customer) in self.customers.iter().enumerate() {
            customer.validate(index)?;
        }

        match &self.variant {
            Variant::Uncapacitated { setup_cost } => setup_cost.validate(self.num_facilities())?,
            Variant::Capacitated {
                setup_cost,
                capacity,
            } => {
                setup_cost.validate(self.num_facilities())?;
                capacity.validate(self.num_facilities())?;
            }
            Variant::ChargerBuildOut { chargers } => chargers.validate()?,
        }

        match &self.shipping {
            ShippingCost::Euclidean { cost_per_distance } => {
                check_non_negative("cost_per_distance", *cost_per_distance)?
            }
            ShippingCost::Table(table) => {
                if table.len() != self.num_customers() {
                    return Err(ConfigurationError::DimensionMismatch {
                        table: "shipping_cost",
                        expected: self.num_customers(),
                        actual: table.len(),
                    });
                }
                for row in table {
                    if row.len() != self.num_facilities() {
                        return Err(ConfigurationError::DimensionMismatch {
                            table: "shipping_cost",
                            expected: self.num_facilities(),
                            actual: row.len(),
                        });
                    }
                    row.iter()
                        .try_for_each(|cost| check_non_negative("shipping_cost", *cost))?;
                }
            }
        }
        Ok(())
    }
}
