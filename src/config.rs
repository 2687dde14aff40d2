use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use validator::Validate;

use crate::domain::ChargerSpec;
use crate::optimizer::{
    FacilityCapacity, SetupCost, ShippingCost, SolverSettings, Variant, VariantKind,
};
use crate::planner::FailurePolicy;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub chargers: ChargersConfig,
    #[validate(nested)]
    pub solver: SolverConfig,
    #[validate(nested)]
    pub model: ModelConfig,
    pub data: DataConfig,
    #[validate(nested)]
    pub planning: PlanningConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChargersConfig {
    #[validate(range(min = 0.0))]
    pub slow_capacity: f64,
    #[validate(range(min = 0.0))]
    pub fast_capacity: f64,
    #[validate(range(min = 0.0))]
    pub slow_cost: f64,
    #[validate(range(min = 0.0))]
    pub fast_cost_multiplier: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SolverConfig {
    #[validate(range(min = 1))]
    pub time_limit_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModelConfig {
    pub variant: VariantKind,
    #[validate(range(min = 0.0))]
    pub setup_cost: f64,
    /// Where the capacitated variant takes facility capacities from
    #[serde(default)]
    pub capacity_source: CapacitySource,
    /// Capacity of every facility for `capacity_source = "uniform"`
    #[validate(range(min = 0.0))]
    pub facility_capacity: f64,
    /// One capacity per facility for `capacity_source = "per_facility"`
    #[serde(default)]
    pub facility_capacities: Vec<f64>,
    #[validate(range(min = 0.0))]
    pub cost_per_distance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacitySource {
    #[default]
    Uniform,
    PerFacility,
    /// Capacity of the chargers installed at each facility
    FromChargers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub facilities: PathBuf,
    pub demand: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanningConfig {
    #[validate(length(min = 1))]
    pub periods: Vec<String>,
    /// Periods whose results enter the submission; empty means all.
    /// Other periods only seed the infrastructure of later ones.
    #[serde(default)]
    pub submit_periods: Vec<String>,
    pub on_failure: FailurePolicy,
    pub report_sample: usize,
}

impl PlanningConfig {
    pub fn submits(&self, period: &str) -> bool {
        self.submit_periods.is_empty() || self.submit_periods.iter().any(|p| p == period)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("FLP__").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Self = figment.extract()?;
        cfg.validate()?;
        if let Some(unknown) = cfg
            .planning
            .submit_periods
            .iter()
            .find(|p| !cfg.planning.periods.contains(p))
        {
            anyhow::bail!("submit period '{unknown}' is not a planned period");
        }
        Ok(cfg)
    }

    pub fn charger_spec(&self) -> ChargerSpec {
        ChargerSpec::from_base_cost(
            self.chargers.slow_capacity,
            self.chargers.fast_capacity,
            self.chargers.slow_cost,
            self.chargers.fast_cost_multiplier,
        )
    }

    pub fn variant(&self) -> Variant {
        let setup_cost = SetupCost::Uniform(self.model.setup_cost);
        match self.model.variant {
            VariantKind::Uncapacitated => Variant::Uncapacitated { setup_cost },
            VariantKind::Capacitated => Variant::Capacitated {
                setup_cost,
                capacity: match self.model.capacity_source {
                    CapacitySource::Uniform => FacilityCapacity::Uniform(self.model.facility_capacity),
                    CapacitySource::PerFacility => {
                        FacilityCapacity::PerFacility(self.model.facility_capacities.clone())
                    }
                    CapacitySource::FromChargers => FacilityCapacity::FromChargers(self.charger_spec()),
                },
            },
            VariantKind::ChargerBuildOut => Variant::ChargerBuildOut {
                chargers: self.charger_spec(),
            },
        }
    }

    pub fn shipping(&self) -> ShippingCost {
        ShippingCost::Euclidean {
            cost_per_distance: self.model.cost_per_distance,
        }
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            time_limit: self.solver.time_limit_seconds.map(Duration::from_secs),
        }
    }
}
