//! Facility-location planning for EV charging infrastructure.
//!
//! Problems are formulated as mixed-integer linear programs
//! ([`optimizer`]), solved through a pluggable engine boundary, and turned
//! into truncated, checked result artifacts ([`postprocess`]). The
//! [`planner`] chains solves over several periods.

pub mod config;
pub mod domain;
pub mod optimizer;
pub mod planner;
pub mod postprocess;
pub mod repo;
pub mod telemetry;
