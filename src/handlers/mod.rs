//! HTTP handlers for profiles, prescriptions and service probes.

pub mod common;
pub mod prescriptions;
pub mod profiles;
