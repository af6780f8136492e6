//! Common test utilities for folio integration tests
//!
//! Provides the worked portfolio scenario as a fixture, a store wrapper
//! that counts mutations and injects failures, and small query helpers.

#![allow(dead_code)]

pub mod counting;
pub mod scenario;

pub use counting::CountingStore;
pub use scenario::{
    canonical, design, gate_settings, murals, names_in, scenario_store, seed_scenario,
    tagged_in, SCENARIO,
};
