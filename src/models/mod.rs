//! Wire-level data models for the screenshot store.
//!
//! These types shape the JSON surface of the service; they serialize
//! naturally via `serde` and carry no storage logic.

pub mod screenshot;
