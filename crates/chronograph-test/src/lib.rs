//! Chronograph Test Harness - Simulation and end-to-end validation
//!
//! This crate provides:
//! - Simulated acquisition devices with drifting clocks and known truth
//! - Simulated recording sessions linking devices by mapping records
//! - End-to-end fixtures for conversion scenarios

pub mod device_simulator;
pub mod integration;

pub use device_simulator::*;
pub use integration::*;
