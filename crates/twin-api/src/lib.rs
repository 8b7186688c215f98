//! Battery twin prediction service
//!
//! Serves SOH/RUL predictions and trip simulations over HTTP from a model
//! registry loaded once at startup.

pub mod api;
pub mod config;
