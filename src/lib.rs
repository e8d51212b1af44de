//! Binnacle: time tracking of activities against project roles, vacation
//! requests, evidences and approvals.

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod repository;
pub mod services;
pub mod store;
pub mod usecases;
pub mod validators;

#[cfg(test)]
pub(crate) mod testing;

pub use app::App;
pub use error::{BinnacleError, Result};
