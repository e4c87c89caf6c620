pub mod cli;
pub mod cloud;
pub mod commands;
pub mod config;
pub mod converters;
pub mod error;
pub mod loader;
pub mod models;
pub mod telemetry;
pub mod writer;

pub use error::{Result, Vsi2wmError};
