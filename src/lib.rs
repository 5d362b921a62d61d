pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod log;
pub mod models;
pub mod runner;
pub mod transport;

pub use error::{FleetError, Result};
