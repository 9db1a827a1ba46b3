//! GlucoGuide: turns blood-glucose readings and a dietary preference into a
//! generated meal plan, with alerting and a local history of readings and
//! plans.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod plans;
pub mod readings;
pub mod sensor;
pub mod session;
pub mod state;

pub use state::AppState;
