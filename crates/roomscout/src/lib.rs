//! Property discovery for rental listings: structured filters, free-text location
//! search, and a single selection shared between a grid view and a map view.

pub mod config;
pub mod discovery;
pub mod error;
pub mod telemetry;
