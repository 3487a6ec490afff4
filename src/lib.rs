//! Debug API gateway for TiDB cluster components
//!
//! Forwards catalogued debug requests to cluster members and hands the
//! response back through a one-time download token.

pub mod api;
pub mod catalog;
pub mod models;
pub mod services;
pub mod utils;
