//! dialmon server: polls vendor telephony endpoints, normalizes the
//! payloads, appends them to the metric store, and serves the REST
//! trigger/query surface.

pub mod api;
pub mod app;
pub mod collector;
pub mod config;
pub mod logging;
pub mod scheduler;
pub mod state;
