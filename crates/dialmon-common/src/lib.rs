//! Shared types for the dialmon telephony metrics pipeline.

pub mod types;
