//! Source adapters producing observations for the reconciliation engine.

pub mod local;
pub mod streaming;
