//! Core system layer: the component contract, settings, security controls,
//! the orchestrator that routes queries, metrics, and business reporting.

pub mod component;
pub mod config;
pub mod security;
pub mod orchestrator;
pub mod metrics;
pub mod business_intelligence;
