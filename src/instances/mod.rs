//! Component instances for the manufacturing intelligence system
//!
//! Each instance wraps a `BaseComponent` and implements the `Component`
//! trait so the orchestrator can start, query and measure it.

pub mod common;
pub mod reasoner;
pub mod rag_engine;
pub mod cv_testing;

// Re-export instances for convenience
pub use reasoner::ManufacturingReasoner;
pub use rag_engine::AgenticRagEngine;
pub use cv_testing::DefectTester;
