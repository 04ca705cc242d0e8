pub mod system;
pub mod dashboard;
pub mod query;
