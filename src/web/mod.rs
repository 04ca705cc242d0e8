//! HTTP dashboard API served by `dashboard --serve`

pub mod handlers;
pub mod models;
pub mod server;
