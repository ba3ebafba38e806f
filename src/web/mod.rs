//! HTTP surface for the lecture aggregator.

pub mod error;
pub mod lectures;
pub mod middleware;
pub mod routes;

pub use routes::*;
