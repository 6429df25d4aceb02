//! Cross-cutting service plumbing shared by all Roomlet services:
//! health endpoints, request-id middleware, tracing setup, serde helpers.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
