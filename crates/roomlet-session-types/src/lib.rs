//! Session types shared across Roomlet services.
//!
//! Provides JWT session-token validation and the session cookie builders.

pub mod cookie;
pub mod token;
