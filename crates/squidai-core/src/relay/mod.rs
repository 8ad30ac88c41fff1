//! Rate-limited streaming relay in front of the completion provider.

pub mod cooldown;
pub mod service;
