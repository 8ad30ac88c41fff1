//! Upstream completion provider abstraction.

pub mod provider;
