//! Analytics sink port.

pub mod repository;
