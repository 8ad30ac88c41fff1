//! Session persistence: repository port, store adapter and best-effort writes.

pub mod best_effort;
pub mod repository;
pub mod service;
