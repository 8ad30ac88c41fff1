//! Client-side chat controller and the ports it drives.

pub mod controller;
pub mod transport;
pub mod typing;
pub mod utf8;
