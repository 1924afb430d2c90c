//! Putt assistance in rust
//!
//! Places a ball and a cup, given as WGS84 positions, on a surveyed green
//! and hands them to a putt solver in the green's own frame.

pub mod backend;
pub mod common;
pub mod config;
pub mod math;
pub mod registry;
pub mod solver;
pub mod transform;
