//! # SixDoF Relay Library
//!
//! Fly the active vehicle with a 3D mouse.
//!
//! This library relays motion from a 6-degree-of-freedom input device into
//! bounded manual control commands, delivered at a fixed rate to whichever
//! vehicle is currently active.

pub mod config;
pub mod error;
pub mod device;
pub mod relay;
pub mod vehicle;
