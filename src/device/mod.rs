//! # Device Module
//!
//! 6-DOF input device handling.
//!
//! This module handles:
//! - Normalizing raw motion events into vehicle-frame axes
//! - Bounding axes into manual control commands
//! - Sharing the latest sample between the driver thread and the relay

pub mod sample;
pub mod state;
