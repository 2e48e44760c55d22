//! # Device Sample Module
//!
//! Converts raw 3D mouse motion into normalized 6-DOF axis values and
//! bounds them into manual control commands.
//!
//! ## Axis Wiring
//!
//! The driver reports six values per motion event. Their order does not
//! match the vehicle frame, so they are permuted during normalization:
//!
//! | Output | Raw index | Description |
//! |--------|-----------|-------------|
//! | x | 1 | Forward/backward translation |
//! | y | 0 | Left/right translation |
//! | z | 2 | Up/down translation |
//! | a | 4 | Roll |
//! | b | 3 | Pitch |
//! | c | 5 | Yaw |
//!
//! ## Usage
//!
//! ```
//! use sixdof_relay::device::sample::DeviceSample;
//!
//! let sample = DeviceSample::from_raw(&[0.0375, 0.0, 0.0, 0.0, 0.0, 0.0], 0.075).unwrap();
//! assert!((sample.y - 50.0).abs() < 1e-3);
//!
//! let command = sample.to_command();
//! assert_eq!(command.y, 1.0);
//! ```

use serde::Serialize;

/// Number of values a well-formed motion event carries.
pub const AXIS_COUNT: usize = 6;

/// Gain applied before dividing by the normalization scale.
pub const AXIS_GAIN: f64 = 100.0;

/// Lower bound of a control command axis.
pub const COMMAND_MIN: f64 = -1.0;

/// Upper bound of a control command axis.
pub const COMMAND_MAX: f64 = 1.0;

/// Raw index feeding each output axis, in `x, y, z, a, b, c` order.
pub const AXIS_PERMUTATION: [usize; AXIS_COUNT] = [1, 0, 2, 4, 3, 5];

/// Normalized 6-DOF motion, not yet bounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Roll
    pub a: f64,
    /// Pitch
    pub b: f64,
    /// Yaw
    pub c: f64,
}

/// One manual control command with every axis inside `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ManualControlCommand {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Clamps a single axis value to the command range.
///
/// NaN passes through unchanged, matching `f64::clamp`.
#[inline]
#[must_use]
pub fn clamp_axis(value: f64) -> f64 {
    value.clamp(COMMAND_MIN, COMMAND_MAX)
}

/// Scales one raw reading into normalized units.
#[inline]
#[must_use]
pub fn normalize_axis(raw: f32, normalization_scale: f64) -> f64 {
    f64::from(raw) * AXIS_GAIN / normalization_scale
}

impl DeviceSample {
    /// Builds a sample from a raw motion event.
    ///
    /// Returns `None` when fewer than [`AXIS_COUNT`] values are supplied.
    /// Extra trailing values are ignored.
    #[must_use]
    pub fn from_raw(raw: &[f32], normalization_scale: f64) -> Option<Self> {
        if raw.len() < AXIS_COUNT {
            return None;
        }

        let axis = |output: usize| normalize_axis(raw[AXIS_PERMUTATION[output]], normalization_scale);

        Some(Self {
            x: axis(0),
            y: axis(1),
            z: axis(2),
            a: axis(3),
            b: axis(4),
            c: axis(5),
        })
    }

    /// Returns the axes in `x, y, z, a, b, c` order.
    #[must_use]
    pub fn axes(&self) -> [f64; AXIS_COUNT] {
        [self.x, self.y, self.z, self.a, self.b, self.c]
    }

    /// Bounds every axis independently into a control command.
    #[must_use]
    pub fn to_command(&self) -> ManualControlCommand {
        ManualControlCommand {
            x: clamp_axis(self.x),
            y: clamp_axis(self.y),
            z: clamp_axis(self.z),
            a: clamp_axis(self.a),
            b: clamp_axis(self.b),
            c: clamp_axis(self.c),
        }
    }
}

impl ManualControlCommand {
    /// Returns the axes in `x, y, z, a, b, c` order.
    #[must_use]
    pub fn axes(&self) -> [f64; AXIS_COUNT] {
        [self.x, self.y, self.z, self.a, self.b, self.c]
    }
}
