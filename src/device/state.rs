//! # Device State Module
//!
//! Holds the latest normalized sample and the device activity flag behind a
//! single lock, so the emission loop always reads a consistent snapshot.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

use super::sample::{DeviceSample, ManualControlCommand, AXIS_COUNT};

#[derive(Debug, Default)]
struct Snapshot {
    sample: DeviceSample,
    active: bool,
}

/// Shared device state written by sample ingestion and read once per tick.
#[derive(Debug)]
pub struct DeviceState {
    snapshot: Mutex<Snapshot>,
    normalization_scale: f64,
}

impl DeviceState {
    /// Creates an inactive device state with all axes at zero.
    pub fn new(normalization_scale: f64) -> Self {
        Self {
            snapshot: Mutex::new(Snapshot::default()),
            normalization_scale,
        }
    }

    /// Returns the divisor applied to raw readings.
    pub fn normalization_scale(&self) -> f64 {
        self.normalization_scale
    }

    /// Stores a raw motion event.
    ///
    /// Events with fewer than six values are dropped without touching the
    /// stored state. Returns whether the event was accepted.
    pub fn ingest(&self, raw: &[f32]) -> bool {
        let Some(sample) = DeviceSample::from_raw(raw, self.normalization_scale) else {
            trace!("Dropping short motion sample ({} of {} values)", raw.len(), AXIS_COUNT);
            return false;
        };

        let mut snapshot = self.lock();
        snapshot.sample = sample;
        snapshot.active = true;
        true
    }

    /// Whether at least one well-formed sample has been received.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Returns the stored, unbounded sample.
    pub fn sample(&self) -> DeviceSample {
        self.lock().sample
    }

    /// Bounds the stored axes in place and returns them as a command.
    ///
    /// Returns `None` while the device has never produced a sample.
    pub fn clamped_command(&self) -> Option<ManualControlCommand> {
        let mut snapshot = self.lock();
        if !snapshot.active {
            return None;
        }

        let command = snapshot.sample.to_command();
        snapshot.sample = DeviceSample {
            x: command.x,
            y: command.y,
            z: command.z,
            a: command.a,
            b: command.b,
            c: command.c,
        };
        Some(command)
    }

    // A panic while holding the lock cannot leave a half-written snapshot,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: f64 = 0.075;

    #[test]
    fn test_starts_inactive() {
        let state = DeviceState::new(SCALE);
        assert!(!state.is_active());
        assert_eq!(state.sample(), DeviceSample::default());
        assert!(state.clamped_command().is_none());
        assert_eq!(state.normalization_scale(), SCALE);
    }

    #[test]
    fn test_zero_sample_activates() {
        let state = DeviceState::new(SCALE);
        assert!(state.ingest(&[0.0; 6]));
        assert!(state.is_active());
        assert_eq!(state.clamped_command(), Some(ManualControlCommand::default()));
    }

    #[test]
    fn test_short_sample_leaves_state_unchanged() {
        let state = DeviceState::new(SCALE);
        assert!(!state.ingest(&[0.01, 0.02, 0.03]));
        assert!(!state.is_active());
        assert_eq!(state.sample(), DeviceSample::default());

        assert!(state.ingest(&[0.001, 0.002, 0.0, 0.0, 0.0, 0.0]));
        let before = state.sample();

        assert!(!state.ingest(&[0.05; 5]));
        assert!(state.is_active());
        assert_eq!(state.sample(), before);
    }

    #[test]
    fn test_active_flag_is_monotonic() {
        let state = DeviceState::new(SCALE);
        state.ingest(&[0.0; 6]);
        state.ingest(&[]);
        state.ingest(&[0.0; 2]);
        assert!(state.is_active());
    }

    #[test]
    fn test_latest_sample_wins() {
        let state = DeviceState::new(SCALE);
        state.ingest(&[0.0, 0.0003, 0.0, 0.0, 0.0, 0.0]);
        state.ingest(&[0.0, 0.0006, 0.0, 0.0, 0.0, 0.0]);

        let sample = state.sample();
        assert!((sample.x - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_clamped_command_writes_back() {
        let state = DeviceState::new(SCALE);
        state.ingest(&[0.0375, -0.0375, 0.0, 0.0, 0.0, 0.0]);
        assert!(state.sample().y > 1.0);

        let command = state.clamped_command().unwrap();
        assert_eq!(command.x, -1.0);
        assert_eq!(command.y, 1.0);
        assert_eq!(state.sample().y, 1.0);
        assert_eq!(state.clamped_command(), Some(command));
    }

    #[test]
    fn test_concurrent_ingest_keeps_snapshot_consistent() {
        use std::sync::Arc;
        use std::thread;

        let state = Arc::new(DeviceState::new(1.0));
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    let v = 0.001 * (i as f32 + 1.0);
                    for _ in 0..500 {
                        state.ingest(&[v; 6]);
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let axes = state.sample().axes();
            assert!(axes.iter().all(|&value| value == axes[0]), "torn sample: {:?}", axes);
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }
}
