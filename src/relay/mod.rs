//! # Relay Module
//!
//! The 6-DOF relay worker.
//!
//! [`SixDofRelay`] owns the device state, the vehicle binding and a
//! background emission task. Motion samples may arrive from any thread at
//! any rate; the emission task bounds the latest sample and forwards it to
//! the bound vehicle every [`TICK_PERIOD`].
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --first binding--> Running --stop observed--> Stopped
//! ```
//!
//! The worker is not started by construction. The first call to
//! [`SixDofRelay::on_active_vehicle_changed`] (or an explicit
//! [`SixDofRelay::start`]) spawns the emission task, which begins by binding
//! whatever vehicle the [`ActiveVehicleSource`] reports as active.
//! `Stopped` is terminal.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sixdof_relay::relay::SixDofRelay;
//! use sixdof_relay::vehicle::tracker::ActiveVehicleTracker;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let tracker = Arc::new(ActiveVehicleTracker::new());
//!     let relay = SixDofRelay::new(0.075, tracker.clone())?;
//!     relay.follow(tracker.subscribe());
//!
//!     // From the device driver callback:
//!     relay.on_motion_sample(&[0.01, 0.0, 0.0, 0.0, 0.0, 0.0]);
//!
//!     relay.shutdown().await?;
//!     Ok(())
//! }
//! ```

use serde::de::Error as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::DeviceConfig;
use crate::device::state::DeviceState;
use crate::error::{RelayError, Result};
use crate::vehicle::tracker::ActiveVehicle;
use crate::vehicle::{ActiveVehicleSource, Vehicle};

pub mod binding;

use binding::VehicleBinding;

/// Emission period, matching the ~50 Hz native rate of 3D mice.
pub const TICK_PERIOD: Duration = Duration::from_millis(20);

/// Emission task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, emission task not spawned yet.
    Idle,
    /// Emission task is ticking.
    Running,
    /// Stop observed; the relay cannot be restarted.
    Stopped,
}

/// Counters describing relay activity since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayStats {
    /// Emission loop iterations that ran past the stop check.
    pub ticks: u64,
    /// Commands delivered to a bound vehicle.
    pub emissions: u64,
    /// Motion samples stored.
    pub samples_accepted: u64,
    /// Motion samples dropped for having fewer than six values.
    pub samples_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    emissions: AtomicU64,
    samples_accepted: AtomicU64,
    samples_dropped: AtomicU64,
}

#[derive(Debug)]
struct Lifecycle {
    state: WorkerState,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    device: DeviceState,
    binding: Mutex<VehicleBinding>,
    source: Arc<dyn ActiveVehicleSource>,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
    runtime: Handle,
    counters: Counters,
}

/// Relays 3D mouse motion to the active vehicle at a fixed rate.
///
/// Dropping the relay requests a stop; use [`SixDofRelay::shutdown`] to
/// also wait for the emission task to finish.
pub struct SixDofRelay {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SixDofRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SixDofRelay")
            .field("normalization_scale", &self.shared.device.normalization_scale())
            .field("state", &self.state())
            .field("binding", &*lock(&self.shared.binding))
            .finish_non_exhaustive()
    }
}

impl SixDofRelay {
    /// Creates an idle relay.
    ///
    /// The emission task is spawned later on the tokio runtime current at
    /// construction, so this must be called from within a runtime.
    ///
    /// # Errors
    ///
    /// - `Config`: `normalization_scale` is not a positive finite number
    /// - `Runtime`: called outside a tokio runtime
    pub fn new(normalization_scale: f64, source: Arc<dyn ActiveVehicleSource>) -> Result<Self> {
        if !normalization_scale.is_finite() || normalization_scale <= 0.0 {
            return Err(RelayError::Config(toml::de::Error::custom(
                "normalization_scale must be a positive finite number",
            )));
        }

        let runtime = Handle::try_current()
            .map_err(|e| RelayError::Runtime(format!("SixDofRelay needs a tokio runtime: {}", e)))?;

        Ok(Self {
            shared: Arc::new(Shared {
                device: DeviceState::new(normalization_scale),
                binding: Mutex::new(VehicleBinding::default()),
                source,
                lifecycle: Mutex::new(Lifecycle {
                    state: WorkerState::Idle,
                    task: None,
                }),
                cancel: CancellationToken::new(),
                runtime,
                counters: Counters::default(),
            }),
        })
    }

    /// Creates an idle relay from the `[device]` configuration section.
    pub fn from_config(config: &DeviceConfig, source: Arc<dyn ActiveVehicleSource>) -> Result<Self> {
        Self::new(config.normalization_scale, source)
    }

    /// Stores a raw motion event from the device driver.
    ///
    /// Events with fewer than six values are silently dropped. Any
    /// well-formed event marks the device active. Safe to call from any
    /// thread.
    pub fn on_motion_sample(&self, raw: &[f32]) {
        let counter = if self.shared.device.ingest(raw) {
            &self.shared.counters.samples_accepted
        } else {
            &self.shared.counters.samples_dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Rebinds the relay output to `vehicle` and starts the worker if it has
    /// never run.
    ///
    /// Once this returns, the previously bound vehicle receives no further
    /// commands.
    pub fn on_active_vehicle_changed(&self, vehicle: Option<Arc<dyn Vehicle>>) {
        self.shared.on_active_vehicle_changed(vehicle);
    }

    /// Spawns the emission task if the relay is idle.
    pub fn start(&self) {
        self.shared.ensure_started();
    }

    /// Spawns a task that applies every change published on `receiver`.
    ///
    /// The task ends when the relay stops or the sender is dropped.
    pub fn follow(&self, mut receiver: watch::Receiver<ActiveVehicle>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shared.cancel.cancelled() => break,
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            debug!("Active vehicle channel closed");
                            break;
                        }
                        let vehicle = receiver.borrow_and_update().clone();
                        shared.on_active_vehicle_changed(vehicle);
                    }
                }
            }
        })
    }

    /// Requests a stop and waits for the emission task to exit.
    ///
    /// # Errors
    ///
    /// Returns `Worker` if the emission task panicked.
    pub async fn shutdown(&self) -> Result<()> {
        self.shared.cancel.cancel();

        let task = {
            let mut lifecycle = lock(&self.shared.lifecycle);
            if lifecycle.state == WorkerState::Idle {
                lifecycle.state = WorkerState::Stopped;
            }
            lifecycle.task.take()
        };

        match task {
            Some(task) => task.await.map_err(|e| {
                error!("Emission task failed: {}", e);
                RelayError::Worker(format!("emission task failed: {}", e))
            }),
            None => Ok(()),
        }
    }

    /// Current worker lifecycle state.
    pub fn state(&self) -> WorkerState {
        lock(&self.shared.lifecycle).state
    }

    /// Whether at least one well-formed sample has been received.
    pub fn is_device_active(&self) -> bool {
        self.shared.device.is_active()
    }

    /// Id of the bound vehicle, capable or not.
    pub fn bound_vehicle_id(&self) -> Option<u32> {
        lock(&self.shared.binding).vehicle().map(|v| v.id())
    }

    /// Whether commands currently reach a vehicle.
    pub fn is_attached(&self) -> bool {
        lock(&self.shared.binding).is_attached()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> RelayStats {
        let c = &self.shared.counters;
        RelayStats {
            ticks: c.ticks.load(Ordering::Relaxed),
            emissions: c.emissions.load(Ordering::Relaxed),
            samples_accepted: c.samples_accepted.load(Ordering::Relaxed),
            samples_dropped: c.samples_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for SixDofRelay {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

impl Shared {
    fn on_active_vehicle_changed(self: &Arc<Self>, vehicle: Option<Arc<dyn Vehicle>>) {
        self.bind(vehicle);
        self.ensure_started();
    }

    fn bind(&self, vehicle: Option<Arc<dyn Vehicle>>) {
        lock(&self.binding).rebind(vehicle);
    }

    fn ensure_started(self: &Arc<Self>) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.state != WorkerState::Idle || self.cancel.is_cancelled() {
            return;
        }

        lifecycle.state = WorkerState::Running;
        let shared = Arc::clone(self);
        lifecycle.task = Some(self.runtime.spawn(shared.run()));
    }

    async fn run(self: Arc<Self>) {
        info!(
            "Emission loop started ({} ms tick, normalization scale {})",
            TICK_PERIOD.as_millis(),
            self.device.normalization_scale()
        );

        // Pick up whatever vehicle was active before the worker existed. The
        // source is read under the binding lock so a notification that lands
        // meanwhile is applied after this, not overwritten by a stale read.
        {
            let mut binding = lock(&self.binding);
            binding.rebind(self.source.active_vehicle());
        }

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.tick();

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(TICK_PERIOD) => {}
            }
        }

        lock(&self.lifecycle).state = WorkerState::Stopped;
        info!(
            "Emission loop stopped after {} ticks, {} commands delivered",
            self.counters.ticks.load(Ordering::Relaxed),
            self.counters.emissions.load(Ordering::Relaxed)
        );
    }

    fn tick(&self) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let Some(command) = self.device.clamped_command() else {
            return;
        };

        // Delivery happens under the binding lock so a concurrent rebind
        // cannot complete while a command is in flight to the old vehicle.
        if lock(&self.binding).deliver(command) {
            self.counters.emissions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
