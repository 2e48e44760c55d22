//! # Active Vehicle Tracker
//!
//! In-process record of the active vehicle. Changes are published on a
//! `tokio::sync::watch` channel so a relay can follow them.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::{ActiveVehicleSource, Vehicle};

/// Value carried on the active-vehicle channel.
pub type ActiveVehicle = Option<Arc<dyn Vehicle>>;

/// Tracks the active vehicle and notifies subscribers when it changes.
#[derive(Debug)]
pub struct ActiveVehicleTracker {
    sender: watch::Sender<ActiveVehicle>,
}

impl Default for ActiveVehicleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveVehicleTracker {
    /// Creates a tracker with no active vehicle.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Makes `vehicle` the active vehicle and notifies all subscribers.
    ///
    /// Setting the same vehicle again still notifies.
    pub fn set_active(&self, vehicle: ActiveVehicle) {
        match &vehicle {
            Some(v) => info!("Active vehicle set to {} (id {})", v.name(), v.id()),
            None => info!("Active vehicle cleared"),
        }
        self.sender.send_replace(vehicle);
    }

    /// Returns a receiver that observes every later change.
    pub fn subscribe(&self) -> watch::Receiver<ActiveVehicle> {
        self.sender.subscribe()
    }
}

impl ActiveVehicleSource for ActiveVehicleTracker {
    fn active_vehicle(&self) -> Option<Arc<dyn Vehicle>> {
        self.sender.borrow().clone()
    }
}
