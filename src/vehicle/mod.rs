//! # Vehicle Module
//!
//! Interfaces between the relay and the vehicle-management side.
//!
//! A [`Vehicle`] is any session that can become the active vehicle. Only
//! vehicles that return a [`ManualControl`] sink from
//! [`Vehicle::manual_control`] receive 6-DOF commands; the others are bound
//! but inert.

use std::fmt;
use std::sync::Arc;

use crate::device::sample::ManualControlCommand;

pub mod recorder;
pub mod tracker;

/// Command input of a vehicle that accepts manual 6-DOF control.
///
/// Commands are delivered while the relay holds its binding lock.
/// Implementations must not call back into the relay (for example
/// `SixDofRelay::on_active_vehicle_changed`) from
/// [`set_manual_6dof_control`](ManualControl::set_manual_6dof_control);
/// the lock is not reentrant and the emission task would deadlock.
pub trait ManualControl: Send + Sync {
    /// Applies one bounded command. Called from the relay's emission task.
    fn set_manual_6dof_control(&self, command: ManualControlCommand);
}

/// A vehicle session known to the vehicle manager.
pub trait Vehicle: Send + Sync {
    /// Numeric system id of the vehicle.
    fn id(&self) -> u32;

    /// Human-readable name for logs.
    fn name(&self) -> String {
        format!("vehicle-{}", self.id())
    }

    /// The manual 6-DOF command sink, if this vehicle supports it.
    fn manual_control(self: Arc<Self>) -> Option<Arc<dyn ManualControl>> {
        None
    }
}

impl fmt::Debug for dyn Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vehicle")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// Answers "which vehicle is active right now".
///
/// The relay queries this once at worker start-up while holding its binding
/// lock, so implementations must not call back into the relay.
#[cfg_attr(test, mockall::automock)]
pub trait ActiveVehicleSource: Send + Sync {
    fn active_vehicle(&self) -> Option<Arc<dyn Vehicle>>;
}

/// Source that never reports an active vehicle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActiveVehicle;

impl ActiveVehicleSource for NoActiveVehicle {
    fn active_vehicle(&self) -> Option<Arc<dyn Vehicle>> {
        None
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Vehicle that records every command it receives.
    #[derive(Clone)]
    pub struct RecordingVehicle {
        pub id: u32,
        pub commands: Arc<Mutex<Vec<ManualControlCommand>>>,
    }

    impl RecordingVehicle {
        pub fn new(id: u32) -> Arc<Self> {
            Arc::new(Self {
                id,
                commands: Arc::new(Mutex::new(Vec::new())),
            })
        }

        pub fn received(&self) -> Vec<ManualControlCommand> {
            self.commands.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.commands.lock().unwrap().len()
        }
    }

    impl ManualControl for RecordingVehicle {
        fn set_manual_6dof_control(&self, command: ManualControlCommand) {
            self.commands.lock().unwrap().push(command);
        }
    }

    impl Vehicle for RecordingVehicle {
        fn id(&self) -> u32 {
            self.id
        }

        fn manual_control(self: Arc<Self>) -> Option<Arc<dyn ManualControl>> {
            Some(self)
        }
    }

    /// Vehicle without manual 6-DOF support.
    pub struct PassiveVehicle {
        pub id: u32,
    }

    impl Vehicle for PassiveVehicle {
        fn id(&self) -> u32 {
            self.id
        }
    }
}
