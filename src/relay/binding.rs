//! # Vehicle Binding
//!
//! Associates the relay output with the active vehicle's manual control
//! sink. The old sink is always detached before a new vehicle is stored.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::device::sample::ManualControlCommand;
use crate::vehicle::{ManualControl, Vehicle};

/// The bound vehicle and, if it supports manual 6-DOF control, its sink.
#[derive(Default)]
pub struct VehicleBinding {
    vehicle: Option<Arc<dyn Vehicle>>,
    sink: Option<Arc<dyn ManualControl>>,
}

impl fmt::Debug for VehicleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VehicleBinding")
            .field("vehicle", &self.vehicle)
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

impl VehicleBinding {
    /// Replaces the bound vehicle.
    ///
    /// The previous sink is detached first. `None` and vehicles without
    /// manual control leave the binding inert.
    pub fn rebind(&mut self, vehicle: Option<Arc<dyn Vehicle>>) {
        self.detach();

        self.sink = vehicle.clone().and_then(|v| v.manual_control());
        match (&vehicle, self.sink.is_some()) {
            (Some(v), true) => debug!("Attached manual control to {} (id {})", v.name(), v.id()),
            (Some(v), false) => debug!(
                "{} (id {}) does not support manual 6-DOF control, binding is inert",
                v.name(),
                v.id()
            ),
            (None, _) => debug!("No active vehicle, binding is inert"),
        }
        self.vehicle = vehicle;
    }

    /// Drops the current sink. Safe to call when nothing is attached.
    ///
    /// Returns whether a sink was attached.
    pub fn detach(&mut self) -> bool {
        let detached = self.sink.take().is_some();
        if detached {
            if let Some(v) = &self.vehicle {
                debug!("Detached manual control from {} (id {})", v.name(), v.id());
            }
        }
        detached
    }

    /// The bound vehicle, capable or not.
    pub fn vehicle(&self) -> Option<&Arc<dyn Vehicle>> {
        self.vehicle.as_ref()
    }

    /// Whether commands currently reach a vehicle.
    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Sends `command` to the attached sink. Returns whether it was delivered.
    pub fn deliver(&self, command: ManualControlCommand) -> bool {
        match &self.sink {
            Some(sink) => {
                sink.set_manual_6dof_control(command);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::mocks::{PassiveVehicle, RecordingVehicle};

    fn command(x: f64) -> ManualControlCommand {
        ManualControlCommand { x, ..Default::default() }
    }

    #[test]
    fn test_default_is_inert() {
        let binding = VehicleBinding::default();
        assert!(binding.vehicle().is_none());
        assert!(!binding.is_attached());
        assert!(!binding.deliver(command(0.1)));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut binding = VehicleBinding::default();
        assert!(!binding.detach());
        assert!(!binding.detach());

        binding.rebind(Some(RecordingVehicle::new(1)));
        assert!(binding.detach());
        assert!(!binding.detach());
        assert!(binding.vehicle().is_some());
    }

    #[test]
    fn test_capable_vehicle_receives_commands() {
        let vehicle = RecordingVehicle::new(1);
        let mut binding = VehicleBinding::default();
        binding.rebind(Some(vehicle.clone()));

        assert!(binding.is_attached());
        assert!(binding.deliver(command(0.5)));
        assert_eq!(vehicle.received(), vec![command(0.5)]);
    }

    #[test]
    fn test_incapable_vehicle_is_stored_but_inert() {
        let mut binding = VehicleBinding::default();
        binding.rebind(Some(Arc::new(PassiveVehicle { id: 3 })));

        assert_eq!(binding.vehicle().map(|v| v.id()), Some(3));
        assert!(!binding.is_attached());
        assert!(!binding.deliver(command(0.5)));
    }

    #[test]
    fn test_rebind_moves_delivery_to_new_vehicle() {
        let a = RecordingVehicle::new(1);
        let b = RecordingVehicle::new(2);
        let mut binding = VehicleBinding::default();

        binding.rebind(Some(a.clone()));
        binding.deliver(command(0.1));
        binding.rebind(Some(b.clone()));
        binding.deliver(command(0.2));

        assert_eq!(a.received(), vec![command(0.1)]);
        assert_eq!(b.received(), vec![command(0.2)]);
    }

    #[test]
    fn test_rebind_to_passive_detaches_previous() {
        let a = RecordingVehicle::new(1);
        let mut binding = VehicleBinding::default();

        binding.rebind(Some(a.clone()));
        binding.rebind(Some(Arc::new(PassiveVehicle { id: 2 })));
        binding.deliver(command(0.3));

        assert_eq!(a.count(), 0);
    }

    #[test]
    fn test_rebind_to_none_clears_vehicle() {
        let a = RecordingVehicle::new(1);
        let mut binding = VehicleBinding::default();

        binding.rebind(Some(a.clone()));
        binding.rebind(None);

        assert!(binding.vehicle().is_none());
        assert!(!binding.deliver(command(1.0)));
        assert_eq!(a.count(), 0);
    }
}
