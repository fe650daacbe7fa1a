//! Device registry: the single owner of device state.
//!
//! Each device sits behind its own mutex so that user intents, controller
//! reports and phase timers serialize per device without blocking each other
//! across devices. Readers get cloned snapshots. Every effective change is
//! broadcast as a [`DeviceChange`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;

use roomhub_domain::device::{Device, DeviceKind};
use roomhub_domain::error::{NotFoundError, RoomHubError};
use roomhub_domain::id::{DeviceId, RoomId};
use roomhub_domain::section::Section;
use roomhub_domain::time::now;

/// Who caused a device change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    User,
    Controller,
    Timer,
}

/// Snapshot of a device right after it changed.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceChange {
    pub device: Device,
    pub origin: ChangeOrigin,
}

#[derive(Default)]
struct Inner {
    order: Vec<DeviceId>,
    devices: HashMap<DeviceId, Arc<Mutex<Device>>>,
}

pub struct DeviceRegistry {
    inner: RwLock<Inner>,
    changes: broadcast::Sender<DeviceChange>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

impl DeviceRegistry {
    /// Create an empty registry whose change channel buffers `capacity` changes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            inner: RwLock::new(Inner::default()),
            changes,
        }
    }

    /// Create a registry holding `devices`, in order.
    #[must_use]
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let registry = Self::default();
        for device in devices {
            registry.upsert(device);
        }
        registry
    }

    /// Subscribe to changes made after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceChange> {
        self.changes.subscribe()
    }

    fn entry(&self, id: &DeviceId) -> Option<Arc<Mutex<Device>>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.devices.get(id).map(Arc::clone)
    }

    fn snapshots(&self, keep: impl Fn(&Device) -> bool) -> Vec<Device> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|id| inner.devices.get(id))
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .filter(|device| keep(device))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<Device> {
        self.entry(id)
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Insert a device, or replace the one with the same id.
    pub fn upsert(&self, device: Device) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = inner.devices.get(&device.id) {
            *entry.lock().unwrap_or_else(PoisonError::into_inner) = device;
            return;
        }
        inner.order.push(device.id.clone());
        inner
            .devices
            .insert(device.id.clone(), Arc::new(Mutex::new(device)));
    }

    #[must_use]
    pub fn all_in_room(&self, room: RoomId) -> Vec<Device> {
        self.snapshots(|device| device.id.room == room)
    }

    #[must_use]
    pub fn all_of_type(&self, kind: DeviceKind) -> Vec<Device> {
        self.snapshots(|device| device.kind() == kind)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Device> {
        self.snapshots(|_| true)
    }

    /// Ids of the devices of `kind` in one section of a room, in
    /// declaration order.
    #[must_use]
    pub fn find(&self, room: RoomId, section: Section, kind: DeviceKind) -> Vec<DeviceId> {
        self.snapshots(|device| {
            device.id.room == room && device.id.section == section && device.kind() == kind
        })
        .into_iter()
        .map(|device| device.id)
        .collect()
    }

    /// Mutate one device under its lock.
    ///
    /// When the closure changes the device, `last_updated` is refreshed and
    /// the new snapshot is broadcast with `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`RoomHubError::NotFound`] when no device has this id.
    pub fn update<R>(
        &self,
        id: &DeviceId,
        origin: ChangeOrigin,
        f: impl FnOnce(&mut Device) -> R,
    ) -> Result<R, RoomHubError> {
        let entry = self.entry(id).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: id.to_string(),
        })?;
        let mut device = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = device.state.clone();
        let result = f(&mut device);
        if device.state != before {
            device.last_updated = now();
            // only fails without receivers
            let _ = self.changes.send(DeviceChange {
                device: device.clone(),
                origin,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomhub_domain::device::{DeviceState, Dimmer, Switch};

    fn room(n: u32) -> RoomId {
        RoomId::try_from(n).unwrap()
    }

    fn light(room_id: RoomId, section: Section, name: &str) -> Device {
        Device::builder()
            .id(DeviceId::new(room_id, section, name))
            .state(DeviceState::Dimmer(Dimmer::new(50, false)))
            .build()
            .unwrap()
    }

    fn heater(room_id: RoomId) -> Device {
        Device::builder()
            .id(DeviceId::new(room_id, Section::Bathroom, "ScaldaOnOff"))
            .state(DeviceState::Switch(Switch::new(false)))
            .build()
            .unwrap()
    }

    #[test]
    fn should_return_snapshot_of_known_device() {
        let registry = DeviceRegistry::with_devices([light(room(1), Section::Bedroom, "Totale")]);
        let id = DeviceId::new(room(1), Section::Bedroom, "Totale");
        assert_eq!(registry.get(&id).unwrap().id, id);
        assert!(
            registry
                .get(&DeviceId::new(room(1), Section::Living, "Totale"))
                .is_none()
        );
    }

    #[test]
    fn should_filter_by_room_and_type_in_declaration_order() {
        let registry = DeviceRegistry::with_devices([
            light(room(1), Section::Bedroom, "Totale"),
            heater(room(1)),
            light(room(2), Section::Bedroom, "Totale"),
            light(room(1), Section::Bedroom, "Letto"),
        ]);
        let names: Vec<_> = registry
            .all_in_room(room(1))
            .into_iter()
            .map(|d| d.id.name)
            .collect();
        assert_eq!(names, ["Totale", "ScaldaOnOff", "Letto"]);
        assert_eq!(registry.all_of_type(DeviceKind::Dimmer).len(), 3);
        assert_eq!(registry.all_of_type(DeviceKind::Switch).len(), 1);
    }

    #[test]
    fn should_replace_device_on_upsert_without_duplicating() {
        let registry = DeviceRegistry::with_devices([heater(room(1))]);
        let mut replacement = heater(room(1));
        replacement.label = "Heater".to_string();
        registry.upsert(replacement);
        let all = registry.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].label, "Heater");
    }

    #[test]
    fn should_return_not_found_when_updating_unknown_device() {
        let registry = DeviceRegistry::default();
        let id = DeviceId::new(room(1), Section::Bedroom, "Totale");
        let result = registry.update(&id, ChangeOrigin::User, |_| ());
        assert!(matches!(result, Err(RoomHubError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_broadcast_effective_changes_only() {
        let registry = DeviceRegistry::with_devices([heater(room(1))]);
        let mut rx = registry.subscribe();
        let id = DeviceId::new(room(1), Section::Bathroom, "ScaldaOnOff");

        registry.update(&id, ChangeOrigin::Controller, |_| ()).unwrap();
        registry
            .update(&id, ChangeOrigin::Controller, |device| {
                if let DeviceState::Switch(switch) = &mut device.state {
                    switch.apply_reported(true);
                }
            })
            .unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.origin, ChangeOrigin::Controller);
        assert_eq!(
            change.device.state,
            DeviceState::Switch(Switch::new(true))
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn should_find_devices_of_kind_in_section() {
        let registry = DeviceRegistry::with_devices([
            light(room(3), Section::Bathroom, "Totale"),
            heater(room(3)),
            light(room(3), Section::Bedroom, "Totale"),
        ]);
        let ids = registry.find(room(3), Section::Bathroom, DeviceKind::Dimmer);
        assert_eq!(ids, vec![DeviceId::new(room(3), Section::Bathroom, "Totale")]);
    }
}
