//! Control service: the operations a user interface calls.
//!
//! A user intent runs through the device's state machine under the device
//! lock, then the resulting command goes to the command queue. Intents are
//! admitted one at a time, so commands reach the queue in the order the
//! transitions happened. Momentary actions additionally get a phase timer
//! that walks them back to idle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use roomhub_domain::device::{Device, DeviceState, Intent};
use roomhub_domain::error::{NotFoundError, RoomHubError, TransitionError};
use roomhub_domain::id::{DeviceId, RoomId};
use roomhub_domain::time::now;

use crate::command_queue::{CommandQueue, Delivery};
use crate::ports::{EventPublisher, Transport};
use crate::registry::{ChangeOrigin, DeviceRegistry};

/// Result of an accepted intent.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedIntent {
    /// Snapshot taken right after the transition, under the device lock.
    pub device: Device,
    pub delivery: Delivery,
}

pub struct ControlService<T, P> {
    registry: Arc<DeviceRegistry>,
    queue: Arc<CommandQueue<T, P>>,
    admission: Arc<AsyncMutex<()>>,
}

impl<T, P> Clone for ControlService<T, P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            queue: Arc::clone(&self.queue),
            admission: Arc::clone(&self.admission),
        }
    }
}

impl<T, P> ControlService<T, P>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>, queue: Arc<CommandQueue<T, P>>) -> Self {
        Self {
            registry,
            queue,
            admission: Arc::new(AsyncMutex::new(())),
        }
    }

    /// # Errors
    ///
    /// Returns [`RoomHubError::NotFound`] when no device has this id.
    pub fn get_device(&self, id: &DeviceId) -> Result<Device, RoomHubError> {
        self.registry.get(id).ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// All devices, or those of one room, in declaration order.
    #[must_use]
    pub fn list_devices(&self, room: Option<RoomId>) -> Vec<Device> {
        match room {
            Some(room) => self.registry.all_in_room(room),
            None => self.registry.list(),
        }
    }

    /// Apply a user intent and deliver the resulting command.
    ///
    /// Returns the device as the transition left it, and whether the
    /// command went out at once or was queued.
    ///
    /// # Errors
    ///
    /// Returns [`RoomHubError::NotFound`] for an unknown device, or
    /// [`RoomHubError::Transition`] when the state machine refuses the intent.
    /// Nothing is sent in either case.
    #[tracing::instrument(skip(self), fields(device = %id))]
    pub async fn apply_user_intent(
        &self,
        id: &DeviceId,
        intent: Intent,
    ) -> Result<AppliedIntent, RoomHubError> {
        let _admitted = self.admission.lock().await;
        let triggered_at = Instant::now();
        let applied = self.registry.update(id, ChangeOrigin::User, |device| {
            let command = device.apply(intent, now())?;
            let schedule = match &device.state {
                DeviceState::Momentary(action) => Some(action.schedule()),
                _ => None,
            };
            Ok::<_, TransitionError>((command, schedule, device.clone()))
        })?;
        let (command, schedule, device) = match applied {
            Ok(applied) => applied,
            Err(err) => {
                if matches!(err, TransitionError::Busy { .. }) {
                    tracing::warn!(%err, "momentary trigger rejected");
                }
                return Err(err.into());
            }
        };
        if let Some(schedule) = schedule {
            self.spawn_phase_timer(id.clone(), triggered_at, schedule);
        }
        let delivery = self.queue.send(&command).await;
        Ok(AppliedIntent { device, delivery })
    }

    fn spawn_phase_timer(&self, id: DeviceId, triggered_at: Instant, schedule: [u64; 3]) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            for offset in schedule {
                tokio::time::sleep_until(triggered_at + Duration::from_millis(offset)).await;
                let advanced = registry.update(&id, ChangeOrigin::Timer, |device| {
                    match &mut device.state {
                        DeviceState::Momentary(action) => action.advance(offset),
                        _ => false,
                    }
                });
                if let Err(err) = advanced {
                    tracing::warn!(%err, device = %id, "momentary device vanished");
                    return;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use roomhub_domain::device::{Dimmer, Momentary, MomentaryPhase, Switch};
    use roomhub_domain::section::Section;

    use crate::command_queue::QueueConfig;
    use crate::command_queue::tests::{FakeTransport, RecordingPublisher};

    type TestService = ControlService<Arc<FakeTransport>, Arc<RecordingPublisher>>;

    fn room() -> RoomId {
        RoomId::try_from(7).unwrap()
    }

    fn light_id() -> DeviceId {
        DeviceId::new(room(), Section::Bedroom, "Totale")
    }

    fn action_id() -> DeviceId {
        DeviceId::new(room(), Section::Settings, "ResetLuci")
    }

    fn service(transport: FakeTransport) -> (TestService, Arc<FakeTransport>, Arc<DeviceRegistry>) {
        let registry = Arc::new(DeviceRegistry::with_devices([
            Device::builder()
                .id(light_id())
                .state(DeviceState::Dimmer(Dimmer::new(60, false)))
                .build()
                .unwrap(),
            Device::builder()
                .id(DeviceId::new(room(), Section::Bathroom, "ScaldaOnOff"))
                .state(DeviceState::Switch(Switch::new(false)))
                .build()
                .unwrap(),
            Device::builder()
                .id(action_id())
                .state(DeviceState::Momentary(Momentary::new(3000, 2000)))
                .build()
                .unwrap(),
        ]));
        let transport = Arc::new(transport);
        let queue = Arc::new(CommandQueue::new(
            Arc::clone(&transport),
            Arc::new(RecordingPublisher::default()),
            QueueConfig::default(),
        ));
        (
            ControlService::new(Arc::clone(&registry), queue),
            transport,
            registry,
        )
    }

    fn phase(service: &TestService) -> MomentaryPhase {
        match service.get_device(&action_id()).unwrap().state {
            DeviceState::Momentary(action) => action.phase(),
            other => panic!("expected momentary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_send_one_command_per_intent() {
        let (service, transport, _) = service(FakeTransport::connected());

        let applied = service
            .apply_user_intent(&light_id(), Intent::SetPower { on: true })
            .await
            .unwrap();

        assert_eq!(applied.delivery, Delivery::Sent);
        let DeviceState::Dimmer(dimmer) = applied.device.state else {
            panic!("expected dimmer");
        };
        assert_eq!((dimmer.level(), dimmer.power()), (60, true));
        let published = transport.published();
        assert_eq!(published.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(body["nLivello"], 60);
        assert_eq!(body["bOnOff"], true);
        assert_eq!(body["sLocale"], "Camera");
    }

    #[tokio::test]
    async fn should_broadcast_user_change() {
        let (service, _, registry) = service(FakeTransport::connected());
        let mut changes = registry.subscribe();

        service
            .apply_user_intent(&light_id(), Intent::SetLevel { level: 5 })
            .await
            .unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.origin, ChangeOrigin::User);
        let DeviceState::Dimmer(dimmer) = change.device.state else {
            panic!("expected dimmer");
        };
        assert_eq!(dimmer.level(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_concurrent_intents_in_transition_order() {
        let (service, transport, registry) = service(FakeTransport::connected());
        transport
            .latencies
            .lock()
            .unwrap()
            .push_back(Duration::from_millis(50));

        let id = light_id();
        let (first, second) = tokio::join!(
            service.apply_user_intent(&id, Intent::SetLevel { level: 30 }),
            service.apply_user_intent(&id, Intent::SetLevel { level: 70 }),
        );

        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.device.state, DeviceState::Dimmer(Dimmer::new(30, true)));
        assert_eq!(second.device.state, DeviceState::Dimmer(Dimmer::new(70, true)));
        assert_eq!(transport.published_levels(), [30, 70]);
        let DeviceState::Dimmer(stored) = registry.get(&light_id()).unwrap().state else {
            panic!("expected dimmer");
        };
        assert_eq!(stored.set_level(), 70);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_device() {
        let (service, transport, _) = service(FakeTransport::connected());
        let id = DeviceId::new(room(), Section::Living, "Divano");

        let result = service.apply_user_intent(&id, Intent::Toggle).await;

        assert!(matches!(result, Err(RoomHubError::NotFound(_))));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_reject_unsupported_intent_without_sending() {
        let (service, transport, _) = service(FakeTransport::connected());

        let result = service
            .apply_user_intent(&light_id(), Intent::Trigger)
            .await;

        assert!(matches!(result, Err(RoomHubError::Transition(_))));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_walk_momentary_phases_and_reject_retrigger() {
        let (service, transport, _) = service(FakeTransport::connected());

        service
            .apply_user_intent(&action_id(), Intent::Trigger)
            .await
            .unwrap();
        assert_eq!(phase(&service), MomentaryPhase::Pressed);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(phase(&service), MomentaryPhase::Executing);

        tokio::time::sleep(Duration::from_millis(750)).await;
        let retrigger = service
            .apply_user_intent(&action_id(), Intent::Trigger)
            .await;
        assert!(matches!(
            retrigger,
            Err(RoomHubError::Transition(TransitionError::Busy {
                phase: MomentaryPhase::Executing
            }))
        ));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(phase(&service), MomentaryPhase::Completed);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(phase(&service), MomentaryPhase::Idle);

        assert_eq!(transport.published().len(), 1, "timers never re-send");
    }

    #[test]
    fn should_list_devices_by_room() {
        let (service, _, _) = service(FakeTransport::default());
        assert_eq!(service.list_devices(None).len(), 3);
        assert_eq!(service.list_devices(Some(room())).len(), 3);
        let other = RoomId::try_from(8).unwrap();
        assert!(service.list_devices(Some(other)).is_empty());
    }
}
