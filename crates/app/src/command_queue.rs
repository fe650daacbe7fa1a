//! Outbound command delivery with a FIFO retry queue.
//!
//! [`CommandQueue::send`] publishes right away when the transport is up and
//! nothing is waiting, and appends to the queue otherwise, so commands reach
//! the controller in the order they were sent. A single background task
//! drains the queue one item at a time while connected, pausing
//! `retry_delay` between items. A failed item stays at the head; after
//! `max_retries` failed queued attempts it is dropped and reported as
//! [`EventType::CommandDropped`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;

use roomhub_domain::command::DeviceCommand;
use roomhub_domain::device::DeviceKind;
use roomhub_domain::event::{Event, EventType};
use roomhub_domain::id::{CommandId, DeviceId};
use roomhub_domain::protocol::encode_command;
use roomhub_domain::time::{Timestamp, now};

use crate::ports::{EventPublisher, Transport};

pub const DEFAULT_TOPIC: &str = "Camere/Hmi";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_PENDING: usize = 256;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Topic every command is published on.
    pub topic: String,
    /// Failed queued attempts before a command is dropped.
    pub max_retries: u32,
    /// Pause between two queued items.
    pub retry_delay: Duration,
    /// Queue capacity. The oldest item is dropped when it is exceeded.
    pub max_pending: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

/// An encoded command waiting for the transport.
#[derive(Debug, Clone)]
pub struct OutboundCommand {
    pub id: CommandId,
    pub device: DeviceId,
    pub kind: DeviceKind,
    pub payload: Vec<u8>,
    pub created_at: Timestamp,
    pub retries: u32,
}

impl OutboundCommand {
    #[must_use]
    pub fn new(command: &DeviceCommand, at: Timestamp) -> Self {
        Self {
            id: CommandId::new(),
            device: command.device.clone(),
            kind: command.action.kind(),
            payload: encode_command(command, at).to_payload(),
            created_at: at,
            retries: 0,
        }
    }

    fn summary(&self) -> QueuedItem {
        QueuedItem {
            id: self.id,
            device: self.device.clone(),
            kind: self.kind,
            retries: self.retries,
            created_at: self.created_at,
        }
    }
}

/// Outcome of [`CommandQueue::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Queued,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueuedItem {
    pub id: CommandId,
    pub device: DeviceId,
    pub kind: DeviceKind,
    pub retries: u32,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: bool,
    pub connected: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub items: Vec<QueuedItem>,
}

pub struct CommandQueue<T, P> {
    transport: T,
    publisher: P,
    config: QueueConfig,
    pending: Mutex<VecDeque<OutboundCommand>>,
    wake: Notify,
    processing: AtomicBool,
    /// Held across every publish so a direct send never overtakes a drain.
    publish_order: AsyncMutex<()>,
}

impl<T, P> CommandQueue<T, P>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(transport: T, publisher: P, config: QueueConfig) -> Self {
        Self {
            transport,
            publisher,
            config,
            pending: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
            processing: AtomicBool::new(false),
            publish_order: AsyncMutex::new(()),
        }
    }

    /// Spawn the drain loop.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    /// Deliver a command now if possible, queue it otherwise.
    ///
    /// A command never skips ahead of queued ones: while anything is
    /// pending it is appended even when the transport is up.
    #[tracing::instrument(skip(self, command), fields(device = %command.device))]
    pub async fn send(&self, command: &DeviceCommand) -> Delivery {
        let item = OutboundCommand::new(command, now());
        let _order = self.publish_order.lock().await;
        if self.transport.is_connected() && self.is_empty() {
            match self
                .transport
                .publish(&self.config.topic, item.payload.clone())
                .await
            {
                Ok(()) => {
                    self.emit(EventType::CommandDelivered, &item, None).await;
                    return Delivery::Sent;
                }
                Err(err) => tracing::warn!(%err, "publish failed, queueing command"),
            }
        }
        self.enqueue(item).await;
        Delivery::Queued
    }

    /// React to a transport connection change. Reconnection resumes draining.
    pub fn notify_connection(&self, connected: bool) {
        if connected {
            self.wake.notify_one();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn status(&self) -> QueueStatus {
        let items: Vec<QueuedItem> = self.lock().iter().map(OutboundCommand::summary).collect();
        QueueStatus {
            pending: items.len(),
            processing: self.processing.load(Ordering::Acquire),
            connected: self.transport.is_connected(),
            max_retries: self.config.max_retries,
            retry_delay_ms: u64::try_from(self.config.retry_delay.as_millis()).unwrap_or(u64::MAX),
            items,
        }
    }

    /// Drop every pending command, reporting each one. Returns how many were dropped.
    pub async fn clear(&self) -> usize {
        let dropped: Vec<OutboundCommand> = self.lock().drain(..).collect();
        for item in &dropped {
            self.emit(EventType::CommandDropped, item, Some("cleared")).await;
        }
        dropped.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<OutboundCommand>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enqueue(&self, item: OutboundCommand) {
        let evicted = {
            let mut pending = self.lock();
            let evicted = if pending.len() >= self.config.max_pending {
                pending.pop_front()
            } else {
                None
            };
            pending.push_back(item.clone());
            evicted
        };
        if let Some(evicted) = evicted {
            tracing::error!(device = %evicted.device, command = %evicted.id, "queue full, dropping oldest command");
            self.emit(EventType::CommandDropped, &evicted, Some("queue_full"))
                .await;
        }
        self.emit(EventType::CommandQueued, &item, None).await;
        self.wake.notify_one();
    }

    async fn run(self: Arc<Self>) {
        loop {
            if !self.transport.is_connected() || self.is_empty() {
                self.wake.notified().await;
                continue;
            }
            self.drain_one().await;
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    /// Attempt the oldest queued command once.
    async fn drain_one(&self) {
        let _order = self.publish_order.lock().await;
        let Some(mut item) = self.lock().pop_front() else {
            return;
        };
        self.processing.store(true, Ordering::Release);
        match self
            .transport
            .publish(&self.config.topic, item.payload.clone())
            .await
        {
            Ok(()) => {
                tracing::debug!(device = %item.device, retries = item.retries, "queued command delivered");
                self.emit(EventType::CommandDelivered, &item, None).await;
            }
            Err(err) => {
                item.retries += 1;
                if item.retries >= self.config.max_retries {
                    tracing::error!(%err, device = %item.device, retries = item.retries, "dropping command after max retries");
                    self.emit(EventType::CommandDropped, &item, Some("max_retries"))
                        .await;
                } else {
                    tracing::warn!(%err, device = %item.device, retries = item.retries, "queued publish failed, retrying later");
                    self.lock().push_front(item);
                }
            }
        }
        self.processing.store(false, Ordering::Release);
    }

    async fn emit(&self, event_type: EventType, item: &OutboundCommand, reason: Option<&str>) {
        let data = serde_json::json!({
            "command_id": item.id,
            "kind": item.kind,
            "retries": item.retries,
            "reason": reason,
        });
        let event = Event::new(event_type, Some(item.device.clone()), data);
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish queue event");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;

    use roomhub_domain::command::CommandAction;
    use roomhub_domain::error::RoomHubError;
    use roomhub_domain::id::RoomId;
    use roomhub_domain::section::Section;
    use tokio::sync::mpsc;

    use crate::ports::TransportEvent;

    /// Transport whose publish outcome is scripted by the test.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub connected: AtomicBool,
        pub failing: AtomicBool,
        pub attempts: AtomicUsize,
        pub published: Mutex<Vec<(String, Vec<u8>)>>,
        /// Latency of the next publishes, consumed one per call.
        pub latencies: Mutex<VecDeque<Duration>>,
    }

    impl FakeTransport {
        pub(crate) fn connected() -> Self {
            let transport = Self::default();
            transport.connected.store(true, Ordering::SeqCst);
            transport
        }

        pub(crate) fn published(&self) -> Vec<(String, Vec<u8>)> {
            self.published.lock().unwrap().clone()
        }

        pub(crate) fn published_levels(&self) -> Vec<i64> {
            self.published()
                .iter()
                .map(|(_, payload)| {
                    let body: serde_json::Value = serde_json::from_slice(payload).unwrap();
                    body["nLivello"].as_i64().unwrap()
                })
                .collect()
        }
    }

    impl Transport for FakeTransport {
        fn connect(
            &self,
        ) -> impl Future<Output = Result<mpsc::Receiver<TransportEvent>, RoomHubError>> + Send
        {
            let (_tx, rx) = mpsc::channel(1);
            async { Ok(rx) }
        }

        fn subscribe(&self, _topic: &str) -> impl Future<Output = Result<(), RoomHubError>> + Send {
            async { Ok(()) }
        }

        fn publish(
            &self,
            topic: &str,
            payload: Vec<u8>,
        ) -> impl Future<Output = Result<(), RoomHubError>> + Send {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let latency = self.latencies.lock().unwrap().pop_front();
            let topic = topic.to_string();
            async move {
                if let Some(latency) = latency {
                    tokio::time::sleep(latency).await;
                }
                if !self.connected.load(Ordering::SeqCst) || self.failing.load(Ordering::SeqCst) {
                    return Err(RoomHubError::Transport("publish rejected".into()));
                }
                self.published.lock().unwrap().push((topic, payload));
                Ok(())
            }
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    /// Publisher that keeps every event.
    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        pub events: Mutex<Vec<Event>>,
    }

    impl RecordingPublisher {
        pub(crate) fn types(&self) -> Vec<EventType> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type)
                .collect()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: Event) -> impl Future<Output = Result<(), RoomHubError>> + Send {
            self.events.lock().unwrap().push(event);
            async { Ok(()) }
        }
    }

    type TestQueue = CommandQueue<Arc<FakeTransport>, Arc<RecordingPublisher>>;

    fn command(name: &str) -> DeviceCommand {
        dimmer_command(name, 40)
    }

    fn dimmer_command(name: &str, level: u8) -> DeviceCommand {
        DeviceCommand {
            device: DeviceId::new(RoomId::try_from(5).unwrap(), Section::Bedroom, name),
            action: CommandAction::Dimmer { level, power: true },
        }
    }

    fn queue(
        transport: FakeTransport,
        config: QueueConfig,
    ) -> (Arc<TestQueue>, Arc<FakeTransport>, Arc<RecordingPublisher>) {
        let transport = Arc::new(transport);
        let publisher = Arc::new(RecordingPublisher::default());
        let queue = Arc::new(CommandQueue::new(
            Arc::clone(&transport),
            Arc::clone(&publisher),
            config,
        ));
        (queue, transport, publisher)
    }

    #[tokio::test]
    async fn should_publish_immediately_when_connected() {
        let (queue, transport, publisher) = queue(FakeTransport::connected(), QueueConfig::default());

        let delivery = queue.send(&command("Totale")).await;

        assert_eq!(delivery, Delivery::Sent);
        assert!(queue.is_empty());
        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "Camere/Hmi");
        let body: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(body["sNome"], "Totale");
        assert_eq!(body["nLivello"], 40);
        assert_eq!(publisher.types(), vec![EventType::CommandDelivered]);
    }

    #[tokio::test]
    async fn should_queue_without_publishing_when_disconnected() {
        let (queue, transport, publisher) = queue(FakeTransport::default(), QueueConfig::default());

        let delivery = queue.send(&command("Totale")).await;

        assert_eq!(delivery, Delivery::Queued);
        assert_eq!(queue.len(), 1);
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.types(), vec![EventType::CommandQueued]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_drain_in_fifo_order_after_reconnection() {
        let (queue, transport, _publisher) = queue(FakeTransport::default(), QueueConfig::default());
        queue.send(&command("Totale")).await;
        queue.send(&command("Letto")).await;
        let handle = queue.start();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(queue.len(), 2, "nothing drains while disconnected");

        transport.connected.store(true, Ordering::SeqCst);
        queue.notify_connection(true);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let names: Vec<String> = transport
            .published()
            .iter()
            .map(|(_, payload)| {
                let body: serde_json::Value = serde_json::from_slice(payload).unwrap();
                body["sNome"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(names, ["Totale", "Letto"]);
        assert!(queue.is_empty());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn should_queue_behind_pending_commands_after_reconnect() {
        let (queue, transport, _publisher) = queue(FakeTransport::default(), QueueConfig::default());
        assert_eq!(queue.send(&dimmer_command("Totale", 30)).await, Delivery::Queued);

        transport.connected.store(true, Ordering::SeqCst);
        assert_eq!(queue.send(&dimmer_command("Totale", 70)).await, Delivery::Queued);
        assert!(transport.published().is_empty());

        let handle = queue.start();
        queue.notify_connection(true);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(transport.published_levels(), [30, 70]);
        assert!(queue.is_empty());

        assert_eq!(queue.send(&dimmer_command("Totale", 90)).await, Delivery::Sent);
        assert_eq!(transport.published_levels(), [30, 70, 90]);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_failed_item_before_later_ones() {
        let (queue, transport, _publisher) = queue(FakeTransport::default(), QueueConfig::default());
        queue.send(&dimmer_command("Totale", 30)).await;
        queue.send(&dimmer_command("Totale", 70)).await;
        transport.connected.store(true, Ordering::SeqCst);
        transport.failing.store(true, Ordering::SeqCst);
        let handle = queue.start();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
        let heads: Vec<_> = queue.status().items.iter().map(|i| i.retries).collect();
        assert_eq!(heads, [1, 0], "the failed item keeps its place");

        transport.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(transport.published_levels(), [30, 70]);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn should_wait_retry_delay_between_items() {
        let (queue, transport, _publisher) = queue(FakeTransport::default(), QueueConfig::default());
        for name in ["Totale", "Parziale", "Letto"] {
            queue.send(&command(name)).await;
        }
        transport.connected.store(true, Ordering::SeqCst);
        let handle = queue.start();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.published().len(), 1);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(transport.published().len(), 2);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn should_drop_command_after_max_retries_and_restore_queue_length() {
        let transport = FakeTransport::connected();
        transport.failing.store(true, Ordering::SeqCst);
        let (queue, transport, publisher) = queue(transport, QueueConfig::default());
        let before = queue.len();

        assert_eq!(queue.send(&command("Totale")).await, Delivery::Queued);
        assert_eq!(queue.len(), before + 1);
        let handle = queue.start();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(queue.len(), before);
        // one immediate attempt, then max_retries queued attempts
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 4);
        let events = publisher.events.lock().unwrap().clone();
        let dropped: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventType::CommandDropped)
            .collect();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].data["retries"], 3);
        assert_eq!(dropped[0].data["reason"], "max_retries");
        handle.abort();
    }

    #[tokio::test]
    async fn should_evict_oldest_when_queue_is_full() {
        let config = QueueConfig {
            max_pending: 2,
            ..QueueConfig::default()
        };
        let (queue, _transport, publisher) = queue(FakeTransport::default(), config);
        for name in ["Totale", "Parziale", "Letto"] {
            queue.send(&command(name)).await;
        }

        let status = queue.status();
        assert_eq!(status.pending, 2);
        let names: Vec<_> = status.items.iter().map(|i| i.device.name.as_str()).collect();
        assert_eq!(names, ["Parziale", "Letto"]);
        assert!(publisher.types().contains(&EventType::CommandDropped));
    }

    #[tokio::test]
    async fn should_report_each_item_when_cleared() {
        let (queue, _transport, publisher) = queue(FakeTransport::default(), QueueConfig::default());
        queue.send(&command("Totale")).await;
        queue.send(&command("Letto")).await;

        assert_eq!(queue.clear().await, 2);

        assert!(queue.is_empty());
        let dropped = publisher
            .types()
            .into_iter()
            .filter(|t| *t == EventType::CommandDropped)
            .count();
        assert_eq!(dropped, 2);
    }

    #[test]
    fn should_describe_queue_in_status() {
        let (queue, _transport, _publisher) = queue(FakeTransport::default(), QueueConfig::default());
        let status = queue.status();
        assert_eq!(status.pending, 0);
        assert!(!status.connected);
        assert_eq!(status.max_retries, 3);
        assert_eq!(status.retry_delay_ms, 1000);
    }
}
