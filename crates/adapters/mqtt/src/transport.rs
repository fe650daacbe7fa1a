//! [`Transport`] implementation backed by a rumqttc client.
//!
//! A background task drives the rumqttc event loop. It forwards publishes
//! and connection changes to the receiver handed out by
//! [`Transport::connect`], re-subscribes after every `ConnAck`, and stops
//! after `max_reconnect_attempts` consecutive connection failures.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use roomhub_app::ports::{Transport, TransportEvent};
use roomhub_domain::error::RoomHubError;

use crate::config::MqttConfig;
use crate::error::MqttError;

const REQUEST_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Map a numeric QoS level to the rumqttc enum.
///
/// # Errors
///
/// Returns [`MqttError::InvalidQos`] for anything above 2.
pub fn qos(level: u8) -> Result<QoS, MqttError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(MqttError::InvalidQos(other)),
    }
}

pub struct MqttTransport {
    config: MqttConfig,
    qos: QoS,
    client: OnceLock<AsyncClient>,
    connected: Arc<AtomicBool>,
    topics: Arc<Mutex<Vec<String>>>,
}

impl MqttTransport {
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidQos`] when the configured QoS is out of range.
    pub fn new(config: MqttConfig) -> Result<Self, MqttError> {
        Ok(Self {
            qos: qos(config.qos)?,
            config,
            client: OnceLock::new(),
            connected: Arc::new(AtomicBool::new(false)),
            topics: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));
        options
    }

    fn remember(&self, topic: &str) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if !topics.iter().any(|known| known == topic) {
            topics.push(topic.to_string());
        }
    }
}

impl Transport for MqttTransport {
    fn connect(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<TransportEvent>, RoomHubError>> + Send {
        let (client, eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let started = self.client.set(client.clone()).is_ok();
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        if started {
            tracing::info!(
                host = %self.config.broker_host,
                port = self.config.broker_port,
                "connecting to MQTT broker"
            );
            let poller = Poller {
                eventloop,
                client,
                qos: self.qos,
                connected: Arc::clone(&self.connected),
                topics: Arc::clone(&self.topics),
                events: tx,
                reconnect_delay: self.config.reconnect_delay(),
                max_attempts: self.config.max_reconnect_attempts,
            };
            tokio::spawn(poller.run());
        }
        async move {
            if started {
                Ok(rx)
            } else {
                Err(MqttError::AlreadyStarted.into())
            }
        }
    }

    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), RoomHubError>> + Send {
        self.remember(topic);
        let live = self
            .client
            .get()
            .filter(|_| self.connected.load(Ordering::Acquire))
            .cloned();
        let topic = topic.to_string();
        let qos = self.qos;
        async move {
            // otherwise subscribed on the next ConnAck
            if let Some(client) = live {
                client
                    .subscribe(topic, qos)
                    .await
                    .map_err(MqttError::Client)?;
            }
            Ok(())
        }
    }

    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), RoomHubError>> + Send {
        let client = self
            .client
            .get()
            .filter(|_| self.connected.load(Ordering::Acquire))
            .cloned();
        let topic = topic.to_string();
        let qos = self.qos;
        async move {
            let client = client.ok_or(MqttError::NotConnected)?;
            client
                .publish(topic, qos, false, payload)
                .await
                .map_err(MqttError::Client)?;
            Ok(())
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Owns the rumqttc event loop.
struct Poller {
    eventloop: EventLoop,
    client: AsyncClient,
    qos: QoS,
    connected: Arc<AtomicBool>,
    topics: Arc<Mutex<Vec<String>>>,
    events: mpsc::Sender<TransportEvent>,
    reconnect_delay: Duration,
    max_attempts: u32,
}

impl Poller {
    async fn run(mut self) {
        let mut failures: u32 = 0;
        loop {
            let next = match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    failures = 0;
                    self.connected.store(true, Ordering::Release);
                    self.resubscribe();
                    tracing::info!("MQTT broker connected");
                    Some(TransportEvent::Connected)
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => Some(TransportEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                }),
                Ok(_) => None,
                Err(err) => {
                    let was_connected = self.connected.swap(false, Ordering::AcqRel);
                    failures += 1;
                    if failures > self.max_attempts {
                        tracing::error!(%err, attempts = failures - 1, "giving up on MQTT broker");
                        if was_connected {
                            let _ = self.events.send(TransportEvent::Disconnected).await;
                        }
                        return;
                    }
                    tracing::warn!(
                        %err,
                        attempt = failures,
                        max = self.max_attempts,
                        "MQTT connection failed, retrying"
                    );
                    if was_connected && self.events.send(TransportEvent::Disconnected).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(self.reconnect_delay).await;
                    None
                }
            };
            if let Some(event) = next {
                if self.events.send(event).await.is_err() {
                    tracing::debug!("transport receiver dropped, stopping MQTT poller");
                    return;
                }
            }
        }
    }

    fn resubscribe(&self) {
        let topics = self
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for topic in topics {
            if let Err(err) = self.client.try_subscribe(topic.clone(), self.qos) {
                tracing::warn!(%err, %topic, "failed to subscribe");
            }
        }
    }
}
