//! Channels between the broker link and the evaluation loop.
//!
//! The link task owns the network and the MQTT session. It copies every received message into
//! [`INBOUND_CHANNEL`], the evaluation loop drains that channel once per tick. Publications go
//! the other way through [`OUTBOUND_CHANNEL`].

use defmt::{Format, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;
use heapless::{String, Vec};

/// Longest topic name we can carry
pub const TOPIC_CAPACITY: usize = 32;

/// Largest payload we can carry, an alarm list of 16 entries fits comfortably
pub const PAYLOAD_CAPACITY: usize = 768;

/// The capacity of the inbound channel
const INBOUND_CHANNEL_CAPACITY: usize = 4;

/// The capacity of the outbound channel
const OUTBOUND_CHANNEL_CAPACITY: usize = 2;

/// A message on its way between the broker and the engine
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    /// Topic the message was received or is to be published on
    pub topic: String<TOPIC_CAPACITY>,
    /// Raw payload
    pub payload: Vec<u8, PAYLOAD_CAPACITY>,
}

impl BrokerMessage {
    /// Copy `topic` and `payload` into a new message, `None` if either does not fit
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut owned_topic = String::new();
        owned_topic.push_str(topic).ok()?;
        let owned_payload = Vec::from_slice(payload).ok()?;
        Some(Self {
            topic: owned_topic,
            payload: owned_payload,
        })
    }
}

impl Format for BrokerMessage {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=str} ({=usize} bytes)",
            self.topic.as_str(),
            self.payload.len()
        );
    }
}

/// Messages received from the broker
pub static INBOUND_CHANNEL: Channel<CriticalSectionRawMutex, BrokerMessage, INBOUND_CHANNEL_CAPACITY> =
    Channel::new();

/// Messages to publish to the broker
pub static OUTBOUND_CHANNEL: Channel<
    CriticalSectionRawMutex,
    BrokerMessage,
    OUTBOUND_CHANNEL_CAPACITY,
> = Channel::new();

/// Tells the link task to drop the broker session and connect again
pub static RECONNECT_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Hands a received message to the evaluation loop. Never waits: when the loop falls behind,
/// the message is dropped and a later one will carry the same information.
pub fn forward_inbound(topic: &str, payload: &[u8]) {
    let Some(message) = BrokerMessage::new(topic, payload) else {
        warn!(
            "dropping oversized message on {=str} ({=usize} bytes)",
            topic,
            payload.len()
        );
        return;
    };
    if let Err(TrySendError::Full(message)) = INBOUND_CHANNEL.try_send(message) {
        warn!("inbound channel full, dropping {}", message);
    }
}

/// Queues a message for publication, `false` if it was not queued
pub fn queue_outbound(topic: &str, payload: &[u8]) -> bool {
    BrokerMessage::new(topic, payload)
        .is_some_and(|message| OUTBOUND_CHANNEL.try_send(message).is_ok())
}

/// Waits for the next message to publish
pub async fn receive_outbound() -> BrokerMessage {
    OUTBOUND_CHANNEL.receiver().receive().await
}

/// Asks the link task to reconnect
pub fn signal_reconnect() {
    RECONNECT_SIGNAL.signal(());
}
