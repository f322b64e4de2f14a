//! # Orchestrate Task
//! The evaluation loop. Every tick it applies what the broker sent, polls the zone button,
//! redraws the display and sounds the buzzer when an alarm is due. The decisions live in
//! [`Engine`], this task only wires it to the other tasks.
use defmt::{info, unwrap, warn};
use embassy_time::{Duration, Instant, Ticker};
use zone_alarm_core::{
    Buzzer, Display, Engine, EngineConfig, Frame, Monotonic, RouteOutcome, TimezoneRegistry,
    Uplink, UplinkError,
};

use crate::{
    config::TOPICS,
    event::{INBOUND_CHANNEL, queue_outbound, signal_reconnect},
    task::{buttons::ZONE_BUTTON_LATCH, buzzer::signal_buzzer, display::signal_display_update},
};

/// Milliseconds since boot, truncated to 32 bits
struct EmbassyTicks;

impl Monotonic for EmbassyTicks {
    #[allow(clippy::cast_possible_truncation)]
    fn ticks(&self) -> u32 {
        // wraps after ~49.7 days, the clock copes as long as a sync arrives more often
        Instant::now().as_millis() as u32
    }

    fn ticks_per_second(&self) -> u32 {
        1000
    }
}

/// Forwards the engine's outputs to the display, buzzer and link tasks
struct Collaborators;

impl Display for Collaborators {
    fn render(&mut self, frame: &Frame) {
        signal_display_update(frame.clone());
    }
}

impl Buzzer for Collaborators {
    fn sound(&mut self, duration_ms: u32, frequency_hz: u32) {
        signal_buzzer(duration_ms, frequency_hz);
    }
}

impl Uplink for Collaborators {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), UplinkError> {
        if queue_outbound(topic, payload) {
            Ok(())
        } else {
            Err(UplinkError::QueueFull)
        }
    }

    fn request_reconnect(&mut self) {
        signal_reconnect();
    }
}

/// Runs the evaluation loop forever.
#[embassy_executor::task]
pub async fn evaluate(registry: TimezoneRegistry<'static>) {
    info!("Evaluation task starting");
    let mut engine = unwrap!(Engine::new(
        registry,
        EmbassyTicks,
        &ZONE_BUTTON_LATCH,
        TOPICS,
        EngineConfig::default(),
    ));
    let mut io = Collaborators;
    let mut ticker = Ticker::every(Duration::from_millis(
        engine.config().tick_period_ms.into(),
    ));

    loop {
        while let Ok(message) = INBOUND_CHANNEL.try_receive() {
            match engine.deliver(&message.topic, &message.payload) {
                RouteOutcome::Dropped(reason) => {
                    warn!("Dropped message on {}: {}", message.topic.as_str(), reason);
                }
                outcome => info!("Applied message on {}: {}", message.topic.as_str(), outcome),
            }
        }

        let report = engine.tick(&mut io);
        if let Some(zone) = report.zone_advanced {
            info!("Zone button, now showing {}", zone);
        }
        if let Some(alarm) = report.fired {
            info!("Alarm {} fired", alarm);
        }

        ticker.next().await;
    }
}
