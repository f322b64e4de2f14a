//! # Buzzer task
//! Drives a passive piezo buzzer with a square wave. The evaluation loop only signals a request
//! and carries on, so button presses are not missed while the buzzer sounds.
use defmt::{Format, info};
use embassy_rp::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

/// A tone to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct BuzzerRequest {
    /// How long to sound
    pub duration_ms: u32,
    /// Pitch of the tone
    pub frequency_hz: u32,
}

/// Signal for starting a tone
static BUZZER_SIGNAL: Signal<CriticalSectionRawMutex, BuzzerRequest> = Signal::new();

/// Signals the buzzer task to sound a tone
pub fn signal_buzzer(duration_ms: u32, frequency_hz: u32) {
    BUZZER_SIGNAL.signal(BuzzerRequest {
        duration_ms,
        frequency_hz,
    });
}

#[embassy_executor::task]
pub async fn buzzer_handler(mut pin: Output<'static>) {
    info!("Buzzer task started");
    loop {
        let request = BUZZER_SIGNAL.wait().await;
        info!("Buzzer sounding {}", request);

        // toggling twice per period gives the requested frequency
        let half_period = Duration::from_micros(500_000 / u64::from(request.frequency_hz.max(1)));
        let deadline = Instant::now() + Duration::from_millis(request.duration_ms.into());
        while Instant::now() < deadline {
            pin.toggle();
            Timer::after(half_period).await;
        }
        pin.set_low();
    }
}
