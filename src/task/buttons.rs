//! # Button task
//! The zone button. The GPIO interrupt wakes this task on every falling edge (the button pulls
//! the pin low), and all the task does is raise the edge latch. Debouncing and the actual zone
//! change happen in the evaluation loop.

use defmt::info;
use embassy_rp::gpio::Input;
use zone_alarm_core::EdgeLatch;

/// Latch between the button and the evaluation loop
pub static ZONE_BUTTON_LATCH: EdgeLatch = EdgeLatch::new();

#[embassy_executor::task]
pub async fn zone_button(mut input: Input<'static>) {
    info!("zone button task started");
    loop {
        input.wait_for_falling_edge().await;
        ZONE_BUTTON_LATCH.notify_edge();
    }
}
