//! # Display task
//! This module contains the task that displays the time and zone on the OLED display.
//!
//! The evaluation loop hands over a finished [`Frame`] every tick. Line one is the time in a
//! large font, line two the zone name.
use defmt::{Debug2Format, error, info, warn};
use embassy_rp::i2c::{Async, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_graphics::{
    mono_font::{
        MonoTextStyleBuilder,
        ascii::{FONT_6X13, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use ssd1306_async::{I2CDisplayInterface, Ssd1306, prelude::*};
use zone_alarm_core::Frame;

/// Signal for the frame to show next
static DISPLAY_SIGNAL: Signal<CriticalSectionRawMutex, Frame> = Signal::new();

/// Position of the time line, 20 pixels high
const TIME_POSITION: Point = Point::new(24, 14);

/// Position of the zone line, 13 pixels high
const ZONE_POSITION: Point = Point::new(16, 42);

/// Signals the display task to show `frame`
pub fn signal_display_update(frame: Frame) {
    DISPLAY_SIGNAL.signal(frame);
}

#[embassy_executor::task]
pub async fn display(i2c: I2c<'static, I2C0, Async>) {
    info!("Display task started");

    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    if let Err(e) = display.init().await {
        error!("Failed to initialize display: {}", Debug2Format(&e));
        return;
    }
    if let Err(e) = display.set_brightness(Brightness::DIM).await {
        warn!("Failed to dim display: {}", Debug2Format(&e));
    }

    let time_style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(BinaryColor::On)
        .build();
    let zone_style = MonoTextStyleBuilder::new()
        .font(&FONT_6X13)
        .text_color(BinaryColor::On)
        .build();

    let mut shown = Frame::default();
    loop {
        // Wait for a signal to update the display
        let frame = DISPLAY_SIGNAL.wait().await;
        // the loop ticks several times per second, only talk to the panel when something changed
        if frame == shown {
            continue;
        }

        // prepare the display, note that nothing is sent to the display before flush()
        display.clear();
        let _ = Text::with_baseline(&frame.time, TIME_POSITION, time_style, Baseline::Top)
            .draw(&mut display);
        let _ = Text::with_baseline(&frame.zone, ZONE_POSITION, zone_style, Baseline::Top)
            .draw(&mut display);

        // finally: send the display buffer to the display
        match display.flush().await {
            Ok(()) => shown = frame,
            Err(e) => warn!("Failed to flush display: {}", Debug2Format(&e)),
        }
    }
}
