// we are in an environment with constrained resources, so we do not use the standard library and we define a different entry point.
#![no_std]
#![no_main]

use crate::task::buttons::zone_button;
use crate::task::buzzer::buzzer_handler;
use crate::task::display::display;
use crate::task::link::link;
use crate::task::orchestrate::evaluate;
use crate::task::resources::Irqs;
use cyw43_pio::PioSpi; // for WiFi
use defmt::{info, unwrap}; // global logger
use embassy_executor::Spawner; // executor
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::pio::Pio;
use zone_alarm_core::{DEFAULT_ZONES, TimezoneEntry, TimezoneRegistry};
use {defmt_rtt as _, panic_probe as _}; // panic handler

mod config;
mod event;
mod task;

/// The zones the button cycles through, in order
static ZONES: [TimezoneEntry; 4] = DEFAULT_ZONES;

// Entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Program start");

    // Initialize the peripherals for the RP2040
    let p = embassy_rp::init(Default::default());

    let registry = unwrap!(TimezoneRegistry::new(&ZONES));

    // zone button
    info!("init zone button");
    let zone_button_input = Input::new(p.PIN_20, Pull::Up);
    unwrap!(spawner.spawn(zone_button(zone_button_input)));

    // display
    info!("init display");
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let i2c = I2c::new_async(p.I2C0, p.PIN_13, p.PIN_12, Irqs, i2c_config);
    unwrap!(spawner.spawn(display(i2c)));

    // buzzer
    info!("init buzzer");
    let buzzer_pin = Output::new(p.PIN_15, Level::Low);
    unwrap!(spawner.spawn(buzzer_handler(buzzer_pin)));

    // Setup for WiFi connection and the broker link
    info!("init wifi");
    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );
    unwrap!(spawner.spawn(link(spawner, pwr, spi)));

    // the evaluation loop
    unwrap!(spawner.spawn(evaluate(registry)));
}
