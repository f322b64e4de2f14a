//! # Link task
//! This module contains the task that keeps the clock connected to the MQTT broker.
//!
//! The task joins the WiFi network, opens a TCP connection to the broker, subscribes to the
//! sync, zone and alarm topics and then shuttles messages: everything received goes to the
//! evaluation loop, everything the loop queues is published. Whenever something fails the
//! task tears the connection down and starts over, waiting a little longer after every
//! failed attempt.
//!
//! # populate the wifi and broker constants
//! make sure to have `config/wifi_config.json` and `config/broker_config.json`, see the
//! `*.example.json` files next to them. `build.rs` turns them into constants.

use crate::config::{
    BROKER_ADDRESS, BROKER_PASSWORD, BROKER_PORT, BROKER_USERNAME, CLIENT_ID, HOSTNAME, PASSWORD,
    SSID, TOPICS,
};
use crate::event::{BrokerMessage, RECONNECT_SIGNAL, forward_inbound, receive_outbound};
use cyw43_pio::PioSpi;
use defmt::{Debug2Format, Format, error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{Either4, select4};
use embassy_net::tcp::{ConnectError, TcpSocket};
use embassy_net::{Config, DhcpConfig, Ipv4Address, Stack, StackResources};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_time::{Duration, Ticker, Timer, with_timeout};
use rand::RngCore;
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;
use static_cell::StaticCell;

/// Size of the TCP and MQTT buffers, the alarm list is the largest message we expect
const BUFFER_SIZE: usize = 1024;

/// MQTT keep alive in seconds, we ping at half of it
const KEEP_ALIVE_SECS: u16 = 60;

/// Why a broker session ended
#[derive(Debug)]
enum SessionError {
    /// The TCP connection to the broker could not be opened
    Connect(ConnectError),
    /// The broker or the MQTT client reported an error
    Mqtt(ReasonCode),
}

impl Format for SessionError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Connect(e) => defmt::write!(f, "connect: {}", e),
            Self::Mqtt(code) => defmt::write!(f, "mqtt: {}", Debug2Format(code)),
        }
    }
}

/// Waiting time between connection attempts, doubling up to a ceiling
struct Backoff {
    /// Delay before the next attempt
    current: Duration,
}

impl Backoff {
    /// First retry delay
    const MIN: Duration = Duration::from_secs(1);
    /// Longest retry delay
    const MAX: Duration = Duration::from_secs(60);

    const fn new() -> Self {
        Self { current: Self::MIN }
    }

    /// The delay to wait now, doubling the one after it
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = if delay * 2 > Self::MAX {
            Self::MAX
        } else {
            delay * 2
        };
        delay
    }

    /// Start over from the shortest delay after a good connection
    fn reset(&mut self) {
        self.current = Self::MIN;
    }
}

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(stack: &'static Stack<cyw43::NetDriver<'static>>) -> ! {
    stack.run().await
}

#[embassy_executor::task]
pub async fn link(
    spawner: Spawner,
    pwr: Output<'static>,
    spi: PioSpi<'static, PIO0, 0, DMA_CH0>,
) {
    info!("link task started");

    let fw = unsafe { core::slice::from_raw_parts(0x1010_0000 as *const u8, 230_321) };
    let clm = unsafe { core::slice::from_raw_parts(0x1014_0000 as *const u8, 4752) };

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());

    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    unwrap!(spawner.spawn(cyw43_task(runner)));

    info!("init control");
    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    let mut dhcp_config = DhcpConfig::default();
    dhcp_config.hostname = HOSTNAME.try_into().ok();
    let config = Config::dhcpv4(dhcp_config);

    // random seed
    let mut rng = RoscRng;
    let seed = rng.next_u64();

    // Initialize the network stack
    static STACK: StaticCell<Stack<cyw43::NetDriver<'static>>> = StaticCell::new();
    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let stack = &*STACK.init(Stack::new(
        net_device,
        config,
        RESOURCES.init(StackResources::<3>::new()),
        seed,
    ));
    unwrap!(spawner.spawn(net_task(stack)));

    let mut backoff = Backoff::new();
    loop {
        info!("Joining WPA2 network with SSID: {:?}", SSID);
        match with_timeout(Duration::from_secs(10), control.join_wpa2(SSID, PASSWORD)).await {
            Ok(Ok(())) => {
                control.gpio_set(0, true).await; // Turn on the onboard LED
                info!("Connected to wifi");
            }
            Ok(Err(e)) => {
                error!("Error connecting to wifi: {}", Debug2Format(&e));
                control.leave().await;
                Timer::after(backoff.next_delay()).await;
                continue;
            }
            Err(_) => {
                error!("Timeout while trying to connect to wifi");
                control.leave().await;
                Timer::after(backoff.next_delay()).await;
                continue;
            }
        }

        if with_timeout(Duration::from_secs(10), stack.wait_config_up())
            .await
            .is_err()
        {
            error!("DHCP timed out");
        } else {
            match run_session(stack, &mut backoff).await {
                Ok(()) => info!("Broker session closed, reconnecting"),
                Err(e) => error!("Broker session failed: {}", e),
            }
        }

        control.leave().await;
        control.gpio_set(0, false).await; // Turn off the onboard LED
        let delay = backoff.next_delay();
        info!("Reconnecting in {} ms", delay.as_millis());
        Timer::after(delay).await;
    }
}

/// What woke up the session loop, apart from received messages
enum SessionEvent {
    /// Publish this message
    Publish(BrokerMessage),
    /// Time for a keep alive ping
    Ping,
}

/// Connect to the broker and shuttle messages until something fails or a reconnect is requested
async fn run_session(
    stack: &'static Stack<cyw43::NetDriver<'static>>,
    backoff: &mut Backoff,
) -> Result<(), SessionError> {
    let mut rx_buffer = [0; BUFFER_SIZE];
    let mut tx_buffer = [0; BUFFER_SIZE];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(u64::from(KEEP_ALIVE_SECS) * 2)));

    let [a, b, c, d] = BROKER_ADDRESS;
    socket
        .connect((Ipv4Address::new(a, b, c, d), BROKER_PORT))
        .await
        .map_err(SessionError::Connect)?;
    info!("TCP connection to broker open");

    let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
    config.add_max_subscribe_qos(QualityOfService::QoS0);
    config.add_client_id(CLIENT_ID);
    config.add_username(BROKER_USERNAME);
    config.add_password(BROKER_PASSWORD);
    config.keep_alive = KEEP_ALIVE_SECS;
    config.max_packet_size = BUFFER_SIZE as u32;

    let mut recv_buffer = [0; BUFFER_SIZE];
    let mut write_buffer = [0; BUFFER_SIZE];
    let mut client = MqttClient::<_, 5, _>::new(
        socket,
        &mut write_buffer,
        BUFFER_SIZE,
        &mut recv_buffer,
        BUFFER_SIZE,
        config,
    );

    client
        .connect_to_broker()
        .await
        .map_err(SessionError::Mqtt)?;
    for topic in [TOPICS.sync, TOPICS.zone_select, TOPICS.alarm_update] {
        client
            .subscribe_to_topic(topic)
            .await
            .map_err(SessionError::Mqtt)?;
        info!("Subscribed to {}", topic);
    }
    backoff.reset();
    // a request from before this session is already served
    RECONNECT_SIGNAL.reset();

    let mut ping = Ticker::every(Duration::from_secs(u64::from(KEEP_ALIVE_SECS / 2)));
    loop {
        let event = match select4(
            client.receive_message(),
            receive_outbound(),
            ping.next(),
            RECONNECT_SIGNAL.wait(),
        )
        .await
        {
            Either4::First(Ok((topic, payload))) => {
                forward_inbound(topic, payload);
                continue;
            }
            Either4::First(Err(code)) => return Err(SessionError::Mqtt(code)),
            Either4::Second(message) => SessionEvent::Publish(message),
            Either4::Third(()) => SessionEvent::Ping,
            Either4::Fourth(()) => {
                warn!("Reconnect requested");
                return Ok(());
            }
        };

        match event {
            SessionEvent::Publish(message) => {
                client
                    .send_message(
                        &message.topic,
                        &message.payload,
                        QualityOfService::QoS0,
                        false,
                    )
                    .await
                    .map_err(SessionError::Mqtt)?;
                info!("Published {}", message);
            }
            SessionEvent::Ping => client.send_ping().await.map_err(SessionError::Mqtt)?,
        }
    }
}
