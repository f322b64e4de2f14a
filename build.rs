//! This build script copies the `memory.x` file from the crate root into
//! a directory where the linker can always find it at build time, and turns
//! the JSON files in `config/` into Rust constants.
//!
//! Missing config files are created with dummy values so that a fresh
//! checkout builds, the firmware will then simply fail to join any network.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::print_stdout)]

use std::{
    env, fs,
    fs::File,
    io,
    io::Write,
    path::{Path, PathBuf},
};

fn main() {
    memory_x();
    wifi_secrets().unwrap();
    broker_config().unwrap();
}

/// Read `config/<name>`, writing `dummy` to it first if it does not exist
fn read_config(name: &str, dummy: &str) -> serde_json::Value {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR environment variable not set");
    let config_dir = Path::new(&manifest_dir).join("config");
    let config_path = config_dir.join(name);
    println!("cargo:rerun-if-changed={}", config_path.display());

    let contents = if config_path.exists() {
        fs::read_to_string(&config_path).unwrap_or_else(|_| panic!("Could not read {name}"))
    } else {
        println!("cargo:warning={name} not found, creating it with dummy values");
        fs::create_dir_all(&config_dir).expect("Could not create config directory");
        fs::write(&config_path, dummy).unwrap_or_else(|_| panic!("Could not write dummy {name}"));
        dummy.to_string()
    };
    serde_json::from_str(&contents).unwrap_or_else(|_| panic!("Could not parse {name}"))
}

/// Create `file` in the output directory
fn out_file(file: &str) -> File {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR environment variable not set");
    File::create(Path::new(&out_dir).join(file))
        .unwrap_or_else(|_| panic!("Could not create {file}"))
}

/// Look up a string value, panicking with a useful message if it is missing
fn str_field<'a>(config: &'a serde_json::Value, path: &[&str], file: &str) -> &'a str {
    path.iter()
        .fold(config, |value, key| &value[key])
        .as_str()
        .unwrap_or_else(|| panic!("{} not found in {file}", path.join(".")))
}

/// Generate `wifi_secrets.rs` from `wifi_config.json`
fn wifi_secrets() -> io::Result<()> {
    let file = "wifi_config.json";
    let config = read_config(file, r#"{"ssid":"dummy","password":"dummy"}"#);
    let ssid = str_field(&config, &["ssid"], file);
    let password = str_field(&config, &["password"], file);

    let mut f = out_file("wifi_secrets.rs");
    writeln!(f, "/// SSID of the WiFi network to join")?;
    writeln!(f, "pub const SSID: &str = {ssid:?};")?;
    writeln!(f, "/// WPA2 passphrase of the WiFi network")?;
    writeln!(f, "pub const PASSWORD: &str = {password:?};")?;
    Ok(())
}

/// Generate `broker_config.rs` from `broker_config.json`
fn broker_config() -> io::Result<()> {
    let file = "broker_config.json";
    let dummy = r#"{
    "host": "192.168.1.10",
    "port": 1883,
    "username": "dummy",
    "password": "dummy",
    "client_id": "pico-zone-alarm",
    "topics": {
        "sync": "clock/sync",
        "zone": "clock/zone",
        "alarms": "clock/alarms",
        "zone_change": "clock/zone"
    }
}"#;
    let config = read_config(file, dummy);

    let host = str_field(&config, &["host"], file);
    let octets: Vec<u8> = host
        .split('.')
        .map(|octet| {
            octet
                .parse()
                .unwrap_or_else(|_| panic!("host in {file} must be an IPv4 address"))
        })
        .collect();
    assert!(octets.len() == 4, "host in {file} must be an IPv4 address");
    let port = config["port"]
        .as_u64()
        .and_then(|port| u16::try_from(port).ok())
        .unwrap_or_else(|| panic!("port not found in {file}"));

    let mut f = out_file("broker_config.rs");
    writeln!(f, "/// IPv4 address of the MQTT broker")?;
    writeln!(f, "pub const BROKER_ADDRESS: [u8; 4] = {octets:?};")?;
    writeln!(f, "/// TCP port of the MQTT broker")?;
    writeln!(f, "pub const BROKER_PORT: u16 = {port};")?;
    let fields: [(&str, &[&str]); 7] = [
        ("BROKER_USERNAME", &["username"]),
        ("BROKER_PASSWORD", &["password"]),
        ("CLIENT_ID", &["client_id"]),
        ("TOPIC_SYNC", &["topics", "sync"]),
        ("TOPIC_ZONE", &["topics", "zone"]),
        ("TOPIC_ALARMS", &["topics", "alarms"]),
        ("TOPIC_ZONE_CHANGE", &["topics", "zone_change"]),
    ];
    for (name, path) in fields {
        let value = str_field(&config, path, file);
        writeln!(f, "/// `{}` from {file}", path.join("."))?;
        writeln!(f, "pub const {name}: &str = {value:?};")?;
    }
    Ok(())
}

/// Handle the `memory.x` linker script
fn memory_x() {
    // Put `memory.x` in our output directory and ensure it's
    // on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    // By default, Cargo will re-run a build script whenever
    // any file in the project changes. By specifying `memory.x`
    // here, we ensure the build script is only re-run when
    // `memory.x` is changed.
    println!("cargo:rerun-if-changed=memory.x");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
