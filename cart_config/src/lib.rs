#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and catalog parsing for the cart.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; an empty file is a valid scripted setup.
//! - The catalog CSV loader enforces headers and rejects bad rows.
use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;

/// Catalog CSV schema.
///
/// Expected headers:
/// upc,name,price,weight
///
/// Example:
/// upc,name,price,weight
/// 760557824961,microSD,7.45,0.2
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CatalogRow {
    pub upc: String,
    pub name: String,
    pub price: f64,
    pub weight: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// No proximity hardware; found/lost comes from an operator.
    #[default]
    Scripted,
    /// Proximity readings from the ADC sampler.
    Sampled,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    pub mode: SensorMode,
    /// Readings held per channel
    pub window: usize,
    pub sample_rate_hz: u32,
    /// ADC channel wired to the left proximity sensor
    pub left_channel: u8,
    pub right_channel: u8,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            mode: SensorMode::Scripted,
            window: 1024,
            sample_rate_hz: 1000,
            left_channel: 1,
            right_channel: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FollowCfg {
    pub sample_period_ms: u64,
    /// Lost time before the cart starts looking
    pub worry_ms: u64,
    /// Lost time before the cart gives up
    pub lost_ms: u64,
}

impl Default for FollowCfg {
    fn default() -> Self {
        Self {
            sample_period_ms: 1000,
            worry_ms: 2000,
            lost_ms: 6000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UiCfg {
    pub tick_ms: u64,
    /// Splash screen time
    pub init_ms: u64,
}

impl Default for UiCfg {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            init_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NetworkCfg {
    /// Address the status server listens on
    pub server: Option<String>,
    /// Cloud peer to connect to
    pub client: Option<String>,
    pub uplink_enabled: bool,
}

impl Default for NetworkCfg {
    fn default() -> Self {
        Self {
            server: None,
            client: None,
            uplink_enabled: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ScannerCfg {
    /// File the barcode reader drops codes into
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CatalogCfg {
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Pins {
    pub led: u8,
    pub buzzer: u8,
    pub motor_left_fwd: u8,
    pub motor_left_back: u8,
    pub motor_right_fwd: u8,
    pub motor_right_back: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            led: 5,
            buzzer: 2,
            motor_left_fwd: 17,
            motor_left_back: 27,
            motor_right_fwd: 22,
            motor_right_back: 23,
        }
    }
}

impl Pins {
    fn all(&self) -> [(&'static str, u8); 6] {
        [
            ("led", self.led),
            ("buzzer", self.buzzer),
            ("motor_left_fwd", self.motor_left_fwd),
            ("motor_left_back", self.motor_left_back),
            ("motor_right_fwd", self.motor_right_fwd),
            ("motor_right_back", self.motor_right_back),
        ]
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub follow: FollowCfg,
    #[serde(default)]
    pub ui: UiCfg,
    #[serde(default)]
    pub network: NetworkCfg,
    #[serde(default)]
    pub scanner: ScannerCfg,
    /// GPIO assignments, only read by the hardware backend
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub catalog: CatalogCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// MCP3008 channel count.
const ADC_CHANNELS: u8 = 8;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.window == 0 {
            eyre::bail!("sensor.window must be >= 1");
        }
        if self.sensor.window > 65_536 {
            eyre::bail!("sensor.window is unreasonably large (>65536)");
        }
        if self.sensor.sample_rate_hz == 0 {
            eyre::bail!("sensor.sample_rate_hz must be > 0");
        }
        if self.sensor.sample_rate_hz > 1_000_000 {
            eyre::bail!("sensor.sample_rate_hz must be <= 1000000");
        }
        if self.sensor.left_channel >= ADC_CHANNELS || self.sensor.right_channel >= ADC_CHANNELS {
            eyre::bail!("sensor channels must be in 0..8");
        }
        if self.sensor.left_channel == self.sensor.right_channel {
            eyre::bail!("sensor.left_channel and sensor.right_channel must differ");
        }

        // Follow
        if self.follow.sample_period_ms == 0 {
            eyre::bail!("follow.sample_period_ms must be > 0");
        }
        if self.follow.lost_ms < self.follow.worry_ms {
            eyre::bail!("follow.lost_ms must be >= follow.worry_ms");
        }

        // UI
        if self.ui.tick_ms == 0 {
            eyre::bail!("ui.tick_ms must be > 0");
        }
        if self.ui.init_ms > 60 * 1000 {
            eyre::bail!("ui.init_ms is unreasonably large (>60s)");
        }

        // Network
        for (key, addr) in [
            ("network.server", &self.network.server),
            ("network.client", &self.network.client),
        ] {
            if let Some(a) = addr
                && a.parse::<SocketAddr>().is_err()
            {
                eyre::bail!("{key} must be host:port with a numeric IP, got '{a}'");
            }
        }

        // Pins
        let mut seen = HashSet::new();
        for (name, pin) in self.pins.all() {
            if !seen.insert(pin) {
                eyre::bail!("pins.{name} reuses GPIO {pin}");
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// Check catalog rows: non-empty numeric UPCs, no negatives, no duplicates.
pub fn validate_catalog(rows: &[CatalogRow]) -> eyre::Result<()> {
    let mut seen = HashSet::new();
    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 2;
        if row.upc.is_empty() || !row.upc.bytes().all(|b| b.is_ascii_digit()) {
            eyre::bail!("catalog row {line}: upc must be digits, got '{}'", row.upc);
        }
        if !row.price.is_finite() || row.price < 0.0 {
            eyre::bail!("catalog row {line}: price must be >= 0");
        }
        if !row.weight.is_finite() || row.weight < 0.0 {
            eyre::bail!("catalog row {line}: weight must be >= 0");
        }
        if !seen.insert(row.upc.as_str()) {
            eyre::bail!("catalog row {line}: duplicate upc {}", row.upc);
        }
    }
    Ok(())
}

pub fn load_catalog_csv(path: &std::path::Path) -> eyre::Result<Vec<CatalogRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open catalog CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["upc", "name", "price", "weight"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "catalog CSV must have headers 'upc,name,price,weight', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CatalogRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    validate_catalog(&rows)?;
    Ok(rows)
}
