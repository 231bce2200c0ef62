//! `From` implementations bridging `cart_config` types to `cart_core` types.

use std::time::Duration;

use crate::config::{FollowCfg, SensorMode, UiCfg};

// ── FollowCfg ────────────────────────────────────────────────────────────────

impl From<&cart_config::Config> for FollowCfg {
    fn from(c: &cart_config::Config) -> Self {
        Self {
            window: c.sensor.window,
            sample_period: Duration::from_millis(c.follow.sample_period_ms),
            worry: Duration::from_millis(c.follow.worry_ms),
            lost: Duration::from_millis(c.follow.lost_ms),
        }
    }
}

// ── SensorMode ───────────────────────────────────────────────────────────────

impl From<cart_config::SensorMode> for SensorMode {
    fn from(m: cart_config::SensorMode) -> Self {
        match m {
            cart_config::SensorMode::Scripted => Self::Scripted,
            cart_config::SensorMode::Sampled => Self::Sampled,
        }
    }
}

// ── UiCfg ────────────────────────────────────────────────────────────────────

/// Timing comes from `[ui]`; the setup screens show the `[network]` addresses.
impl From<&cart_config::Config> for UiCfg {
    fn from(c: &cart_config::Config) -> Self {
        let defaults = Self::default();
        Self {
            tick: Duration::from_millis(c.ui.tick_ms),
            init_delay: Duration::from_millis(c.ui.init_ms),
            local_addr: c.network.server.clone().unwrap_or(defaults.local_addr),
            cloud_addr: c.network.client.clone().unwrap_or(defaults.cloud_addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_defaults() {
        let cfg = cart_config::load_toml("").unwrap();
        assert_eq!(FollowCfg::from(&cfg), FollowCfg::default());
        assert_eq!(UiCfg::from(&cfg), UiCfg::default());
        assert_eq!(SensorMode::from(cfg.sensor.mode), SensorMode::Scripted);
    }

    #[test]
    fn network_addresses_reach_setup_screens() {
        let cfg = cart_config::load_toml(
            "[network]\nserver = \"0.0.0.0:3490\"\nclient = \"10.0.0.5:8080\"\n",
        )
        .unwrap();
        let ui = UiCfg::from(&cfg);
        assert_eq!(ui.local_addr, "0.0.0.0:3490");
        assert_eq!(ui.cloud_addr, "10.0.0.5:8080");
    }
}
