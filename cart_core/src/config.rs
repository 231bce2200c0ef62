//! Runtime configuration used by the controller.
//!
//! These are separate from the TOML schema in `cart_config`; see
//! `conversions` for the mapping.

use std::time::Duration;

use crate::fusion::WINDOW_CAPACITY;

/// Follow loop timing and window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowCfg {
    /// Readings held per proximity channel.
    pub window: usize,
    /// Period of one follow step; also the accumulator increment.
    pub sample_period: Duration,
    /// Lost time beyond which the cart is `Looking`.
    pub worry: Duration,
    /// Lost time beyond which the cart is `Lost`.
    pub lost: Duration,
}

impl Default for FollowCfg {
    fn default() -> Self {
        Self {
            window: WINDOW_CAPACITY,
            sample_period: Duration::from_millis(1000),
            worry: Duration::from_millis(2000),
            lost: Duration::from_millis(6000),
        }
    }
}

/// Where follow steps get their input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorMode {
    /// No proximity hardware; target presence is set externally.
    #[default]
    Scripted,
    /// Readings arrive from a proximity sampler.
    Sampled,
}

/// UI pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiCfg {
    /// Period of the state loop tick.
    pub tick: Duration,
    /// Splash time before leaving `Init`.
    pub init_delay: Duration,
    /// Address shown on the target-IP setup screen.
    pub local_addr: String,
    /// Address shown on the server-IP setup screen.
    pub cloud_addr: String,
}

impl Default for UiCfg {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            init_delay: Duration::from_millis(2000),
            local_addr: "127.0.0.1".into(),
            cloud_addr: "not set".into(),
        }
    }
}
