//! Type-state builder for `CartController`.
//!
//! `build()` only exists once a display and a motor are set. Every other
//! collaborator has a quiet default. `try_build()` is available in any state
//! for dynamic wiring and reports what is missing.

use std::marker::PhantomData;

use cart_traits::clock::{Clock, MonotonicClock};
use cart_traits::{Alert, Display, ItemLookup, Motor, Mood, Scanner, Uplink};

use crate::cart::{CartContext, CartController};
use crate::config::{FollowCfg, SensorMode, UiCfg};
use crate::error::{BuildError, Result};
use crate::fusion::SensorFusion;
use crate::ledger::Ledger;
use crate::mocks::{NoopAlert, NoopLookup};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

#[derive(Default)]
struct Parts {
    display: Option<Box<dyn Display>>,
    motor: Option<Box<dyn Motor>>,
    alert: Option<Box<dyn Alert>>,
    lookup: Option<Box<dyn ItemLookup>>,
    uplink: Option<Box<dyn Uplink>>,
    scanner: Option<Box<dyn Scanner>>,
    clock: Option<Box<dyn Clock>>,
    follow: Option<FollowCfg>,
    ui: Option<UiCfg>,
    mode: SensorMode,
    uplink_enabled: Option<bool>,
}

/// Builder for `CartController`. Configuration is validated on `build()`.
pub struct CartBuilder<D, M> {
    parts: Parts,
    _d: PhantomData<D>,
    _m: PhantomData<M>,
}

impl Default for CartBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            parts: Parts::default(),
            _d: PhantomData,
            _m: PhantomData,
        }
    }
}

impl CartController {
    /// Start building a controller.
    pub fn builder() -> CartBuilder<Missing, Missing> {
        CartBuilder::default()
    }
}

fn validate(follow: &FollowCfg, ui: &UiCfg) -> Result<()> {
    if follow.window == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "window must be >= 1",
        )));
    }
    if follow.sample_period.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "sample period must be > 0",
        )));
    }
    if follow.lost < follow.worry {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "lost threshold must be >= worry threshold",
        )));
    }
    if ui.tick.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "ui tick must be > 0",
        )));
    }
    Ok(())
}

impl<D, M> CartBuilder<D, M> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<CartController> {
        let p = self.parts;
        let display = p
            .display
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDisplay))?;
        let motor = p
            .motor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let follow = p.follow.unwrap_or_default();
        let ui = p.ui.unwrap_or_default();
        validate(&follow, &ui)?;

        let clock: Box<dyn Clock> = p.clock.unwrap_or_else(|| Box::new(MonotonicClock::new()));
        let init_started = clock.now();
        let ctx = CartContext {
            display,
            motor,
            alert: p.alert.unwrap_or_else(|| Box::new(NoopAlert)),
            lookup: p.lookup.unwrap_or_else(|| Box::new(NoopLookup)),
            uplink_enabled: p.uplink_enabled.unwrap_or(p.uplink.is_some()),
            uplink: p.uplink,
            scanner: p.scanner,
            clock,
            ui,
            mode: p.mode,
            ledger: Ledger::new(),
            fusion: SensorFusion::new(follow),
            target_found: true,
            mood: None,
            test_mood: Mood::Ready,
            prev_mood: None,
            pending_scan: None,
            fetching: None,
            lookup_result: None,
            scanned: None,
            analog: (0, 0),
            help_message: None,
            init_started,
        };
        CartController::from_context(ctx)
    }

    #[must_use]
    pub fn with_alert(mut self, alert: impl Alert + 'static) -> Self {
        self.parts.alert = Some(Box::new(alert));
        self
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: impl ItemLookup + 'static) -> Self {
        self.parts.lookup = Some(Box::new(lookup));
        self
    }

    #[must_use]
    pub fn with_uplink(mut self, uplink: impl Uplink + 'static) -> Self {
        self.parts.uplink = Some(Box::new(uplink));
        self
    }

    /// Start with the uplink switched on or off regardless of whether one is set.
    #[must_use]
    pub fn with_uplink_enabled(mut self, enabled: bool) -> Self {
        self.parts.uplink_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_scanner(mut self, scanner: impl Scanner + 'static) -> Self {
        self.parts.scanner = Some(Box::new(scanner));
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.parts.clock = Some(Box::new(clock));
        self
    }

    #[must_use]
    pub fn with_follow(mut self, follow: FollowCfg) -> Self {
        self.parts.follow = Some(follow);
        self
    }

    #[must_use]
    pub fn with_ui(mut self, ui: UiCfg) -> Self {
        self.parts.ui = Some(ui);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SensorMode) -> Self {
        self.parts.mode = mode;
        self
    }
}

// Setters that advance type-state
impl<M> CartBuilder<Missing, M> {
    pub fn with_display(mut self, display: impl Display + 'static) -> CartBuilder<Set, M> {
        self.parts.display = Some(Box::new(display));
        CartBuilder {
            parts: self.parts,
            _d: PhantomData,
            _m: PhantomData,
        }
    }
}

impl<D> CartBuilder<D, Missing> {
    pub fn with_motor(mut self, motor: impl Motor + 'static) -> CartBuilder<D, Set> {
        self.parts.motor = Some(Box::new(motor));
        CartBuilder {
            parts: self.parts,
            _d: PhantomData,
            _m: PhantomData,
        }
    }
}

impl CartBuilder<Set, Set> {
    /// Validate and build. Only available once display and motor are set.
    pub fn build(self) -> Result<CartController> {
        self.try_build()
    }
}
