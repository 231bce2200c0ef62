//! Mutable state threaded through every cart state hook.

use std::time::Instant;

use cart_traits::{
    Alert, Clock, Display, Item, ItemLookup, Lookup, Mood, Motor, Scanner, Song, Uplink,
};

use crate::config::{SensorMode, UiCfg};
use crate::fsm::Renderer;
use crate::fusion::SensorFusion;
use crate::hw_error::log_failure;
use crate::ledger::Ledger;
use crate::protocol::Command;

/// Collaborators plus all cart data. Owned by the controller and lent to the
/// state machine for the duration of each call.
pub struct CartContext {
    pub(crate) display: Box<dyn Display>,
    pub(crate) motor: Box<dyn Motor>,
    pub(crate) alert: Box<dyn Alert>,
    pub(crate) lookup: Box<dyn ItemLookup>,
    pub(crate) uplink: Option<Box<dyn Uplink>>,
    pub(crate) scanner: Option<Box<dyn Scanner>>,
    pub(crate) clock: Box<dyn Clock>,

    pub(crate) ui: UiCfg,
    pub(crate) mode: SensorMode,
    pub(crate) ledger: Ledger,
    pub(crate) fusion: SensorFusion,
    pub(crate) target_found: bool,

    /// Last mood pushed to the alert sink.
    pub(crate) mood: Option<Mood>,
    pub(crate) test_mood: Mood,
    pub(crate) prev_mood: Option<Mood>,

    /// Scanned code waiting for `ScanReady` to pick it up.
    pub(crate) pending_scan: Option<String>,
    /// Code whose lookup is in flight.
    pub(crate) fetching: Option<String>,
    pub(crate) lookup_result: Option<Lookup>,
    /// Item shown on the accept screen.
    pub(crate) scanned: Option<Item>,

    pub(crate) analog: (i32, i32),
    pub(crate) uplink_enabled: bool,
    pub(crate) help_message: Option<String>,
    pub(crate) init_started: Instant,
}

impl CartContext {
    /// Push `mood` to the alert sink unless it is already showing.
    pub(crate) fn set_mood(&mut self, mood: Mood) {
        if self.mood == Some(mood) {
            return;
        }
        self.mood = Some(mood);
        tracing::info!(%mood, "mood");
        log_failure("set_mood", self.alert.set_mood(mood));
    }

    /// Replay `mood` even if it is current.
    pub(crate) fn force_mood(&mut self, mood: Mood) {
        self.mood = None;
        self.set_mood(mood);
    }

    pub(crate) fn play(&mut self, song: Song) {
        log_failure("play", self.alert.play(song));
    }

    pub(crate) fn set_led(&mut self, on: bool) {
        log_failure("set_led", self.alert.set_led(on));
    }

    /// Send `cmd` to the cloud peer. Returns whether it went out.
    pub(crate) fn send(&mut self, cmd: &Command) -> bool {
        if !self.uplink_enabled {
            tracing::debug!(%cmd, "uplink disabled, not sending");
            return false;
        }
        let Some(uplink) = self.uplink.as_mut() else {
            tracing::debug!(%cmd, "no uplink configured");
            return false;
        };
        let line = cmd.to_string();
        match uplink.send(&line) {
            Ok(()) => {
                tracing::debug!(line = %line, "uplink send");
                true
            }
            Err(e) => {
                let mapped = crate::hw_error::map_hw_error(e.as_ref());
                tracing::warn!(error = %mapped, line = %line, "uplink send failed");
                false
            }
        }
    }

    pub(crate) fn poll_scanner(&mut self) {
        let Some(scanner) = self.scanner.as_mut() else {
            return;
        };
        match scanner.poll() {
            Ok(Some(code)) => self.queue_scan(&code),
            Ok(None) => {}
            Err(e) => {
                let mapped = crate::hw_error::map_hw_error(e.as_ref());
                tracing::warn!(error = %mapped, "scanner poll failed");
            }
        }
    }

    pub(crate) fn queue_scan(&mut self, code: &str) {
        let code = code.trim();
        if code.is_empty() {
            return;
        }
        tracing::info!(upc = code, "scanned");
        self.pending_scan = Some(code.to_string());
    }
}

impl Renderer for CartContext {
    fn render(&mut self, line1: Option<&str>, line2: Option<&str>) {
        log_failure("render", self.display.render(line1, line2));
    }
}
