//! The cart controller: state table, context and the operations the outside
//! world drives it with.
//!
//! All methods must be called from a single thread; each returns only after
//! every chained transition it triggered has completed.

mod context;
pub mod state;
mod states;

pub use context::CartContext;
pub use state::StateId;

use std::time::Duration;

use cart_traits::{ActionCode, Lookup, Mood, Song};

use crate::config::SensorMode;
use crate::error::{CartError, Result};
use crate::fsm::{Key, Row, StateMachine, Target};
use crate::hw_error::log_failure;
use crate::ledger::Ledger;
use crate::protocol::{self, Command};

pub struct CartController {
    machine: StateMachine<StateId, CartContext>,
    ctx: CartContext,
}

impl core::fmt::Debug for CartController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CartController")
            .field("state", &self.machine.current())
            .field("mood", &self.ctx.mood)
            .field("ledger", &self.ctx.ledger)
            .field("following", &self.ctx.fusion.is_running())
            .finish()
    }
}

impl CartController {
    pub(crate) fn from_context(ctx: CartContext) -> Result<Self> {
        let machine = StateMachine::new(states::table(), StateId::Init).map_err(CartError::from)?;
        Ok(Self { machine, ctx })
    }

    /// Enter `Init` and draw the splash screen.
    pub fn start(&mut self) -> Result<()> {
        self.ctx.play(Song::PowerUp);
        self.machine.start(&mut self.ctx).map_err(CartError::from)?;
        Ok(())
    }

    /// Soft key press.
    pub fn dispatch_key(&mut self, key: Key) -> Result<()> {
        self.ctx.play(Song::KeyPress);
        self.machine
            .dispatch_key(key, &mut self.ctx)
            .map_err(CartError::from)?;
        Ok(())
    }

    /// Redraw the current screen.
    pub fn refresh(&mut self) {
        self.machine.render(&mut self.ctx);
    }

    /// One UI tick: run the state loop, then route any pending scan to the
    /// scan screen.
    pub fn tick(&mut self) -> Result<()> {
        self.ctx.poll_scanner();
        self.machine.tick(&mut self.ctx).map_err(CartError::from)?;
        if self.ctx.pending_scan.is_some() && self.machine.current() != StateId::ScanReady {
            self.goto(StateId::ScanReady)?;
        }
        Ok(())
    }

    /// Feed one proximity reading into the fusion windows.
    pub fn sample(&mut self, left: i32, right: i32) {
        self.ctx.fusion.sample(left, right);
        self.ctx.analog = (left, right);
    }

    /// One follow period. Returns the motor command issued, if any.
    pub fn sample_tick(&mut self) -> Option<ActionCode> {
        match self.ctx.mode {
            SensorMode::Sampled => {
                let reading = self.ctx.fusion.step()?;
                log_failure("set_action", self.ctx.motor.set_action(reading.action));
                self.ctx.set_mood(reading.mood);
                Some(reading.action)
            }
            SensorMode::Scripted => {
                let mood = self.ctx.fusion.step_scripted(self.ctx.target_found)?;
                self.ctx.set_mood(mood);
                None
            }
        }
    }

    /// Scripted follow input.
    pub fn set_target_found(&mut self, found: bool) {
        self.ctx.target_found = found;
    }

    /// Queue a scanned barcode; the next tick picks it up.
    pub fn scan(&mut self, code: &str) {
        self.ctx.queue_scan(code);
    }

    /// Complete the in-flight lookup. Unsolicited answers are dropped.
    pub fn deliver_lookup(&mut self, lookup: Lookup) {
        let Some(upc) = self.ctx.fetching.clone() else {
            tracing::debug!(?lookup, "lookup reply with nothing in flight");
            return;
        };
        let lookup = match lookup {
            Lookup::Found(mut item) => {
                if item.upc.is_empty() {
                    item.upc = upc;
                }
                Lookup::Found(item)
            }
            other => other,
        };
        self.ctx.lookup_result = Some(lookup);
    }

    /// Dispatch one protocol line, returning the reply to send back.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let cmd = match line.parse::<Command>() {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!(error = %e, line = protocol::strip_frame(line), "rejected message");
                return Some(protocol::nak(line));
            }
        };
        tracing::debug!(%cmd, "received");

        match cmd {
            Command::CartStatus { follow } => {
                let next = if follow {
                    StateId::FollowStart
                } else {
                    StateId::FollowStop
                };
                self.goto_logged(next);
                Some(protocol::ack("cart_status"))
            }
            Command::UpcAdd(item) => {
                self.ctx.ledger.add(&item);
                self.refresh_totals();
                Some(protocol::ack("upc_add"))
            }
            Command::UpcDel(item) => {
                self.ctx.ledger.remove(&item);
                self.refresh_totals();
                Some(protocol::ack("upc_del"))
            }
            Command::CustAlert { message } => {
                self.ctx.help_message = Some(message);
                self.goto_logged(StateId::HelpSent);
                Some(protocol::ack("cust_alert"))
            }
            Command::LookupReply(lookup) => {
                self.deliver_lookup(lookup);
                None
            }
            Command::Ack { verb } => {
                if verb == "cust_alert" && self.state() == StateId::HelpSend {
                    self.goto_logged(StateId::HelpSent);
                }
                None
            }
            Command::Nak { message } => {
                tracing::warn!(message = %message, "peer rejected a message");
                if self.state() == StateId::HelpSend {
                    self.goto_logged(StateId::HelpLost);
                }
                None
            }
            Command::UpcLookup { .. } => Some(protocol::nak(line)),
        }
    }

    /// Stop everything and park on the goodbye screen.
    pub fn shutdown(&mut self) {
        self.ctx.fusion.stop();
        log_failure("motor_stop", self.ctx.motor.stop());
        self.ctx.set_led(false);
        self.ctx.play(Song::PowerDown);
        self.goto_logged(StateId::Shutdown);
        tracing::info!(transitions = self.machine.transitions(), "controller shut down");
    }

    #[inline]
    pub fn state(&self) -> StateId {
        self.machine.current()
    }

    #[inline]
    pub fn ledger(&self) -> &Ledger {
        &self.ctx.ledger
    }

    /// Mood last pushed to the alert sink.
    #[inline]
    pub fn mood(&self) -> Option<Mood> {
        self.ctx.mood
    }

    #[inline]
    pub fn is_following(&self) -> bool {
        self.ctx.fusion.is_running()
    }

    #[inline]
    pub fn uplink_enabled(&self) -> bool {
        self.ctx.uplink_enabled
    }

    #[inline]
    pub fn mode(&self) -> SensorMode {
        self.ctx.mode
    }

    pub fn ui_tick(&self) -> Duration {
        self.ctx.ui.tick
    }

    /// Period of one follow step.
    pub fn sample_period(&self) -> Duration {
        self.ctx.fusion.sample_period()
    }

    /// Current text of one row of the current screen.
    pub fn line(&self, row: Row) -> &str {
        self.machine.line(self.machine.current(), row)
    }

    /// Transition by state name. Unknown names leave the state unchanged.
    pub fn goto_named(&mut self, name: &str) -> Result<()> {
        self.machine
            .goto_named(name, &mut self.ctx)
            .map_err(CartError::from)?;
        Ok(())
    }

    fn goto(&mut self, next: StateId) -> Result<()> {
        self.machine
            .goto(Target::State(next), &mut self.ctx)
            .map_err(CartError::from)?;
        Ok(())
    }

    fn goto_logged(&mut self, next: StateId) {
        if let Err(e) = self.goto(next) {
            tracing::error!(error = %e, state = ?next, "transition failed");
        }
    }

    /// Re-enter the follow screen so totals changed from outside show up.
    fn refresh_totals(&mut self) {
        let cur = self.state();
        if matches!(cur, StateId::FollowWeight | StateId::FollowPrice) {
            self.goto_logged(cur);
        }
    }
}
