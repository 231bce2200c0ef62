use std::sync::atomic::{AtomicBool, Ordering};

use cart_traits::Lookup;
use crossbeam_channel as xch;

use crate::cart::CartController;
use crate::error::Result as CoreResult;
use crate::fsm::Key;
use crate::sampler::Sampler;

/// Inputs the outside world feeds the controller through one channel.
#[derive(Debug)]
pub enum Event {
    Key(Key),
    /// Redraw the current screen.
    Refresh,
    Scan(String),
    /// A protocol line from the network; any reply goes back on `reply`.
    Net {
        line: String,
        reply: xch::Sender<String>,
    },
    Lookup(Lookup),
    TargetFound(bool),
    Quit,
}

/// Optional stop condition for bounded runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    /// Stop after this many UI ticks.
    pub max_ticks: Option<u64>,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub follow_steps: u64,
    pub events: u64,
    /// Ticks or events that failed; the loop logs them and keeps going.
    pub faults: u64,
}

/// Drive `cart` until `Quit`, the shutdown flag, or the tick limit.
///
/// The UI tick runs state loops; the follow tick drains `sampler` (when given)
/// into the fusion windows and steps the follow loop. Channel disconnection
/// only stops event delivery; ticks keep running. A failed tick or event is
/// logged and counted in [`RunStats::faults`], so the cart is always shut
/// down on the way out.
pub fn run(
    cart: &mut CartController,
    events: &xch::Receiver<Event>,
    sampler: Option<&Sampler>,
    shutdown: &AtomicBool,
    limits: RunLimits,
) -> CoreResult<RunStats> {
    let ui_tick = xch::tick(cart.ui_tick());
    let follow_tick = xch::tick(cart.sample_period());
    let mut events = events.clone();
    let mut stats = RunStats::default();

    cart.start()?;
    tracing::info!(mode = ?cart.mode(), ?limits, "cart loop start");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if limits.max_ticks.is_some_and(|max| stats.ticks >= max) {
            tracing::info!(ticks = stats.ticks, "tick limit reached");
            break;
        }

        xch::select! {
            recv(ui_tick) -> _ => {
                let res = cart.tick();
                absorb(&mut stats, "tick", res);
                stats.ticks += 1;
            }
            recv(follow_tick) -> _ => {
                if let Some(s) = sampler {
                    for (l, r) in s.drain() {
                        cart.sample(l, r);
                    }
                }
                if let Some(action) = cart.sample_tick() {
                    tracing::trace!(%action, "follow step");
                }
                stats.follow_steps += 1;
            }
            recv(events) -> msg => match msg {
                Ok(Event::Quit) => {
                    tracing::info!("quit requested");
                    break;
                }
                Ok(ev) => {
                    stats.events += 1;
                    let res = handle_event(cart, ev);
                    absorb(&mut stats, "event", res);
                }
                Err(_) => {
                    tracing::debug!("event sources closed");
                    events = xch::never();
                }
            },
        }
    }

    cart.shutdown();
    tracing::info!(?stats, "cart loop stopped");
    Ok(stats)
}

fn absorb(stats: &mut RunStats, source: &'static str, res: CoreResult<()>) {
    if let Err(e) = res {
        stats.faults += 1;
        tracing::error!(error = %e, source, "cart fault");
    }
}

fn handle_event(cart: &mut CartController, ev: Event) -> CoreResult<()> {
    match ev {
        Event::Key(key) => cart.dispatch_key(key)?,
        Event::Refresh => cart.refresh(),
        Event::Scan(code) => cart.scan(&code),
        Event::Net { line, reply } => {
            if let Some(answer) = cart.handle_line(&line)
                && reply.send(answer).is_err()
            {
                tracing::debug!("reply receiver gone");
            }
        }
        Event::Lookup(lookup) => cart.deliver_lookup(lookup),
        Event::TargetFound(found) => cart.set_target_found(found),
        Event::Quit => {}
    }
    Ok(())
}
