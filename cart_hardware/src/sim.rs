//! Simulated collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cart_traits::{
    ActionCode, Alert, BoxError, Item, ItemLookup, Lookup, Mood, Motor, ProximitySensor, Song,
    Wheel, WheelDrive,
};

/// Shared switch saying whether the simulated shopper is in front of the cart.
/// The shopper starts out present.
#[derive(Debug, Clone)]
pub struct SimTarget(Arc<AtomicBool>);

impl Default for SimTarget {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl SimTarget {
    pub fn set(&self, present: bool) {
        self.0.store(present, Ordering::Relaxed);
    }

    pub fn present(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Noisy proximity pair. With the target present both channels read around
/// `near`; otherwise they hover around zero. One reading in 64 is a spike.
pub struct SimulatedProximity {
    target: SimTarget,
    near: i32,
    noise: u32,
    state: u32,
}

impl SimulatedProximity {
    pub fn new(target: SimTarget) -> Self {
        Self {
            target,
            near: 300,
            noise: 8,
            state: 0x2545_F491,
        }
    }

    /// Reading level while the target is present.
    #[must_use]
    pub fn with_near(mut self, near: i32) -> Self {
        self.near = near;
        self
    }

    // xorshift32
    fn next(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    fn jitter(&mut self) -> i32 {
        let span = 2 * self.noise + 1;
        let r = self.next();
        let spike = if r % 64 == 0 { 900 } else { 0 };
        (r % span) as i32 - self.noise as i32 + spike
    }
}

impl ProximitySensor for SimulatedProximity {
    fn read(&mut self) -> Result<(i32, i32), BoxError> {
        let base = if self.target.present() { self.near } else { 0 };
        Ok((base + self.jitter(), base + self.jitter()))
    }
}

/// Motor that only logs what it would do.
#[derive(Debug, Default)]
pub struct SimulatedMotor {
    running: bool,
    last: Option<ActionCode>,
}

impl SimulatedMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_action(&self) -> Option<ActionCode> {
        self.last
    }
}

impl Motor for SimulatedMotor {
    fn start(&mut self) -> Result<(), BoxError> {
        self.running = true;
        tracing::info!("motor started (simulated)");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        self.running = false;
        tracing::info!("motor stopped (simulated)");
        Ok(())
    }

    fn set_action(&mut self, action: ActionCode) -> Result<(), BoxError> {
        if self.last != Some(action) {
            tracing::info!(%action, running = self.running, "motor action (simulated)");
        }
        self.last = Some(action);
        Ok(())
    }

    fn drive_wheel(&mut self, wheel: Wheel, drive: WheelDrive) -> Result<(), BoxError> {
        tracing::info!(?wheel, ?drive, "wheel (simulated)");
        Ok(())
    }
}

/// Buzzer, LED and mood light that only log.
#[derive(Debug, Default)]
pub struct SimulatedAlert {
    led: bool,
}

impl SimulatedAlert {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Alert for SimulatedAlert {
    fn set_mood(&mut self, mood: Mood) -> Result<(), BoxError> {
        tracing::info!(%mood, "mood light (simulated)");
        Ok(())
    }

    fn play(&mut self, song: Song) -> Result<(), BoxError> {
        tracing::debug!(?song, "buzzer (simulated)");
        Ok(())
    }

    fn silence(&mut self) -> Result<(), BoxError> {
        tracing::debug!("buzzer silenced (simulated)");
        Ok(())
    }

    fn set_led(&mut self, on: bool) -> Result<(), BoxError> {
        if self.led != on {
            tracing::info!(on, "led (simulated)");
        }
        self.led = on;
        Ok(())
    }
}

/// In-memory item catalog. Unknown codes are `NotFound`.
#[derive(Debug, Clone)]
pub struct SimulatedCatalog {
    items: Vec<Item>,
}

impl Default for SimulatedCatalog {
    fn default() -> Self {
        Self::from_items(vec![
            Item::new("760557824961", 7.45, 0.2).named("microSD"),
            Item::new("941047822994", 2.21, 0.3).named("ROM Cherry"),
            Item::new("2839903352", 5.62, 0.4).named("GUM Toothbrush"),
            Item::new("7094212457", 12.88, 0.77).named("Gund plush penguin"),
        ])
    }
}

impl SimulatedCatalog {
    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Codes in catalog order.
    pub fn upcs(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.upc.as_str())
    }
}

impl ItemLookup for SimulatedCatalog {
    fn lookup(&mut self, upc: &str) -> Result<Lookup, BoxError> {
        let found = self.items.iter().find(|i| i.upc == upc).cloned();
        tracing::debug!(upc, found = found.is_some(), "catalog lookup");
        Ok(found.map_or(Lookup::NotFound, Lookup::Found))
    }
}
