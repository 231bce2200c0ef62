//! Test and helper mocks for cart_core.
//!
//! The `Noop*` types are the builder's defaults for optional collaborators.
//! The `Spy*` types record every call into a shared log so tests can keep a
//! handle after the controller takes ownership.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use cart_traits::{
    ActionCode, Alert, BoxError, Display, ItemLookup, Lookup, Mood, Motor, ProximitySensor,
    Scanner, Song, Uplink, Wheel, WheelDrive,
};

/// Alert sink that does nothing.
pub struct NoopAlert;

impl Alert for NoopAlert {
    fn set_mood(&mut self, _mood: Mood) -> Result<(), BoxError> {
        Ok(())
    }
    fn play(&mut self, _song: Song) -> Result<(), BoxError> {
        Ok(())
    }
    fn silence(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
    fn set_led(&mut self, _on: bool) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Lookup that knows no items.
pub struct NoopLookup;

impl ItemLookup for NoopLookup {
    fn lookup(&mut self, _upc: &str) -> Result<Lookup, BoxError> {
        Ok(Lookup::NotFound)
    }
}

/// A proximity sensor that always errors; useful for exercising the
/// sampler's skip-on-error path.
pub struct NoopProximity;

impl ProximitySensor for NoopProximity {
    fn read(&mut self) -> Result<(i32, i32), BoxError> {
        Err(Box::new(std::io::Error::other("noop proximity")))
    }
}

/// Every externally visible effect, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Render(Option<String>, Option<String>),
    MotorStart,
    MotorStop,
    Action(ActionCode),
    Wheel(Wheel, WheelDrive),
    Mood(Mood),
    Play(Song),
    Silence,
    Led(bool),
    Send(String),
}

/// Shared effect log.
#[derive(Debug, Clone, Default)]
pub struct Effects(Rc<RefCell<Vec<Effect>>>);

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, e: Effect) {
        self.0.borrow_mut().push(e);
    }

    pub fn take(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn snapshot(&self) -> Vec<Effect> {
        self.0.borrow().clone()
    }

    /// Motor commands issued so far.
    pub fn actions(&self) -> Vec<ActionCode> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Effect::Action(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    /// Lines sent on the uplink so far.
    pub fn sent(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Effect::Send(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent text drawn on each row.
    pub fn screen(&self) -> (Option<String>, Option<String>) {
        let mut top = None;
        let mut bottom = None;
        for e in self.0.borrow().iter() {
            if let Effect::Render(a, b) = e {
                if a.is_some() {
                    top.clone_from(a);
                }
                if b.is_some() {
                    bottom.clone_from(b);
                }
            }
        }
        (top, bottom)
    }

    pub fn spy_display(&self) -> SpyDisplay {
        SpyDisplay(self.clone())
    }

    pub fn spy_motor(&self) -> SpyMotor {
        SpyMotor(self.clone())
    }

    pub fn spy_alert(&self) -> SpyAlert {
        SpyAlert(self.clone())
    }

    pub fn spy_uplink(&self) -> SpyUplink {
        SpyUplink {
            log: self.clone(),
            fail: false,
        }
    }
}

pub struct SpyDisplay(Effects);

impl Display for SpyDisplay {
    fn render(&mut self, line1: Option<&str>, line2: Option<&str>) -> Result<(), BoxError> {
        self.0.push(Effect::Render(
            line1.map(str::to_string),
            line2.map(str::to_string),
        ));
        Ok(())
    }
}

pub struct SpyMotor(Effects);

impl Motor for SpyMotor {
    fn start(&mut self) -> Result<(), BoxError> {
        self.0.push(Effect::MotorStart);
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.0.push(Effect::MotorStop);
        Ok(())
    }
    fn set_action(&mut self, action: ActionCode) -> Result<(), BoxError> {
        self.0.push(Effect::Action(action));
        Ok(())
    }
    fn drive_wheel(&mut self, wheel: Wheel, drive: WheelDrive) -> Result<(), BoxError> {
        self.0.push(Effect::Wheel(wheel, drive));
        Ok(())
    }
}

pub struct SpyAlert(Effects);

impl Alert for SpyAlert {
    fn set_mood(&mut self, mood: Mood) -> Result<(), BoxError> {
        self.0.push(Effect::Mood(mood));
        Ok(())
    }
    fn play(&mut self, song: Song) -> Result<(), BoxError> {
        self.0.push(Effect::Play(song));
        Ok(())
    }
    fn silence(&mut self) -> Result<(), BoxError> {
        self.0.push(Effect::Silence);
        Ok(())
    }
    fn set_led(&mut self, on: bool) -> Result<(), BoxError> {
        self.0.push(Effect::Led(on));
        Ok(())
    }
}

pub struct SpyUplink {
    log: Effects,
    fail: bool,
}

impl SpyUplink {
    /// Reject every send, as a disconnected peer would.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Uplink for SpyUplink {
    fn send(&mut self, line: &str) -> Result<(), BoxError> {
        if self.fail {
            return Err(Box::new(std::io::Error::other("peer unreachable")));
        }
        self.log.push(Effect::Send(line.to_string()));
        Ok(())
    }
}

/// Scanner fed from a queue the test controls.
#[derive(Debug, Clone, Default)]
pub struct QueueScanner(Rc<RefCell<VecDeque<String>>>);

impl QueueScanner {
    pub fn push(&self, code: &str) {
        self.0.borrow_mut().push_back(code.to_string());
    }
}

impl Scanner for QueueScanner {
    fn poll(&mut self) -> Result<Option<String>, BoxError> {
        Ok(self.0.borrow_mut().pop_front())
    }
}

/// Lookup answering `Pending` for everything, as a cloud-backed lookup does.
pub struct DeferredLookup;

impl ItemLookup for DeferredLookup {
    fn lookup(&mut self, _upc: &str) -> Result<Lookup, BoxError> {
        Ok(Lookup::Pending)
    }
}
