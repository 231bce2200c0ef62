//! Collaborator seams for the cart controller.
//!
//! Every device the controller talks to sits behind one of these traits so the
//! core can run against simulated parts, a console, or real GPIO without
//! knowing which. Fallible calls return a boxed error; the core maps and logs
//! them without aborting.
pub mod action;
pub mod clock;

pub use action::{ActionCode, Direction, Item, Lookup, Mood, Song, Speed, Wheel, WheelDrive};
pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boxed error used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Two-line character display. `None` leaves that row untouched.
pub trait Display {
    fn render(&mut self, line1: Option<&str>, line2: Option<&str>) -> Result<(), BoxError>;
}

/// Drive train. `set_action` receives one classified command per sample period.
pub trait Motor {
    fn start(&mut self) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
    fn set_action(&mut self, action: ActionCode) -> Result<(), BoxError>;
    /// Direct single-wheel control used by the output test screens.
    fn drive_wheel(&mut self, wheel: Wheel, drive: WheelDrive) -> Result<(), BoxError>;
}

/// Mood lighting, buzzer and status LED.
pub trait Alert {
    fn set_mood(&mut self, mood: Mood) -> Result<(), BoxError>;
    fn play(&mut self, song: Song) -> Result<(), BoxError>;
    fn silence(&mut self) -> Result<(), BoxError>;
    fn set_led(&mut self, on: bool) -> Result<(), BoxError>;
}

/// Paired left/right proximity channels, raw ADC counts.
pub trait ProximitySensor {
    fn read(&mut self) -> Result<(i32, i32), BoxError>;
}

/// Barcode source. Returns the next scanned code, if any.
pub trait Scanner {
    fn poll(&mut self) -> Result<Option<String>, BoxError>;
}

/// UPC resolution. `Lookup::Pending` means the answer arrives later through
/// the network path.
pub trait ItemLookup {
    fn lookup(&mut self, upc: &str) -> Result<Lookup, BoxError>;
}

/// Outbound status line to the cloud peer.
pub trait Uplink {
    fn send(&mut self, line: &str) -> Result<(), BoxError>;
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn render(&mut self, line1: Option<&str>, line2: Option<&str>) -> Result<(), BoxError> {
        (**self).render(line1, line2)
    }
}

impl<T: Motor + ?Sized> Motor for Box<T> {
    fn start(&mut self) -> Result<(), BoxError> {
        (**self).start()
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        (**self).stop()
    }
    fn set_action(&mut self, action: ActionCode) -> Result<(), BoxError> {
        (**self).set_action(action)
    }
    fn drive_wheel(&mut self, wheel: Wheel, drive: WheelDrive) -> Result<(), BoxError> {
        (**self).drive_wheel(wheel, drive)
    }
}

impl<T: ProximitySensor + ?Sized> ProximitySensor for Box<T> {
    fn read(&mut self) -> Result<(i32, i32), BoxError> {
        (**self).read()
    }
}
