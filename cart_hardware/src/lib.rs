//! Device backends for the cart.
//!
//! The simulated devices are always built and are what the CLI uses unless
//! the `hardware` feature is enabled. They log through `tracing` so a
//! simulated run reads like a hardware trace.

pub mod error;
pub mod scanner;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod gpio;

pub use scanner::FileScanner;
pub use sim::{SimTarget, SimulatedAlert, SimulatedCatalog, SimulatedMotor, SimulatedProximity};

#[cfg(feature = "hardware")]
pub use gpio::{GpioAlert, GpioMotor, Mcp3008Proximity, MotorPins};
