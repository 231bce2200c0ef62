#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core cart logic (hardware-agnostic).
//!
//! Every hardware interaction goes through the collaborator traits in
//! `cart_traits`; this crate owns the decisions.
//!
//! ## Architecture
//!
//! - **FSM**: generic table-driven engine with enter/loop/exit hooks (`fsm`)
//! - **Fusion**: 2σ trimmed mean over two proximity windows, action and mood (`fusion`)
//! - **Ledger**: running cart weight and cost (`ledger`)
//! - **Protocol**: `verb:key=value;` line codec (`protocol`)
//! - **Cart**: the state table and `CartController` tying it together (`cart`)
//! - **Runtime**: background proximity `sampler` and the single-threaded `runner`
//!
//! All controller state lives on one thread. Input sources only send
//! `runner::Event`s; each event, including every nested transition it
//! triggers, completes before the next one is taken.

pub mod builder;
pub mod cart;
pub mod config;
pub mod conversions;
pub mod error;
pub mod fsm;
pub mod fusion;
pub mod hw_error;
pub mod ledger;
pub mod mocks;
pub mod protocol;
pub mod runner;
pub mod sampler;
pub mod util;

pub use builder::{CartBuilder, Missing, Set};
pub use cart::{CartController, StateId};
pub use config::{FollowCfg, SensorMode, UiCfg};
pub use error::{BuildError, CartError, Result};
pub use fsm::{Key, Row};
pub use fusion::{FusionReading, SensorFusion, classify, trimmed_mean};
pub use ledger::Ledger;
pub use protocol::{Command, Message};
pub use runner::{Event, RunLimits, RunStats};
pub use sampler::Sampler;
