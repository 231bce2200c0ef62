//! Human-readable error descriptions, exit codes, and structured JSON errors.

use std::path::PathBuf;

use cart_core::error::{BuildError, CartError, FsmError};
use cart_hardware::error::HwError;

/// Startup failures raised by the CLI itself.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid configuration in {path}: {msg}")]
    Config { path: PathBuf, msg: String },
    #[error("invalid catalog {path}: {msg}")]
    Catalog { path: PathBuf, msg: String },
}

/// Coarse classification shared by exit codes and the JSON `reason` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Config,
    Table,
    Hardware,
    Other,
}

impl Failure {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Config => 2,
            Self::Table => 3,
            Self::Hardware => 4,
            Self::Other => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Config => "Config",
            Self::Table => "Table",
            Self::Hardware => "Hardware",
            Self::Other => "Error",
        }
    }
}

pub fn classify(err: &eyre::Report) -> Failure {
    if err.downcast_ref::<CliError>().is_some() {
        return Failure::Config;
    }
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => Failure::Config,
            BuildError::MissingDisplay | BuildError::MissingMotor => Failure::Hardware,
        };
    }
    if err.downcast_ref::<FsmError>().is_some() {
        return Failure::Table;
    }
    if err.downcast_ref::<HwError>().is_some() {
        return Failure::Hardware;
    }
    match err.downcast_ref::<CartError>() {
        Some(CartError::Config(_)) => Failure::Config,
        Some(CartError::Fsm(_)) => Failure::Table,
        Some(CartError::Hardware(_) | CartError::HardwareFault(_)) => Failure::Hardware,
        _ => Failure::Other,
    }
}

/// Map an `eyre::Report` to an explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config { path, msg } => format!(
                "What happened: The configuration in {} was rejected ({msg}).\nLikely causes: A value is out of range, a key is misspelled, or two pins collide.\nHow to fix: Edit the TOML named above and rerun `cart self-check`.",
                path.display()
            ),
            CliError::Catalog { path, msg } => format!(
                "What happened: The item catalog {} could not be used ({msg}).\nLikely causes: Wrong headers (expected upc,name,price,weight), a negative price or weight, or a duplicated UPC.\nHow to fix: Fix the CSV row reported above or remove [catalog] file to use the built-in items.",
                path.display()
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDisplay => {
                "What happened: No display was wired into the controller.\nLikely causes: The display failed to open before the builder ran.\nHow to fix: Check the console or LCD setup and pass it via with_display(...).".to_string()
            }
            BuildError::MissingMotor => {
                "What happened: No motor driver was wired into the controller.\nLikely causes: GPIO setup for the motor bridge failed.\nHow to fix: Check [pins] motor_* values and GPIO permissions.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid timing configuration ({msg}).\nLikely causes: Zero or inverted values in [follow] or [ui].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(fe) = err.downcast_ref::<FsmError>() {
        return format!(
            "What happened: The screen table is inconsistent ({fe}).\nLikely causes: A state was added without a matching table row or name.\nHow to fix: This is a build defect; report it with the message above."
        );
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::Gpio(msg) => format!(
                "What happened: GPIO setup failed ({msg}).\nLikely causes: Wrong pin numbers, a pin already in use, or missing access to /dev/gpiomem.\nHow to fix: Check [pins] in the config and run as a user in the gpio group."
            ),
            HwError::Spi(msg) => format!(
                "What happened: The proximity ADC could not be opened ({msg}).\nLikely causes: SPI is disabled or the MCP3008 is not on SPI0/CE0.\nHow to fix: Enable SPI (raspi-config) and check the wiring."
            ),
            HwError::Channel(ch) => format!(
                "What happened: ADC channel {ch} does not exist.\nLikely causes: sensor.left_channel or sensor.right_channel is 8 or more.\nHow to fix: Use channels 0 to 7."
            ),
            HwError::Io(e) => format!(
                "What happened: Device I/O failed ({e}).\nLikely causes: A device node is missing or not readable.\nHow to fix: Re-run with --log-level=debug for the failing path."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CartError>() {
        return format!(
            "What happened: {ce}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("bind protocol server") || lower.contains("address already in use") {
        return format!(
            "What happened: The protocol server could not listen ({msg}).\nLikely causes: Another process holds the port or the address is not local.\nHow to fix: Pick a free port with --server or [network] server."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    classify(err).exit_code()
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let failure = classify(err);
    serde_json::json!({
        "reason": failure.name(),
        "exit_code": failure.exit_code(),
        "message": humanize(err),
    })
    .to_string()
}
