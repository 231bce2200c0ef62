mod cli;
mod error_fmt;
mod net;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cart_core::fsm::StateKey;
use cart_core::runner::{self, Event, RunLimits, RunStats};
use cart_core::{CartController, FollowCfg, Key, Sampler, SensorMode, UiCfg};
use cart_hardware::{FileScanner, SimTarget, SimulatedCatalog};
use cart_traits::{Item, MonotonicClock};
use cart_ui::ConsoleDisplay;
use clap::Parser;
use crossbeam_channel as xch;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{CliError, exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    let catalog = load_catalog(&cfg)?;

    match cli.cmd {
        Commands::SelfCheck => self_check(&cfg, &catalog, cli.json),
        Commands::Run {
            server,
            client,
            max_ticks,
            no_keys,
        } => {
            let opts = RunOpts {
                server: server.or_else(|| cfg.network.server.clone()),
                client: client.or_else(|| cfg.network.client.clone()),
                limits: RunLimits { max_ticks },
                keys: !no_keys,
            };
            let stats = run(&cfg, catalog, &opts)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ticks": stats.ticks,
                        "follow_steps": stats.follow_steps,
                        "events": stats.events,
                        "faults": stats.faults,
                    })
                );
            } else {
                eprintln!(
                    "cart stopped after {} ticks ({} follow steps, {} events, {} faults)",
                    stats.ticks, stats.follow_steps, stats.events, stats.faults
                );
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<cart_config::Config> {
    let Some(path) = path else {
        return Ok(cart_config::Config::default());
    };
    let config_failure = |msg: String| CliError::Config {
        path: path.to_path_buf(),
        msg,
    };
    let text = std::fs::read_to_string(path).map_err(|e| config_failure(e.to_string()))?;
    let cfg: cart_config::Config =
        toml::from_str(&text).map_err(|e| config_failure(e.message().to_string()))?;
    cfg.validate().map_err(|e| config_failure(format!("{e:#}")))?;
    Ok(cfg)
}

fn load_catalog(cfg: &cart_config::Config) -> Result<SimulatedCatalog> {
    let Some(file) = cfg.catalog.file.as_deref() else {
        return Ok(SimulatedCatalog::default());
    };
    let path = PathBuf::from(file);
    let catalog_failure = |e: eyre::Report| CliError::Catalog {
        path: path.clone(),
        msg: format!("{e:#}"),
    };
    let rows = cart_config::load_catalog_csv(&path).map_err(catalog_failure)?;
    cart_config::validate_catalog(&rows).map_err(catalog_failure)?;
    let items = rows
        .into_iter()
        .map(|r| Item::new(r.upc, r.price, r.weight).named(r.name))
        .collect();
    Ok(SimulatedCatalog::from_items(items))
}

fn init_tracing(json: bool, level: Option<&str>, logging: &cart_config::Logging) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("bad log level {level:?}"))?,
    };

    // stdout carries the LCD frame, so console logs go to stderr.
    let pretty = (!json).then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));
    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn self_check(cfg: &cart_config::Config, catalog: &SimulatedCatalog, json: bool) -> Result<()> {
    let cart = CartController::builder()
        .with_display(ConsoleDisplay::new(std::io::sink()))
        .with_motor(cart_hardware::SimulatedMotor::new())
        .with_follow(FollowCfg::from(cfg))
        .with_ui(UiCfg::from(cfg))
        .with_mode(cfg.sensor.mode.into())
        .build()?;
    let mode = format!("{:?}", cart.mode()).to_ascii_lowercase();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "mode": mode,
                "catalog_items": catalog.len(),
                "state": cart.state().name(),
            })
        );
    } else {
        println!("self-check ok: mode {mode}, {} catalog items", catalog.len());
    }
    Ok(())
}

struct RunOpts {
    server: Option<String>,
    client: Option<String>,
    limits: RunLimits,
    keys: bool,
}

#[cfg(not(feature = "hardware"))]
fn devices(
    _cfg: &cart_config::Config,
    target: &SimTarget,
) -> Result<(
    cart_hardware::SimulatedMotor,
    cart_hardware::SimulatedAlert,
    cart_hardware::SimulatedProximity,
)> {
    Ok((
        cart_hardware::SimulatedMotor::new(),
        cart_hardware::SimulatedAlert::new(),
        cart_hardware::SimulatedProximity::new(target.clone()),
    ))
}

#[cfg(feature = "hardware")]
fn devices(
    cfg: &cart_config::Config,
    _target: &SimTarget,
) -> Result<(
    cart_hardware::GpioMotor,
    cart_hardware::GpioAlert,
    cart_hardware::Mcp3008Proximity,
)> {
    let p = &cfg.pins;
    let motor = cart_hardware::GpioMotor::new(cart_hardware::MotorPins {
        left_fwd: p.motor_left_fwd,
        left_back: p.motor_left_back,
        right_fwd: p.motor_right_fwd,
        right_back: p.motor_right_back,
    })?;
    let alert = cart_hardware::GpioAlert::new(p.led, p.buzzer)?;
    let sensor =
        cart_hardware::Mcp3008Proximity::new(cfg.sensor.left_channel, cfg.sensor.right_channel)?;
    Ok((motor, alert, sensor))
}

fn run(cfg: &cart_config::Config, catalog: SimulatedCatalog, opts: &RunOpts) -> Result<RunStats> {
    let (tx, rx) = xch::unbounded::<Event>();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let target = SimTarget::default();
    let (motor, alert, sensor) = devices(cfg, &target)?;
    let mode: SensorMode = cfg.sensor.mode.into();

    let mut ui = UiCfg::from(cfg);
    if let Some(s) = &opts.server {
        ui.local_addr.clone_from(s);
    }
    if let Some(c) = &opts.client {
        ui.cloud_addr.clone_from(c);
    }

    let keypad_codes: Vec<String> = catalog.upcs().take(4).map(str::to_owned).collect();
    let mut builder = CartController::builder()
        .with_alert(alert)
        .with_follow(FollowCfg::from(cfg))
        .with_ui(ui)
        .with_mode(mode)
        .with_clock(MonotonicClock::new());
    builder = match &opts.client {
        Some(addr) => builder
            .with_lookup(net::RemoteLookup)
            .with_uplink(net::TcpUplink::new(addr.clone(), tx.clone()))
            .with_uplink_enabled(cfg.network.uplink_enabled),
        None => builder.with_lookup(catalog),
    };
    if let Some(file) = &cfg.scanner.file {
        builder = builder.with_scanner(FileScanner::new(file));
    }
    let mut cart = builder
        .with_display(ConsoleDisplay::stdout())
        .with_motor(motor)
        .build()?;

    if let Some(addr) = &opts.server {
        net::spawn_server(addr, tx.clone())?;
    }
    if opts.keys {
        spawn_keys(tx.clone(), keypad_codes, target);
    }
    drop(tx);

    let sampler = match mode {
        SensorMode::Sampled => Some(Sampler::spawn(
            sensor,
            cfg.sensor.sample_rate_hz,
            cfg.sensor.window,
            MonotonicClock::new(),
        )),
        SensorMode::Scripted => None,
    };

    let stats = runner::run(
        &mut cart,
        &rx,
        sampler.as_ref(),
        &shutdown,
        opts.limits,
    )?;
    tracing::info!(
        state = cart.state().name(),
        weight = cart.ledger().total_weight(),
        cost = cart.ledger().total_cost(),
        "cart stopped"
    );
    Ok(stats)
}

/// Map one keyboard byte to a controller event.
fn key_event(b: u8, codes: &[String], target: &SimTarget) -> Option<Event> {
    let c = char::from(b);
    if let Some(key) = Key::from_digit(c) {
        return Some(Event::Key(key));
    }
    match c {
        ' ' | 'r' => Some(Event::Refresh),
        'a'..='d' => {
            let idx = usize::from(b - b'a');
            codes.get(idx).map(|code| Event::Scan(code.clone()))
        }
        'f' | 'l' => {
            let found = c == 'f';
            target.set(found);
            Some(Event::TargetFound(found))
        }
        'q' => Some(Event::Quit),
        _ => None,
    }
}

/// Keyboard thread: 1-4 are the keypad, space redraws, a-d scan catalog
/// items, f/l place or remove the shopper, q quits.
fn spawn_keys(tx: xch::Sender<Event>, codes: Vec<String>, target: SimTarget) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for byte in stdin.lock().bytes() {
            let Ok(b) = byte else { break };
            if let Some(ev) = key_event(b, &codes, &target) {
                let quit = matches!(ev, Event::Quit);
                if tx.send(ev).is_err() || quit {
                    break;
                }
            }
        }
        tracing::debug!("keyboard input closed");
    });
}
