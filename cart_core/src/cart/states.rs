//! The cart's transition table and its hook functions.

use cart_traits::{ActionCode, Lookup, Mood, Song, Wheel, WheelDrive};

use super::context::CartContext;
use super::state::StateId;
use crate::fsm::{Row, StateDef, StateMachine, Target};
use crate::hw_error::log_failure;
use crate::protocol::Command;
use crate::util::amount;

type Machine = StateMachine<StateId, CartContext>;
type Def = StateDef<StateId, CartContext>;

use StateId as S;

const fn to(s: StateId) -> Target<StateId> {
    Target::State(s)
}

const NOP: Target<StateId> = Target::Nop;

/// Build the full table in `StateId` order.
pub fn table() -> Vec<Def> {
    vec![
        Def::new(
            S::Init,
            ["Follow Me Cart! ", "  Init...       "],
            [to(S::ReadyHome); 4],
        )
        .enter(init_enter)
        .looping(init_loop),
        Def::new(S::Shutdown, ["Follow Me Cart! ", "  Bye...        "], [NOP; 4]),
        Def::new(
            S::ReadyHome,
            ["MyCart!         ", "Go    Setup Test"],
            [to(S::FollowStart), to(S::SetupHome), to(S::TestHome), NOP],
        ),
        // Follow
        Def::transient(S::FollowStart, follow_start_enter),
        Def::transient(S::FollowStop, follow_stop_enter),
        Def::new(
            S::FollowWeight,
            ["Cart  123.45 lb ", "Stop  Scan  Help"],
            [
                to(S::FollowStop),
                to(S::ScanReady),
                to(S::HelpSend),
                to(S::FollowPrice),
            ],
        )
        .enter(follow_weight_enter)
        .looping(follow_loop),
        Def::new(
            S::FollowPrice,
            ["Cart    $123.45 ", "Stop  Scan  Help"],
            [
                to(S::FollowStop),
                to(S::ScanReady),
                to(S::HelpSend),
                to(S::FollowWeight),
            ],
        )
        .enter(follow_price_enter),
        // Scan
        Def::new(
            S::ScanReady,
            ["Ready to Scan...", "Cancel          "],
            [to(S::FollowWeight), NOP, NOP, to(S::FollowWeight)],
        )
        .enter(scan_ready_enter)
        .looping(scan_ready_loop),
        Def::new(
            S::ScanFetch,
            ["Fetching info...", "Cancel          "],
            [to(S::FollowWeight), NOP, NOP, to(S::FollowWeight)],
        )
        .enter(scan_fetch_enter)
        .looping(scan_fetch_loop)
        .exit(scan_fetch_exit),
        Def::new(
            S::ScanAccept,
            ["Scan    $123.45 ", "Add   Del       "],
            [to(S::ScanAdd), to(S::ScanDel), NOP, to(S::FollowWeight)],
        )
        .enter(scan_accept_enter),
        Def::transient(S::ScanAdd, scan_add_enter),
        Def::transient(S::ScanDel, scan_del_enter),
        Def::new(
            S::ScanMissing,
            ["Item not found  ", "Rescan      Quit"],
            [to(S::ScanReady), NOP, to(S::FollowWeight), to(S::FollowWeight)],
        ),
        // Help
        Def::new(
            S::HelpSend,
            ["Help sending... ", "            Quit"],
            [NOP, NOP, to(S::FollowWeight), to(S::FollowWeight)],
        )
        .enter(help_send_enter),
        Def::new(
            S::HelpSent,
            ["Help call sent! ", "            Quit"],
            [NOP, NOP, to(S::FollowWeight), to(S::FollowWeight)],
        )
        .enter(help_sent_enter),
        Def::new(
            S::HelpLost,
            ["Help not sent   ", "Resend      Quit"],
            [to(S::HelpSend), NOP, to(S::FollowWeight), to(S::FollowWeight)],
        ),
        // Setup
        Def::new(
            S::SetupHome,
            ["Setup           ", "Dev   Cloud Quit"],
            [
                to(S::SetupTargetIp),
                to(S::SetupServer),
                to(S::ReadyHome),
                to(S::SetupHome),
            ],
        ),
        Def::new(
            S::SetupTargetIp,
            ["Target IP Addr  ", ""],
            [NOP, NOP, NOP, to(S::SetupHome)],
        )
        .enter(setup_target_ip_enter),
        Def::transient(S::SetupServer, setup_server_enter),
        Def::new(
            S::SetupServerDisabled,
            ["Server  Disabled", "Enable          "],
            [to(S::SetupServerEnable), NOP, NOP, to(S::SetupServerIp)],
        ),
        Def::transient(S::SetupServerEnable, setup_server_enable_enter),
        Def::new(
            S::SetupServerEnabled,
            ["Server  Enabled!", "Disable         "],
            [to(S::SetupServerDisable), NOP, NOP, to(S::SetupServerIp)],
        ),
        Def::transient(S::SetupServerDisable, setup_server_disable_enter),
        Def::new(
            S::SetupServerIp,
            ["Server  IP Addr ", ""],
            [NOP, NOP, NOP, to(S::SetupHome)],
        )
        .enter(setup_server_ip_enter),
        // Test
        Def::new(
            S::TestHome,
            ["Test            ", "In    Out  Quit "],
            [
                to(S::TestAnalog),
                to(S::TestMotorL),
                to(S::ReadyHome),
                to(S::ReadyHome),
            ],
        ),
        Def::new(
            S::TestAnalog,
            ["Inputs  Analog  ", "L    0 R      0 "],
            [NOP, NOP, NOP, to(S::TestInputs)],
        )
        .looping(test_analog_loop),
        Def::new(
            S::TestInputs,
            ["Inputs  L R F B ", "n n n n n n n n "],
            [NOP, NOP, NOP, to(S::TestMoodInit)],
        ),
        Def::transient(S::TestMoodInit, test_mood_init_enter),
        Def::new(
            S::TestMood,
            ["Mood       READY", "Play  Next      "],
            [to(S::TestMoodPlay), to(S::TestMoodNext), NOP, to(S::TestMotorL)],
        )
        .enter(test_mood_enter)
        .exit(test_mood_exit),
        Def::transient(S::TestMoodPlay, test_mood_play_enter),
        Def::transient(S::TestMoodNext, test_mood_next_enter),
        Def::new(
            S::TestMotorL,
            ["Outputs  MotorL ", "Fwd   Back  Stop"],
            [
                to(S::TestMotorLFwd),
                to(S::TestMotorLBack),
                to(S::TestMotorLOff),
                to(S::TestMotorR),
            ],
        )
        .exit(|_, c| wheel(c, Wheel::Left, WheelDrive::Off)),
        Def::transient(S::TestMotorLFwd, |m, c| {
            wheel_and_return(m, c, Wheel::Left, WheelDrive::Forward)
        }),
        Def::transient(S::TestMotorLBack, |m, c| {
            wheel_and_return(m, c, Wheel::Left, WheelDrive::Back)
        }),
        Def::transient(S::TestMotorLOff, |m, c| {
            wheel_and_return(m, c, Wheel::Left, WheelDrive::Off)
        }),
        Def::new(
            S::TestMotorR,
            ["Outputs  MotorR ", "Fwd   Back  Stop"],
            [
                to(S::TestMotorRFwd),
                to(S::TestMotorRBack),
                to(S::TestMotorROff),
                to(S::TestBeeper),
            ],
        )
        .exit(|_, c| wheel(c, Wheel::Right, WheelDrive::Off)),
        Def::transient(S::TestMotorRFwd, |m, c| {
            wheel_and_return(m, c, Wheel::Right, WheelDrive::Forward)
        }),
        Def::transient(S::TestMotorRBack, |m, c| {
            wheel_and_return(m, c, Wheel::Right, WheelDrive::Back)
        }),
        Def::transient(S::TestMotorROff, |m, c| {
            wheel_and_return(m, c, Wheel::Right, WheelDrive::Off)
        }),
        Def::new(
            S::TestBeeper,
            ["Outputs  Beeper ", "On    Off       "],
            [to(S::TestBeepOn), to(S::TestBeepOff), NOP, to(S::TestHome)],
        )
        .exit(|_, c| log_failure("silence", c.alert.silence())),
        Def::transient(S::TestBeepOn, |m, c| {
            c.play(Song::PowerUp);
            m.chain(S::TestBeeper, c);
            false
        }),
        Def::transient(S::TestBeepOff, |m, c| {
            log_failure("silence", c.alert.silence());
            m.chain(S::TestBeeper, c);
            false
        }),
    ]
}

fn init_enter(_: &mut Machine, c: &mut CartContext) -> bool {
    c.init_started = c.clock.now();
    true
}

fn init_loop(m: &mut Machine, c: &mut CartContext) {
    c.set_mood(Mood::Ready);
    if c.clock.elapsed_since(c.init_started) >= c.ui.init_delay {
        m.chain(S::ReadyHome, c);
    }
}

fn follow_start_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    c.set_led(true);
    c.set_mood(Mood::Follow);
    log_failure("motor_start", c.motor.start());
    c.fusion.start();
    m.chain(S::FollowWeight, c);
    c.send(&Command::CartStatus { follow: true });
    false
}

fn follow_stop_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    // Stop the accumulator first so no later sample tick can drive the motor.
    c.fusion.stop();
    log_failure("motor_wait", c.motor.set_action(ActionCode::Wait));
    log_failure("motor_stop", c.motor.stop());
    c.set_led(false);
    c.set_mood(Mood::Ready);
    m.chain(S::ReadyHome, c);
    c.send(&Command::CartStatus { follow: false });
    false
}

fn follow_weight_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let text = format!("Cart{} lb ", amount(c.ledger.total_weight()));
    m.set_line(S::FollowWeight, Row::Top, &text);
    true
}

fn follow_loop(m: &mut Machine, c: &mut CartContext) {
    let status = c.fusion.status_line();
    m.set_line(S::FollowWeight, Row::Top, &status);
    m.render(c);
}

fn follow_price_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let text = format!("Cart  ${} ", amount(c.ledger.total_cost()));
    m.set_line(S::FollowPrice, Row::Top, &text);
    true
}

fn scan_ready_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    scan_ready_loop(m, c);
    true
}

fn scan_ready_loop(m: &mut Machine, c: &mut CartContext) {
    if c.pending_scan.is_some() {
        m.chain(S::ScanFetch, c);
    }
}

fn scan_fetch_enter(_: &mut Machine, c: &mut CartContext) -> bool {
    c.lookup_result = None;
    c.scanned = None;
    let Some(upc) = c.pending_scan.take() else {
        c.lookup_result = Some(Lookup::NotFound);
        return true;
    };
    match c.lookup.lookup(&upc) {
        Ok(Lookup::Pending) => {
            if !c.send(&Command::UpcLookup { upc: upc.clone() }) {
                c.lookup_result = Some(Lookup::NotFound);
            }
        }
        Ok(found) => c.lookup_result = Some(found),
        Err(e) => {
            let mapped = crate::hw_error::map_hw_error(e.as_ref());
            tracing::warn!(error = %mapped, upc = %upc, "lookup failed");
            c.lookup_result = Some(Lookup::NotFound);
        }
    }
    c.fetching = Some(upc);
    true
}

fn scan_fetch_loop(m: &mut Machine, c: &mut CartContext) {
    match c.lookup_result.take() {
        None => {}
        Some(Lookup::Found(item)) => {
            c.scanned = Some(item);
            m.chain(S::ScanAccept, c);
        }
        Some(Lookup::NotFound | Lookup::Pending) => m.chain(S::ScanMissing, c),
    }
}

fn scan_fetch_exit(_: &mut Machine, c: &mut CartContext) {
    c.fetching = None;
}

fn scan_accept_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let price = c.scanned.as_ref().map_or(0.0, |i| i.price);
    m.set_line(S::ScanAccept, Row::Top, &format!("Scan  ${} ", amount(price)));
    true
}

fn scan_add_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    if let Some(item) = c.scanned.take() {
        c.ledger.add(&item);
    }
    m.chain(S::FollowPrice, c);
    false
}

fn scan_del_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    if let Some(item) = c.scanned.take() {
        c.ledger.remove(&item);
    }
    m.chain(S::FollowPrice, c);
    false
}

fn help_send_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let sent = c.send(&Command::CustAlert {
        message: "Help requested".into(),
    });
    if !sent {
        m.chain(S::HelpLost, c);
    }
    sent
}

fn help_sent_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let text = c
        .help_message
        .take()
        .unwrap_or_else(|| "Help call sent!".into());
    m.set_line(S::HelpSent, Row::Top, &text);
    c.play(Song::Help);
    true
}

fn setup_target_ip_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    m.set_line(S::SetupTargetIp, Row::Bottom, &c.ui.local_addr);
    true
}

fn setup_server_ip_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    m.set_line(S::SetupServerIp, Row::Bottom, &c.ui.cloud_addr);
    true
}

fn setup_server_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let next = if c.uplink_enabled {
        S::SetupServerEnabled
    } else {
        S::SetupServerDisabled
    };
    m.chain(next, c);
    false
}

fn setup_server_enable_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    c.uplink_enabled = true;
    tracing::info!("uplink enabled");
    m.chain(S::SetupServerEnabled, c);
    false
}

fn setup_server_disable_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    c.uplink_enabled = false;
    tracing::info!("uplink disabled");
    m.chain(S::SetupServerDisabled, c);
    false
}

fn test_analog_loop(m: &mut Machine, c: &mut CartContext) {
    let (l, r) = c.analog;
    m.set_line(S::TestAnalog, Row::Bottom, &format!("L{l:>5} R{r:>7} "));
    m.render(c);
}

fn test_mood_init_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    c.test_mood = Mood::Ready;
    c.prev_mood = c.mood;
    m.chain(S::TestMood, c);
    false
}

fn test_mood_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    let text = format!("Mood{:>12}", c.test_mood.label());
    m.set_line(S::TestMood, Row::Top, &text);
    true
}

fn test_mood_exit(_: &mut Machine, c: &mut CartContext) {
    if let Some(prev) = c.prev_mood {
        c.force_mood(prev);
    }
}

fn test_mood_play_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    c.force_mood(c.test_mood);
    m.chain(S::TestMood, c);
    false
}

fn test_mood_next_enter(m: &mut Machine, c: &mut CartContext) -> bool {
    c.test_mood = c.test_mood.next();
    m.chain(S::TestMood, c);
    false
}

fn wheel(c: &mut CartContext, w: Wheel, drive: WheelDrive) {
    log_failure("drive_wheel", c.motor.drive_wheel(w, drive));
}

fn wheel_and_return(m: &mut Machine, c: &mut CartContext, w: Wheel, drive: WheelDrive) -> bool {
    wheel(c, w, drive);
    let home = match w {
        Wheel::Left => S::TestMotorL,
        Wheel::Right => S::TestMotorR,
    };
    m.chain(home, c);
    false
}
