//! End-to-end scenarios driving `CartController` through spies.

use std::time::Duration;

use cart_core::error::CartError;
use cart_core::fsm::FsmError;
use cart_core::mocks::{DeferredLookup, Effect, Effects, QueueScanner, SpyUplink};
use cart_core::{CartController, Key, Row, SensorMode, StateId};
use cart_traits::{
    ActionCode, BoxError, Direction, Item, ItemLookup, Lookup, ManualClock, Mood, Song, Speed,
    Wheel, WheelDrive,
};
use rstest::rstest;

struct Shelf(Vec<Item>);

impl ItemLookup for Shelf {
    fn lookup(&mut self, upc: &str) -> Result<Lookup, BoxError> {
        Ok(self
            .0
            .iter()
            .find(|i| i.upc == upc)
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found))
    }
}

fn shelf() -> Shelf {
    Shelf(vec![
        Item::new("760557824961", 7.45, 0.2).named("microSD"),
        Item::new("941047822994", 2.21, 0.3).named("ROM Cherry"),
    ])
}

struct Rig {
    cart: CartController,
    fx: Effects,
    clock: ManualClock,
    scanner: QueueScanner,
}

impl Rig {
    fn build(
        lookup: impl ItemLookup + 'static,
        uplink: Option<SpyUplink>,
        mode: SensorMode,
        fx: Effects,
    ) -> Self {
        let clock = ManualClock::new();
        let scanner = QueueScanner::default();
        let mut b = CartController::builder()
            .with_display(fx.spy_display())
            .with_motor(fx.spy_motor())
            .with_alert(fx.spy_alert())
            .with_lookup(lookup)
            .with_scanner(scanner.clone())
            .with_clock(clock.clone())
            .with_mode(mode);
        if let Some(u) = uplink {
            b = b.with_uplink(u);
        }
        let mut cart = b.build().unwrap();
        cart.start().unwrap();
        Self {
            cart,
            fx,
            clock,
            scanner,
        }
    }

    fn new() -> Self {
        let fx = Effects::new();
        let uplink = fx.spy_uplink();
        Self::build(shelf(), Some(uplink), SensorMode::Scripted, fx)
    }

    /// Past the splash screen.
    fn ready(mut self) -> Self {
        self.clock.advance(Duration::from_secs(2));
        self.cart.tick().unwrap();
        assert_eq!(self.cart.state(), StateId::ReadyHome);
        self
    }

    fn following(mut self) -> Self {
        self = self.ready();
        self.cart.dispatch_key(Key::K1).unwrap();
        assert_eq!(self.cart.state(), StateId::FollowWeight);
        self
    }

    fn keys(&mut self, keys: &[Key]) {
        for k in keys {
            self.cart.dispatch_key(*k).unwrap();
        }
    }
}

#[test]
fn splash_waits_for_init_delay() {
    let mut rig = Rig::new();
    assert_eq!(rig.cart.state(), StateId::Init);
    assert_eq!(rig.cart.line(Row::Top), "Follow Me Cart! ");

    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::Init);
    assert_eq!(rig.cart.mood(), Some(Mood::Ready));

    rig.clock.advance(Duration::from_millis(1999));
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::Init);

    rig.clock.advance(Duration::from_millis(1));
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ReadyHome);
    assert_eq!(
        rig.fx.screen(),
        (
            Some("MyCart!         ".into()),
            Some("Go    Setup Test".into())
        )
    );
}

#[test]
fn any_key_skips_the_splash() {
    let mut rig = Rig::new();
    rig.cart.dispatch_key(Key::K3).unwrap();
    assert_eq!(rig.cart.state(), StateId::ReadyHome);
}

#[test]
fn follow_start_then_stop() {
    let mut rig = Rig::new().ready();
    rig.fx.take();

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
    assert!(rig.cart.is_following());
    let log = rig.fx.take();
    assert!(log.contains(&Effect::Play(Song::KeyPress)));
    assert!(log.contains(&Effect::Led(true)));
    assert!(log.contains(&Effect::MotorStart));
    assert!(log.contains(&Effect::Mood(Mood::Follow)));
    assert!(log.contains(&Effect::Send("cart_status:follow=on;".into())));
    // transient state never draws itself
    let renders: Vec<_> = log
        .iter()
        .filter(|e| matches!(e, Effect::Render(..)))
        .collect();
    assert_eq!(renders.len(), 1);
    assert_eq!(rig.cart.line(Row::Top), "Cart    0.00 lb ");

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::ReadyHome);
    assert!(!rig.cart.is_following());
    let log = rig.fx.take();
    assert!(log.contains(&Effect::Action(ActionCode::Wait)));
    assert!(log.contains(&Effect::MotorStop));
    assert!(log.contains(&Effect::Led(false)));
    assert!(log.contains(&Effect::Send("cart_status:follow=off;".into())));
    assert_eq!(rig.cart.mood(), Some(Mood::Ready));

    assert_eq!(rig.cart.sample_tick(), None);
}

#[test]
fn scripted_follow_escalates_mood_while_lost() {
    let mut rig = Rig::new().following();
    rig.cart.set_target_found(false);

    let mut moods = Vec::new();
    for _ in 0..7 {
        rig.cart.sample_tick();
        moods.push(rig.cart.mood().unwrap());
    }
    assert_eq!(
        moods,
        vec![
            Mood::Follow,
            Mood::Follow,
            Mood::Looking,
            Mood::Looking,
            Mood::Looking,
            Mood::Looking,
            Mood::Lost,
        ]
    );

    rig.cart.set_target_found(true);
    rig.cart.sample_tick();
    assert_eq!(rig.cart.mood(), Some(Mood::Follow));
    // scripted follow never commands the motor
    assert!(rig.fx.actions().is_empty());
}

#[test]
fn scripted_follow_keeps_following_without_presence_input() {
    let mut rig = Rig::new().following();
    for _ in 0..3 {
        assert_eq!(rig.cart.sample_tick(), None);
    }
    assert_eq!(rig.cart.mood(), Some(Mood::Follow));
}

#[test]
fn follow_screen_shows_direction_on_tick() {
    let mut rig = Rig::new().following();
    rig.cart.set_target_found(true);
    rig.cart.sample_tick();
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.line(Row::Top), " straight slow  ");
}

#[test]
fn sampled_follow_drives_the_motor() {
    let fx = Effects::new();
    let mut rig = Rig::build(shelf(), None, SensorMode::Sampled, fx).following();
    for _ in 0..10 {
        rig.cart.sample(300, 300);
    }
    let action = rig.cart.sample_tick();
    assert_eq!(
        action,
        Some(ActionCode::Move(Direction::Straight, Speed::Fast))
    );
    assert_eq!(rig.fx.actions().last(), action.as_ref());
    assert_eq!(rig.cart.mood(), Some(Mood::Follow));
}

#[test]
fn sampled_follow_with_no_target_waits() {
    let fx = Effects::new();
    let mut rig = Rig::build(shelf(), None, SensorMode::Sampled, fx).following();
    for _ in 0..3 {
        assert_eq!(rig.cart.sample_tick(), Some(ActionCode::Wait));
    }
    assert_eq!(rig.cart.mood(), Some(Mood::Looking));
}

#[test]
fn scan_found_then_add_updates_ledger() {
    let mut rig = Rig::new().following();
    rig.scanner.push("760557824961\n");

    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanFetch);
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanAccept);
    assert_eq!(rig.cart.line(Row::Top), "Scan  $    7.45 ");

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowPrice);
    assert!((rig.cart.ledger().total_cost() - 7.45).abs() < 1e-9);
    assert!((rig.cart.ledger().total_weight() - 0.2).abs() < 1e-9);
    assert_eq!(rig.cart.line(Row::Top), "Cart  $    7.45 ");

    rig.cart.dispatch_key(Key::K4).unwrap();
    assert_eq!(rig.cart.line(Row::Top), "Cart    0.20 lb ");
}

#[test]
fn scan_delete_floors_at_zero() {
    let mut rig = Rig::new().following();
    rig.cart.scan("941047822994");
    rig.cart.tick().unwrap();
    rig.cart.tick().unwrap();
    rig.cart.dispatch_key(Key::K2).unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowPrice);
    assert_eq!(rig.cart.ledger().total_cost(), 0.0);
    assert_eq!(rig.cart.ledger().total_weight(), 0.0);
}

#[test]
fn unknown_upc_lands_on_missing() {
    let mut rig = Rig::new().following();
    rig.cart.scan("000000000000");
    rig.cart.tick().unwrap();
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanMissing);

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanReady);
    rig.cart.dispatch_key(Key::K4).unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
}

#[test]
fn blank_scans_are_ignored() {
    let mut rig = Rig::new().following();
    rig.cart.scan("  \n");
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
}

#[test]
fn scan_from_ready_screen_is_routed_to_scanner() {
    let mut rig = Rig::new().ready();
    rig.cart.scan("760557824961");
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanFetch);
}

#[test]
fn deferred_lookup_waits_for_peer_reply() {
    let fx = Effects::new();
    let uplink = fx.spy_uplink();
    let mut rig = Rig::build(DeferredLookup, Some(uplink), SensorMode::Scripted, fx).following();
    rig.cart.scan("2839903352");
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanFetch);
    assert!(rig.fx.sent().contains(&"upc_lookup:upc=2839903352;".to_string()));

    // nothing yet: stays put
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanFetch);

    let reply = rig
        .cart
        .handle_line("re_upc_lookup:price=5.62,weight=0.4,name=GUM Toothbrush;");
    assert_eq!(reply, None);
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanAccept);
    rig.cart.dispatch_key(Key::K1).unwrap();
    assert!((rig.cart.ledger().total_cost() - 5.62).abs() < 1e-9);
}

#[test]
fn deferred_lookup_nak_is_missing() {
    let fx = Effects::new();
    let uplink = fx.spy_uplink();
    let mut rig = Rig::build(DeferredLookup, Some(uplink), SensorMode::Scripted, fx).following();
    rig.cart.scan("1");
    rig.cart.tick().unwrap();
    rig.cart
        .handle_line("re_upc_lookup:status=nak,message=not found;");
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanMissing);
}

#[test]
fn deferred_lookup_without_uplink_is_missing() {
    let fx = Effects::new();
    let mut rig = Rig::build(DeferredLookup, None, SensorMode::Scripted, fx).following();
    rig.cart.scan("1");
    rig.cart.tick().unwrap();
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanMissing);
}

#[test]
fn late_lookup_reply_is_dropped() {
    let mut rig = Rig::new().following();
    rig.cart
        .handle_line("re_upc_lookup:price=1,weight=1;");
    rig.cart.dispatch_key(Key::K2).unwrap();
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.state(), StateId::ScanReady);
}

#[rstest]
#[case("cart_status:follow=on;", "re_cart_status:status=ack;", StateId::FollowWeight)]
#[case("cart_status:follow=off;", "re_cart_status:status=ack;", StateId::ReadyHome)]
#[case(
    "upc_add:upc=1,price=2.5,weight=1.25;",
    "re_upc_add:status=ack;",
    StateId::ReadyHome
)]
#[case(
    "cust_alert:message=Aisle 5, please;",
    "re_cust_alert:status=ack;",
    StateId::HelpSent
)]
#[case("hello;", "no_command:status=nak,message=hello;", StateId::ReadyHome)]
#[case(
    "cart_status:follow=maybe;",
    "no_command:status=nak,message=cart_status:follow=maybe;",
    StateId::ReadyHome
)]
#[case(
    "upc_lookup:upc=1;",
    "no_command:status=nak,message=upc_lookup:upc=1;",
    StateId::ReadyHome
)]
fn network_dispatch(#[case] line: &str, #[case] reply: &str, #[case] state: StateId) {
    let mut rig = Rig::new().ready();
    assert_eq!(rig.cart.handle_line(line).as_deref(), Some(reply));
    assert_eq!(rig.cart.state(), state);
}

#[test]
fn remote_add_refreshes_follow_screen() {
    let mut rig = Rig::new().following();
    rig.cart
        .handle_line("upc_add:upc=1,price=2.5,weight=1.25;\n");
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
    assert_eq!(rig.cart.line(Row::Top), "Cart    1.25 lb ");

    rig.cart.handle_line("upc_del:upc=1,price=9,weight=0.25;");
    assert_eq!(rig.cart.ledger().total_cost(), 0.0);
    assert!((rig.cart.ledger().total_weight() - 1.0).abs() < 1e-9);
}

#[test]
fn remote_add_moves_totals_by_the_item() {
    let mut rig = Rig::new().ready();
    let cost = rig.cart.ledger().total_cost();
    let weight = rig.cart.ledger().total_weight();
    assert_eq!(
        rig.cart
            .handle_line("upc_add:upc=123456789,price=5.34,weight=1.23;")
            .as_deref(),
        Some("re_upc_add:status=ack;")
    );
    assert!((rig.cart.ledger().total_cost() - cost - 5.34).abs() < 1e-9);
    assert!((rig.cart.ledger().total_weight() - weight - 1.23).abs() < 1e-9);
}

#[rstest]
#[case("upc_add:upc=1,price=-5,weight=-1;")]
#[case("upc_add:upc=1,price=5,weight=-1;")]
#[case("upc_del:upc=1,price=-5,weight=1;")]
fn negative_remote_amounts_are_refused(#[case] line: &str) {
    let mut rig = Rig::new().ready();
    let reply = rig.cart.handle_line(line).unwrap();
    assert!(reply.starts_with("no_command:status=nak,"), "{reply}");
    assert_eq!(rig.cart.ledger().total_cost(), 0.0);
    assert_eq!(rig.cart.ledger().total_weight(), 0.0);
}

#[test]
fn incoming_alert_shows_message() {
    let mut rig = Rig::new().following();
    rig.fx.take();
    rig.cart.handle_line("cust_alert:message=On my way;");
    assert_eq!(rig.cart.state(), StateId::HelpSent);
    assert_eq!(rig.cart.line(Row::Top), "On my way       ");
    assert!(rig.fx.snapshot().contains(&Effect::Play(Song::Help)));
}

#[test]
fn help_request_acked_by_peer() {
    let mut rig = Rig::new().following();
    rig.cart.dispatch_key(Key::K3).unwrap();
    assert_eq!(rig.cart.state(), StateId::HelpSend);
    assert!(
        rig.fx
            .sent()
            .contains(&"cust_alert:message=Help requested;".to_string())
    );

    assert_eq!(rig.cart.handle_line("re_cust_alert:status=ack;"), None);
    assert_eq!(rig.cart.state(), StateId::HelpSent);
    assert_eq!(rig.cart.line(Row::Top), "Help call sent! ");

    rig.cart.dispatch_key(Key::K4).unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
}

#[test]
fn help_request_rejected_by_peer() {
    let mut rig = Rig::new().following();
    rig.cart.dispatch_key(Key::K3).unwrap();
    rig.cart
        .handle_line("no_command:status=nak,message=cust_alert:message=Help requested;");
    assert_eq!(rig.cart.state(), StateId::HelpLost);
}

#[test]
fn help_request_without_peer_is_lost_and_resendable() {
    let fx = Effects::new();
    let uplink = fx.spy_uplink().failing();
    let mut rig = Rig::build(shelf(), Some(uplink), SensorMode::Scripted, fx).following();

    rig.cart.dispatch_key(Key::K3).unwrap();
    assert_eq!(rig.cart.state(), StateId::HelpLost);
    assert_eq!(rig.cart.line(Row::Top), "Help not sent   ");

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::HelpLost);
    rig.cart.dispatch_key(Key::K3).unwrap();
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
}

#[test]
fn setup_toggles_uplink() {
    let mut rig = Rig::new().ready();
    rig.keys(&[Key::K2, Key::K2]);
    assert_eq!(rig.cart.state(), StateId::SetupServerEnabled);
    assert!(rig.cart.uplink_enabled());

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::SetupServerDisabled);
    assert!(!rig.cart.uplink_enabled());

    // revisiting the screen keeps the setting
    rig.keys(&[Key::K4, Key::K4, Key::K2]);
    assert_eq!(rig.cart.state(), StateId::SetupServerDisabled);

    // follow start no longer reaches the peer
    rig.keys(&[Key::K4, Key::K4, Key::K3, Key::K1]);
    assert_eq!(rig.cart.state(), StateId::FollowWeight);
    assert!(rig.fx.sent().is_empty());
}

#[test]
fn setup_screens_show_addresses() {
    let mut rig = Rig::new().ready();
    rig.keys(&[Key::K2, Key::K1]);
    assert_eq!(rig.cart.state(), StateId::SetupTargetIp);
    assert_eq!(rig.cart.line(Row::Bottom), "127.0.0.1       ");
    rig.keys(&[Key::K4, Key::K2, Key::K4]);
    assert_eq!(rig.cart.state(), StateId::SetupServerIp);
    assert_eq!(rig.cart.line(Row::Bottom), "not set         ");
}

#[test]
fn test_mood_restores_previous_mood() {
    let mut rig = Rig::new().ready();
    rig.keys(&[Key::K3, Key::K1, Key::K4, Key::K4]);
    assert_eq!(rig.cart.state(), StateId::TestMood);
    assert_eq!(rig.cart.line(Row::Top), "Mood       READY");

    rig.keys(&[Key::K2, Key::K2]);
    assert_eq!(rig.cart.line(Row::Top), "Mood     LOOKING");
    rig.fx.take();
    rig.cart.dispatch_key(Key::K1).unwrap();
    assert!(rig.fx.take().contains(&Effect::Mood(Mood::Looking)));
    assert_eq!(rig.cart.mood(), Some(Mood::Looking));

    rig.cart.dispatch_key(Key::K4).unwrap();
    assert_eq!(rig.cart.state(), StateId::TestMotorL);
    assert_eq!(rig.cart.mood(), Some(Mood::Ready));
}

#[test]
fn wheel_tests_drive_and_release() {
    let mut rig = Rig::new().ready();
    rig.keys(&[Key::K3, Key::K2]);
    assert_eq!(rig.cart.state(), StateId::TestMotorL);
    rig.fx.take();

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert_eq!(rig.cart.state(), StateId::TestMotorL);
    let wheels: Vec<_> = rig
        .fx
        .take()
        .into_iter()
        .filter(|e| matches!(e, Effect::Wheel(..)))
        .collect();
    assert_eq!(
        wheels,
        vec![
            Effect::Wheel(Wheel::Left, WheelDrive::Off),
            Effect::Wheel(Wheel::Left, WheelDrive::Forward),
        ]
    );

    rig.cart.dispatch_key(Key::K4).unwrap();
    assert_eq!(rig.cart.state(), StateId::TestMotorR);
    assert!(
        rig.fx
            .take()
            .contains(&Effect::Wheel(Wheel::Left, WheelDrive::Off))
    );

    rig.keys(&[Key::K2, Key::K4]);
    assert_eq!(rig.cart.state(), StateId::TestBeeper);
    assert!(
        rig.fx
            .take()
            .contains(&Effect::Wheel(Wheel::Right, WheelDrive::Back))
    );

    rig.cart.dispatch_key(Key::K1).unwrap();
    assert!(rig.fx.take().contains(&Effect::Play(Song::PowerUp)));
    rig.cart.dispatch_key(Key::K4).unwrap();
    assert_eq!(rig.cart.state(), StateId::TestHome);
    assert!(rig.fx.take().contains(&Effect::Silence));
}

#[test]
fn analog_screen_mirrors_raw_samples() {
    let mut rig = Rig::new().ready();
    rig.keys(&[Key::K3, Key::K1]);
    rig.cart.sample(12, 345);
    rig.cart.tick().unwrap();
    assert_eq!(rig.cart.line(Row::Bottom), "L   12 R    345 ");
    assert_eq!(rig.fx.screen().1.as_deref(), Some("L   12 R    345 "));
}

#[test]
fn refresh_redraws_current_screen() {
    let mut rig = Rig::new().ready();
    rig.fx.take();
    rig.cart.refresh();
    assert_eq!(
        rig.fx.take(),
        vec![Effect::Render(
            Some("MyCart!         ".into()),
            Some("Go    Setup Test".into())
        )]
    );
}

#[test]
fn goto_named_rejects_unknown_state() {
    let mut rig = Rig::new().ready();
    let err = rig.cart.goto_named("Nowhere").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CartError>(),
        Some(CartError::Fsm(FsmError::UnknownState(_)))
    ));
    assert_eq!(rig.cart.state(), StateId::ReadyHome);

    rig.cart.goto_named("TestHome").unwrap();
    assert_eq!(rig.cart.state(), StateId::TestHome);
}

#[test]
fn shutdown_parks_everything() {
    let mut rig = Rig::new().following();
    rig.fx.take();
    rig.cart.shutdown();
    assert_eq!(rig.cart.state(), StateId::Shutdown);
    assert!(!rig.cart.is_following());
    let log = rig.fx.take();
    assert!(log.contains(&Effect::MotorStop));
    assert!(log.contains(&Effect::Led(false)));
    assert!(log.contains(&Effect::Play(Song::PowerDown)));
    assert_eq!(rig.cart.line(Row::Bottom), "  Bye...        ");
    // no way out of the shutdown screen
    rig.keys(&Key::ALL);
    assert_eq!(rig.cart.state(), StateId::Shutdown);
}
