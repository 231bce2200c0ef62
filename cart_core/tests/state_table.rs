use cart_core::fsm::{StateKey, Target};
use cart_core::mocks::Effects;
use cart_core::{CartController, StateId};
use rstest::rstest;

fn cart() -> CartController {
    let fx = Effects::new();
    let mut cart = CartController::builder()
        .with_display(fx.spy_display())
        .with_motor(fx.spy_motor())
        .build()
        .expect("cart table must validate");
    cart.start().unwrap();
    cart
}

#[test]
fn every_state_is_enterable_by_name() {
    for s in StateId::ALL {
        let mut c = cart();
        c.goto_named(s.name())
            .unwrap_or_else(|e| panic!("entering {} failed: {e}", s.name()));
    }
}

// Pass-through states never remain current after being entered.
#[rstest]
#[case(StateId::FollowStart, StateId::FollowWeight)]
#[case(StateId::FollowStop, StateId::ReadyHome)]
#[case(StateId::ScanAdd, StateId::FollowPrice)]
#[case(StateId::ScanDel, StateId::FollowPrice)]
#[case(StateId::SetupServerEnable, StateId::SetupServerEnabled)]
#[case(StateId::SetupServerDisable, StateId::SetupServerDisabled)]
#[case(StateId::TestMoodInit, StateId::TestMood)]
#[case(StateId::TestMoodPlay, StateId::TestMood)]
#[case(StateId::TestMoodNext, StateId::TestMood)]
#[case(StateId::TestMotorLFwd, StateId::TestMotorL)]
#[case(StateId::TestMotorROff, StateId::TestMotorR)]
#[case(StateId::TestBeepOn, StateId::TestBeeper)]
#[case(StateId::TestBeepOff, StateId::TestBeeper)]
fn transient_states_hand_off(#[case] transient: StateId, #[case] lands: StateId) {
    let mut c = cart();
    c.goto_named(transient.name()).unwrap();
    assert_eq!(c.state(), lands);
}

#[test]
fn state_names_are_unique() {
    let mut names: Vec<_> = StateId::ALL.iter().map(|s| s.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), StateId::COUNT);
}

#[test]
fn target_nop_is_distinct_from_every_state() {
    for s in StateId::ALL {
        assert_ne!(Target::State(*s), Target::Nop);
    }
}
