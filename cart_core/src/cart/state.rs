//! State identities of the cart UI.

use crate::fsm::StateKey;

macro_rules! states {
    ($($id:ident),+ $(,)?) => {
        /// Every screen and pass-through action of the cart UI.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StateId {
            $($id),+
        }

        impl StateId {
            pub const ALL: &'static [Self] = &[$(Self::$id),+];
        }

        impl StateKey for StateId {
            const COUNT: usize = Self::ALL.len();

            #[inline]
            fn index(self) -> usize {
                self as usize
            }

            fn from_index(idx: usize) -> Option<Self> {
                Self::ALL.get(idx).copied()
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$id => stringify!($id)),+
                }
            }
        }
    };
}

states! {
    Init,
    Shutdown,
    ReadyHome,
    FollowStart,
    FollowStop,
    FollowWeight,
    FollowPrice,
    ScanReady,
    ScanFetch,
    ScanAccept,
    ScanAdd,
    ScanDel,
    ScanMissing,
    HelpSend,
    HelpSent,
    HelpLost,
    SetupHome,
    SetupTargetIp,
    SetupServer,
    SetupServerDisabled,
    SetupServerEnable,
    SetupServerEnabled,
    SetupServerDisable,
    SetupServerIp,
    TestHome,
    TestAnalog,
    TestInputs,
    TestMoodInit,
    TestMood,
    TestMoodPlay,
    TestMoodNext,
    TestMotorL,
    TestMotorLFwd,
    TestMotorLBack,
    TestMotorLOff,
    TestMotorR,
    TestMotorRFwd,
    TestMotorRBack,
    TestMotorROff,
    TestBeeper,
    TestBeepOn,
    TestBeepOff,
}
