//! Value types shared between the controller and its collaborators.

use std::fmt;
use std::str::FromStr;

/// Steering component of a motor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Straight,
}

impl Direction {
    pub const fn code(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
            Self::Straight => 'S',
        }
    }
}

/// Throttle component of a motor command. `Stop` is used when the target is
/// far enough away that the cart should hold position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speed {
    Stop,
    Medium,
    Fast,
}

impl Speed {
    pub const fn code(self) -> char {
        match self {
            Self::Stop => 'P',
            Self::Medium => 'M',
            Self::Fast => 'F',
        }
    }
}

/// Discrete motor command produced once per sample period.
///
/// Wire form is `W` for wait, otherwise direction followed by speed
/// (`LF`, `SM`, `RP`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCode {
    Wait,
    Move(Direction, Speed),
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wait => f.write_str("W"),
            Self::Move(d, s) => write!(f, "{}{}", d.code(), s.code()),
        }
    }
}

/// Error returned when an action code string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionError(pub String);

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action code: {:?}", self.0)
    }
}

impl std::error::Error for ParseActionError {}

impl FromStr for ActionCode {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let parsed = match (chars.next(), chars.next(), chars.next()) {
            (Some('W'), None, None) => Some(Self::Wait),
            (Some(d), Some(v), None) => {
                let dir = match d {
                    'L' => Some(Direction::Left),
                    'R' => Some(Direction::Right),
                    'S' => Some(Direction::Straight),
                    _ => None,
                };
                let speed = match v {
                    'P' => Some(Speed::Stop),
                    'M' => Some(Speed::Medium),
                    'F' => Some(Speed::Fast),
                    _ => None,
                };
                dir.zip(speed).map(|(d, v)| Self::Move(d, v))
            }
            _ => None,
        };
        parsed.ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Cart mood, shown through backlight colour and buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    Ready,
    Follow,
    Looking,
    Lost,
}

impl Mood {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Follow => "FOLLOW",
            Self::Looking => "LOOKING",
            Self::Lost => "LOST",
        }
    }

    /// Cycle order used by the mood test screen.
    pub const fn next(self) -> Self {
        match self {
            Self::Ready => Self::Follow,
            Self::Follow => Self::Looking,
            Self::Looking => Self::Lost,
            Self::Lost => Self::Ready,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Buzzer tunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Song {
    PowerUp,
    PowerDown,
    Following,
    Waiting,
    Ok,
    KeyPress,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDrive {
    Forward,
    Back,
    Off,
}

/// A catalog entry. Price in currency units, weight in pounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub upc: String,
    pub name: Option<String>,
    pub price: f64,
    pub weight: f64,
}

impl Item {
    pub fn new(upc: impl Into<String>, price: f64, weight: f64) -> Self {
        Self {
            upc: upc.into(),
            name: None,
            price,
            weight,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Outcome of a UPC lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Item),
    NotFound,
    /// The answer will be delivered asynchronously.
    Pending,
}
