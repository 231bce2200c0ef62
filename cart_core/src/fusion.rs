//! Proximity fusion: trimmed-mean smoothing, action classification and the
//! lost-target accumulator that drives mood.
//!
//! Each channel keeps a circular window of raw readings. Once per sample
//! period the two windows are reduced with a two-pass 2σ trimmed mean:
//!
//! ```text
//! mean, σ over valid samples
//! keep x where mean - 2σ <= x <= mean + 2σ
//! reading = mean(kept)          (0 when nothing is kept)
//! ```
//!
//! `distance = right + left` and `spread = right - left` are then mapped to
//! one [`ActionCode`]. A `Wait` means the target is centered and close, so
//! the cart holds position; while it keeps waiting the accumulator grows by
//! one sample period per step.

use std::time::Duration;

use cart_traits::{ActionCode, Direction, Mood, Speed};

use crate::config::FollowCfg;

/// Default number of readings held per channel.
pub const WINDOW_CAPACITY: usize = 1024;

/// Circular buffer of raw readings. Only filled slots take part in the mean.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: Vec<i32>,
    cursor: usize,
    len: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            cursor: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, v: i32) {
        self.buf[self.cursor] = v;
        self.cursor = (self.cursor + 1) % self.buf.len();
        self.len = (self.len + 1).min(self.buf.len());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Valid samples in storage order (not arrival order once wrapped).
    #[inline]
    pub fn samples(&self) -> &[i32] {
        &self.buf[..self.len]
    }

    pub fn filtered_mean(&self) -> f64 {
        trimmed_mean(self.samples())
    }
}

/// Two-pass 2σ trimmed mean using the population standard deviation.
/// Bounds are inclusive; an empty input (or an empty kept set) yields 0.
pub fn trimmed_mean(samples: &[i32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&x| {
            let d = f64::from(x) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let band = 2.0 * var.sqrt();
    let (lo, hi) = (mean - band, mean + band);

    let (sum, kept) = samples
        .iter()
        .map(|&x| f64::from(x))
        .filter(|x| (lo..=hi).contains(x))
        .fold((0.0, 0u32), |(s, k), x| (s + x, k + 1));
    if kept == 0 { 0.0 } else { sum / f64::from(kept) }
}

/// Map a distance/spread pair to a motor command.
///
/// The dead band `|spread| < 10 && |distance| < 50` (both strict) is `Wait`.
/// Otherwise the spread picks the direction (beyond ±100) and the distance
/// picks the speed: above 1200 stop, above 600 medium, else fast.
pub fn classify(distance: f64, spread: f64) -> ActionCode {
    if spread > -10.0 && spread < 10.0 && distance > -50.0 && distance < 50.0 {
        return ActionCode::Wait;
    }
    let dir = if spread < -100.0 {
        Direction::Left
    } else if spread > 100.0 {
        Direction::Right
    } else {
        Direction::Straight
    };
    let speed = if distance > 1200.0 {
        Speed::Stop
    } else if distance > 600.0 {
        Speed::Medium
    } else {
        Speed::Fast
    };
    ActionCode::Move(dir, speed)
}

/// Result of one sensor-driven follow step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionReading {
    pub distance: f64,
    pub spread: f64,
    pub action: ActionCode,
    pub mood: Mood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    Action(ActionCode),
    Scripted { found: bool },
}

/// Both channel windows plus the follow accumulator.
#[derive(Debug, Clone)]
pub struct SensorFusion {
    left: SampleWindow,
    right: SampleWindow,
    cfg: FollowCfg,
    running: bool,
    lost_for: Duration,
    last: Option<Observation>,
}

impl SensorFusion {
    pub fn new(cfg: FollowCfg) -> Self {
        Self {
            left: SampleWindow::new(cfg.window),
            right: SampleWindow::new(cfg.window),
            cfg,
            running: false,
            lost_for: Duration::ZERO,
            last: None,
        }
    }

    pub fn sample(&mut self, left: i32, right: i32) {
        self.left.push(left);
        self.right.push(right);
    }

    pub fn distance(&self) -> f64 {
        self.right.filtered_mean() + self.left.filtered_mean()
    }

    pub fn spread(&self) -> f64 {
        self.right.filtered_mean() - self.left.filtered_mean()
    }

    pub fn start(&mut self) {
        self.running = true;
        self.lost_for = Duration::ZERO;
        tracing::debug!("follow started");
    }

    /// After `stop` no step produces an action until the next `start`.
    pub fn stop(&mut self) {
        self.running = false;
        self.lost_for = Duration::ZERO;
        tracing::debug!("follow stopped");
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn sample_period(&self) -> Duration {
        self.cfg.sample_period
    }

    /// Time the target has been missing.
    #[inline]
    pub fn lost_for(&self) -> Duration {
        self.lost_for
    }

    /// One sample-period cycle from the windows. `None` while stopped.
    pub fn step(&mut self) -> Option<FusionReading> {
        if !self.running {
            return None;
        }
        let distance = self.distance();
        let spread = self.spread();
        let action = classify(distance, spread);
        if action == ActionCode::Wait {
            self.lost_for = self.lost_for.saturating_add(self.cfg.sample_period);
        } else {
            self.lost_for = Duration::ZERO;
        }
        self.last = Some(Observation::Action(action));
        let mood = self.mood();
        tracing::trace!(distance, spread, %action, ?mood, "fusion step");
        Some(FusionReading {
            distance,
            spread,
            action,
            mood,
        })
    }

    /// Sensorless step: the caller states whether the target is in view.
    /// Classification is bypassed; only the accumulator moves.
    pub fn step_scripted(&mut self, found: bool) -> Option<Mood> {
        if !self.running {
            return None;
        }
        if found {
            self.lost_for = Duration::ZERO;
        } else {
            self.lost_for = self.lost_for.saturating_add(self.cfg.sample_period);
        }
        self.last = Some(Observation::Scripted { found });
        Some(self.mood())
    }

    /// Follow mood from the accumulator, strict thresholds.
    pub fn mood(&self) -> Mood {
        if self.lost_for > self.cfg.lost {
            Mood::Lost
        } else if self.lost_for > self.cfg.worry {
            Mood::Looking
        } else {
            Mood::Follow
        }
    }

    /// Sixteen-column description of the latest step.
    pub fn status_line(&self) -> String {
        let waiting = |mood: Mood, idle: &str| -> String {
            match mood {
                Mood::Lost => " ...lost!!...   ".into(),
                Mood::Looking => " ...looking...  ".into(),
                _ => idle.into(),
            }
        };
        match self.last {
            None => "<no sensor data>".into(),
            Some(Observation::Action(ActionCode::Wait)) => waiting(self.mood(), "Waiting...      "),
            Some(Observation::Action(ActionCode::Move(d, s))) => {
                let dir = match d {
                    Direction::Left => "Left    ",
                    Direction::Right => "Right   ",
                    Direction::Straight => "Straight",
                };
                let speed = match s {
                    Speed::Stop => " stop.  ",
                    Speed::Medium => " slow.  ",
                    Speed::Fast => " fast.  ",
                };
                format!("{dir}{speed}")
            }
            Some(Observation::Scripted { found: true }) => " straight slow  ".into(),
            Some(Observation::Scripted { found: false }) => {
                waiting(self.mood(), " ...waiting...  ")
            }
        }
    }
}
