//! Table-driven finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ StateDef table, one row per StateKey index                       │
//! │ ┌──────────┬──────────────┬───────────────┬──────────────────┐   │
//! │ │ id       │ lines [2]    │ keys [4]      │ enter/loop/exit  │   │
//! │ ├──────────┼──────────────┼───────────────┼──────────────────┤   │
//! │ │ Home     │ "Menu  ..."  │ Go,Nop,..     │ -, -, -          │   │
//! │ │ Start    │ "" ""        │ Nop x4        │ enter -> chain   │   │
//! │ └──────────┴──────────────┴───────────────┴──────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A transition runs the current state's `on_exit`, moves the cursor, then
//! runs the new state's `on_enter`. Hooks get `&mut StateMachine` and may
//! chain into further transitions before returning. An enter hook returning
//! `false` suppresses the render of its own state, which is how transient
//! states hand off without flashing blank screens. The display text of each
//! state lives in a mutable buffer seeded from the table's templates.

use std::fmt;

use thiserror::Error;

use crate::util::{LCD_COLS, fit_line};

/// Deepest allowed chain of hook-initiated transitions.
pub const MAX_CHAIN_DEPTH: usize = 8;

/// Closed set of state identities, indexable `0..COUNT`.
pub trait StateKey: Copy + Eq + fmt::Debug + 'static {
    const COUNT: usize;

    fn index(self) -> usize;
    fn from_index(idx: usize) -> Option<Self>;
    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        (0..Self::COUNT)
            .filter_map(Self::from_index)
            .find(|s| s.name() == name)
    }
}

/// Sink for the current state's display rows. `None` means keep that row.
pub trait Renderer {
    fn render(&mut self, line1: Option<&str>, line2: Option<&str>);
}

/// Transition target of a key slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<S> {
    Nop,
    State(S),
}

/// One of the four soft keys under the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    K1,
    K2,
    K3,
    K4,
}

impl Key {
    pub const ALL: [Self; 4] = [Self::K1, Self::K2, Self::K3, Self::K4];

    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            Self::K1 => 0,
            Self::K2 => 1,
            Self::K3 => 2,
            Self::K4 => 3,
        }
    }

    /// `'1'..='4'` map to the keys; anything else is not a key.
    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::K1),
            '2' => Some(Self::K2),
            '3' => Some(Self::K3),
            '4' => Some(Self::K4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Top,
    Bottom,
}

impl Row {
    #[inline]
    const fn idx(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Bottom => 1,
        }
    }
}

pub type EnterHook<S, C> = fn(&mut StateMachine<S, C>, &mut C) -> bool;
pub type Hook<S, C> = fn(&mut StateMachine<S, C>, &mut C);

/// One row of the transition table.
pub struct StateDef<S: StateKey, C> {
    pub id: S,
    /// Display templates; an empty string leaves the row untouched.
    pub lines: [&'static str; 2],
    pub keys: [Target<S>; 4],
    pub on_enter: Option<EnterHook<S, C>>,
    pub on_loop: Option<Hook<S, C>>,
    pub on_exit: Option<Hook<S, C>>,
}

impl<S: StateKey, C> StateDef<S, C> {
    pub fn new(id: S, lines: [&'static str; 2], keys: [Target<S>; 4]) -> Self {
        Self {
            id,
            lines,
            keys,
            on_enter: None,
            on_loop: None,
            on_exit: None,
        }
    }

    /// A state with no text and no keys, used as a pass-through action.
    pub fn transient(id: S, on_enter: EnterHook<S, C>) -> Self {
        Self::new(id, ["", ""], [Target::Nop; 4]).enter(on_enter)
    }

    #[must_use]
    pub fn enter(mut self, f: EnterHook<S, C>) -> Self {
        self.on_enter = Some(f);
        self
    }

    #[must_use]
    pub fn looping(mut self, f: Hook<S, C>) -> Self {
        self.on_loop = Some(f);
        self
    }

    #[must_use]
    pub fn exit(mut self, f: Hook<S, C>) -> Self {
        self.on_exit = Some(f);
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsmError {
    #[error("invalid state table: {0}")]
    InvalidTable(String),
    #[error("unknown state {0:?}")]
    UnknownState(String),
    #[error("transition chain deeper than {limit} entering {state}")]
    ChainTooDeep { state: &'static str, limit: usize },
}

/// The engine: an immutable table plus the current-state cursor.
pub struct StateMachine<S: StateKey, C> {
    table: Vec<StateDef<S, C>>,
    lines: Vec<[String; 2]>,
    current: S,
    depth: usize,
    fault: Option<FsmError>,
    transitions: u64,
}

impl<S: StateKey, C> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("states", &self.table.len())
            .field("transitions", &self.transitions)
            .finish()
    }
}

impl<S: StateKey, C: Renderer> StateMachine<S, C> {
    /// Validate `table` and park the cursor on `initial` without running
    /// any hook. Call [`start`](Self::start) to enter it.
    pub fn new(table: Vec<StateDef<S, C>>, initial: S) -> Result<Self, FsmError> {
        if table.len() != S::COUNT {
            return Err(FsmError::InvalidTable(format!(
                "expected {} states, found {}",
                S::COUNT,
                table.len()
            )));
        }
        for (i, def) in table.iter().enumerate() {
            if def.id.index() != i {
                return Err(FsmError::InvalidTable(format!(
                    "row {i} holds {} (index {})",
                    def.id.name(),
                    def.id.index()
                )));
            }
            for t in &def.keys {
                if let Target::State(s) = t
                    && s.index() >= S::COUNT
                {
                    return Err(FsmError::InvalidTable(format!(
                        "{} has a key target outside the table",
                        def.id.name()
                    )));
                }
            }
            if let Some(l) = def.lines.iter().find(|l| l.chars().count() > LCD_COLS) {
                return Err(FsmError::InvalidTable(format!(
                    "{} line {l:?} is wider than {LCD_COLS} columns",
                    def.id.name()
                )));
            }
        }
        if initial.index() >= S::COUNT {
            return Err(FsmError::InvalidTable("initial state outside the table".into()));
        }

        let lines = table
            .iter()
            .map(|d| d.lines.map(|l| if l.is_empty() { String::new() } else { fit_line(l) }))
            .collect();

        Ok(Self {
            table,
            lines,
            current: initial,
            depth: 0,
            fault: None,
            transitions: 0,
        })
    }

    /// Enter the initial state: run its enter hook and render.
    pub fn start(&mut self, ctx: &mut C) -> Result<(), FsmError> {
        tracing::info!(state = self.current.name(), "state machine starting");
        self.depth += 1;
        self.enter(self.current, ctx);
        self.depth -= 1;
        self.take_fault()
    }

    /// Transition to `target`. `Nop` does nothing.
    pub fn goto(&mut self, target: Target<S>, ctx: &mut C) -> Result<(), FsmError> {
        let Target::State(next) = target else {
            return Ok(());
        };
        self.chain(next, ctx);
        if self.depth == 0 {
            self.take_fault()
        } else {
            Ok(())
        }
    }

    /// Transition by state name. Unknown names are logged and ignored.
    pub fn goto_named(&mut self, name: &str, ctx: &mut C) -> Result<(), FsmError> {
        match S::from_name(name) {
            Some(s) => self.goto(Target::State(s), ctx),
            None => {
                tracing::error!(name, "could not find state");
                Err(FsmError::UnknownState(name.to_string()))
            }
        }
    }

    /// Transition from inside a hook. Faults are reported by the outermost
    /// `goto`, `tick` or `dispatch_key` call.
    pub fn chain(&mut self, next: S, ctx: &mut C) {
        if self.depth >= MAX_CHAIN_DEPTH {
            tracing::error!(
                state = next.name(),
                limit = MAX_CHAIN_DEPTH,
                "transition chain too deep, dropping transition"
            );
            self.fault.get_or_insert(FsmError::ChainTooDeep {
                state: next.name(),
                limit: MAX_CHAIN_DEPTH,
            });
            return;
        }
        self.depth += 1;

        let from = self.current;
        if let Some(exit) = self.table[from.index()].on_exit {
            exit(self, ctx);
        }
        tracing::debug!(from = from.name(), to = next.name(), "state transition");
        self.current = next;
        self.transitions = self.transitions.wrapping_add(1);
        self.enter(next, ctx);

        self.depth -= 1;
    }

    /// Run the current state's loop hook. Never renders by itself.
    pub fn tick(&mut self, ctx: &mut C) -> Result<(), FsmError> {
        if let Some(f) = self.table[self.current.index()].on_loop {
            self.depth += 1;
            f(self, ctx);
            self.depth -= 1;
        }
        self.take_fault()
    }

    /// Follow the current state's target for `key`.
    pub fn dispatch_key(&mut self, key: Key, ctx: &mut C) -> Result<(), FsmError> {
        let target = self.table[self.current.index()].keys[key.slot()];
        self.goto(target, ctx)
    }

    /// Push the current state's rows to the renderer.
    pub fn render(&self, ctx: &mut C) {
        let [a, b] = &self.lines[self.current.index()];
        ctx.render(keep_blank(a), keep_blank(b));
    }

    fn enter(&mut self, next: S, ctx: &mut C) {
        let proceed = match self.table[next.index()].on_enter {
            Some(f) => f(self, ctx),
            None => true,
        };
        if proceed && self.current == next {
            self.render(ctx);
        }
    }

    fn take_fault(&mut self) -> Result<(), FsmError> {
        self.fault.take().map_or(Ok(()), Err)
    }
}

/// Blank rows are left untouched on the display.
fn keep_blank(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

impl<S: StateKey, C> StateMachine<S, C> {
    #[inline]
    pub fn current(&self) -> S {
        self.current
    }

    /// Total transitions performed since construction.
    #[inline]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Overwrite one display row of `state`, fitted to the display width.
    pub fn set_line(&mut self, state: S, row: Row, text: &str) {
        self.lines[state.index()][row.idx()] = fit_line(text);
    }

    pub fn line(&self, state: S, row: Row) -> &str {
        &self.lines[state.index()][row.idx()]
    }

    pub fn keys(&self, state: S) -> [Target<S>; 4] {
        self.table[state.index()].keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum T {
        Home,
        Hop,
        Away,
        PingA,
        PingB,
    }

    impl StateKey for T {
        const COUNT: usize = 5;
        fn index(self) -> usize {
            self as usize
        }
        fn from_index(idx: usize) -> Option<Self> {
            [Self::Home, Self::Hop, Self::Away, Self::PingA, Self::PingB]
                .get(idx)
                .copied()
        }
        fn name(self) -> &'static str {
            match self {
                Self::Home => "Home",
                Self::Hop => "Hop",
                Self::Away => "Away",
                Self::PingA => "PingA",
                Self::PingB => "PingB",
            }
        }
    }

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
        frames: Vec<(Option<String>, Option<String>)>,
    }

    impl Renderer for Log {
        fn render(&mut self, a: Option<&str>, b: Option<&str>) {
            self.frames.push((a.map(str::to_string), b.map(str::to_string)));
        }
    }

    fn hop_enter(m: &mut StateMachine<T, Log>, c: &mut Log) -> bool {
        c.events.push("enter Hop".into());
        m.chain(T::Away, c);
        false
    }

    fn home_exit(_: &mut StateMachine<T, Log>, c: &mut Log) {
        c.events.push("exit Home".into());
    }

    fn away_enter(_: &mut StateMachine<T, Log>, c: &mut Log) -> bool {
        c.events.push("enter Away".into());
        true
    }

    fn ping_a(m: &mut StateMachine<T, Log>, c: &mut Log) -> bool {
        m.chain(T::PingB, c);
        false
    }

    fn ping_b(m: &mut StateMachine<T, Log>, c: &mut Log) -> bool {
        m.chain(T::PingA, c);
        false
    }

    fn table() -> Vec<StateDef<T, Log>> {
        vec![
            StateDef::new(
                T::Home,
                ["Home            ", "Go    Ping      "],
                [
                    Target::State(T::Hop),
                    Target::State(T::PingA),
                    Target::Nop,
                    Target::Nop,
                ],
            )
            .exit(home_exit),
            StateDef::transient(T::Hop, hop_enter),
            StateDef::new(
                T::Away,
                ["Away", ""],
                [Target::State(T::Home), Target::Nop, Target::Nop, Target::Nop],
            )
            .enter(away_enter),
            StateDef::transient(T::PingA, ping_a),
            StateDef::transient(T::PingB, ping_b),
        ]
    }

    #[test]
    fn nop_target_changes_nothing() {
        let mut ctx = Log::default();
        let mut m = StateMachine::new(table(), T::Home).unwrap();
        m.start(&mut ctx).unwrap();
        let frames = ctx.frames.len();
        m.dispatch_key(Key::K3, &mut ctx).unwrap();
        assert_eq!(m.current(), T::Home);
        assert_eq!(m.transitions(), 0);
        assert_eq!(ctx.frames.len(), frames);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn chained_transition_renders_only_final_state() {
        let mut ctx = Log::default();
        let mut m = StateMachine::new(table(), T::Home).unwrap();
        m.start(&mut ctx).unwrap();
        ctx.frames.clear();

        m.dispatch_key(Key::K1, &mut ctx).unwrap();

        assert_eq!(m.current(), T::Away);
        assert_eq!(ctx.events, vec!["exit Home", "enter Hop", "enter Away"]);
        // Away's blank second row is passed as "keep".
        assert_eq!(
            ctx.frames,
            vec![(Some("Away            ".to_string()), None)]
        );
    }

    #[test]
    fn runaway_chain_is_cut_off() {
        let mut ctx = Log::default();
        let mut m = StateMachine::new(table(), T::Home).unwrap();
        let err = m.dispatch_key(Key::K2, &mut ctx).unwrap_err();
        assert!(matches!(err, FsmError::ChainTooDeep { limit: MAX_CHAIN_DEPTH, .. }));
        assert!(matches!(m.current(), T::PingA | T::PingB));
        // Machine remains usable afterwards.
        m.goto(Target::State(T::Away), &mut ctx).unwrap();
        assert_eq!(m.current(), T::Away);
    }

    #[test]
    fn unknown_name_leaves_state_untouched() {
        let mut ctx = Log::default();
        let mut m = StateMachine::new(table(), T::Home).unwrap();
        let err = m.goto_named("Nowhere", &mut ctx).unwrap_err();
        assert_eq!(err, FsmError::UnknownState("Nowhere".into()));
        assert_eq!(m.current(), T::Home);
        assert!(ctx.events.is_empty());

        m.goto_named("Away", &mut ctx).unwrap();
        assert_eq!(m.current(), T::Away);
    }

    #[test]
    fn misplaced_row_is_rejected() {
        let mut t = table();
        t.swap(1, 2);
        let err = StateMachine::new(t, T::Home).unwrap_err();
        assert!(matches!(err, FsmError::InvalidTable(m) if m.contains("row 1")));
    }

    #[test]
    fn short_table_is_rejected() {
        let mut t = table();
        t.pop();
        assert!(StateMachine::new(t, T::Home).is_err());
    }

    #[test]
    fn set_line_is_fitted_and_rendered() {
        let mut ctx = Log::default();
        let mut m = StateMachine::new(table(), T::Home).unwrap();
        m.set_line(T::Home, Row::Top, "Hi");
        assert_eq!(m.line(T::Home, Row::Top), "Hi              ");
        m.render(&mut ctx);
        assert_eq!(ctx.frames[0].0.as_deref(), Some("Hi              "));
    }

    #[test]
    fn blank_template_rows_are_left_alone() {
        let mut ctx = Log::default();
        let mut m = StateMachine::new(table(), T::Home).unwrap();
        m.start(&mut ctx).unwrap();
        m.dispatch_key(Key::K1, &mut ctx).unwrap();
        assert_eq!(m.current(), T::Away);
        let (top, bottom) = ctx.frames.last().unwrap();
        assert!(top.as_deref().unwrap().starts_with("Away"));
        assert_eq!(*bottom, None);
    }
}
