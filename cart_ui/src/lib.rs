#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Terminal stand-in for the 16x2 character LCD.

use std::io::Write;

use cart_traits::{BoxError, Display};

pub const COLS: usize = 16;

/// Draws the two LCD rows inside a box frame on any writer.
///
/// Rows passed as `None` keep their previous text. Output is only written
/// when the visible content changes.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    rows: [String; 2],
    drawn: bool,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows: [blank(), blank()],
            drawn: false,
        }
    }

    pub fn rows(&self) -> (&str, &str) {
        (&self.rows[0], &self.rows[1])
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn frame(&self) -> String {
        let edge = "-".repeat(COLS);
        format!(
            "+{edge}+\n|{}|\n|{}|\n+{edge}+\n",
            self.rows[0], self.rows[1]
        )
    }
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

fn blank() -> String {
    " ".repeat(COLS)
}

/// Pad or cut to exactly `COLS` characters.
fn fit(text: &str) -> String {
    let mut s: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(COLS)
        .collect();
    let n = s.chars().count();
    s.extend(std::iter::repeat_n(' ', COLS - n));
    s
}

impl<W: Write> Display for ConsoleDisplay<W> {
    fn render(&mut self, line1: Option<&str>, line2: Option<&str>) -> Result<(), BoxError> {
        let before = self.rows.clone();
        if let Some(t) = line1 {
            self.rows[0] = fit(t);
        }
        if let Some(t) = line2 {
            self.rows[1] = fit(t);
        }
        if self.drawn && before == self.rows {
            return Ok(());
        }
        let frame = self.frame();
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()?;
        self.drawn = true;
        tracing::trace!(top = %self.rows[0], bottom = %self.rows[1], "lcd");
        Ok(())
    }
}
