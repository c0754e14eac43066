//! # Interactive Console
//!
//! Line-oriented stdin surface shared by both binaries:
//!
//! - `q`          quit
//! - blank line   print the current value
//! - `<integer>`  store the integer
//!
//! Anything else is ignored.

use std::io::{self, BufRead, Write};

use tracing::debug;

use svdb_common::{leading_integer, Value};

use crate::cell::ValueCell;

/// One parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Show,
    Set(Value),
    Ignore,
}

impl Command {
    /// Parses a console line.
    ///
    /// Leading whitespace is skipped. An integer may be followed by any text,
    /// which is dropped.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_start();
        if line.starts_with('q') {
            return Command::Quit;
        }
        if line.is_empty() {
            return Command::Show;
        }
        match leading_integer(line) {
            Some(value) => Command::Set(value),
            None => Command::Ignore,
        }
    }
}

/// Console loop over any reader/writer pair.
#[derive(Debug, Clone, Default)]
pub struct Console {
    prompt: Option<String>,
}

impl Console {
    /// Creates a console that prints no prompt.
    pub fn new() -> Self {
        Console::default()
    }

    /// Creates a console that prints and flushes `prompt` before each line.
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Console {
            prompt: Some(prompt.into()),
        }
    }

    /// Runs until `q` or end of input.
    pub fn run<R, W, C>(&self, mut input: R, mut output: W, cell: &C) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
        C: ValueCell + ?Sized,
    {
        let mut line = String::new();
        loop {
            if let Some(prompt) = &self.prompt {
                output.write_all(prompt.as_bytes())?;
                output.flush()?;
            }

            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }

            match Command::parse(&line) {
                Command::Quit => return Ok(()),
                Command::Show => {
                    writeln!(output, "{}", cell.get())?;
                    output.flush()?;
                }
                Command::Set(value) => {
                    debug!(value, "console set");
                    cell.set(value);
                }
                Command::Ignore => {}
            }
        }
    }
}
