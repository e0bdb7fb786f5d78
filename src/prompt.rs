// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Collecting the authorization PIN from the user.
//!
//! The handshake needs one piece of input from a human: the PIN Twitter shows after they approve
//! the app on the authorization page. How that PIN is obtained is up to the application, so the
//! `Authenticator` asks a `Prompt` for it. `StdinPrompt` covers the terminal case, and any
//! `FnMut(&str) -> io::Result<String>` closure works as well, which is handy in tests or GUIs.

use std::io::{self, BufRead, Write};

/// Something that can ask the user a question and return their answer.
pub trait Prompt: Send {
    /// Shows `message` to the user and returns the text they supplied.
    ///
    /// The answer is handed to Twitter as-is, so implementations shouldn't try to validate it.
    fn prompt_for_text(&mut self, message: &str) -> io::Result<String>;
}

impl<F> Prompt for F
where
    F: FnMut(&str) -> io::Result<String> + Send,
{
    fn prompt_for_text(&mut self, message: &str) -> io::Result<String> {
        self(message)
    }
}

/// A `Prompt` that prints the message to stdout and reads one line from stdin.
///
/// Only the line terminator is removed from the answer. Reaching the end of stdin before any
/// line arrives is reported as `UnexpectedEof`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn prompt_for_text(&mut self, message: &str) -> io::Result<String> {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        writeln!(stdout, "{}", message)?;
        stdout.flush()?;

        read_answer(&mut io::stdin().lock())
    }
}

fn read_answer(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before an answer was given",
        ));
    }

    let answer = line.strip_suffix('\n').unwrap_or(&line);
    let answer = answer.strip_suffix('\r').unwrap_or(answer);
    Ok(answer.to_string())
}
