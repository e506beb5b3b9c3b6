//! Interactive counter session.
//!
//! Reads one card number or pickup code per line from stdin and verifies
//! it. Results are printed by a separate task that follows the engine's
//! outcome feed, so anything subscribed to the same engine sees the
//! same stream the operator does.

use chrono::FixedOffset;
use mealpass_core::{OutcomeStream, ShortId, VerificationOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config::Engine;
use crate::error::CliError;
use crate::output;

use super::util;

/// What the operator typed on one line.
#[derive(Debug, PartialEq, Eq)]
enum Entry {
    Id(ShortId),
    Code(String),
    Blank,
    Quit,
}

/// Classify an input line.
///
/// A bare number with exactly as many digits as a pickup code is a code;
/// anything shorter, or anything starting with `#`, is a card number.
/// `id N` and `code N` force the reading either way.
fn parse_entry(line: &str, code_length: usize) -> Result<Entry, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Entry::Blank);
    }
    if matches!(line, "q" | "quit" | "exit") {
        return Ok(Entry::Quit);
    }

    let (forced, rest) = match line.split_once(char::is_whitespace) {
        Some((word @ ("id" | "code"), rest)) => (Some(word), rest.trim()),
        _ => (None, line),
    };

    let as_id = |raw: &str| {
        raw.parse::<ShortId>()
            .map(Entry::Id)
            .map_err(|_| format!("'{raw}' is not a card number"))
    };

    match forced {
        Some("id") => as_id(rest),
        Some(_) => Ok(Entry::Code(rest.to_owned())),
        None if rest.starts_with('#') => as_id(rest),
        None if rest.len() == code_length && rest.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(Entry::Code(rest.to_owned()))
        }
        None => as_id(rest),
    }
}

// ── Feed printer ────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    logged: usize,
    rejected: usize,
}

struct Printer {
    structured: bool,
    color: bool,
    quiet: bool,
    offset: FixedOffset,
    tally: Tally,
}

impl Printer {
    fn print(&mut self, outcome: &VerificationOutcome) {
        if outcome.is_success() {
            self.tally.logged += 1;
        } else {
            self.tally.rejected += 1;
        }
        let line = if self.structured {
            output::render_json_compact(outcome)
        } else {
            format!(
                "{}  {}",
                util::local_hms(outcome.at(), self.offset),
                output::outcome_line(outcome, self.color)
            )
        };
        output::print_output(&line, self.quiet);
    }

    /// Print outcomes until cancelled, then flush whatever is still queued.
    async fn run(mut self, mut feed: OutcomeStream, cancel: CancellationToken) -> Tally {
        loop {
            tokio::select! {
                biased;
                next = feed.next() => match next {
                    Some(outcome) => self.print(&outcome),
                    None => break,
                },
                () = cancel.cancelled() => {
                    while let Some(outcome) = feed.try_next() {
                        self.print(&outcome);
                    }
                    break;
                }
            }
        }
        self.tally
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let code_length = engine.config().code_length;
    let cancel = CancellationToken::new();

    let printer = Printer {
        structured: !matches!(global.format(), OutputFormat::Table | OutputFormat::Plain),
        color: output::should_color(global.color_mode()),
        quiet: global.quiet,
        offset: engine.config().utc_offset,
        tally: Tally::default(),
    };
    let printer = tokio::spawn(printer.run(engine.subscribe(), cancel.clone()));

    if !global.quiet {
        eprintln!(
            "Counter open, logging {}. Enter a card number or pickup code; Ctrl-D to close.",
            engine.current_slot()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        match parse_entry(&line, code_length) {
            Ok(Entry::Id(short_id)) => {
                engine.verify_by_short_id(short_id).await;
            }
            Ok(Entry::Code(code)) => {
                engine.verify_by_code(&code).await;
            }
            Ok(Entry::Blank) => {}
            Ok(Entry::Quit) => break,
            Err(msg) => eprintln!("{msg}"),
        }
    }

    cancel.cancel();
    let tally = printer
        .await
        .map_err(|e| CliError::Internal(format!("outcome printer failed: {e}")))?;

    if !global.quiet {
        eprintln!(
            "Counter closed: {} logged, {} rejected",
            tally.logged, tally.rejected
        );
    }
    Ok(())
}
