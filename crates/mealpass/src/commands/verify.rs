//! Verify command handlers.

use mealpass_core::VerificationOutcome;

use crate::cli::{GlobalOpts, OutputFormat, VerifyArgs, VerifyCommand};
use crate::config::Engine;
use crate::error::CliError;
use crate::output;

pub async fn handle(engine: &Engine, args: VerifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = match args.command {
        VerifyCommand::Id { short_id } => engine.verify_by_short_id(short_id).await,
        VerifyCommand::Code { code } => engine.verify_by_code(&code).await,
    };
    report(&outcome, global)
}

/// Print an outcome and turn a failure into the matching exit code.
///
/// Structured formats always emit the outcome document so scripts can read
/// the reason; the human formats leave failures to the error report.
fn report(outcome: &VerificationOutcome, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color_mode());
    match (global.format(), outcome) {
        (OutputFormat::Table | OutputFormat::Plain, VerificationOutcome::Success { .. }) => {
            output::print_output(&output::outcome_line(outcome, color), global.quiet);
        }
        (OutputFormat::Table | OutputFormat::Plain, VerificationOutcome::Failure { .. }) => {}
        (format, _) => {
            let out = output::render_single(
                format,
                outcome,
                |o| output::outcome_line(o, color),
                ToString::to_string,
            );
            output::print_output(&out, global.quiet);
        }
    }

    match outcome.failure_reason() {
        Some(reason) => Err(CliError::rejected(reason.clone())),
        None => Ok(()),
    }
}
