//! Delegated code command handlers.

use mealpass_core::{DelegatedCode, Issued, ShortId};
use serde::Serialize;

use crate::cli::{CodesArgs, CodesCommand, GlobalOpts};
use crate::config::Engine;
use crate::error::CliError;
use crate::output;

use super::util;

/// An issued code together with who it was issued for.
#[derive(Serialize)]
struct IssuedCode {
    #[serde(flatten)]
    code: DelegatedCode,
    short_id: ShortId,
    name: String,
}

fn detail(issued: &IssuedCode, engine: &Engine) -> String {
    let offset = engine.config().utc_offset;
    let remaining = issued.code.remaining_at(engine.now());
    [
        format!("Code:      {}", issued.code.code),
        format!("For:       {} (#{})", issued.name, issued.short_id),
        format!(
            "Expires:   {} (in {})",
            util::local_hm(issued.code.expires_at, offset),
            util::human_duration(remaining)
        ),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: CodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CodesCommand::Issue { short_id } => {
            let Issued { student, code } = engine.issue_code(short_id).await?;
            let issued = IssuedCode {
                code,
                short_id: student.short_id,
                name: student.name,
            };
            let out = output::render_single(
                global.format(),
                &issued,
                |i| detail(i, engine),
                |i| i.code.code.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CodesCommand::Revoke { code } => {
            if !util::confirm(&format!("Revoke code {code}?"), global.yes)? {
                return Ok(());
            }
            let revoked = engine.revoke_code(&code).await?;
            tracing::debug!(code_id = %revoked.id, "code revoked");
            if !global.quiet {
                eprintln!("Code {} revoked", revoked.code);
            }
            Ok(())
        }
    }
}
