//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn ask(prompt: &str, default: String) -> Result<String, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(default)
        .interact_text()
        .map_err(prompt_err)
}

fn ask_number<T>(prompt: &str, default: T) -> Result<T, CliError>
where
    T: Clone + std::fmt::Display + std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Input::new()
        .with_prompt(prompt)
        .default(default)
        .interact_text()
        .map_err(prompt_err)
}

/// Walk the operator through the settings that differ per canteen.
fn wizard(mut cfg: Config) -> Result<Config, CliError> {
    cfg.utc_offset = ask("UTC offset of the canteen (e.g. +05:30)", cfg.utc_offset)?;
    cfg.meals.lunch_start = ask("Lunch starts", cfg.meals.lunch_start)?;
    cfg.meals.lunch_end = ask("Lunch ends", cfg.meals.lunch_end)?;
    cfg.meals.dinner_start = ask("Dinner starts", cfg.meals.dinner_start)?;
    cfg.meals.dinner_end = ask("Dinner ends", cfg.meals.dinner_end)?;
    cfg.meals.lunch_price = ask_number("Lunch price", cfg.meals.lunch_price)?;
    cfg.meals.dinner_price = ask_number("Dinner price", cfg.meals.dinner_price)?;

    let db: String = ask(
        "Record store file",
        cfg.database_path().display().to_string(),
    )?;
    cfg.store.path = Some(db.into());
    Ok(cfg)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: guided setup ──────────────────────────────────────
        ConfigCommand::Init { force } => {
            let path = config::active_config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let interactive = !global.yes && std::io::stdin().is_terminal();
            let cfg = if interactive {
                eprintln!("mealpass configuration");
                eprintln!("   Config path: {}\n", path.display());
                wizard(Config::default())?
            } else {
                Config::default()
            };

            // Refuse to write something the engine would reject on load
            cfg.to_engine_config()?;

            let written = config::save_config(&cfg, Some(&path))?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", written.display());
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = match global.format() {
                OutputFormat::Table | OutputFormat::Plain => cfg.to_toml()?,
                format => output::render_single(format, &cfg, |_| String::new(), |_| String::new()),
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::active_config_path(global).display());
            Ok(())
        }
    }
}
