//! CLI configuration: thin wrapper around `mealpass_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--config, --db, --output, --color).

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;

use mealpass_core::{SqliteStore, Verifier};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use mealpass_config::{Config, config_path, load_config, save_config};

/// The verifier every store-bound command runs against.
pub type Engine = Verifier<SqliteStore>;

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` or the platform path.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file named by the global flags.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config(global.config.as_deref())?)
}

/// Fill unset output and color flags from the config's `[defaults]`.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        global.output = Some(parse_choice::<OutputFormat>("defaults.output", &cfg.defaults.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_choice::<ColorMode>("defaults.color", &cfg.defaults.color)?);
    }
    Ok(())
}

fn parse_choice<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("unrecognized value '{raw}'"),
    })
}

/// The database file: `--db` flag > config `[store] path` > platform default.
pub fn database_path(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    global.db.clone().unwrap_or_else(|| cfg.database_path())
}

/// Open the record store and build the verification engine.
pub fn open_engine(global: &GlobalOpts, cfg: &Config) -> Result<Engine, CliError> {
    let engine_config = cfg.to_engine_config()?;
    let path = database_path(global, cfg);
    tracing::debug!(path = %path.display(), "opening record store");

    let store = SqliteStore::open(&path).map_err(|err| match CliError::from(err) {
        CliError::StoreUnavailable { reason, .. } => CliError::StoreUnavailable {
            reason,
            path: path.display().to_string(),
        },
        other => other,
    })?;
    Ok(Verifier::with_system_clock(Arc::new(store), engine_config))
}
