//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, refuses instead of hanging.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.trim_end_matches('?').into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Wall-clock time in the canteen's offset, e.g. "12:41".
pub fn local_hm(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}

/// Local time with seconds, for live feeds.
pub fn local_hms(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M:%S").to_string()
}

/// Round a duration down to whole seconds and format it, e.g. "14m 59s".
pub fn human_duration(d: std::time::Duration) -> String {
    humantime::format_duration(std::time::Duration::from_secs(d.as_secs())).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_time_uses_offset() {
        let at = Utc.with_ymd_and_hms(2026, 4, 14, 7, 15, 0).unwrap();
        let ist = FixedOffset::east_opt(19_800).unwrap();
        assert_eq!(local_hm(at, ist), "12:45");
    }

    #[test]
    fn durations_drop_subsecond_noise() {
        let d = std::time::Duration::from_millis(899_400);
        assert_eq!(human_duration(d), "14m 59s");
    }
}
