//! Daily redemption log.

use std::collections::HashMap;

use mealpass_core::{MealSlot, RedemptionRecord, ShortId, UserId};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, LogArgs, OutputFormat};
use crate::config::Engine;
use crate::error::CliError;
use crate::output;

use super::util;

/// A ledger record joined with the student it belongs to.
#[derive(Serialize)]
struct LogEntry {
    #[serde(flatten)]
    record: RedemptionRecord,
    short_id: Option<ShortId>,
    name: String,
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "#")]
    short_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Meal")]
    slot: String,
    #[tabled(rename = "Via")]
    method: String,
}

fn row(entry: &LogEntry, engine: &Engine) -> LogRow {
    LogRow {
        time: util::local_hm(entry.record.created_at, engine.config().utc_offset),
        short_id: entry
            .short_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into()),
        name: entry.name.clone(),
        slot: entry.record.slot.to_string(),
        method: entry.record.method.to_string(),
    }
}

/// "2 lunch, 1 dinner, 180 due" for the footer under the table.
fn totals(entries: &[LogEntry], engine: &Engine) -> String {
    let windows = &engine.config().windows;
    let count = |slot: MealSlot| entries.iter().filter(|e| e.record.slot == slot).count();
    let lunches = count(MealSlot::Lunch);
    let dinners = count(MealSlot::Dinner);
    let due: u64 = entries
        .iter()
        .map(|e| u64::from(windows.price_of(e.record.slot)))
        .sum();
    format!("{lunches} lunch, {dinners} dinner, {due} due")
}

pub async fn handle(engine: &Engine, args: LogArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let date = args.date.unwrap_or_else(|| engine.today());

    let students: HashMap<UserId, _> = engine
        .students()
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let records = engine.ledger().entries_on(date).await?;

    let entries: Vec<LogEntry> = records
        .into_iter()
        .map(|record| {
            let student = students.get(&record.user_id);
            LogEntry {
                short_id: student.map(|s| s.short_id),
                name: student.map(|s| s.name.clone()).unwrap_or_default(),
                record,
            }
        })
        .collect();

    let mut out = output::render_list(
        global.format(),
        &entries,
        |e| row(e, engine),
        |e| e.record.id.to_string(),
    );
    if matches!(global.format(), OutputFormat::Table) {
        out = format!("{out}\n{date}: {}", totals(&entries, engine));
    }
    output::print_output(&out, global.quiet);
    Ok(())
}
