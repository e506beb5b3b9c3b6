//! Student command handlers.

use chrono::NaiveDate;
use mealpass_core::{FailureReason, ShortId, Student};
use tabled::Tabled;

use crate::cli::{GlobalOpts, StudentsArgs, StudentsCommand};
use crate::config::Engine;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct StudentRow {
    #[tabled(rename = "#")]
    short_id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Ends")]
    ends: String,
    #[tabled(rename = "Days left")]
    days_left: String,
}

impl StudentRow {
    fn new(s: &Student, today: NaiveDate) -> Self {
        Self {
            short_id: s.short_id.get(),
            name: s.name.clone(),
            active: if s.is_active { "yes" } else { "no" }.into(),
            ends: s
                .subscription_end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            days_left: s
                .days_remaining(today)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
        }
    }
}

fn detail(s: &Student, today: NaiveDate) -> String {
    let mut lines = vec![
        format!("Card:      #{}", s.short_id),
        format!("Name:      {}", s.name),
        format!("Active:    {}", s.is_active),
    ];
    if let Some(end) = s.subscription_end_date {
        lines.push(format!("Ends:      {end}"));
    }
    if let Some(days) = s.days_remaining(today) {
        lines.push(format!("Days left: {days}"));
    }
    lines.push(format!("ID:        {}", s.id));
    lines.join("\n")
}

fn next_free_id(students: &[Student]) -> ShortId {
    let max = students.iter().map(|s| s.short_id.get()).max().unwrap_or(0);
    ShortId::new(max.saturating_add(1))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    engine: &Engine,
    args: StudentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let today = engine.today();

    match args.command {
        StudentsCommand::Add {
            name,
            short_id,
            until,
            inactive,
        } => {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "name cannot be empty".into(),
                });
            }
            let short_id = match short_id {
                Some(id) => id,
                None => next_free_id(&engine.students().await?),
            };

            let mut student = Student::new(short_id, name);
            if let Some(end) = until {
                student = student.with_end_date(end);
            }
            if inactive {
                student = student.inactive();
            }

            let student = engine.enroll(student).await?;
            let out = output::render_single(
                global.format(),
                &student,
                |s| detail(s, today),
                |s| s.short_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StudentsCommand::List => {
            let students = engine.students().await?;
            let out = output::render_list(
                global.format(),
                &students,
                |s| StudentRow::new(s, today),
                |s| s.short_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StudentsCommand::Show { short_id } => {
            let student = engine
                .find_student(short_id)
                .await?
                .ok_or_else(|| {
                    CliError::rejected(FailureReason::NotFound {
                        identifier: format!("#{short_id}"),
                    })
                })?;
            let out = output::render_single(
                global.format(),
                &student,
                |s| detail(s, today),
                |s| s.short_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StudentsCommand::Activate { short_id } => {
            let student = engine.set_active(short_id, true).await?;
            if !global.quiet {
                eprintln!("Subscription on for {} (#{})", student.name, student.short_id);
            }
            Ok(())
        }

        StudentsCommand::Deactivate { short_id } => {
            if !util::confirm(
                &format!("Switch off the subscription for #{short_id}?"),
                global.yes,
            )? {
                return Ok(());
            }
            let student = engine.set_active(short_id, false).await?;
            if !global.quiet {
                eprintln!("Subscription off for {} (#{})", student.name, student.short_id);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn next_id_follows_the_highest() {
        let students = vec![
            Student::new(ShortId::new(3), "A"),
            Student::new(ShortId::new(7), "B"),
        ];
        assert_eq!(next_free_id(&students), ShortId::new(8));
        assert_eq!(next_free_id(&[]), ShortId::new(1));
    }

    #[test]
    fn row_shows_dashes_without_end_date() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let row = StudentRow::new(&Student::new(ShortId::new(1), "Asha").inactive(), today);
        assert_eq!(row.active, "no");
        assert_eq!(row.ends, "-");
        assert_eq!(row.days_left, "-");
    }
}
