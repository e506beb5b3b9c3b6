//! Meal hours and the slot the counter would log right now.

use chrono::NaiveTime;
use mealpass_core::{MealSlot, SlotPolicy};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config::Engine;
use crate::error::CliError;
use crate::output;

#[derive(Clone, Serialize, Tabled)]
struct MealHours {
    #[tabled(rename = "Meal")]
    slot: MealSlot,
    #[tabled(rename = "From")]
    #[serde(with = "hm")]
    start: NaiveTime,
    #[tabled(rename = "Until")]
    #[serde(with = "hm")]
    end: NaiveTime,
    #[tabled(rename = "Price")]
    price: u32,
    #[tabled(rename = "Serving")]
    serving: bool,
}

#[derive(Serialize)]
struct Hours {
    meals: Vec<MealHours>,
    policy: SlotPolicy,
    current_slot: MealSlot,
    local_time: String,
}

mod hm {
    use chrono::NaiveTime;

    pub fn serialize<S: serde::Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format("%H:%M"))
    }
}

fn policy_note(policy: SlotPolicy) -> String {
    match policy {
        SlotPolicy::Cutoff { hour } => format!("lunch before {hour:02}:00, dinner after"),
        SlotPolicy::Windowed => "nearest serving window".into(),
    }
}

pub fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let windows = &engine.config().windows;
    let now = engine.local_time();
    let serving = windows.serving_window(now);

    let hours = Hours {
        meals: [MealSlot::Lunch, MealSlot::Dinner]
            .into_iter()
            .map(|slot| {
                let (start, end) = windows.window(slot);
                MealHours {
                    slot,
                    start,
                    end,
                    price: windows.price_of(slot),
                    serving: serving == Some(slot),
                }
            })
            .collect(),
        policy: windows.policy,
        current_slot: engine.current_slot(),
        local_time: now.format("%H:%M").to_string(),
    };

    let out = match global.format() {
        OutputFormat::Table => {
            let table =
                output::render_list(global.format(), &hours.meals, |m| m.clone(), |m| {
                    m.slot.to_string()
                });
            format!(
                "{table}\nNow {}: logging {} ({})",
                hours.local_time,
                hours.current_slot,
                policy_note(hours.policy)
            )
        }
        OutputFormat::Plain => hours.current_slot.to_string(),
        format => output::render_single(format, &hours, |_| String::new(), |_| String::new()),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
