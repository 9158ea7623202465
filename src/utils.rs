use chrono::{Datelike, Duration, Local};
use teloxide::utils::html::escape;

use crate::schedule::{Day, LectureBlock, WeeklySchedule};
use crate::state::{Field, FieldError, LectureForm, State};

pub const FIRST_HOUR: u8 = 9;
pub const LAST_HOUR: u8 = 20;
pub const DEFAULT_COLOR: &str = "#00ff55";

pub fn lecture_message(block: &LectureBlock) -> String {
    format!(
        "{} {}\n<b>{}</b>\n{}",
        block.day,
        block.slot(),
        escape(&block.name),
        block.color
    )
}

/// Rejected answer followed by the prompt for the same field.
pub fn field_error_message(err: &FieldError, field: Option<Field>) -> String {
    let prompt = field.map(Field::prompt).unwrap_or_default();
    format!("{}.\n\n{}", escape(&err.to_string()), prompt)
}

/// Preview of the form as filled so far, with placeholders for empty fields.
pub fn state_message(state: &State) -> String {
    let (form, current): (&LectureForm, Option<&LectureBlock>) = match state {
        State::AddLecture { form } => (form, None),
        State::EditLecture { current, form } => (form, Some(current)),
        _ => {
            return "".into();
        }
    };

    let day = form
        .day
        .or(current.map(|b| b.day))
        .unwrap_or(Day::Mon);
    let start = form.start.or(current.map(|b| b.start)).unwrap_or(FIRST_HOUR);
    let end = form
        .end
        .or(current.map(|b| b.end))
        .unwrap_or(start.saturating_add(1));
    let name = form
        .name
        .clone()
        .or(current.map(|b| b.name.clone()))
        .unwrap_or("Lecture".into());
    let color = form
        .color
        .clone()
        .or(current.map(|b| b.color.clone()))
        .unwrap_or(DEFAULT_COLOR.into());

    format!(
        "{} {:02}:00-{:02}:00\n<b>{}</b>\n{}",
        day,
        start,
        end,
        escape(&name),
        color
    )
}

pub fn day_message(schedule: &WeeklySchedule, day: Day) -> String {
    let mut blocks: Vec<_> = schedule.day(day).iter().collect();
    blocks.sort_by_key(|b| b.start);

    let mut message = format!("<b>{}</b>\n\n", day);
    let lectures = blocks
        .iter()
        .map(|b| format!("{}\n<b>{}</b>", b.slot(), escape(&b.name)))
        .collect::<Vec<_>>()
        .join("\n------\n\n");

    if lectures.is_empty() {
        message.push_str("No classes");
    } else {
        message.push_str(&lectures);
    }
    message
}

/// Lectures in display order: by day, then by start hour.
pub fn listing(schedule: &WeeklySchedule) -> Vec<&LectureBlock> {
    Day::ALL
        .into_iter()
        .flat_map(|day| {
            let mut blocks: Vec<_> = schedule.day(day).iter().collect();
            blocks.sort_by_key(|b| b.start);
            blocks
        })
        .collect()
}

pub fn listing_message(blocks: &[&LectureBlock]) -> String {
    blocks
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{}. {} {} <b>{}</b>", i + 1, b.day.key(), b.slot(), escape(&b.name)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a 1-based position in a listing of `len` lectures.
pub fn pick(text: &str, len: usize) -> Option<usize> {
    text.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

/// Working day `offset` days from today, or `None` on a weekend.
pub fn working_day(offset: i64) -> Option<Day> {
    let date = Local::now() + Duration::days(offset);
    Day::try_from(date.weekday()).ok()
}
