use thiserror::Error;
use uuid::Uuid;

use crate::schedule::{Day, Lecture, LectureBlock, ParseDayError};
use crate::utils::{DEFAULT_COLOR, FIRST_HOUR, LAST_HOUR};

/// Answer that keeps the current value of a field.
pub const KEEP: &str = "-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Edit,
    Remove,
}

#[derive(Clone, Default, Debug)]
pub enum State {
    #[default]
    Default,
    AddLecture {
        form: LectureForm,
    },
    PickLecture {
        action: Action,
        ids: Vec<Uuid>,
    },
    EditLecture {
        current: LectureBlock,
        form: LectureForm,
    },
    ConfirmRemove {
        id: Uuid,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Type lecture name")]
    EmptyName,
    #[error(transparent)]
    Day(#[from] ParseDayError),
    #[error("Choose an hour between {} and {}", FIRST_HOUR, LAST_HOUR)]
    Hour,
    #[error("Check start time and end time")]
    EndBeforeStart,
    #[error("Color must look like #00ff55")]
    Color,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Day,
    Start,
    End,
    Color,
}

impl Field {
    pub fn prompt(self) -> &'static str {
        match self {
            Field::Name => "Enter the lecture name.",
            Field::Day => "Enter the day: <b>mon</b>, <b>tue</b>, <b>wed</b>, <b>thu</b> or <b>fri</b>. Send <b>-</b> for Monday.",
            Field::Start => "Enter the start hour, for example <b>9</b>. Send <b>-</b> for the earliest hour.",
            Field::End => "Enter the end hour, for example <b>10</b>. Send <b>-</b> for one hour after the start.",
            Field::Color => "Enter the table color, for example <b>#00ff55</b>, or <b>-</b> for the default.",
        }
    }
}

/// Fields of the create/edit dialog, filled one answer at a time.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct LectureForm {
    pub name: Option<String>,
    pub day: Option<Day>,
    pub start: Option<u8>,
    pub end: Option<u8>,
    pub color: Option<String>,
}

fn parse_hour(text: &str) -> Result<u8, FieldError> {
    text.trim()
        .parse::<u8>()
        .ok()
        .filter(|hour| (FIRST_HOUR..=LAST_HOUR).contains(hour))
        .ok_or(FieldError::Hour)
}

fn parse_color(text: &str) -> Result<String, FieldError> {
    let text = text.trim();
    match text.strip_prefix('#') {
        Some(hex) if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
            Ok(text.to_lowercase())
        }
        _ => Err(FieldError::Color),
    }
}

impl LectureForm {
    pub fn next_field(&self) -> Option<Field> {
        if self.name.is_none() {
            Some(Field::Name)
        } else if self.day.is_none() {
            Some(Field::Day)
        } else if self.start.is_none() {
            Some(Field::Start)
        } else if self.end.is_none() {
            Some(Field::End)
        } else if self.color.is_none() {
            Some(Field::Color)
        } else {
            None
        }
    }

    /// Fills the next empty field from `text`.
    ///
    /// With `current` set, [`KEEP`] copies the field from the lecture being
    /// edited. Without it, [`KEEP`] picks the default: Monday, 9 to 10 and
    /// [`DEFAULT_COLOR`]. The name has no default.
    pub fn answer(&mut self, text: &str, current: Option<&LectureBlock>) -> Result<(), FieldError> {
        let keep = text.trim() == KEEP;
        let Some(field) = self.next_field() else {
            return Ok(());
        };

        match field {
            Field::Name => {
                let name = match current {
                    Some(block) if keep => block.name.clone(),
                    None if keep => String::new(),
                    _ => text.trim().to_string(),
                };
                if name.is_empty() {
                    return Err(FieldError::EmptyName);
                }
                self.name = Some(name);
            }
            Field::Day => {
                self.day = Some(match current {
                    Some(block) if keep => block.day,
                    None if keep => Day::Mon,
                    _ => text.parse()?,
                });
            }
            Field::Start => {
                self.start = Some(match current {
                    Some(block) if keep => block.start,
                    None if keep => FIRST_HOUR,
                    _ => parse_hour(text)?,
                });
            }
            Field::End => {
                let end = match current {
                    Some(block) if keep => block.end,
                    None if keep => self
                        .start
                        .map(|start| start + 1)
                        .filter(|end| *end <= LAST_HOUR)
                        .ok_or(FieldError::Hour)?,
                    _ => parse_hour(text)?,
                };
                if self.start.is_some_and(|start| start >= end) {
                    return Err(FieldError::EndBeforeStart);
                }
                self.end = Some(end);
            }
            Field::Color => {
                self.color = Some(match current {
                    Some(block) if keep => block.color.clone(),
                    None if keep => DEFAULT_COLOR.to_string(),
                    _ => parse_color(text)?,
                });
            }
        }
        Ok(())
    }

    /// Clears the hours so the dialog asks for them again.
    pub fn retry_time(&mut self) {
        self.start = None;
        self.end = None;
    }

    pub fn complete(&self) -> Option<(Day, Lecture)> {
        Some((
            self.day?,
            Lecture {
                name: self.name.clone()?,
                start: self.start?,
                end: self.end?,
                color: self.color.clone()?,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(form: &mut LectureForm, answers: &[&str], current: Option<&LectureBlock>) {
        for answer in answers {
            form.answer(answer, current).unwrap();
        }
    }

    #[test]
    fn add_dialog_fills_fields_in_order() {
        let mut form = LectureForm::default();
        assert_eq!(form.next_field(), Some(Field::Name));
        fill(&mut form, &["Math", "tue", "9", "11"], None);
        assert_eq!(form.next_field(), Some(Field::Color));
        fill(&mut form, &["-"], None);

        let (day, lecture) = form.complete().unwrap();
        assert_eq!(day, Day::Tue);
        assert_eq!(lecture.name, "Math");
        assert_eq!((lecture.start, lecture.end), (9, 11));
        assert_eq!(lecture.color, DEFAULT_COLOR);
    }

    #[test]
    fn rejects_invalid_answers_without_advancing() {
        let mut form = LectureForm::default();
        assert_eq!(form.answer("   ", None), Err(FieldError::EmptyName));
        assert_eq!(form.answer(KEEP, None), Err(FieldError::EmptyName));
        assert_eq!(form.next_field(), Some(Field::Name));
        form.answer("Math", None).unwrap();

        assert!(matches!(form.answer("sun", None), Err(FieldError::Day(_))));
        assert_eq!(form.next_field(), Some(Field::Day));
        form.answer("wed", None).unwrap();

        assert_eq!(form.answer("8", None), Err(FieldError::Hour));
        assert_eq!(form.answer("21", None), Err(FieldError::Hour));
        assert_eq!(form.answer("ten", None), Err(FieldError::Hour));
        form.answer("12", None).unwrap();

        assert_eq!(form.answer("12", None), Err(FieldError::EndBeforeStart));
        assert_eq!(form.answer("10", None), Err(FieldError::EndBeforeStart));
        form.answer("13", None).unwrap();

        assert_eq!(form.answer("green", None), Err(FieldError::Color));
        assert_eq!(form.answer("#12345", None), Err(FieldError::Color));
        form.answer("#AABBCC", None).unwrap();
        assert_eq!(form.color.as_deref(), Some("#aabbcc"));
        assert!(form.next_field().is_none());
    }

    #[test]
    fn add_dialog_accepts_defaults() {
        let mut form = LectureForm::default();
        fill(&mut form, &["Math", "-", "-", "-", "-"], None);

        let (day, lecture) = form.complete().unwrap();
        assert_eq!(day, Day::Mon);
        assert_eq!(
            lecture,
            Lecture {
                name: "Math".into(),
                start: 9,
                end: 10,
                color: DEFAULT_COLOR.into(),
            }
        );
    }

    #[test]
    fn default_end_follows_chosen_start() {
        let mut form = LectureForm::default();
        fill(&mut form, &["Math", "wed", "15", "-"], None);
        assert_eq!(form.end, Some(16));

        let mut late = LectureForm::default();
        fill(&mut late, &["Math", "wed", "20"], None);
        assert_eq!(late.answer(KEEP, None), Err(FieldError::Hour));
        assert_eq!(late.next_field(), Some(Field::End));
    }

    #[test]
    fn edit_dialog_keeps_current_values() {
        let current = LectureBlock {
            id: Uuid::new_v4(),
            day: Day::Mon,
            start: 9,
            end: 10,
            name: "Math".into(),
            color: "#123456".into(),
        };
        let mut form = LectureForm::default();
        fill(&mut form, &["-", "fri", "-", "-", "-"], Some(&current));

        let (day, lecture) = form.complete().unwrap();
        assert_eq!(day, Day::Fri);
        assert_eq!(
            lecture,
            Lecture {
                name: "Math".into(),
                start: 9,
                end: 10,
                color: "#123456".into(),
            }
        );
    }

    #[test]
    fn retry_time_asks_for_start_again() {
        let mut form = LectureForm::default();
        fill(&mut form, &["Math", "mon", "9", "10", "-"], None);
        form.retry_time();
        assert_eq!(form.next_field(), Some(Field::Start));
        assert!(form.complete().is_none());
    }
}
