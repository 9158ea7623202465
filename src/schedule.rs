use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    pub const ALL: [Day; 5] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    pub fn key(self) -> &'static str {
        match self {
            Day::Mon => "mon",
            Day::Tue => "tue",
            Day::Wed => "wed",
            Day::Thu => "thu",
            Day::Fri => "fri",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Day::Mon => "Monday",
            Day::Tue => "Tuesday",
            Day::Wed => "Wednesday",
            Day::Thu => "Thursday",
            Day::Fri => "Friday",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown weekday `{0}`, expected one of mon, tue, wed, thu, fri")]
pub struct ParseDayError(pub String);

impl FromStr for Day {
    type Err = ParseDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Day::ALL
            .into_iter()
            .find(|day| lower == day.key() || lower == day.to_string().to_lowercase())
            .ok_or_else(|| ParseDayError(s.trim().to_string()))
    }
}

impl TryFrom<Weekday> for Day {
    type Error = Weekday;

    fn try_from(weekday: Weekday) -> Result<Self, Self::Error> {
        match weekday {
            Weekday::Mon => Ok(Day::Mon),
            Weekday::Tue => Ok(Day::Tue),
            Weekday::Wed => Ok(Day::Wed),
            Weekday::Thu => Ok(Day::Thu),
            Weekday::Fri => Ok(Day::Fri),
            weekend => Err(weekend),
        }
    }
}

/// Half-open hour interval `[start, end)`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: u8,
    pub end: u8,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}

/// Reports whether `candidate` overlaps `existing`.
///
/// A slot ending at hour H does not conflict with one starting at H.
pub fn has_conflict(existing: Slot, candidate: Slot) -> bool {
    if candidate.start < existing.start {
        candidate.end > existing.start
    } else {
        candidate.start < existing.end
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LectureBlock {
    pub id: Uuid,
    pub day: Day,
    pub start: u8,
    pub end: u8,
    pub name: String,
    pub color: String,
}

impl LectureBlock {
    pub fn slot(&self) -> Slot {
        Slot {
            start: self.start,
            end: self.end,
        }
    }
}

/// Candidate fields of a lecture, already validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lecture {
    pub name: String,
    pub start: u8,
    pub end: u8,
    pub color: String,
}

impl Lecture {
    pub fn slot(&self) -> Slot {
        Slot {
            start: self.start,
            end: self.end,
        }
    }

    fn into_block(self, id: Uuid, day: Day) -> LectureBlock {
        LectureBlock {
            id,
            day,
            start: self.start,
            end: self.end,
            name: self.name,
            color: self.color,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{slot} on {day} is already taken by \"{name}\"")]
pub struct ConflictError {
    pub id: Uuid,
    pub day: Day,
    pub slot: Slot,
    pub name: String,
}

impl ConflictError {
    fn with(block: &LectureBlock) -> Self {
        ConflictError {
            id: block.id,
            day: block.day,
            slot: block.slot(),
            name: block.name.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("no lecture {id} on {day}")]
    UnknownLecture { id: Uuid, day: Day },
}

/// Reasons a stored schedule is refused when loading it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSchedule {
    #[error("lecture {id} is filed under {key} but says {day}")]
    MisplacedLecture { id: Uuid, key: Day, day: Day },
    #[error("lecture {id} ends at {end} before it starts at {start}")]
    EmptySlot { id: Uuid, start: u8, end: u8 },
    #[error("lecture {id} appears more than once")]
    DuplicateId { id: Uuid },
    #[error("lecture {id} overlaps: {conflict}")]
    Overlap { id: Uuid, conflict: ConflictError },
}

/// Lectures of a working week, keyed by day.
///
/// Blocks within a day never overlap and ids are unique across the week.
/// The operations below keep both, and deserializing rejects data that
/// breaks them.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(
    into = "BTreeMap<Day, Vec<LectureBlock>>",
    try_from = "BTreeMap<Day, Vec<LectureBlock>>"
)]
pub struct WeeklySchedule {
    days: BTreeMap<Day, Vec<LectureBlock>>,
}

impl From<WeeklySchedule> for BTreeMap<Day, Vec<LectureBlock>> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule.days
    }
}

impl TryFrom<BTreeMap<Day, Vec<LectureBlock>>> for WeeklySchedule {
    type Error = InvalidSchedule;

    fn try_from(days: BTreeMap<Day, Vec<LectureBlock>>) -> Result<Self, Self::Error> {
        let mut schedule = WeeklySchedule::new();
        for (key, blocks) in days {
            for block in blocks {
                let id = block.id;
                if block.day != key {
                    return Err(InvalidSchedule::MisplacedLecture {
                        id,
                        key,
                        day: block.day,
                    });
                }
                if block.start >= block.end {
                    return Err(InvalidSchedule::EmptySlot {
                        id,
                        start: block.start,
                        end: block.end,
                    });
                }
                if schedule.find(id).is_some() {
                    return Err(InvalidSchedule::DuplicateId { id });
                }
                if let Some(conflict) = schedule.conflict_on(key, block.slot(), None) {
                    return Err(InvalidSchedule::Overlap { id, conflict });
                }
                schedule.days.entry(key).or_default().push(block);
            }
        }
        Ok(schedule)
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl WeeklySchedule {
    pub fn new() -> Self {
        WeeklySchedule {
            days: Day::ALL.into_iter().map(|day| (day, Vec::new())).collect(),
        }
    }

    pub fn day(&self, day: Day) -> &[LectureBlock] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, id: Uuid) -> Option<&LectureBlock> {
        self.iter().find(|block| block.id == id)
    }

    /// All blocks, day by day, each day in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LectureBlock> {
        self.days.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn conflict_on(&self, day: Day, slot: Slot, ignore: Option<Uuid>) -> Option<ConflictError> {
        self.day(day)
            .iter()
            .filter(|block| Some(block.id) != ignore)
            .find(|block| has_conflict(block.slot(), slot))
            .map(ConflictError::with)
    }

    fn fresh_id(&self) -> Uuid {
        let mut id = Uuid::new_v4();
        while self.find(id).is_some() {
            id = Uuid::new_v4();
        }
        id
    }

    pub fn insert_lecture(&mut self, day: Day, lecture: Lecture) -> Result<Uuid, ConflictError> {
        if let Some(conflict) = self.conflict_on(day, lecture.slot(), None) {
            return Err(conflict);
        }

        let id = self.fresh_id();
        debug!(%id, %day, slot = %lecture.slot(), "inserting lecture");
        self.days
            .entry(day)
            .or_default()
            .push(lecture.into_block(id, day));
        Ok(id)
    }

    /// Replaces lecture `id`, moving it from `original_day` to the end of `day`.
    ///
    /// The lecture does not conflict with its own previous slot.
    pub fn edit_lecture(
        &mut self,
        id: Uuid,
        original_day: Day,
        day: Day,
        lecture: Lecture,
    ) -> Result<(), ScheduleError> {
        let Some(position) = self.day(original_day).iter().position(|b| b.id == id) else {
            return Err(ScheduleError::UnknownLecture {
                id,
                day: original_day,
            });
        };

        if let Some(conflict) = self.conflict_on(day, lecture.slot(), Some(id)) {
            return Err(conflict.into());
        }

        debug!(%id, from = %original_day, to = %day, slot = %lecture.slot(), "editing lecture");
        if let Some(blocks) = self.days.get_mut(&original_day) {
            blocks.remove(position);
        }
        self.days
            .entry(day)
            .or_default()
            .push(lecture.into_block(id, day));
        Ok(())
    }

    pub fn remove_lecture(&mut self, id: Uuid) -> Option<LectureBlock> {
        for blocks in self.days.values_mut() {
            if let Some(position) = blocks.iter().position(|b| b.id == id) {
                debug!(%id, "removing lecture");
                return Some(blocks.remove(position));
            }
        }
        None
    }
}
