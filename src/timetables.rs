use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use teloxide::types::ChatId;

use crate::schedule::WeeklySchedule;

/// One weekly schedule per chat.
///
/// Every access holds the lock for the whole closure, so inserts and edits
/// on a schedule never interleave.
#[derive(Default)]
pub struct Timetables {
    schedules: Mutex<HashMap<ChatId, WeeklySchedule>>,
}

impl Timetables {
    pub fn with<R>(&self, chat: ChatId, f: impl FnOnce(&mut WeeklySchedule) -> R) -> R {
        // Operations never leave a schedule half-updated, so a poisoned lock is still usable.
        let mut schedules = self.schedules.lock().unwrap_or_else(PoisonError::into_inner);
        f(schedules.entry(chat).or_default())
    }

    pub fn snapshot(&self, chat: ChatId) -> WeeklySchedule {
        self.with(chat, |schedule| schedule.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Day, Lecture};

    fn math() -> Lecture {
        Lecture {
            name: "Math".into(),
            start: 9,
            end: 10,
            color: "#00ff55".into(),
        }
    }

    #[test]
    fn chats_have_separate_schedules() {
        let timetables = Timetables::default();
        timetables
            .with(ChatId(1), |s| s.insert_lecture(Day::Mon, math()))
            .unwrap();

        assert_eq!(timetables.snapshot(ChatId(1)).len(), 1);
        assert!(timetables.snapshot(ChatId(2)).is_empty());
        assert!(timetables
            .with(ChatId(2), |s| s.insert_lecture(Day::Mon, math()))
            .is_ok());
    }

    #[test]
    fn concurrent_inserts_keep_one_winner_per_slot() {
        let timetables = std::sync::Arc::new(Timetables::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let timetables = timetables.clone();
                std::thread::spawn(move || {
                    timetables
                        .with(ChatId(7), |s| s.insert_lecture(Day::Wed, math()))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(timetables.snapshot(ChatId(7)).day(Day::Wed).len(), 1);
    }
}
