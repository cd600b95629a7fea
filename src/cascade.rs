use crate::class_day::{is_class_day, next_class_day};
use crate::config::SearchLimits;
use crate::holiday::HolidayDates;
use crate::item::ClassMeetingItem;
use crate::pattern::WeekdayPattern;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    /// The chain resolved and a new calendar was produced.
    Moved,
    /// Source and target are the same date.
    Unchanged,
    /// No movable item at the source date; stale drag state.
    NotFound,
    /// A bound was hit; the best placement reached is returned.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub description: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub meetings: Vec<ClassMeetingItem>,
    pub status: MoveStatus,
    pub relocations: Vec<Relocation>,
}

impl MoveOutcome {
    fn untouched(meetings: &[ClassMeetingItem], status: MoveStatus) -> Self {
        Self {
            meetings: meetings.to_vec(),
            status,
            relocations: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == MoveStatus::Exhausted
    }
}

/// Item index -> current date. Each step yields a fresh map.
type Placement = BTreeMap<usize, NaiveDate>;

fn place(placement: &Placement, index: usize, date: NaiveDate) -> Placement {
    let mut next = placement.clone();
    next.insert(index, date);
    next
}

struct CascadeBoard<'a> {
    meetings: &'a [ClassMeetingItem],
    movable: Vec<bool>,
    blocked: HolidayDates,
    pattern: WeekdayPattern,
    limits: SearchLimits,
}

impl<'a> CascadeBoard<'a> {
    fn new(
        meetings: &'a [ClassMeetingItem],
        pattern: WeekdayPattern,
        holidays: &HolidayDates,
        limits: SearchLimits,
    ) -> Self {
        let movable = meetings
            .iter()
            .map(|meeting| !meeting.is_fixed() && is_class_day(meeting.date, pattern, holidays))
            .collect();
        let mut blocked = holidays.clone();
        blocked.extend(
            meetings
                .iter()
                .filter(|meeting| meeting.is_fixed())
                .map(|meeting| meeting.date),
        );
        Self {
            meetings,
            movable,
            blocked,
            pattern,
            limits,
        }
    }

    fn find_mover(&self, source: NaiveDate, item_key: Option<&str>) -> Option<usize> {
        self.meetings.iter().enumerate().position(|(index, meeting)| {
            self.movable[index]
                && meeting.date == source
                && item_key.is_none_or(|key| meeting.description == key)
        })
    }

    fn occupant(&self, placement: &Placement, mover: usize, date: NaiveDate) -> Option<usize> {
        placement
            .iter()
            .find(|&(&index, &current)| index != mover && self.movable[index] && current == date)
            .map(|(&index, _)| index)
    }

    fn next_free_slot(&self, after: NaiveDate) -> Option<NaiveDate> {
        next_class_day(
            after,
            self.pattern,
            &self.blocked,
            self.limits.holiday_skip_attempts,
        )
    }
}

/// Move one class meeting to `target`, pushing whatever it displaces forward
/// to the next free class day, and so on down the chain.
///
/// Only on-pattern, non-fixed meetings take part. Holidays and dates held by
/// fixed meetings are skipped when looking for a free slot. `item_key`
/// selects among several movable meetings on `source` by description.
#[tracing::instrument(skip(meetings, holidays, limits), fields(meetings = meetings.len()))]
pub fn move_meeting_item(
    meetings: &[ClassMeetingItem],
    source: NaiveDate,
    target: NaiveDate,
    pattern: WeekdayPattern,
    holidays: &HolidayDates,
    item_key: Option<&str>,
    limits: SearchLimits,
) -> MoveOutcome {
    let board = CascadeBoard::new(meetings, pattern, holidays, limits);

    let Some(mover) = board.find_mover(source, item_key) else {
        warn!(%source, item_key, "no movable meeting at source date");
        return MoveOutcome::untouched(meetings, MoveStatus::NotFound);
    };
    if source == target {
        return MoveOutcome::untouched(meetings, MoveStatus::Unchanged);
    }

    let mut placement: Placement = meetings
        .iter()
        .enumerate()
        .map(|(index, meeting)| (index, meeting.date))
        .collect();
    let mut queue = VecDeque::from([(mover, target)]);
    let mut status = MoveStatus::Moved;
    let mut hops = 0;

    while let Some((index, destination)) = queue.pop_front() {
        let displaced = board.occupant(&placement, index, destination);
        placement = place(&placement, index, destination);
        debug!(item = %meetings[index].description, %destination, "placed meeting");

        let Some(displaced) = displaced else {
            break;
        };
        hops += 1;
        if hops > limits.cascade_hops {
            error!(hops, "cascade exceeded hop limit");
            status = MoveStatus::Exhausted;
            break;
        }
        match board.next_free_slot(destination) {
            Some(slot) => queue.push_back((displaced, slot)),
            None => {
                warn!(%destination, "no free class day for displaced meeting");
                status = MoveStatus::Exhausted;
                break;
            }
        }
    }

    let mut relocations = Vec::new();
    let updated = meetings
        .iter()
        .enumerate()
        .map(|(index, meeting)| {
            let date = placement.get(&index).copied().unwrap_or(meeting.date);
            if date == meeting.date {
                meeting.clone()
            } else {
                relocations.push(Relocation {
                    description: meeting.description.clone(),
                    from: meeting.date,
                    to: date,
                });
                meeting.with_date(date)
            }
        })
        .collect();

    MoveOutcome {
        meetings: updated,
        status,
        relocations,
    }
}
