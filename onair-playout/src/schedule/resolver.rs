//! Schedule resolution
//!
//! Pure mapping from (day plan, instant) to the item on air and what
//! follows it. No hidden state: the same inputs always give the same
//! answer, whether the list came from the cache or straight from the store.

use onair_common::ScheduleItem;
use std::cmp::Ordering;

/// Result of resolving a day plan at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Item airing now, or the promoted fallback
    pub current: Option<ScheduleItem>,
    /// Items starting strictly after now, sorted, without a promoted item
    pub upcoming: Vec<ScheduleItem>,
    /// `current` was promoted from the upcoming list to fill a gap
    pub promoted: bool,
}

impl Resolution {
    /// Seconds already aired of `current` at `now_seconds`; zero for a
    /// promoted item, which starts from the top
    pub fn offset_into_current(&self, now_seconds: u32) -> u32 {
        match &self.current {
            Some(item) if !self.promoted && item.window_contains(now_seconds) => {
                now_seconds - item.start_seconds()
            }
            _ => 0,
        }
    }

    /// Seconds left until `current` ends at `now_seconds`
    pub fn remaining_in_current(&self, now_seconds: u32) -> Option<u32> {
        self.current
            .as_ref()
            .map(|item| item.duration_seconds - self.offset_into_current(now_seconds))
    }
}

/// Ordering used everywhere a day plan is sorted: start time, then
/// order_position, then id so that equal keys still sort deterministically.
pub fn schedule_order(a: &ScheduleItem, b: &ScheduleItem) -> Ordering {
    a.start_seconds()
        .cmp(&b.start_seconds())
        .then(a.order_position.cmp(&b.order_position))
        .then(a.id.cmp(&b.id))
}

/// Sort a day plan in place
pub fn sort_schedule(items: &mut [ScheduleItem]) {
    items.sort_by(schedule_order);
}

/// Resolve the item on air at `now_seconds` (seconds since local midnight)
///
/// - Current is the first item, in schedule order, whose window contains
///   now and whose media is playable. Overlaps are not an error: the
///   earliest start wins. An item without playable media is passed over
///   as if it were not in the plan.
/// - Upcoming is every item starting strictly after now.
/// - If nothing contains now, the first upcoming item with playable media
///   is promoted to current and removed from upcoming, so a gap in the plan
///   does not blank the channel.
pub fn resolve(items: &[ScheduleItem], now_seconds: u32) -> Resolution {
    let mut sorted = items.to_vec();
    sort_schedule(&mut sorted);

    let current = sorted
        .iter()
        .find(|item| item.window_contains(now_seconds) && item.has_playable_media())
        .cloned();

    let mut upcoming: Vec<ScheduleItem> = sorted
        .into_iter()
        .filter(|item| item.start_seconds() > now_seconds)
        .collect();

    if current.is_some() {
        return Resolution {
            current,
            upcoming,
            promoted: false,
        };
    }

    match upcoming.iter().position(ScheduleItem::has_playable_media) {
        Some(index) => {
            let promoted = upcoming.remove(index);
            Resolution {
                current: Some(promoted),
                upcoming,
                promoted: true,
            }
        }
        None => Resolution {
            current: None,
            upcoming,
            promoted: false,
        },
    }
}
