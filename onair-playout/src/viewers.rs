//! Decorative viewer counter
//!
//! A bounded random walk per channel, shown next to the player for
//! atmosphere. It is advanced only when queried and nothing in playback
//! reads it.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

const DEFAULT_FLOOR: u32 = 40;
const DEFAULT_CEILING: u32 = 2_500;
const DEFAULT_MAX_STEP: u32 = 25;

#[derive(Debug)]
pub struct ViewerCounter {
    floor: u32,
    ceiling: u32,
    max_step: u32,
    counts: Mutex<HashMap<Uuid, u32>>,
}

impl Default for ViewerCounter {
    fn default() -> Self {
        Self::new(DEFAULT_FLOOR, DEFAULT_CEILING, DEFAULT_MAX_STEP)
    }
}

impl ViewerCounter {
    pub fn new(floor: u32, ceiling: u32, max_step: u32) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            max_step,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Next value of the walk for `channel_id`; 0 while off air
    pub fn sample(&self, channel_id: Uuid, on_air: bool) -> u32 {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        if !on_air {
            counts.remove(&channel_id);
            return 0;
        }

        let mut rng = rand::thread_rng();
        let (floor, ceiling, max_step) = (self.floor, self.ceiling, self.max_step);
        let count = counts
            .entry(channel_id)
            .or_insert_with(|| rng.gen_range(floor..=ceiling));

        let step = i64::from(rng.gen_range(0..=max_step));
        let delta = if rng.gen_bool(0.5) { step } else { -step };
        let next = (i64::from(*count) + delta).clamp(i64::from(floor), i64::from(ceiling));
        *count = next as u32;
        *count
    }
}
