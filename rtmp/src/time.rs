//! RTMP timestamps are 32-bit unsigned millisecond counters from an unknown
//! epoch.  Streams can outlive a u32's worth of milliseconds, so arithmetic
//! wraps and two times are comparable as long as they are within 2^31 - 1 of
//! each other (the adjacency window the RTMP specification defines).

use std::cmp::{max, min, Ordering};
use std::num::Wrapping;
use std::ops::{Add, Sub};

/// A wrapping RTMP timestamp.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
pub struct Timestamp {
    pub value: u32,
}

impl Timestamp {
    pub fn new(value: u32) -> Self {
        Timestamp { value }
    }

    pub fn set(&mut self, new_value: u32) {
        self.value = new_value;
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, other: Timestamp) -> Self {
        Timestamp::new((Wrapping(self.value) + Wrapping(other.value)).0)
    }
}

impl Add<u32> for Timestamp {
    type Output = Timestamp;

    fn add(self, other: u32) -> Self {
        Timestamp::new((Wrapping(self.value) + Wrapping(other)).0)
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, other: Timestamp) -> Self {
        Timestamp::new((Wrapping(self.value) - Wrapping(other.value)).0)
    }
}

impl Sub<u32> for Timestamp {
    type Output = Timestamp;

    fn sub(self, other: u32) -> Self {
        Timestamp::new((Wrapping(self.value) - Wrapping(other)).0)
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.value, other.value)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<u32> for Timestamp {
    fn eq(&self, other: &u32) -> bool {
        self.value == *other
    }
}

fn compare(value1: u32, value2: u32) -> Ordering {
    // Two times are adjacent when within 2^31 - 1 of each other; a larger
    // difference means the smaller value is on the far side of a wrap.
    const MAX_ADJACENT_VALUE: u32 = 2147483647;

    let difference = max(value1, value2) - min(value1, value2);
    if difference <= MAX_ADJACENT_VALUE {
        value1.cmp(&value2)
    } else {
        value2.cmp(&value1)
    }
}
