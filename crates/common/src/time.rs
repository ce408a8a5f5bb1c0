//! Block timestamps (seconds since the Unix epoch, 32-bit like the chain's
//! on-wire format).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

pub const SECONDS_PER_DAY: u32 = 86_400;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u32);

impl Timestamp {
    /// Sentinel for "never" / "unset upper bound".
    pub const MAX: Timestamp = Timestamp(u32::MAX);
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_secs(secs: u32) -> Self {
        Timestamp(secs)
    }

    pub const fn secs(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Seconds from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_elapsed_since(&self, earlier: Timestamp) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u32> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: u32) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs))
    }
}

impl Sub<u32> for Timestamp {
    type Output = Timestamp;
    fn sub(self, rhs: u32) -> Timestamp {
        Timestamp(self.0.saturating_sub(rhs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_saturates() {
        assert_eq!(Timestamp::MAX + 1, Timestamp::MAX);
        assert_eq!(Timestamp(5) - 10, Timestamp::ZERO);
        assert_eq!(Timestamp(100).saturating_elapsed_since(Timestamp(40)), 60);
        assert_eq!(Timestamp(40).saturating_elapsed_since(Timestamp(100)), 0);
    }
}
