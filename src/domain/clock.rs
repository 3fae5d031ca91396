//! Time source abstraction
//!
//! Expiry checks are lazy (no background sweep), so every component that
//! compares against "now" takes a [`Clock`] instead of calling `Utc::now()`
//! directly. Tests drive expiry deterministically with a fixed clock.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Trait for obtaining the current time
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}


#[cfg(test)]
mod tests {
    use super::fixed::FixedClock;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock_advances() {
        let start = Utc::now();
        let clock = FixedClock::new(start);

        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(6));
        assert_eq!(clock.now(), start + Duration::minutes(6));
    }
}
