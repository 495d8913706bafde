#[cfg(test)]
use std::sync::{Arc, Mutex};

use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Source of "now" for every window decision; all instants are naive UTC.
pub(crate) trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        primitive_now_utc()
    }
}

/// Clock pinned to an instant until moved explicitly.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    current: Arc<Mutex<PrimitiveDateTime>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: PrimitiveDateTime) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    pub(crate) fn set(&self, instant: PrimitiveDateTime) {
        let mut guard = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = instant;
    }

    pub(crate) fn advance(&self, by: time::Duration) {
        let mut guard = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> PrimitiveDateTime {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(datetime!(2025-01-02 10:20:30)), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn to_primitive_utc_normalizes_offset() {
        let shifted = datetime!(2025-01-02 13:20:30 +03:00);
        assert_eq!(to_primitive_utc(shifted), datetime!(2025-01-02 10:20:30));
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(datetime!(2025-03-01 09:00:00));
        assert_eq!(clock.now(), datetime!(2025-03-01 09:00:00));

        clock.advance(Duration::minutes(30));
        assert_eq!(clock.now(), datetime!(2025-03-01 09:30:00));

        clock.set(datetime!(2025-03-02 00:00:00));
        assert_eq!(clock.now(), datetime!(2025-03-02 00:00:00));
    }
}
