use chrono::{Local, NaiveDate, NaiveDateTime};

/// Wall-clock source, injected so claimability and submission dates are
/// testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Device local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_today_is_date_part() {
        let at = NaiveDateTime::parse_from_str("2024-10-11 23:59:59", "%Y-%m-%d %H:%M:%S").unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 10, 11).unwrap());
    }

    #[test]
    fn system_clock_matches_local_date() {
        assert_eq!(SystemClock.today(), Local::now().date_naive());
    }
}
