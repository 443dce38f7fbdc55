use service::clock::ClockService;
use time::OffsetDateTime;

/// Local wall clock time. Falls back to UTC where the local offset cannot
/// be determined safely.
pub struct ClockServiceImpl;

impl ClockServiceImpl {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

impl ClockService for ClockServiceImpl {
    fn time_now(&self) -> time::Time {
        self.now().time()
    }
    fn date_now(&self) -> time::Date {
        self.now().date()
    }
    fn date_time_now(&self) -> time::PrimitiveDateTime {
        let now = self.now();
        time::PrimitiveDateTime::new(now.date(), now.time())
    }
}
