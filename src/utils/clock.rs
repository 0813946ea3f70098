use chrono::{DateTime, Utc};

/// Provides the reference instant for commands. Computations in
/// [sessions](crate::sessions) never read the clock themselves, it is only consulted at the edges
/// so that tests can pin "now".
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
