//! Capabilities the host environment provides to the session.

use chrono::{
    DateTime,
    Local,
    NaiveDate,
    Utc,
};
use std::rc::Rc;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for daily-reward bookkeeping.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }

    fn unix_millis(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// The daily reward rolls over at local midnight.
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Identity of the person running the host app, when the host shares one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostUser {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

impl HostUser {
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("miner")
    }
}

#[derive(Clone)]
pub struct HostContext {
    pub clock: Rc<dyn Clock>,
    pub user: HostUser,
}

impl HostContext {
    pub fn new(clock: impl Clock + 'static, user: HostUser) -> Self {
        Self {
            clock: Rc::new(clock),
            user,
        }
    }

    pub fn system(user: HostUser) -> Self {
        Self::new(SystemClock, user)
    }
}
