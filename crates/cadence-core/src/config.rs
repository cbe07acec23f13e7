use web_time::Duration;

/// Configuration a host hands to its [`ClockScheduler`](crate::scheduler::ClockScheduler).
///
/// `clock_speed` defaults to zero; a host must pick a real interval before
/// the scheduler can start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClockConfig {
    /// Start ticking as soon as the host's init signal fires.
    pub start_on_init: bool,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "clock_speed_ms", with = "millis")
    )]
    pub clock_speed: Duration,
}

impl ClockConfig {
    pub fn start_on_init(mut self, yes: bool) -> Self {
        self.start_on_init = yes;
        self
    }

    pub fn clock_speed(mut self, interval: Duration) -> Self {
        self.clock_speed = interval;
        self
    }

    pub fn clock_speed_ms(self, ms: u64) -> Self {
        self.clock_speed(Duration::from_millis(ms))
    }
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
