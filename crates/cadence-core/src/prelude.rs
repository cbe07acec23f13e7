pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::ClockConfig;
pub use crate::error::{SchedulerError, SourceError, WaitError};
pub use crate::lifecycle::{Capability, Lifecycle, Phase};
pub use crate::scheduler::{ClockScheduler, Tick};
pub use crate::source::{Notification, Observer, Source, Subject, fail, never, of};
pub use crate::subscription::Subscription;
pub use crate::subscriptions::{Subscriptions, When};
pub use crate::timer::{TimerHandle, Timers};
