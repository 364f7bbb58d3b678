// scheduler-core/src/core/time.rs
// ============================================================================
// Module: Fleet Scheduler Time Model
// Description: Canonical epoch-second timestamps for deployment lifecycle.
// Purpose: Provide a serializable, orderable timestamp shared by records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `Timestamp` wraps a unix epoch-seconds value. Engine code should prefer
//! taking a timestamp as an argument (supplied by a `Clock`) over calling
//! [`Timestamp::now`] directly, so deployment-lifecycle tests stay
//! deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix epoch-seconds timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wraps a raw epoch-seconds value.
    #[must_use]
    pub const fn from_epoch_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Returns the current wall-clock time as a timestamp.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the unix epoch.
    #[must_use]
    pub fn now() -> Self {
        #[allow(
            clippy::unwrap_used,
            reason = "the system clock predating 1970 is not a supported environment"
        )]
        let seconds = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        Self(i64::try_from(seconds).unwrap_or(i64::MAX))
    }

    /// Returns the raw epoch-seconds value.
    #[must_use]
    pub const fn epoch_seconds(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Supplies timestamps to engine code without reading the wall clock
/// directly, keeping deployment-lifecycle logic deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Default clock backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<T> Clock for std::sync::Arc<T>
where
    T: Clock,
{
    fn now(&self) -> Timestamp {
        T::now(self)
    }
}
