//! Convenience implementation of a `Timebound` object.

use std::ops::{Bound, RangeBounds};
use std::time;

/// A `Timebound` object that is valid for a specified range of time.
///
/// The range is given as an argument, as in `t1..t2`.
///
/// ```
/// use std::time::{SystemTime, Duration};
/// use tor_checkable::{Timebound, TimeValidityError, timed::TimerangeBound};
///
/// let now = SystemTime::now();
/// let one_hour = Duration::new(3600, 0);
///
/// let seven = TimerangeBound::new(7_u32, ..now + one_hour);
/// assert_eq!(seven.check_valid_at(&now).unwrap(), 7);
///
/// let seven = TimerangeBound::new(7_u32, ..now + one_hour);
/// assert_eq!(
///     seven.check_valid_at(&(now + 2 * one_hour)),
///     Err(TimeValidityError::Expired(one_hour))
/// );
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(Eq, PartialEq))]
pub struct TimerangeBound<T> {
    /// The underlying object, which we only want to expose if it is
    /// currently timely.
    obj: T,
    /// If present, when the object first became valid.
    start: Option<time::SystemTime>,
    /// If present, when the object will no longer be valid.
    end: Option<time::SystemTime>,
}

/// Convert a `Bound` to its underlying value, if any, discarding whether it
/// was inclusive or exclusive (irrelevant at `SystemTime`'s precision).
fn unwrap_bound(b: Bound<&'_ time::SystemTime>) -> Option<time::SystemTime> {
    match b {
        Bound::Included(x) => Some(*x),
        Bound::Excluded(x) => Some(*x),
        _ => None,
    }
}

impl<T> TimerangeBound<T> {
    /// Construct a new `TimerangeBound` from a given object and range.
    ///
    /// `x..y` and `x..=y` are treated the same here.
    pub fn new<U>(obj: T, range: U) -> Self
    where
        U: RangeBounds<time::SystemTime>,
    {
        let start = unwrap_bound(range.start_bound());
        let end = unwrap_bound(range.end_bound());
        Self { obj, start, end }
    }

    /// Adjust this bound to tolerate an expiration time farther in the
    /// future.
    #[must_use]
    pub fn extend_tolerance(self, d: time::Duration) -> Self {
        let end = self.end.and_then(|t| t.checked_add(d));
        Self { end, ..self }
    }

    /// Adjust this bound to tolerate an initial validity time farther in
    /// the past.
    #[must_use]
    pub fn extend_pre_tolerance(self, d: time::Duration) -> Self {
        let start = self.start.and_then(|t| t.checked_sub(d));
        Self { start, ..self }
    }

    /// Consume this `TimerangeBound`, applying `f` to its protected value.
    ///
    /// The caller must ensure that `f` does not assume the timeliness of
    /// the protected value, or leak its contents inappropriately.
    #[must_use]
    pub fn dangerously_map<F, U>(self, f: F) -> TimerangeBound<U>
    where
        F: FnOnce(T) -> U,
    {
        TimerangeBound {
            obj: f(self.obj),
            start: self.start,
            end: self.end,
        }
    }

    /// Consume this `TimerangeBound`, and return its underlying time bounds
    /// and object, without checking them.
    pub fn dangerously_into_parts(self) -> (T, (Bound<time::SystemTime>, Bound<time::SystemTime>)) {
        let bounds = self.bounds();
        (self.obj, bounds)
    }

    /// Return a reference to the inner object, without checking the time
    /// interval.
    pub fn dangerously_peek(&self) -> &T {
        &self.obj
    }

    /// Return a `TimerangeBound` containing a reference, for calling
    /// methods like `check_valid_at` without consuming the inner `T`.
    pub fn as_ref(&self) -> TimerangeBound<&T> {
        TimerangeBound {
            obj: &self.obj,
            start: self.start,
            end: self.end,
        }
    }

    /// Return the `(start, end)` bounds of this object, as a `Bound` pair.
    fn bounds(&self) -> (Bound<time::SystemTime>, Bound<time::SystemTime>) {
        (
            self.start.map(Bound::Included).unwrap_or(Bound::Unbounded),
            self.end.map(Bound::Excluded).unwrap_or(Bound::Unbounded),
        )
    }
}

impl<T> crate::Timebound<T> for TimerangeBound<T> {
    type Error = crate::TimeValidityError;

    fn is_valid_at(&self, t: &time::SystemTime) -> Result<(), Self::Error> {
        use crate::TimeValidityError;
        if let Some(start) = self.start {
            if let Ok(d) = start.duration_since(*t) {
                return Err(TimeValidityError::NotYetValid(d));
            }
        }

        if let Some(end) = self.end {
            if let Ok(d) = t.duration_since(end) {
                return Err(TimeValidityError::Expired(d));
            }
        }

        Ok(())
    }

    fn dangerously_assume_timely(self) -> T {
        self.obj
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{TimeValidityError, Timebound};

    #[test]
    fn unbounded_is_always_valid() {
        let tb = TimerangeBound::new(5_u32, ..);
        assert!(tb.is_valid_at(&time::SystemTime::now()).is_ok());
    }

    #[test]
    fn expired_reports_duration() {
        let now = time::SystemTime::now();
        let hour = time::Duration::new(3600, 0);
        let tb = TimerangeBound::new(5_u32, ..now);
        assert_eq!(
            tb.is_valid_at(&(now + hour)),
            Err(TimeValidityError::Expired(hour))
        );
    }

    #[test]
    fn not_yet_valid_reports_duration() {
        let now = time::SystemTime::now();
        let hour = time::Duration::new(3600, 0);
        let tb = TimerangeBound::new(5_u32, (now + hour)..);
        assert_eq!(
            tb.is_valid_at(&now),
            Err(TimeValidityError::NotYetValid(hour))
        );
    }

    #[test]
    fn extend_tolerance_postpones_expiry() {
        let now = time::SystemTime::now();
        let hour = time::Duration::new(3600, 0);
        let tb = TimerangeBound::new(5_u32, ..now).extend_tolerance(2 * hour);
        assert!(tb.is_valid_at(&(now + hour)).is_ok());
    }
}
