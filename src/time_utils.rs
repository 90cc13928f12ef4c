use serde::{Serialize, Serializer};
use time::format_description::FormatItem;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time(OffsetDateTime);

/// Layout of sqlite's `datetime('now')`, which fills every timestamp column.
pub(crate) const TIME_FORMAT : &[FormatItem<'static>] = time::macros::format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

const DATE_FORMAT : &[FormatItem<'static>] = time::macros::format_description!(
    "[day].[month].[year repr:last_two] [hour]:[minute]"
);

impl Serialize for Time {
    fn serialize<S>(
        &self,
        serializer : S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S : Serializer,
    {
        self.format(TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl From<OffsetDateTime> for Time {
    fn from(t : OffsetDateTime) -> Self {
        Time(t)
    }
}

impl std::ops::Deref for Time {
    type Target = OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Short relative age of `t` as seen from `now`: `"12s ago"`, `"5m ago"`,
/// `"3h ago"`, or the plain date once it is more than a day old.
pub fn time_since(t : &Time, now : OffsetDateTime) -> String {
    let diff = now - t.0;

    if diff > Duration::DAY {
        return t
            .format(DATE_FORMAT)
            .unwrap_or_else(|_| t.0.to_string());
    }

    let seconds = diff.as_seconds_f64();

    if seconds >= 60.0 * 60.0 {
        return format!("{:.0}h ago", seconds / 60.0 / 60.0);
    }

    if seconds >= 60.0 {
        return format!("{:.0}m ago", seconds / 60.0);
    }

    format!("{:.0}s ago", seconds.abs())
}
