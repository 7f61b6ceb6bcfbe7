//! Request-scoped execution context.

use chrono::{DateTime, FixedOffset, Utc};
use dynaform_store::UserId;

/// Display format for timestamps shown to users and written into diffs.
pub const DISPLAY_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Per-request context: the acting user and their display timezone.
///
/// Timestamps are stored in UTC; the context converts them for display
/// and for parsing datetime input.
#[derive(Debug, Clone)]
pub struct FormContext {
    user_id: Option<UserId>,
    timezone: FixedOffset,
}

impl Default for FormContext {
    fn default() -> Self {
        Self {
            user_id: None,
            timezone: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }
}

impl FormContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acting user
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the display timezone
    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Format a UTC instant in the context timezone for display
    pub fn format_datetime(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format(DISPLAY_DATETIME_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_in_context_timezone() {
        let ctx = FormContext::new().with_timezone(FixedOffset::east_opt(3 * 3600).unwrap());
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 21, 30, 0).unwrap();
        assert_eq!(ctx.format_datetime(instant), "06.03.2024 00:30:00");
    }

    #[test]
    fn default_is_utc_anonymous() {
        let ctx = FormContext::default();
        assert!(ctx.user_id().is_none());
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(ctx.format_datetime(instant), "02.01.2024 03:04:05");
    }
}
