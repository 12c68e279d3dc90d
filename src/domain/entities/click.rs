//! Persisted click analytics.

use serde::Serialize;

/// Number of clicks coming from one referer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RefererStats {
    pub referer: String,
    pub count: i64,
}

/// Number of clicks on one calendar day (`YYYY-MM-DD`, UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyClicks {
    pub date: String,
    pub count: i64,
}
