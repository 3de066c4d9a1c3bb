use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{macros::time, Date, OffsetDateTime};
use uuid::Uuid;

use crate::db::SoftDelete;

/// Where a movie was watched. Declaration order is the sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "watch_method", rename_all = "camelCase")]
pub enum WatchMethod {
    Cinema,
    Streaming,
    HomeVideo,
    Tv,
    Other,
}

impl WatchMethod {
    pub const ALL: [WatchMethod; 5] = [
        WatchMethod::Cinema,
        WatchMethod::Streaming,
        WatchMethod::HomeVideo,
        WatchMethod::Tv,
        WatchMethod::Other,
    ];
}

/// A viewing-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Log {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub tmdb_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_watched: OffsetDateTime,
    pub notes: Option<String>,
    pub watched_where: WatchMethod,
    #[serde(skip_serializing)]
    pub deleted: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SoftDelete for Log {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug, Clone)]
pub struct NewLog {
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub tmdb_id: i64,
    pub date_watched: OffsetDateTime,
    pub notes: Option<String>,
    pub watched_where: WatchMethod,
}

/// Fields an owner may change; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct LogChanges {
    pub date_watched: Option<OffsetDateTime>,
    pub notes: Option<Option<String>>,
    pub watched_where: Option<WatchMethod>,
}

/// UTC midnight at the start of `date`.
pub fn day_start(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

/// Last representable instant of `date` at database (microsecond) precision.
pub fn day_end(date: Date) -> OffsetDateTime {
    date.with_time(time!(23:59:59.999999)).assume_utc()
}

/// Inclusive bounds, already widened to whole UTC days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub watched_where: Option<WatchMethod>,
    pub date_from: Option<OffsetDateTime>,
    pub date_to: Option<OffsetDateTime>,
}

impl LogFilter {
    pub fn between_days(from: Option<Date>, to: Option<Date>) -> Self {
        Self {
            watched_where: None,
            date_from: from.map(day_start),
            date_to: to.map(day_end),
        }
    }

    pub fn matches(&self, log: &Log) -> bool {
        self.watched_where.map_or(true, |w| log.watched_where == w)
            && self.date_from.map_or(true, |from| log.date_watched >= from)
            && self.date_to.map_or(true, |to| log.date_watched <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    DateWatched,
    WatchedWhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogSort {
    pub by: SortBy,
    pub order: SortOrder,
}

impl LogSort {
    /// ORDER BY clause equivalent to [`LogSort::compare`].
    pub fn order_by_sql(&self) -> String {
        let column = match self.by {
            SortBy::DateWatched => "date_watched",
            SortBy::WatchedWhere => "watched_where",
        };
        let dir = match self.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        format!("{column} {dir}, created_at DESC")
    }

    /// Primary key in the requested direction; ties always newest-created first.
    pub fn compare(&self, a: &Log, b: &Log) -> Ordering {
        let primary = match self.by {
            SortBy::DateWatched => a.date_watched.cmp(&b.date_watched),
            SortBy::WatchedWhere => a.watched_where.cmp(&b.watched_where),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| b.created_at.cmp(&a.created_at))
    }
}
