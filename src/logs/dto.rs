use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    logs::repo_types::{Log, SortBy, SortOrder, WatchMethod},
    movies::repo_types::Movie,
    ratings::repo_types::MovieRating,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub tmdb_id: i64,
    #[serde(with = "iso_date")]
    pub date_watched: Date,
    #[serde(default)]
    pub notes: Option<String>,
    pub watched_where: WatchMethod,
}

/// Absent fields are left unchanged; an empty `notes` string clears the notes.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLogRequest {
    #[serde(default, with = "iso_date::option")]
    pub date_watched: Option<Date>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub watched_where: Option<WatchMethod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogListQuery {
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub watched_where: Option<WatchMethod>,
    #[serde(default, with = "iso_date::option")]
    pub date_watched_from: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub date_watched_to: Option<Date>,
}

/// A log joined with its movie and the owner's rating of that movie.
#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub tmdb_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_watched: OffsetDateTime,
    pub notes: Option<String>,
    pub watched_where: WatchMethod,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub movie: Option<Movie>,
    pub movie_rating: Option<MovieRating>,
}

impl LogView {
    pub fn new(log: Log, movie: Option<Movie>, movie_rating: Option<MovieRating>) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            movie_id: log.movie_id,
            tmdb_id: log.tmdb_id,
            date_watched: log.date_watched,
            notes: log.notes,
            watched_where: log.watched_where,
            created_at: log.created_at,
            movie,
            movie_rating,
        }
    }
}
