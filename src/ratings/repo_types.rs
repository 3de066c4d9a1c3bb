use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::SoftDelete;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 10;

/// One rating per (user, movie).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MovieRating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub tmdb_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    #[serde(skip_serializing)]
    pub deleted: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SoftDelete for MovieRating {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug, Clone)]
pub struct RatingUpsert {
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub tmdb_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}
