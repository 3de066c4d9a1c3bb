use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db::SoftDelete, movies::catalog::CatalogMovie};

/// Cached catalog movie, keyed by its external catalog id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub id: Uuid,
    pub tmdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub vote_average: Option<f64>,
    pub original_language: Option<String>,
    #[serde(skip_serializing)]
    pub deleted: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SoftDelete for Movie {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl Movie {
    /// Runtime in minutes, zero when unknown or nonsensical.
    pub fn runtime_minutes(&self) -> u64 {
        self.runtime.filter(|m| *m > 0).map(|m| m as u64).unwrap_or(0)
    }

    pub fn from_catalog(c: CatalogMovie) -> Self {
        Self {
            id: Uuid::new_v4(),
            tmdb_id: c.id,
            title: c.title,
            overview: c.overview,
            poster_path: c.poster_path,
            release_date: c.release_date.filter(|d| !d.is_empty()),
            runtime: c.runtime,
            vote_average: c.vote_average,
            original_language: c.original_language,
            deleted: false,
            deleted_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
