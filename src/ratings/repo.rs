use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::active_clause,
    ratings::repo_types::{MovieRating, RatingUpsert},
};

#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Create-or-update keyed on (user, movie). Concurrent writers: last one wins.
    async fn upsert(&self, rating: RatingUpsert) -> anyhow::Result<MovieRating>;
    async fn find_for_user_movie(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
    ) -> anyhow::Result<Option<MovieRating>>;
    async fn find_for_user_movies(
        &self,
        user_id: Uuid,
        movie_ids: &[Uuid],
    ) -> anyhow::Result<Vec<MovieRating>>;
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<MovieRating>>;
}

const RATING_COLUMNS: &str =
    "id, user_id, movie_id, tmdb_id, rating, comment, deleted, deleted_at, created_at, updated_at";

pub struct PgRatingStore {
    db: PgPool,
}

impl PgRatingStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RatingStore for PgRatingStore {
    async fn upsert(&self, r: RatingUpsert) -> anyhow::Result<MovieRating> {
        let sql = format!(
            r#"
            INSERT INTO movie_ratings (id, user_id, movie_id, tmdb_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, movie_id) DO UPDATE
               SET rating = EXCLUDED.rating,
                   comment = EXCLUDED.comment,
                   deleted = FALSE,
                   deleted_at = NULL,
                   updated_at = now()
            RETURNING {RATING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MovieRating>(&sql)
            .bind(Uuid::new_v4())
            .bind(r.user_id)
            .bind(r.movie_id)
            .bind(r.tmdb_id)
            .bind(r.rating)
            .bind(&r.comment)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_for_user_movie(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
    ) -> anyhow::Result<Option<MovieRating>> {
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM movie_ratings WHERE user_id = $1 AND movie_id = $2 AND {}",
            active_clause(None)
        );
        let row = sqlx::query_as::<_, MovieRating>(&sql)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_for_user_movies(
        &self,
        user_id: Uuid,
        movie_ids: &[Uuid],
    ) -> anyhow::Result<Vec<MovieRating>> {
        if movie_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM movie_ratings WHERE user_id = $1 AND movie_id = ANY($2) AND {}",
            active_clause(None)
        );
        let rows = sqlx::query_as::<_, MovieRating>(&sql)
            .bind(user_id)
            .bind(movie_ids)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<MovieRating>> {
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM movie_ratings WHERE user_id = $1 AND {} ORDER BY updated_at DESC",
            active_clause(None)
        );
        let rows = sqlx::query_as::<_, MovieRating>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}
