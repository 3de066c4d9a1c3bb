use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::active_clause, movies::repo_types::Movie};

#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> anyhow::Result<Option<Movie>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Movie>>;
    /// Inserts, or refreshes the cached fields of the row with the same catalog id.
    async fn upsert(&self, movie: Movie) -> anyhow::Result<Movie>;
}

const MOVIE_COLUMNS: &str = "id, tmdb_id, title, overview, poster_path, release_date, runtime, \
     vote_average, original_language, deleted, deleted_at, created_at";

pub struct PgMovieStore {
    db: PgPool,
}

impl PgMovieStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> anyhow::Result<Option<Movie>> {
        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE tmdb_id = $1 AND {}",
            active_clause(None)
        );
        let movie = sqlx::query_as::<_, Movie>(&sql)
            .bind(tmdb_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(movie)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ANY($1) AND {}",
            active_clause(None)
        );
        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await?;
        Ok(movies)
    }

    async fn upsert(&self, movie: Movie) -> anyhow::Result<Movie> {
        let sql = format!(
            r#"
            INSERT INTO movies (id, tmdb_id, title, overview, poster_path, release_date,
                                runtime, vote_average, original_language)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tmdb_id) DO UPDATE
               SET title = EXCLUDED.title,
                   overview = EXCLUDED.overview,
                   poster_path = EXCLUDED.poster_path,
                   release_date = EXCLUDED.release_date,
                   runtime = EXCLUDED.runtime,
                   vote_average = EXCLUDED.vote_average,
                   original_language = EXCLUDED.original_language
            RETURNING {MOVIE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Movie>(&sql)
            .bind(movie.id)
            .bind(movie.tmdb_id)
            .bind(&movie.title)
            .bind(&movie.overview)
            .bind(&movie.poster_path)
            .bind(&movie.release_date)
            .bind(movie.runtime)
            .bind(movie.vote_average)
            .bind(&movie.original_language)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }
}
