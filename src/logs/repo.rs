use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::active_clause,
    logs::repo_types::{Log, LogChanges, LogFilter, LogSort, NewLog},
};

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn create(&self, log: NewLog) -> anyhow::Result<Log>;
    /// `None` when the log is missing, deleted, or owned by someone else.
    async fn find_by_id_for_owner(
        &self,
        log_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Log>>;
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &LogFilter,
        sort: LogSort,
    ) -> anyhow::Result<Vec<Log>>;
    async fn update(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        changes: LogChanges,
    ) -> anyhow::Result<Option<Log>>;
    /// Returns whether an active owned log was marked deleted.
    async fn soft_delete(&self, log_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
}

const LOG_COLUMNS: &str = "id, user_id, movie_id, tmdb_id, date_watched, notes, watched_where, \
     deleted, deleted_at, created_at, updated_at";

pub struct PgLogStore {
    db: PgPool,
}

impl PgLogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn create(&self, log: NewLog) -> anyhow::Result<Log> {
        let sql = format!(
            r#"
            INSERT INTO logs (id, user_id, movie_id, tmdb_id, date_watched, notes, watched_where)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LOG_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Log>(&sql)
            .bind(Uuid::new_v4())
            .bind(log.user_id)
            .bind(log.movie_id)
            .bind(log.tmdb_id)
            .bind(log.date_watched)
            .bind(&log.notes)
            .bind(log.watched_where)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_by_id_for_owner(
        &self,
        log_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Log>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM logs WHERE id = $1 AND user_id = $2 AND {}",
            active_clause(None)
        );
        let row = sqlx::query_as::<_, Log>(&sql)
            .bind(log_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &LogFilter,
        sort: LogSort,
    ) -> anyhow::Result<Vec<Log>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {LOG_COLUMNS} FROM logs WHERE "));
        qb.push(active_clause(None));
        qb.push(" AND user_id = ").push_bind(user_id);
        if let Some(w) = filter.watched_where {
            qb.push(" AND watched_where = ").push_bind(w);
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND date_watched >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND date_watched <= ").push_bind(to);
        }
        qb.push(" ORDER BY ").push(sort.order_by_sql());

        let rows = qb.build_query_as::<Log>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn update(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        changes: LogChanges,
    ) -> anyhow::Result<Option<Log>> {
        let sql = format!(
            r#"
            UPDATE logs
               SET date_watched = COALESCE($3, date_watched),
                   notes = CASE WHEN $4 THEN $5 ELSE notes END,
                   watched_where = COALESCE($6, watched_where),
                   updated_at = now()
             WHERE id = $1 AND user_id = $2 AND {}
            RETURNING {LOG_COLUMNS}
            "#,
            active_clause(None)
        );
        let (set_notes, notes) = match changes.notes {
            Some(n) => (true, n),
            None => (false, None),
        };
        let row = sqlx::query_as::<_, Log>(&sql)
            .bind(log_id)
            .bind(user_id)
            .bind(changes.date_watched)
            .bind(set_notes)
            .bind(notes)
            .bind(changes.watched_where)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn soft_delete(&self, log_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let sql = format!(
            "UPDATE logs SET deleted = TRUE, deleted_at = now() WHERE id = $1 AND user_id = $2 AND {}",
            active_clause(None)
        );
        let res = sqlx::query(&sql)
            .bind(log_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
