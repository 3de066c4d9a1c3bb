use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, UniqueViolation, User},
    db::active_clause,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive lookup among active users.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_handle(&self, handle: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Fails with a [`UniqueViolation`] inside the error when email or handle is taken.
    async fn create(&self, user: NewUser) -> anyhow::Result<User>;
    /// Replaces the hash and clears any pending reset code.
    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn set_reset_code(
        &self,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()>;
    /// Sets the hash only while `code` is still the pending, unexpired reset code.
    /// Returns `false` when nothing changed.
    async fn redeem_reset_code(
        &self,
        id: Uuid,
        code: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool>;
    /// Soft-deletes and anonymises identifying fields in place.
    async fn forget(&self, id: Uuid) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "id, email, handle, first_name, last_name, bio, password_hash, \
     reset_password_code, reset_password_expires, deleted, deleted_at, created_at";

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn unique_violation(e: &sqlx::Error) -> Option<UniqueViolation> {
    let sqlx::Error::Database(db_err) = e else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    match db_err.constraint() {
        Some(c) if c.contains("email") => Some(UniqueViolation::Email),
        Some(c) if c.contains("handle") => Some(UniqueViolation::Handle),
        _ => None,
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1) AND {}",
            active_clause(None)
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_handle(&self, handle: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE handle = $1 AND {}",
            active_clause(None)
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(handle)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND {}",
            active_clause(None)
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, handle, first_name, last_name, bio, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        let res = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.handle)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.bio)
            .bind(&user.password_hash)
            .fetch_one(&self.db)
            .await;
        match res {
            Ok(u) => Ok(u),
            Err(e) => match unique_violation(&e) {
                Some(v) => Err(v.into()),
                None => Err(e.into()),
            },
        }
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, reset_password_code = NULL, reset_password_expires = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn redeem_reset_code(
        &self,
        id: Uuid,
        code: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            r#"
            UPDATE users
               SET password_hash = $3, reset_password_code = NULL, reset_password_expires = NULL
             WHERE id = $1
               AND reset_password_code = $2
               AND reset_password_expires > now()
               AND {}
            "#,
            active_clause(None)
        );
        let res = sqlx::query(&sql)
            .bind(id)
            .bind(code)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_reset_code(
        &self,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_password_code = $2, reset_password_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn forget(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET email = 'deleted-' || id::text || '@invalid',
                   handle = 'deleted_' || replace(id::text, '-', ''),
                   first_name = 'Deleted',
                   last_name = 'User',
                   bio = NULL,
                   password_hash = NULL,
                   reset_password_code = NULL,
                   reset_password_expires = NULL,
                   deleted = TRUE,
                   deleted_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
