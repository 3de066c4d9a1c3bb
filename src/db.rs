use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Soft-delete predicate shared by every read query.
///
/// `alias` is the table alias used in the query, if any.
pub fn active_clause(alias: Option<&str>) -> String {
    match alias {
        Some(a) => format!("{a}.deleted = FALSE"),
        None => "deleted = FALSE".to_string(),
    }
}

/// Records carrying a `deleted` flag.
pub trait SoftDelete {
    fn is_deleted(&self) -> bool;

    fn is_active(&self) -> bool {
        !self.is_deleted()
    }
}

/// Keeps only non-deleted records.
pub fn active<'a, T, I>(items: I) -> impl Iterator<Item = &'a T>
where
    T: SoftDelete + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().filter(|item| item.is_active())
}
