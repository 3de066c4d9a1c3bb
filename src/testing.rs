//! In-memory stores and helpers shared by unit tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    auth::{
        cookies::{CSRF_COOKIE, CSRF_HEADER},
        dto::RegisterRequest,
        repo::UserStore,
        repo_types::{NewUser, UniqueViolation, User},
    },
    db::active,
    logs::{
        repo::LogStore,
        repo_types::{Log, LogChanges, LogFilter, LogSort, NewLog},
    },
    mail::Mailer,
    movies::{
        catalog::{CatalogMovie, MovieCatalog},
        repo::MovieStore,
        repo_types::Movie,
    },
    ratings::{
        repo::RatingStore,
        repo_types::{MovieRating, RatingUpsert},
    },
    state::AppState,
};

pub const MISSING_TMDB_ID: i64 = 999_999;

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        let email = email.to_lowercase();
        let found = active(rows.iter()).find(|u| u.email.to_lowercase() == email).cloned();
        Ok(found)
    }

    async fn find_by_handle(&self, handle: &str) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter()).find(|u| u.handle == handle).cloned();
        Ok(found)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter()).find(|u| u.id == id).cloned();
        Ok(found)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email.to_lowercase() == user.email.to_lowercase()) {
            return Err(UniqueViolation::Email.into());
        }
        if rows.iter().any(|u| u.handle == user.handle) {
            return Err(UniqueViolation::Handle.into());
        }
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            handle: user.handle,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            password_hash: user.password_hash,
            reset_password_code: None,
            reset_password_expires: None,
            deleted: false,
            deleted_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(u) = rows.iter_mut().find(|u| u.id == id) {
            u.password_hash = Some(password_hash.to_string());
            u.reset_password_code = None;
            u.reset_password_expires = None;
        }
        Ok(())
    }

    async fn set_reset_code(
        &self,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(u) = rows.iter_mut().find(|u| u.id == id) {
            u.reset_password_code = Some(code.to_string());
            u.reset_password_expires = Some(expires);
        }
        Ok(())
    }

    async fn redeem_reset_code(
        &self,
        id: Uuid,
        code: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        let Some(u) = rows.iter_mut().find(|u| {
            u.id == id
                && !u.deleted
                && u.reset_password_code.as_deref() == Some(code)
                && u.reset_password_expires.is_some_and(|e| e > now)
        }) else {
            return Ok(false);
        };
        u.password_hash = Some(password_hash.to_string());
        u.reset_password_code = None;
        u.reset_password_expires = None;
        Ok(true)
    }

    async fn forget(&self, id: Uuid) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(u) = rows.iter_mut().find(|u| u.id == id) {
            u.email = format!("deleted-{id}@invalid");
            u.handle = format!("deleted_{}", id.simple());
            u.first_name = "Deleted".into();
            u.last_name = "User".into();
            u.bio = None;
            u.password_hash = None;
            u.reset_password_code = None;
            u.reset_password_expires = None;
            u.deleted = true;
            u.deleted_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMovieStore {
    rows: Mutex<Vec<Movie>>,
}

#[async_trait]
impl MovieStore for MemoryMovieStore {
    async fn find_by_tmdb_id(&self, tmdb_id: i64) -> anyhow::Result<Option<Movie>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter()).find(|m| m.tmdb_id == tmdb_id).cloned();
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Movie>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter()).filter(|m| ids.contains(&m.id)).cloned().collect();
        Ok(found)
    }

    async fn upsert(&self, movie: Movie) -> anyhow::Result<Movie> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|m| m.tmdb_id == movie.tmdb_id) {
            let Movie { id, created_at, deleted, deleted_at, .. } = existing.clone();
            *existing = Movie { id, created_at, deleted, deleted_at, ..movie };
            return Ok(existing.clone());
        }
        rows.push(movie.clone());
        Ok(movie)
    }
}

#[derive(Default)]
pub struct MemoryLogStore {
    rows: Mutex<Vec<Log>>,
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn create(&self, log: NewLog) -> anyhow::Result<Log> {
        let now = OffsetDateTime::now_utc();
        let row = Log {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            movie_id: log.movie_id,
            tmdb_id: log.tmdb_id,
            date_watched: log.date_watched,
            notes: log.notes,
            watched_where: log.watched_where,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_id_for_owner(
        &self,
        log_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Log>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter())
            .find(|l| l.id == log_id && l.user_id == user_id)
            .cloned();
        Ok(found)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &LogFilter,
        sort: LogSort,
    ) -> anyhow::Result<Vec<Log>> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<Log> = active(rows.iter())
            .filter(|l| l.user_id == user_id && filter.matches(l))
            .cloned()
            .collect();
        out.sort_by(|a, b| sort.compare(a, b));
        Ok(out)
    }

    async fn update(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        changes: LogChanges,
    ) -> anyhow::Result<Option<Log>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(log) = rows
            .iter_mut()
            .find(|l| l.id == log_id && l.user_id == user_id && !l.deleted)
        else {
            return Ok(None);
        };
        if let Some(d) = changes.date_watched {
            log.date_watched = d;
        }
        if let Some(n) = changes.notes {
            log.notes = n;
        }
        if let Some(w) = changes.watched_where {
            log.watched_where = w;
        }
        log.updated_at = OffsetDateTime::now_utc();
        Ok(Some(log.clone()))
    }

    async fn soft_delete(&self, log_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|l| l.id == log_id && l.user_id == user_id && !l.deleted)
        {
            Some(log) => {
                log.deleted = true;
                log.deleted_at = Some(OffsetDateTime::now_utc());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryRatingStore {
    rows: Mutex<Vec<MovieRating>>,
}

#[async_trait]
impl RatingStore for MemoryRatingStore {
    async fn upsert(&self, r: RatingUpsert) -> anyhow::Result<MovieRating> {
        let mut rows = self.rows.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = rows
            .iter_mut()
            .find(|x| x.user_id == r.user_id && x.movie_id == r.movie_id)
        {
            existing.rating = r.rating;
            existing.comment = r.comment;
            existing.deleted = false;
            existing.deleted_at = None;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = MovieRating {
            id: Uuid::new_v4(),
            user_id: r.user_id,
            movie_id: r.movie_id,
            tmdb_id: r.tmdb_id,
            rating: r.rating,
            comment: r.comment,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_for_user_movie(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
    ) -> anyhow::Result<Option<MovieRating>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter())
            .find(|r| r.user_id == user_id && r.movie_id == movie_id)
            .cloned();
        Ok(found)
    }

    async fn find_for_user_movies(
        &self,
        user_id: Uuid,
        movie_ids: &[Uuid],
    ) -> anyhow::Result<Vec<MovieRating>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter())
            .filter(|r| r.user_id == user_id && movie_ids.contains(&r.movie_id))
            .cloned()
            .collect();
        Ok(found)
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<MovieRating>> {
        let rows = self.rows.lock().unwrap();
        let found = active(rows.iter()).filter(|r| r.user_id == user_id).cloned().collect();
        Ok(found)
    }
}

/// Knows every id except [`MISSING_TMDB_ID`]; every movie runs 100 minutes.
pub struct FakeCatalog;

#[async_trait]
impl MovieCatalog for FakeCatalog {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<CatalogMovie>> {
        let mut hit = self.movie(603).await?;
        hit.title = format!("{query} (1999)");
        Ok(vec![hit])
    }

    async fn movie(&self, tmdb_id: i64) -> anyhow::Result<CatalogMovie> {
        anyhow::ensure!(tmdb_id != MISSING_TMDB_ID, "tmdb returned 404 for {tmdb_id}");
        Ok(CatalogMovie {
            id: tmdb_id,
            title: format!("Movie {tmdb_id}"),
            overview: None,
            poster_path: Some(format!("/{tmdb_id}.jpg")),
            release_date: Some("1999-03-31".into()),
            runtime: Some(100),
            vote_average: Some(7.5),
            original_language: Some("en".into()),
        })
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        anyhow::bail!("smtp connection refused")
    }
}

pub fn registration(email: &str, handle: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        password: "password123".into(),
        handle: handle.into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        bio: None,
    }
}

pub async fn seed_user(state: &AppState, email: &str, handle: &str) -> Uuid {
    let (user, _) = crate::auth::services::register(state, registration(email, handle))
        .await
        .expect("seed user");
    user.id
}

/// Account without local credentials.
pub async fn seed_external_user(state: &AppState, email: &str, handle: &str) -> Uuid {
    state
        .users
        .create(NewUser {
            email: email.into(),
            handle: handle.into(),
            first_name: "Ext".into(),
            last_name: "User".into(),
            bio: None,
            password_hash: None,
        })
        .await
        .expect("seed external user")
        .id
}

pub async fn reset_code_for(state: &AppState, email: &str) -> Option<String> {
    state
        .users
        .find_by_email(email)
        .await
        .expect("lookup")
        .and_then(|u| u.reset_password_code)
}

/// Drives the full router, keeping a cookie jar between calls.
pub struct TestClient {
    app: Router,
    jar: HashMap<String, (String, String)>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookies: Vec<String>,
}

impl TestClient {
    pub fn new(state: AppState) -> Self {
        Self {
            app: crate::app::build_app(state),
            jar: HashMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(|(v, _)| v.as_str())
    }

    pub fn set_cookie(&mut self, name: &str, value: &str, path: &str) {
        self.jar.insert(name.into(), (value.into(), path.into()));
    }

    pub fn remove_cookie(&mut self, name: &str) {
        self.jar.remove(name);
    }

    /// `echo_csrf` copies the CSRF cookie into the request header.
    pub async fn send(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        echo_csrf: bool,
    ) -> TestResponse {
        let path = uri.split('?').next().unwrap_or(uri);
        let cookie_header = self
            .jar
            .iter()
            .filter(|(_, (_, p))| path.starts_with(p.as_str()))
            .map(|(k, (v, _))| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");

        let mut req = Request::builder().method(method).uri(uri);
        if !cookie_header.is_empty() {
            req = req.header(header::COOKIE, cookie_header);
        }
        if echo_csrf {
            if let Some(token) = self.cookie(CSRF_COOKIE) {
                req = req.header(CSRF_HEADER, token.to_string());
            }
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let set_cookies: Vec<String> = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        for c in &set_cookies {
            self.absorb(c);
        }
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body, set_cookies }
    }

    fn absorb(&mut self, set_cookie: &str) {
        let mut parts = set_cookie.split(';').map(str::trim);
        let Some((name, value)) = parts.next().and_then(|p| p.split_once('=')) else {
            return;
        };
        let mut path = "/".to_string();
        let mut expired = value.is_empty();
        for attr in parts {
            if let Some(p) = attr.strip_prefix("Path=") {
                path = p.to_string();
            }
            if attr == "Max-Age=0" {
                expired = true;
            }
        }
        if expired {
            self.jar.remove(name);
        } else {
            self.jar.insert(name.to_string(), (value.to_string(), path));
        }
    }
}
