use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::SoftDelete;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub handle: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // None for accounts provisioned without local credentials
    #[serde(skip_serializing)]
    pub reset_password_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<OffsetDateTime>,
    pub deleted: bool,
    pub deleted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl SoftDelete for User {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub handle: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub password_hash: Option<String>,
}

/// Raised by a store when a unique key is already taken.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UniqueViolation {
    #[error("email already exists")]
    Email,
    #[error("handle already exists")]
    Handle,
}
