//! Repository pattern for database operations
//!
//! Provides a clean interface for contact data access with
//! proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use validator::Validate;

/// Contact form payload accepted from anonymous submitters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewContact {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email, length(max = 100))]
    pub mail: String,

    #[serde(default)]
    #[validate(length(max = 50))]
    pub telno: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub referrer: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub contents: String,

    pub confirm: bool,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Contact Operations
    // ========================================================================

    /// Store a new contact submission
    pub async fn create_contact(&self, input: NewContact) -> Result<Contact> {
        let contact = ContactActiveModel {
            name: Set(input.name),
            mail: Set(input.mail),
            telno: Set(input.telno),
            referrer: Set(input.referrer),
            title: Set(input.title),
            contents: Set(input.contents),
            confirm: Set(input.confirm),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        contact.insert(self.conn()).await.map_err(Into::into)
    }

    /// List all contacts, newest first
    pub async fn list_contacts(&self) -> Result<Vec<Contact>> {
        ContactEntity::find()
            .order_by_desc(ContactColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find contact by ID
    pub async fn find_contact_by_id(&self, id: i32) -> Result<Option<Contact>> {
        ContactEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }
}
