//! Contact submission handlers
//!
//! Creating a submission is open to anonymous visitors; reading them
//! requires a session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use contactdesk_common::{
    auth::CurrentSession,
    db::{models::Contact, NewContact, Repository},
    errors::{AppError, Result},
    metrics,
};

/// Response for a stored contact
#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: i32,
    pub name: String,
    pub mail: String,
    pub telno: String,
    pub referrer: String,
    pub title: String,
    pub contents: String,
    pub confirm: bool,
    pub created_at: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            mail: contact.mail,
            telno: contact.telno,
            referrer: contact.referrer,
            title: contact.title,
            contents: contact.contents,
            confirm: contact.confirm,
            created_at: contact.created_at.to_rfc3339(),
        }
    }
}

/// Response after creating a contact
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateContactResponse {
    pub success: bool,
    pub id: i32,
}

/// List every submission, newest first
pub async fn list_contacts(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Result<Json<Vec<ContactResponse>>> {
    let repo = Repository::new(state.db.clone());
    let contacts = repo.list_contacts().await?;

    Ok(Json(contacts.into_iter().map(ContactResponse::from).collect()))
}

/// Get one submission by ID
pub async fn get_contact(
    State(state): State<AppState>,
    _session: CurrentSession,
    Path(contact_id): Path<i32>,
) -> Result<Json<ContactResponse>> {
    let repo = Repository::new(state.db.clone());

    let contact = repo
        .find_contact_by_id(contact_id)
        .await?
        .ok_or(AppError::ContactNotFound { id: contact_id })?;

    Ok(Json(contact.into()))
}

/// Store a new submission
pub async fn create_contact(
    State(state): State<AppState>,
    Json(request): Json<NewContact>,
) -> Result<(StatusCode, Json<CreateContactResponse>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let contact = repo.create_contact(request).await?;

    metrics::record_contact_created();
    tracing::info!(contact_id = contact.id, "Contact submission stored");

    Ok((StatusCode::OK, Json(CreateContactResponse {
        success: true,
        id: contact.id,
    })))
}
