//! Session record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default session payload: an arbitrary JSON object
pub type UserData = serde_json::Map<String, serde_json::Value>;

/// A live session as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord<T = UserData> {
    pub session_id: String,
    pub user_data: T,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Value persisted under the session key. The id lives in the key itself.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredSession<T> {
    pub user_data: T,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl<T> StoredSession<T> {
    pub fn new(user_data: T) -> Self {
        let now = Utc::now();
        Self {
            user_data,
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    pub fn into_record(self, session_id: &str) -> SessionRecord<T> {
        SessionRecord {
            session_id: session_id.to_string(),
            user_data: self.user_data,
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_form_omits_session_id() {
        let mut data = UserData::new();
        data.insert("username".into(), "admin".into());

        let json = serde_json::to_value(StoredSession::new(data)).unwrap();
        assert!(json.get("session_id").is_none());
        assert_eq!(json["user_data"]["username"], "admin");
        assert!(json.get("created_at").is_some());
        assert!(json.get("last_accessed").is_some());
    }

    #[test]
    fn test_touch_keeps_created_at() {
        let mut stored = StoredSession::new(UserData::new());
        let created = stored.created_at;
        stored.touch();
        assert_eq!(stored.created_at, created);
        assert!(stored.last_accessed >= created);
    }
}
