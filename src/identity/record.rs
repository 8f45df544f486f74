use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ID_PREFIX: &str = "usr_";

/// Durable identity as persisted by a credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    /// Argon2 PHC string; the plaintext secret is never stored.
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(handle: String, display_name: String, secret_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            handle,
            display_name,
            secret_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> IdentityView {
        IdentityView {
            id: self.id.clone(),
            handle: self.handle.clone(),
            display_name: self.display_name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public projection of an identity. The only identity shape that leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn generate_id() -> String {
    format!("{}{}", ID_PREFIX, uuid::Uuid::new_v4())
}

/// Key under which handle uniqueness is enforced.
pub fn handle_key(handle: &str) -> String {
    handle.trim().to_lowercase()
}
