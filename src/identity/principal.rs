use serde::{Deserialize, Serialize};

use super::token::Claims;

/// Verified identity attached to a request after its bearer token checked out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub handle: String,
    pub display_name: String,
}

impl From<Claims> for Principal {
    fn from(c: Claims) -> Self {
        Self { user_id: c.sub, handle: c.handle, display_name: c.name }
    }
}
