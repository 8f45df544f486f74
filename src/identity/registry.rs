use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};

use super::record::{Identity, IdentityView};
use super::token::{TokenCodec, TOKEN_TYPE};
use super::validation::{validate_login, validate_registration, DisplayNamePolicy, LoginPayload, RegisterPayload};
use crate::error::{AppError, AppResult};
use crate::security;
use crate::storage::{SharedCredentialStore, StoreError};

pub const REGISTER_SUCCESS: &str = "register success";
pub const HANDLE_TAKEN: &str = "handle already registered";

#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub message: String,
    pub user: IdentityView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: IdentityView,
}

/// Registration and login over a credential store.
pub struct IdentityRegistry {
    store: SharedCredentialStore,
    codec: TokenCodec,
    policy: DisplayNamePolicy,
}

fn storage_failure(op: &str, e: StoreError) -> AppError {
    error!(target: "account::registry", op, error = %e, "credential store failure");
    AppError::storage()
}

impl IdentityRegistry {
    pub fn new(store: SharedCredentialStore, codec: TokenCodec, policy: DisplayNamePolicy) -> Self {
        Self { store, codec, policy }
    }

    pub fn codec(&self) -> &TokenCodec { &self.codec }

    pub fn register(&self, payload: &RegisterPayload) -> AppResult<Registered> {
        let input = validate_registration(payload, &self.policy)?;

        // Fast path only; the store's unique constraint decides races.
        if self.store.exists_by_handle(&input.handle).map_err(|e| storage_failure("exists_by_handle", e))? {
            debug!(target: "account::registry", handle = %input.handle, "registration conflict (pre-check)");
            return Err(AppError::conflict(HANDLE_TAKEN));
        }

        let secret_hash = security::hash_secret(&input.secret)?;
        let identity = Identity::new(input.handle, input.display_name, secret_hash, Utc::now());
        let view = identity.view();
        match self.store.insert(identity) {
            Ok(()) => {}
            Err(StoreError::Duplicate { handle }) => {
                debug!(target: "account::registry", handle = %handle, "registration conflict (unique constraint)");
                return Err(AppError::conflict(HANDLE_TAKEN));
            }
            Err(e) => return Err(storage_failure("insert", e)),
        }
        info!(target: "account::registry", user_id = %view.id, "identity registered");
        Ok(Registered { message: REGISTER_SUCCESS.to_string(), user: view })
    }

    pub fn login(&self, payload: &LoginPayload) -> AppResult<LoginOutcome> {
        let input = validate_login(payload)?;
        let found = self.store.find_by_handle(&input.handle).map_err(|e| storage_failure("find_by_handle", e))?;
        let Some(identity) = found else {
            security::verify_against_dummy(&input.secret);
            debug!(target: "account::registry", "login rejected");
            return Err(AppError::invalid_credentials());
        };
        if !security::verify_secret(&identity.secret_hash, &input.secret) {
            debug!(target: "account::registry", "login rejected");
            return Err(AppError::invalid_credentials());
        }
        let issued = self.codec.issue(&identity).map_err(|e| {
            error!(target: "account::registry", error = %e, "token issue failed");
            AppError::internal("token issue failed")
        })?;
        info!(target: "account::registry", user_id = %identity.id, "login succeeded");
        Ok(LoginOutcome {
            access_token: issued.token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: issued.expires_in,
            user: identity.view(),
        })
    }

    pub fn find_by_id(&self, id: &str) -> AppResult<IdentityView> {
        match self.store.find_by_id(id).map_err(|e| storage_failure("find_by_id", e))? {
            Some(identity) => Ok(identity.view()),
            None => Err(AppError::user_not_found()),
        }
    }
}
