//! Identity core: input validation, the identity registry, the token codec and
//! the per-request authenticated context.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod record;
mod registry;
mod request_context;
mod policy;
mod token;
mod validation;

pub use principal::Principal;
pub use record::{generate_id, handle_key, Identity, IdentityView, ID_PREFIX};
pub use registry::{IdentityRegistry, LoginOutcome, Registered, HANDLE_TAKEN, REGISTER_SUCCESS};
pub use request_context::RequestContext;
pub use policy::{Route, RoutePolicy};
pub use token::{Claims, IssuedToken, TokenCodec, TokenError, TokenSettings, DEFAULT_TTL_SECS, TOKEN_TYPE};
pub use validation::{
    is_valid_handle, validate_login, validate_registration, DisplayNamePolicy, FieldErrors, LoginPayload,
    NormalizedLogin, NormalizedRegistration, RegisterPayload, MIN_SECRET_LEN,
};
