use super::Principal;

/// Per-request authentication state carried in the request extensions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Option<Principal>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self { principal: None, request_id: Some(request_id.into()) }
    }

    pub fn principal(&self) -> Option<&Principal> { self.principal.as_ref() }

    pub fn is_authenticated(&self) -> bool { self.principal.is_some() }

    /// Attach a verified principal. The first one wins; returns false when an
    /// identity was already set for this request.
    pub fn attach(&mut self, principal: Principal) -> bool {
        if self.principal.is_some() { return false; }
        self.principal = Some(principal);
        true
    }
}
