//! Redirect capability.
//!
//! Navigating to the identity provider is the only way the session tells the
//! surrounding application that a login is required. The controller never
//! performs navigation itself; the host injects an implementation.

/// Hands control to an external URI.
pub trait Navigator: Send + Sync {
    /// Navigate to `uri`, replacing the current location.
    fn redirect_to(&self, uri: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to(&self, uri: &str) {
        self(uri);
    }
}
