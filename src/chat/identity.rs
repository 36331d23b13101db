//! Collaborators consumed by the orchestrator.
//!
//! Identity comes from whoever owns the wallet session; intent handling
//! belongs to the domain layer. Both are plugged in through these traits.

use std::sync::{Arc, RwLock};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub wallet_address: String,
    pub username: String,
}

pub trait IdentityProvider: Send + Sync {
    /// `None` when no user is signed in.
    fn current_user(&self) -> Option<UserIdentity>;
}

/// Identity that can be set and cleared at runtime.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Arc<RwLock<Option<UserIdentity>>>,
}

impl StaticIdentity {
    pub fn new(user: Option<UserIdentity>) -> Self {
        Self {
            user: Arc::new(RwLock::new(user)),
        }
    }

    pub fn signed_in(wallet_address: impl Into<String>, username: impl Into<String>) -> Self {
        Self::new(Some(UserIdentity {
            wallet_address: wallet_address.into(),
            username: username.into(),
        }))
    }

    pub fn set(&self, user: Option<UserIdentity>) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = user;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserIdentity> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Interception point ahead of the network path.
///
/// Returning `Some(reply)` answers the turn locally; nothing is dispatched.
pub trait IntentHandler: Send + Sync {
    fn intercept(&self, text: &str) -> Option<String>;
}

/// Lets every turn through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl IntentHandler for PassThrough {
    fn intercept(&self, _text: &str) -> Option<String> {
        None
    }
}

impl<F> IntentHandler for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn intercept(&self, text: &str) -> Option<String> {
        self(text)
    }
}
