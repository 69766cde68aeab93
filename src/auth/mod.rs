//! Sign-in, sign-up and the signed-in identity.

mod local;
mod session;

pub use local::LocalAuth;
pub use session::{clear_stored_identity, load_stored_identity, store_identity, Session};

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Email is already in use: {0}")]
    EmailAlreadyInUse(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account signs in with {0}")]
    AccountUsesProvider(FederatedProvider),

    #[error("{0} signs in with a password. Sign in with it first to link another provider.")]
    AccountUsesPassword(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Auth storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
}

impl std::fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FederatedProvider::Google => write!(f, "google"),
        }
    }
}

impl std::str::FromStr for FederatedProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(FederatedProvider::Google),
            _ => Err(format!("Unknown sign-in provider: {}", s)),
        }
    }
}

/// What the federated provider vouches for after its sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedAssertion {
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInMethod {
    Password,
    Federated(FederatedProvider),
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub method: SignInMethod,
}

pub trait AuthProvider: Send + Sync {
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Create an account and sign it in.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
        assertion: FederatedAssertion,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn current_identity(&self) -> Option<Identity>;

    /// Receives the identity on every sign-in and `None` on sign-out.
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>>;
}
