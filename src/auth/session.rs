use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AuthError, AuthProvider, FederatedAssertion, FederatedProvider, Identity};
use crate::config::PROJECT_DIR;
use crate::error::Result;

const SESSION_FILE: &str = "session.json";

/// The signed-in context handed to whatever needs to know who the user is.
///
/// Created by a successful sign-in and ended with [`Session::end`], which
/// signs out. There is no ambient "current user" anywhere else.
pub struct Session<A: AuthProvider> {
    auth: Arc<A>,
    identity: Identity,
}

impl<A: AuthProvider> Session<A> {
    pub async fn sign_in(auth: Arc<A>, email: &str, password: &str) -> std::result::Result<Self, AuthError> {
        let identity = auth.sign_in_with_password(email, password).await?;
        Ok(Self { auth, identity })
    }

    pub async fn sign_up(auth: Arc<A>, email: &str, password: &str) -> std::result::Result<Self, AuthError> {
        let identity = auth.create_account(email, password).await?;
        Ok(Self { auth, identity })
    }

    pub async fn sign_in_with_provider(
        auth: Arc<A>,
        provider: FederatedProvider,
        assertion: FederatedAssertion,
    ) -> std::result::Result<Self, AuthError> {
        let identity = auth.sign_in_with_provider(provider, assertion).await?;
        Ok(Self { auth, identity })
    }

    /// Wrap an identity the provider has already accepted.
    pub fn resume(auth: Arc<A>, identity: Identity) -> Self {
        Self { auth, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Sign out and tear the session down.
    pub async fn end(self) -> std::result::Result<(), AuthError> {
        self.auth.sign_out().await
    }
}

fn session_path(root: &Path) -> PathBuf {
    root.join(PROJECT_DIR).join(SESSION_FILE)
}

/// Remember the signed-in identity between CLI invocations.
pub fn store_identity(root: &Path, identity: &Identity) -> Result<()> {
    let text = serde_json::to_string_pretty(identity)?;
    fs::write(session_path(root), text)?;
    Ok(())
}

pub fn load_stored_identity(root: &Path) -> Result<Option<Identity>> {
    let path = session_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

pub fn clear_stored_identity(root: &Path) -> Result<()> {
    let path = session_path(root);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LocalAuth, SignInMethod};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let auth = Arc::new(LocalAuth::in_memory());
        let session = Session::sign_up(auth.clone(), "ada@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(session.identity().email, "ada@example.com");
        assert!(auth.current_identity().is_some());

        session.end().await.unwrap();
        assert!(auth.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_in_yields_no_session() {
        let auth = Arc::new(LocalAuth::in_memory());
        let result = Session::sign_in(auth.clone(), "ada@example.com", "secret1").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(auth.current_identity().is_none());
    }

    #[test]
    fn test_stored_identity_round_trip() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(PROJECT_DIR)).unwrap();
        assert!(load_stored_identity(tmp.path()).unwrap().is_none());

        let identity = Identity {
            uid: "u1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: None,
            method: SignInMethod::Password,
        };
        store_identity(tmp.path(), &identity).unwrap();
        assert_eq!(load_stored_identity(tmp.path()).unwrap(), Some(identity));

        clear_stored_identity(tmp.path()).unwrap();
        clear_stored_identity(tmp.path()).unwrap();
        assert!(load_stored_identity(tmp.path()).unwrap().is_none());
    }
}
