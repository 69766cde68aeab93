use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    AuthError, AuthProvider, FederatedAssertion, FederatedProvider, Identity, SignInMethod,
};
use crate::config::PROJECT_DIR;

const ACCOUNTS_FILE: &str = "accounts.json";
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    display_name: Option<String>,
    /// Absent for accounts created through a federated provider.
    password_hash: Option<String>,
    salt: String,
    #[serde(default)]
    providers: Vec<FederatedProvider>,
    created_at: DateTime<Utc>,
}

impl Account {
    fn identity(&self, method: SignInMethod) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            method,
        }
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

/// Accounts kept on this machine: in memory, or in `.stickyboard/accounts.json`.
pub struct LocalAuth {
    accounts: Mutex<HashMap<String, Account>>,
    path: Option<PathBuf>,
    identity: watch::Sender<Option<Identity>>,
}

impl LocalAuth {
    pub fn in_memory() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            path: None,
            identity: watch::channel(None).0,
        }
    }

    /// Load the project's account registry; a missing file means no accounts yet.
    pub fn open(root: &Path) -> Result<Self, AuthError> {
        let path = root.join(PROJECT_DIR).join(ACCOUNTS_FILE);
        let accounts = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| AuthError::Storage(e.to_string()))?;
            serde_json::from_str(&text).map_err(|e| AuthError::Storage(e.to_string()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            accounts: Mutex::new(accounts),
            path: Some(path),
            identity: watch::channel(None).0,
        })
    }

    /// Re-establish a previously signed-in identity, if its account still exists.
    pub fn resume(&self, identity: Identity) -> Result<Identity, AuthError> {
        let accounts = self.lock()?;
        let known = accounts.values().any(|a| a.uid == identity.uid);
        drop(accounts);
        if !known {
            return Err(AuthError::UnknownAccount(identity.email));
        }
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Account>>, AuthError> {
        self.accounts
            .lock()
            .map_err(|_| AuthError::Storage("account lock poisoned".to_string()))
    }

    fn persist(&self, accounts: &HashMap<String, Account>) -> Result<(), AuthError> {
        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| AuthError::Storage(e.to_string()))?;
            }
            let text = serde_json::to_string_pretty(accounts)
                .map_err(|e| AuthError::Storage(e.to_string()))?;
            fs::write(path, text).map_err(|e| AuthError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    fn signed_in(&self, identity: Identity) -> Identity {
        info!(uid = %identity.uid, "signed in");
        self.identity.send_replace(Some(identity.clone()));
        identity
    }
}

impl AuthProvider for LocalAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        let identity = {
            let accounts = self.lock()?;
            let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
            let Some(ref stored) = account.password_hash else {
                let provider = account
                    .providers
                    .first()
                    .copied()
                    .unwrap_or(FederatedProvider::Google);
                return Err(AuthError::AccountUsesProvider(provider));
            };
            if *stored != hash_password(&account.salt, password) {
                debug!(email = %email, "password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            account.identity(SignInMethod::Password)
        };
        Ok(self.signed_in(identity))
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LENGTH,
            });
        }

        let identity = {
            let mut accounts = self.lock()?;
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailAlreadyInUse(email));
            }
            let salt = Uuid::new_v4().simple().to_string();
            let account = Account {
                uid: Uuid::new_v4().to_string(),
                email: email.clone(),
                display_name: None,
                password_hash: Some(hash_password(&salt, password)),
                salt,
                providers: Vec::new(),
                created_at: Utc::now(),
            };
            let identity = account.identity(SignInMethod::Password);
            accounts.insert(email, account);
            self.persist(&accounts)?;
            identity
        };
        Ok(self.signed_in(identity))
    }

    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
        assertion: FederatedAssertion,
    ) -> Result<Identity, AuthError> {
        let email = normalize_email(&assertion.email)?;
        let signed_in_uid = self.identity.borrow().as_ref().map(|i| i.uid.clone());
        let identity = {
            let mut accounts = self.lock()?;
            // A password account only gains a provider while its owner is signed in.
            if let Some(existing) = accounts.get(&email) {
                let linked = existing.providers.contains(&provider);
                let owner_signed_in = signed_in_uid.as_deref() == Some(existing.uid.as_str());
                if existing.password_hash.is_some() && !linked && !owner_signed_in {
                    debug!(email = %email, %provider, "refusing to link provider to password account");
                    return Err(AuthError::AccountUsesPassword(email));
                }
            }
            let account = accounts.entry(email.clone()).or_insert_with(|| Account {
                uid: Uuid::new_v4().to_string(),
                email: email.clone(),
                display_name: assertion.display_name.clone(),
                password_hash: None,
                salt: Uuid::new_v4().simple().to_string(),
                providers: Vec::new(),
                created_at: Utc::now(),
            });
            if !account.providers.contains(&provider) {
                debug!(email = %email, subject = %assertion.subject, %provider, "linking provider");
                account.providers.push(provider);
            }
            if account.display_name.is_none() {
                account.display_name = assertion.display_name.clone();
            }
            let identity = account.identity(SignInMethod::Federated(provider));
            self.persist(&accounts)?;
            identity
        };
        Ok(self.signed_in(identity))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(previous) = self.identity.send_replace(None) {
            info!(uid = %previous.uid, "signed out");
        }
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn google(email: &str) -> FederatedAssertion {
        FederatedAssertion {
            subject: "g-123".to_string(),
            email: email.to_string(),
            display_name: Some("Ada".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_account_signs_in() {
        let auth = LocalAuth::in_memory();
        let identity = auth.create_account("Ada@Example.com", "secret1").await.unwrap();
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.method, SignInMethod::Password);
        assert_eq!(auth.current_identity(), Some(identity));
    }

    #[tokio::test]
    async fn test_create_account_validation() {
        let auth = LocalAuth::in_memory();
        assert!(matches!(
            auth.create_account("not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.create_account("ada@example.com", "123").await,
            Err(AuthError::WeakPassword { min: 6 })
        ));

        auth.create_account("ada@example.com", "secret1").await.unwrap();
        assert!(matches!(
            auth.create_account("ada@example.com", "secret2").await,
            Err(AuthError::EmailAlreadyInUse(_))
        ));
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let auth = LocalAuth::in_memory();
        let created = auth.create_account("ada@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();

        assert_eq!(
            auth.sign_in_with_password("ada@example.com", "wrong!!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in_with_password("nobody@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        );

        let identity = auth
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(identity.uid, created.uid);
    }

    #[tokio::test]
    async fn test_federated_account_cannot_use_password() {
        let auth = LocalAuth::in_memory();
        let identity = auth
            .sign_in_with_provider(FederatedProvider::Google, google("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));

        assert_eq!(
            auth.sign_in_with_password("ada@example.com", "anything").await,
            Err(AuthError::AccountUsesProvider(FederatedProvider::Google))
        );
    }

    #[tokio::test]
    async fn test_federated_sign_in_links_while_owner_signed_in() {
        let auth = LocalAuth::in_memory();
        let created = auth.create_account("ada@example.com", "secret1").await.unwrap();
        let linked = auth
            .sign_in_with_provider(FederatedProvider::Google, google("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(linked.uid, created.uid);
        assert_eq!(linked.method, SignInMethod::Federated(FederatedProvider::Google));

        // Once linked, the provider works on its own.
        auth.sign_out().await.unwrap();
        let again = auth
            .sign_in_with_provider(FederatedProvider::Google, google("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(again.uid, created.uid);
    }

    #[tokio::test]
    async fn test_federated_sign_in_cannot_take_over_password_account() {
        let auth = LocalAuth::in_memory();
        auth.create_account("ada@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();

        assert_eq!(
            auth.sign_in_with_provider(FederatedProvider::Google, google("ada@example.com"))
                .await,
            Err(AuthError::AccountUsesPassword("ada@example.com".to_string()))
        );
        assert!(auth.current_identity().is_none());

        // Someone else being signed in does not help either.
        auth.create_account("eve@example.com", "secret2").await.unwrap();
        assert!(matches!(
            auth.sign_in_with_provider(FederatedProvider::Google, google("ada@example.com"))
                .await,
            Err(AuthError::AccountUsesPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_sees_sign_in_and_out() {
        let auth = LocalAuth::in_memory();
        let mut rx = auth.watch_identity();
        assert!(rx.borrow().is_none());

        auth.create_account("ada@example.com", "secret1").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        auth.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_accounts_persist_in_project() {
        let tmp = TempDir::new().unwrap();
        let auth = LocalAuth::open(tmp.path()).unwrap();
        let created = auth.create_account("ada@example.com", "secret1").await.unwrap();

        let reopened = LocalAuth::open(tmp.path()).unwrap();
        assert!(reopened.current_identity().is_none());
        let identity = reopened
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(identity.uid, created.uid);

        let resumed = LocalAuth::open(tmp.path()).unwrap().resume(identity.clone());
        assert_eq!(resumed, Ok(identity));
    }

    #[test]
    fn test_password_hash_is_salted() {
        assert_ne!(hash_password("a", "secret"), hash_password("b", "secret"));
        assert_eq!(hash_password("a", "secret").len(), 64);
    }
}
