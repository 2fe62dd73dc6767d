use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

use cohab_store::{Snapshots, Store, StoreError, Uid, UserData, UserProfile};

/// A credential obtained from a federated sign-in flow, such as a Google
/// id token
#[derive(Debug, Clone)]
pub struct Credential {
    pub provider: String,
    pub id_token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential did not resolve to an identity
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Something else went wrong at the identity provider
    #[error("Identity provider failure: {0}")]
    Provider(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The identity capability: a stable uid with a name/email snapshot,
/// supplied by an external provider
#[async_trait]
pub trait Identity: Send + Sync + 'static {
    fn current_user(&self) -> Option<UserProfile>;
    /// Fires with the full identity state on every change
    fn watch(&self) -> Snapshots<Option<UserProfile>>;
    async fn sign_in_with_credential(&self, credential: Credential)
        -> Result<UserProfile, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Session management on top of the identity provider. Signing in also
/// makes sure the user's own record exists in the store.
pub struct Auth<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
}

impl<P, S> Auth<P, S>
where
    P: Identity,
    S: Store,
{
    pub fn new(provider: &Arc<P>, store: &Arc<S>) -> Self {
        Self {
            provider: provider.clone(),
            store: store.clone(),
        }
    }

    pub async fn sign_in_with_credential(
        &self,
        credential: Credential,
    ) -> Result<UserData, AuthError> {
        let profile = self.provider.sign_in_with_credential(credential).await?;
        let user = self.store.ensure_user(profile).await?;

        info!("User {} signed in", user.uid);

        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.provider.current_user()
    }

    pub fn watch(&self) -> Snapshots<Option<UserProfile>> {
        self.provider.watch()
    }

    /// Stores a new profile photo location on the user's own record
    pub async fn update_photo(&self, uid: &Uid, photo_url: &str) -> Result<(), AuthError> {
        self.store.set_photo_url(uid, photo_url).await?;

        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::testing::FixedIdentity;
    use super::*;
    use cohab_store::MemoryStore;

    fn alice() -> UserProfile {
        UserProfile {
            uid: "alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    fn credential() -> Credential {
        Credential {
            provider: "google.com".to_string(),
            id_token: "token".to_string(),
        }
    }

    fn auth() -> Auth<FixedIdentity, MemoryStore> {
        let provider = Arc::new(FixedIdentity::new(alice()));
        let store = Arc::new(MemoryStore::new());

        Auth::new(&provider, &store)
    }

    #[tokio::test]
    async fn test_sign_in_ensures_user_record() {
        let auth = auth();

        let user = auth.sign_in_with_credential(credential()).await.unwrap();

        assert_eq!(user.uid, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.room_ids.is_empty());
        assert_eq!(auth.current_user(), Some(alice()));
    }

    #[tokio::test]
    async fn test_sign_out_clears_identity() {
        let auth = auth();
        auth.sign_in_with_credential(credential()).await.unwrap();

        auth.sign_out().await.unwrap();
        assert_eq!(auth.current_user(), None);
    }

    #[tokio::test]
    async fn test_invalid_credential_is_rejected() {
        let auth = auth();

        let result = auth
            .sign_in_with_credential(Credential {
                provider: "google.com".to_string(),
                id_token: String::new(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_watch_follows_sign_in_state() {
        let auth = auth();
        let mut identity = auth.watch();

        assert_eq!(identity.current(), None);

        auth.sign_in_with_credential(credential()).await.unwrap();
        assert_eq!(identity.next().await.unwrap(), Some(alice()));
    }

    #[tokio::test]
    async fn test_update_photo() {
        let auth = auth();
        auth.sign_in_with_credential(credential()).await.unwrap();

        auth.update_photo(&"alice".to_string(), "https://example.com/a.png")
            .await
            .unwrap();

        // Distinct from the identity snapshot, the photo lives on the record
        let user = auth.store.user_by_id(&"alice".to_string()).await.unwrap();
        assert_eq!(user.photo_url.as_deref(), Some("https://example.com/a.png"));
    }
}
