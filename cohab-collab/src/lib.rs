mod announcements;
mod auth;
mod rooms;
mod util;

use std::sync::Arc;

pub use announcements::*;
pub use auth::*;
pub use cohab_store::*;
pub use rooms::*;

/// The cohab system, facilitating room membership, announcements, and
/// sign-in over an external identity provider and document store.
///
/// Constructed once at session start and passed by reference to whatever
/// needs it, never held as ambient global state.
pub struct Cohab<S, P> {
    store: Arc<S>,

    pub auth: Auth<P, S>,
    pub rooms: Rooms<S>,
    pub announcements: Announcements<S>,
}

impl<S, P> Cohab<S, P>
where
    S: Store,
    P: Identity,
{
    pub fn new(store: S, provider: P) -> Self {
        let store = Arc::new(store);
        let provider = Arc::new(provider);

        Self {
            auth: Auth::new(&provider, &store),
            rooms: Rooms::new(&store),
            announcements: Announcements::new(&store),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::testing::FixedIdentity;

    fn profile(uid: &str, name: &str) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            name: name.to_string(),
            email: format!("{uid}@example.com"),
        }
    }

    fn credential() -> Credential {
        Credential {
            provider: "google.com".to_string(),
            id_token: "token".to_string(),
        }
    }

    /// The full join flow: create, share the code, request, review, accept
    #[tokio::test]
    async fn test_join_flow_end_to_end() {
        let alice = profile("alice", "Alice");
        let bob = profile("bob", "Bob");

        let cohab = Cohab::new(MemoryStore::new(), FixedIdentity::new(alice.clone()));
        cohab.auth.sign_in_with_credential(credential()).await.unwrap();

        // Alice creates the room and shares the code with Bob out of band
        let room = cohab.rooms.create_room("Hostel 3", &alice).await.unwrap();
        assert_eq!(
            cohab.rooms.watch_room(&room.id).current().unwrap().name,
            "Hostel 3"
        );

        // Bob signs in on his own device, resolves the code, and requests in
        cohab.store().ensure_user(bob.clone()).await.unwrap();

        let found = cohab
            .rooms
            .find_room_by_code(&room.code.to_lowercase())
            .await
            .unwrap();
        cohab.rooms.request_to_join(&found.id, &bob).await.unwrap();

        // Alice's admin view lists the pending request
        let mut requests = cohab.rooms.watch_join_requests(&room.id);
        let pending = requests.current();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].uid, "bob");

        // Alice accepts, Bob becomes a member and lands in the room
        cohab
            .rooms
            .accept_join(&alice.uid, &room.id, &pending[0])
            .await
            .unwrap();

        assert!(requests.next().await.unwrap().is_empty());

        let bob_data = cohab.rooms.watch_user(&bob.uid).current().unwrap();
        assert!(bob_data.room_ids.contains(&room.id));
        assert_eq!(bob_data.current_room_id, Some(room.id.clone()));

        let resolved = cohab.rooms.rooms_by_ids(&bob_data.room_ids).await.unwrap();
        assert_eq!(resolved[0].name, "Hostel 3");

        let member = cohab.store().member(&room.id, &bob.uid).await.unwrap();
        assert_eq!(member.role, Role::Member);

        // The room now has a shared feed
        cohab
            .announcements
            .post(&room.id, "Welcome Bob!", &alice)
            .await
            .unwrap();
        assert_eq!(cohab.announcements.watch(&room.id).current().len(), 1);
    }
}
