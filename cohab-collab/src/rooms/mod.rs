mod directory;

use std::sync::Arc;

use log::info;
use thiserror::Error;

use cohab_store::{
    JoinRequestData, MemberData, NewJoinRequest, NewRoom, RoomData, RoomId, Snapshots, Store,
    StoreError, Uid, UserData, UserProfile,
};

pub use directory::*;

/// The room membership engine. Owns room creation, the join-request
/// lifecycle, member bookkeeping, and each user's current-room pointer.
///
/// The engine is the sole writer of room, member, join-request, and user
/// records; callers only read through the watch handles and issue commands.
pub struct Rooms<S> {
    store: Arc<S>,
    pub directory: Directory<S>,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room name cannot be empty")]
    InvalidName,
    #[error("Join code cannot be empty")]
    EmptyCode,
    #[error("No room with that code exists")]
    CodeNotFound,
    #[error("User is not a member of this room")]
    NotAMember,
    #[error("Only the room admin can review join requests")]
    PermissionDenied,
    #[error("Could not issue an unused invite code")]
    CodeSpaceExhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> Rooms<S>
where
    S: Store,
{
    pub fn new(store: &Arc<S>) -> Self {
        Self {
            store: store.clone(),
            directory: Directory::new(store),
        }
    }

    /// Creates a room with the caller as its sole admin, and points the
    /// caller's own record at it
    pub async fn create_room(&self, name: &str, user: &UserProfile) -> Result<RoomData, RoomError> {
        let name = name.trim();

        if name.is_empty() {
            return Err(RoomError::InvalidName);
        }

        let code = self.directory.issue_code().await?;

        let room = self
            .store
            .create_room(NewRoom {
                name: name.to_string(),
                code,
                admin: user.clone(),
            })
            .await?;

        self.store.attach_user_room(&user.uid, &room.id).await?;

        info!(
            "User {} created room {} with code {}",
            user.uid, room.name, room.code
        );

        Ok(room)
    }

    /// Case-insensitive invite code lookup, used before requesting to join
    pub async fn find_room_by_code(&self, code: &str) -> Result<RoomData, RoomError> {
        self.directory.find_room_by_code(code).await
    }

    /// Files a join request with the caller's identity snapshot. A second
    /// request from the same user overwrites the first.
    pub async fn request_to_join(
        &self,
        room_id: &RoomId,
        user: &UserProfile,
    ) -> Result<JoinRequestData, RoomError> {
        let request = self
            .store
            .upsert_join_request(
                room_id,
                NewJoinRequest {
                    uid: user.uid.clone(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                },
            )
            .await?;

        Ok(request)
    }

    /// Converts a pending request into a member. Only the room admin may
    /// accept; the store re-checks this at its own boundary.
    pub async fn accept_join(
        &self,
        acting_uid: &Uid,
        room_id: &RoomId,
        request: &JoinRequestData,
    ) -> Result<MemberData, RoomError> {
        let room = self.admin_room(acting_uid, room_id).await?;
        let member = self.store.accept_join(acting_uid, room_id, request).await?;

        info!("User {} joined room {}", member.uid, room.name);

        Ok(member)
    }

    /// Deletes a pending request without creating a member
    pub async fn reject_join(
        &self,
        acting_uid: &Uid,
        room_id: &RoomId,
        uid: &Uid,
    ) -> Result<(), RoomError> {
        self.admin_room(acting_uid, room_id).await?;
        self.store.reject_join(acting_uid, room_id, uid).await?;

        Ok(())
    }

    /// Points the user's session at one of their rooms, or at none.
    /// Selecting a room the user is not a member of is rejected, which keeps
    /// the pointer inside their room list.
    pub async fn select_room(&self, uid: &Uid, room_id: Option<&RoomId>) -> Result<(), RoomError> {
        if let Some(room_id) = room_id {
            let user = self.store.user_by_id(uid).await?;

            if !user.room_ids.contains(room_id) {
                return Err(RoomError::NotAMember);
            }
        }

        self.store.set_current_room(uid, room_id.cloned()).await?;

        Ok(())
    }

    /// Removes the user's membership and clears their current-room pointer
    pub async fn leave_room(&self, room_id: &RoomId, uid: &Uid) -> Result<(), RoomError> {
        self.store.member(room_id, uid).await.map_err(|e| match e {
            StoreError::NotFound { .. } => RoomError::NotAMember,
            e => e.into(),
        })?;

        self.store.leave_room(room_id, uid).await?;

        info!("User {uid} left room {room_id}");

        Ok(())
    }

    /// Resolves a user's room list to room records, skipping ids that no
    /// longer resolve
    pub async fn rooms_by_ids(&self, ids: &[RoomId]) -> Result<Vec<RoomData>, RoomError> {
        let mut rooms = Vec::with_capacity(ids.len());

        for id in ids {
            match self.store.room_by_id(id).await {
                Ok(room) => rooms.push(room),
                Err(StoreError::NotFound { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(rooms)
    }

    pub fn watch_room(&self, room_id: &RoomId) -> Snapshots<Option<RoomData>> {
        self.store.watch_room(room_id)
    }

    pub fn watch_members(&self, room_id: &RoomId) -> Snapshots<Vec<MemberData>> {
        self.store.watch_members(room_id)
    }

    /// Meaningful only to the room admin
    pub fn watch_join_requests(&self, room_id: &RoomId) -> Snapshots<Vec<JoinRequestData>> {
        self.store.watch_join_requests(room_id)
    }

    pub fn watch_user(&self, uid: &Uid) -> Snapshots<Option<UserData>> {
        self.store.watch_user(uid)
    }

    async fn admin_room(&self, acting_uid: &Uid, room_id: &RoomId) -> Result<RoomData, RoomError> {
        let room = self.store.room_by_id(room_id).await?;

        if room.admin_uid != *acting_uid {
            return Err(RoomError::PermissionDenied);
        }

        Ok(room)
    }
}
