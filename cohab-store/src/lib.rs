use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod subscription;
pub use subscription::*;

pub type Result<T> = std::result::Result<T, StoreError>;
pub type BoxedStore = Box<dyn Store>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An unknown or internal error happened with the store
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A record already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The record type in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A record in the store doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// The acting user is not allowed to perform the write.
    /// This is the storage-level counterpart of the admin check done by the
    /// membership engine, so a bypassed caller still cannot mutate requests.
    #[error("user {uid} is not allowed to {action}")]
    PermissionDenied { uid: Uid, action: &'static str },
}

/// Represents a type that can persist cohab records and push live snapshots.
///
/// Writes are atomic per document, last write wins. The composite operations
/// ([Store::create_room], [Store::accept_join], [Store::leave_room]) must
/// apply all of their writes as a single all-or-nothing unit.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn room_by_id(&self, room_id: &RoomId) -> Result<RoomData>;
    /// Equality query against the stored invite code. The stored code is
    /// always uppercase, so callers normalize before querying.
    async fn rooms_by_code(&self, code: &str) -> Result<Vec<RoomData>>;
    /// Creates the room and its admin member record in one unit.
    /// The store assigns the room id.
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;

    async fn member(&self, room_id: &RoomId, uid: &Uid) -> Result<MemberData>;
    async fn list_members(&self, room_id: &RoomId) -> Result<Vec<MemberData>>;

    /// Upserts a join request keyed by the requester's uid, so a second
    /// request from the same user overwrites the first.
    async fn upsert_join_request(
        &self,
        room_id: &RoomId,
        request: NewJoinRequest,
    ) -> Result<JoinRequestData>;
    async fn list_join_requests(&self, room_id: &RoomId) -> Result<Vec<JoinRequestData>>;
    /// Converts a join request into a member record: inserts the member with
    /// the request's identity snapshot, deletes the request, and attaches the
    /// room to the requester's user record, all in one unit.
    /// Fails unless `acting_uid` is the room admin.
    async fn accept_join(
        &self,
        acting_uid: &Uid,
        room_id: &RoomId,
        request: &JoinRequestData,
    ) -> Result<MemberData>;
    /// Deletes a join request without creating a member. Fails unless
    /// `acting_uid` is the room admin. Deleting an already-gone request is
    /// not an error, since a concurrent accept may have removed it first.
    async fn reject_join(&self, acting_uid: &Uid, room_id: &RoomId, uid: &Uid) -> Result<()>;
    /// Deletes the member record, removes the room from the user's room list,
    /// and clears their current-room pointer, all in one unit.
    async fn leave_room(&self, room_id: &RoomId, uid: &Uid) -> Result<()>;

    async fn user_by_id(&self, uid: &Uid) -> Result<UserData>;
    /// Merge-upserts the user's own record, refreshing the identity snapshot
    /// without touching their room list or current-room pointer.
    async fn ensure_user(&self, profile: UserProfile) -> Result<UserData>;
    /// Adds the room to the user's room list and points their current room
    /// at it, as a single merge-write to the user record, creating the
    /// record if it does not exist yet.
    async fn attach_user_room(&self, uid: &Uid, room_id: &RoomId) -> Result<UserData>;
    /// Merge-writes the current-room pointer, creating the record if needed
    async fn set_current_room(&self, uid: &Uid, room_id: Option<RoomId>) -> Result<()>;
    async fn set_photo_url(&self, uid: &Uid, photo_url: &str) -> Result<()>;

    /// Creates an announcement with a store-assigned id and timestamp
    async fn create_announcement(
        &self,
        room_id: &RoomId,
        new_announcement: NewAnnouncement,
    ) -> Result<AnnouncementData>;
    /// Lists announcements newest first
    async fn list_announcements(&self, room_id: &RoomId) -> Result<Vec<AnnouncementData>>;

    fn watch_room(&self, room_id: &RoomId) -> Snapshots<Option<RoomData>>;
    fn watch_members(&self, room_id: &RoomId) -> Snapshots<Vec<MemberData>>;
    fn watch_join_requests(&self, room_id: &RoomId) -> Snapshots<Vec<JoinRequestData>>;
    fn watch_announcements(&self, room_id: &RoomId) -> Snapshots<Vec<AnnouncementData>>;
    fn watch_user(&self, uid: &Uid) -> Snapshots<Option<UserData>>;
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    /// The invite code issued for the room, already uppercase
    pub code: String,
    /// The creator, who becomes the sole admin
    pub admin: UserProfile,
}

#[derive(Debug, Clone)]
pub struct NewJoinRequest {
    pub uid: Uid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub text: String,
    pub created_by_uid: Uid,
    pub created_by_name: String,
}
