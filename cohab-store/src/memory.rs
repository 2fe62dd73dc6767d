use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tokio::sync::watch;

use crate::{
    AnnouncementData, JoinRequestData, MemberData, NewAnnouncement, NewJoinRequest, NewRoom,
    Result, Role, RoomData, RoomId, Snapshots, Store, StoreError, Uid, UserData, UserProfile,
};

/// An in-process store with the same semantics as the hosted backend:
/// per-document atomic overwrite, last write wins, and push-on-change
/// subscriptions that deliver the full current result set.
///
/// All state lives behind one mutex, which is what makes the composite
/// operations all-or-nothing. Snapshots are published before the lock is
/// released, so a subscriber never observes a torn multi-document write.
pub struct MemoryStore {
    state: Mutex<State>,
    room_watchers: DashMap<RoomId, watch::Sender<Option<RoomData>>>,
    member_watchers: DashMap<RoomId, watch::Sender<Vec<MemberData>>>,
    request_watchers: DashMap<RoomId, watch::Sender<Vec<JoinRequestData>>>,
    announcement_watchers: DashMap<RoomId, watch::Sender<Vec<AnnouncementData>>>,
    user_watchers: DashMap<Uid, watch::Sender<Option<UserData>>>,
}

#[derive(Default)]
struct State {
    rooms: HashMap<RoomId, RoomDoc>,
    users: HashMap<Uid, UserData>,
}

/// A room document along with its subcollections
struct RoomDoc {
    data: RoomData,
    members: BTreeMap<Uid, MemberData>,
    join_requests: BTreeMap<Uid, JoinRequestData>,
    announcements: Vec<AnnouncementData>,
}

/// Store-assigned opaque document ids
fn document_id() -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(20)
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Default::default(),
            room_watchers: Default::default(),
            member_watchers: Default::default(),
            request_watchers: Default::default(),
            announcement_watchers: Default::default(),
            user_watchers: Default::default(),
        }
    }

    fn publish_room(&self, state: &State, room_id: &RoomId) {
        if let Some(sender) = self.room_watchers.get(room_id) {
            sender.send_replace(state.rooms.get(room_id).map(|r| r.data.clone()));
        }
    }

    fn publish_members(&self, state: &State, room_id: &RoomId) {
        if let Some(sender) = self.member_watchers.get(room_id) {
            sender.send_replace(members_of(state, room_id));
        }
    }

    fn publish_requests(&self, state: &State, room_id: &RoomId) {
        if let Some(sender) = self.request_watchers.get(room_id) {
            sender.send_replace(requests_of(state, room_id));
        }
    }

    fn publish_announcements(&self, state: &State, room_id: &RoomId) {
        if let Some(sender) = self.announcement_watchers.get(room_id) {
            sender.send_replace(announcements_of(state, room_id));
        }
    }

    fn publish_user(&self, state: &State, uid: &Uid) {
        if let Some(sender) = self.user_watchers.get(uid) {
            sender.send_replace(state.users.get(uid).cloned());
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn members_of(state: &State, room_id: &RoomId) -> Vec<MemberData> {
    state
        .rooms
        .get(room_id)
        .map(|r| r.members.values().cloned().collect())
        .unwrap_or_default()
}

fn requests_of(state: &State, room_id: &RoomId) -> Vec<JoinRequestData> {
    state
        .rooms
        .get(room_id)
        .map(|r| r.join_requests.values().cloned().collect())
        .unwrap_or_default()
}

fn announcements_of(state: &State, room_id: &RoomId) -> Vec<AnnouncementData> {
    state
        .rooms
        .get(room_id)
        .map(|r| r.announcements.iter().rev().cloned().collect())
        .unwrap_or_default()
}

fn room_of<'a>(state: &'a State, room_id: &RoomId) -> Result<&'a RoomDoc> {
    state.rooms.get(room_id).ok_or(StoreError::NotFound {
        resource: "room",
        identifier: "id",
    })
}

fn room_of_mut<'a>(state: &'a mut State, room_id: &RoomId) -> Result<&'a mut RoomDoc> {
    state.rooms.get_mut(room_id).ok_or(StoreError::NotFound {
        resource: "room",
        identifier: "id",
    })
}

/// Re-syncs a watch channel with the current state without waking its
/// subscribers when the held value is already up to date.
fn refresh<T>(sender: &watch::Sender<T>, current: T)
where
    T: PartialEq,
{
    sender.send_if_modified(|value| {
        if *value == current {
            return false;
        }

        *value = current;
        true
    });
}

/// A user record seeded with nothing but the uid, as written by a
/// merge-write that happens before the user ever signed in here
fn blank_user(uid: &Uid) -> UserData {
    UserData {
        uid: uid.clone(),
        email: String::new(),
        name: String::new(),
        room_ids: Vec::new(),
        current_room_id: None,
        photo_url: None,
    }
}

/// Fails unless the acting user is the room's admin
fn check_admin(room: &RoomDoc, acting_uid: &Uid, action: &'static str) -> Result<()> {
    if room.data.admin_uid != *acting_uid {
        return Err(StoreError::PermissionDenied {
            uid: acting_uid.clone(),
            action,
        });
    }

    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn room_by_id(&self, room_id: &RoomId) -> Result<RoomData> {
        let state = self.state.lock();
        room_of(&state, room_id).map(|r| r.data.clone())
    }

    async fn rooms_by_code(&self, code: &str) -> Result<Vec<RoomData>> {
        let state = self.state.lock();

        Ok(state
            .rooms
            .values()
            .filter(|r| r.data.code == code)
            .map(|r| r.data.clone())
            .collect())
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut state = self.state.lock();

        if state.rooms.values().any(|r| r.data.code == new_room.code) {
            return Err(StoreError::Conflict {
                resource: "room",
                field: "code",
                value: new_room.code,
            });
        }

        let room_id = document_id();
        let data = RoomData {
            id: room_id.clone(),
            name: new_room.name,
            code: new_room.code,
            admin_uid: new_room.admin.uid.clone(),
        };

        let admin_member = MemberData {
            uid: new_room.admin.uid,
            name: new_room.admin.name,
            email: new_room.admin.email,
            role: Role::Admin,
            joined_at: Utc::now(),
        };

        let mut members = BTreeMap::new();
        members.insert(admin_member.uid.clone(), admin_member);

        state.rooms.insert(
            room_id.clone(),
            RoomDoc {
                data: data.clone(),
                members,
                join_requests: Default::default(),
                announcements: Default::default(),
            },
        );

        self.publish_room(&state, &room_id);
        self.publish_members(&state, &room_id);

        Ok(data)
    }

    async fn member(&self, room_id: &RoomId, uid: &Uid) -> Result<MemberData> {
        let state = self.state.lock();

        room_of(&state, room_id)?
            .members
            .get(uid)
            .cloned()
            .ok_or(StoreError::NotFound {
                resource: "member",
                identifier: "uid",
            })
    }

    async fn list_members(&self, room_id: &RoomId) -> Result<Vec<MemberData>> {
        let state = self.state.lock();

        room_of(&state, room_id)?;
        Ok(members_of(&state, room_id))
    }

    async fn upsert_join_request(
        &self,
        room_id: &RoomId,
        request: NewJoinRequest,
    ) -> Result<JoinRequestData> {
        let mut state = self.state.lock();

        let data = JoinRequestData {
            uid: request.uid,
            name: request.name,
            email: request.email,
            created_at: Utc::now(),
        };

        let room = room_of_mut(&mut state, room_id)?;
        room.join_requests.insert(data.uid.clone(), data.clone());

        self.publish_requests(&state, room_id);

        Ok(data)
    }

    async fn list_join_requests(&self, room_id: &RoomId) -> Result<Vec<JoinRequestData>> {
        let state = self.state.lock();

        room_of(&state, room_id)?;
        Ok(requests_of(&state, room_id))
    }

    async fn accept_join(
        &self,
        acting_uid: &Uid,
        room_id: &RoomId,
        request: &JoinRequestData,
    ) -> Result<MemberData> {
        let mut state = self.state.lock();

        let room = room_of_mut(&mut state, room_id)?;
        check_admin(room, acting_uid, "accept join requests")?;

        let member = MemberData {
            uid: request.uid.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
            role: Role::Member,
            joined_at: Utc::now(),
        };

        room.members.insert(member.uid.clone(), member.clone());
        room.join_requests.remove(&request.uid);

        // Merge-write the requester's user record, creating it from the
        // request snapshot if they never signed in on this store
        let user = state
            .users
            .entry(request.uid.clone())
            .or_insert_with(|| UserData {
                uid: request.uid.clone(),
                email: request.email.clone(),
                name: request.name.clone(),
                room_ids: Vec::new(),
                current_room_id: None,
                photo_url: None,
            });

        if !user.room_ids.contains(room_id) {
            user.room_ids.push(room_id.clone());
        }
        user.current_room_id = Some(room_id.clone());

        self.publish_members(&state, room_id);
        self.publish_requests(&state, room_id);
        self.publish_user(&state, &member.uid);

        Ok(member)
    }

    async fn reject_join(&self, acting_uid: &Uid, room_id: &RoomId, uid: &Uid) -> Result<()> {
        let mut state = self.state.lock();

        let room = room_of_mut(&mut state, room_id)?;
        check_admin(room, acting_uid, "reject join requests")?;

        room.join_requests.remove(uid);
        self.publish_requests(&state, room_id);

        Ok(())
    }

    async fn leave_room(&self, room_id: &RoomId, uid: &Uid) -> Result<()> {
        let mut state = self.state.lock();

        let room = room_of_mut(&mut state, room_id)?;
        room.members.remove(uid);

        if let Some(user) = state.users.get_mut(uid) {
            user.room_ids.retain(|r| r != room_id);
            // The pointer is cleared even when the user has other rooms
            user.current_room_id = None;
        }

        self.publish_members(&state, room_id);
        self.publish_user(&state, uid);

        Ok(())
    }

    async fn user_by_id(&self, uid: &Uid) -> Result<UserData> {
        let state = self.state.lock();

        state.users.get(uid).cloned().ok_or(StoreError::NotFound {
            resource: "user",
            identifier: "uid",
        })
    }

    async fn ensure_user(&self, profile: UserProfile) -> Result<UserData> {
        let mut state = self.state.lock();

        let user = state
            .users
            .entry(profile.uid.clone())
            .and_modify(|user| {
                user.name = profile.name.clone();
                user.email = profile.email.clone();
            })
            .or_insert_with(|| UserData {
                uid: profile.uid.clone(),
                email: profile.email,
                name: profile.name,
                room_ids: Vec::new(),
                current_room_id: None,
                photo_url: None,
            });

        let user = user.clone();
        self.publish_user(&state, &profile.uid);

        Ok(user)
    }

    async fn attach_user_room(&self, uid: &Uid, room_id: &RoomId) -> Result<UserData> {
        let mut state = self.state.lock();

        // Merge-write, so a user record missing at this point is created
        // rather than failing the operation halfway through
        let user = state.users.entry(uid.clone()).or_insert_with(|| blank_user(uid));

        if !user.room_ids.contains(room_id) {
            user.room_ids.push(room_id.clone());
        }
        user.current_room_id = Some(room_id.clone());

        let user = user.clone();
        self.publish_user(&state, uid);

        Ok(user)
    }

    async fn set_current_room(&self, uid: &Uid, room_id: Option<RoomId>) -> Result<()> {
        let mut state = self.state.lock();

        let user = state.users.entry(uid.clone()).or_insert_with(|| blank_user(uid));

        user.current_room_id = room_id;
        self.publish_user(&state, uid);

        Ok(())
    }

    async fn set_photo_url(&self, uid: &Uid, photo_url: &str) -> Result<()> {
        let mut state = self.state.lock();

        let user = state.users.get_mut(uid).ok_or(StoreError::NotFound {
            resource: "user",
            identifier: "uid",
        })?;

        user.photo_url = Some(photo_url.to_string());
        self.publish_user(&state, uid);

        Ok(())
    }

    async fn create_announcement(
        &self,
        room_id: &RoomId,
        new_announcement: NewAnnouncement,
    ) -> Result<AnnouncementData> {
        let mut state = self.state.lock();

        let data = AnnouncementData {
            id: document_id(),
            text: new_announcement.text,
            created_by_uid: new_announcement.created_by_uid,
            created_by_name: new_announcement.created_by_name,
            created_at: Utc::now(),
        };

        let room = room_of_mut(&mut state, room_id)?;
        room.announcements.push(data.clone());

        self.publish_announcements(&state, room_id);

        Ok(data)
    }

    async fn list_announcements(&self, room_id: &RoomId) -> Result<Vec<AnnouncementData>> {
        let state = self.state.lock();

        room_of(&state, room_id)?;
        Ok(announcements_of(&state, room_id))
    }

    fn watch_room(&self, room_id: &RoomId) -> Snapshots<Option<RoomData>> {
        let state = self.state.lock();
        let current = state.rooms.get(room_id).map(|r| r.data.clone());

        let sender = self
            .room_watchers
            .entry(room_id.clone())
            .or_insert_with(|| watch::channel(current.clone()).0);

        refresh(&sender, current);
        Snapshots::new(sender.subscribe())
    }

    fn watch_members(&self, room_id: &RoomId) -> Snapshots<Vec<MemberData>> {
        let state = self.state.lock();
        let current = members_of(&state, room_id);

        let sender = self
            .member_watchers
            .entry(room_id.clone())
            .or_insert_with(|| watch::channel(current.clone()).0);

        refresh(&sender, current);
        Snapshots::new(sender.subscribe())
    }

    fn watch_join_requests(&self, room_id: &RoomId) -> Snapshots<Vec<JoinRequestData>> {
        let state = self.state.lock();
        let current = requests_of(&state, room_id);

        let sender = self
            .request_watchers
            .entry(room_id.clone())
            .or_insert_with(|| watch::channel(current.clone()).0);

        refresh(&sender, current);
        Snapshots::new(sender.subscribe())
    }

    fn watch_announcements(&self, room_id: &RoomId) -> Snapshots<Vec<AnnouncementData>> {
        let state = self.state.lock();
        let current = announcements_of(&state, room_id);

        let sender = self
            .announcement_watchers
            .entry(room_id.clone())
            .or_insert_with(|| watch::channel(current.clone()).0);

        refresh(&sender, current);
        Snapshots::new(sender.subscribe())
    }

    fn watch_user(&self, uid: &Uid) -> Snapshots<Option<UserData>> {
        let state = self.state.lock();
        let current = state.users.get(uid).cloned();

        let sender = self
            .user_watchers
            .entry(uid.clone())
            .or_insert_with(|| watch::channel(current.clone()).0);

        refresh(&sender, current);
        Snapshots::new(sender.subscribe())
    }
}
