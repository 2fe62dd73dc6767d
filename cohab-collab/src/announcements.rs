use std::sync::Arc;

use thiserror::Error;

use cohab_store::{
    AnnouncementData, NewAnnouncement, RoomId, Snapshots, Store, StoreError, UserProfile,
};

/// A room's announcement feed. Posts carry a frozen author snapshot and a
/// store-assigned timestamp; the feed is delivered newest first.
pub struct Announcements<S> {
    store: Arc<S>,
}

#[derive(Debug, Error)]
pub enum AnnouncementError {
    #[error("Announcement text cannot be empty")]
    EmptyText,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> Announcements<S>
where
    S: Store,
{
    pub fn new(store: &Arc<S>) -> Self {
        Self {
            store: store.clone(),
        }
    }

    pub async fn post(
        &self,
        room_id: &RoomId,
        text: &str,
        author: &UserProfile,
    ) -> Result<AnnouncementData, AnnouncementError> {
        let text = text.trim();

        if text.is_empty() {
            return Err(AnnouncementError::EmptyText);
        }

        let announcement = self
            .store
            .create_announcement(
                room_id,
                NewAnnouncement {
                    text: text.to_string(),
                    created_by_uid: author.uid.clone(),
                    created_by_name: author.name.clone(),
                },
            )
            .await?;

        Ok(announcement)
    }

    pub async fn list(&self, room_id: &RoomId) -> Result<Vec<AnnouncementData>, AnnouncementError> {
        let announcements = self.store.list_announcements(room_id).await?;

        Ok(announcements)
    }

    pub fn watch(&self, room_id: &RoomId) -> Snapshots<Vec<AnnouncementData>> {
        self.store.watch_announcements(room_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cohab_store::{MemoryStore, NewRoom, RoomData};

    fn alice() -> UserProfile {
        UserProfile {
            uid: "alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    async fn feed_with_room() -> (Announcements<MemoryStore>, RoomData) {
        let store = Arc::new(MemoryStore::new());

        let room = store
            .create_room(NewRoom {
                name: "Hostel 3".to_string(),
                code: "K7M2QZ".to_string(),
                admin: alice(),
            })
            .await
            .unwrap();

        (Announcements::new(&store), room)
    }

    #[tokio::test]
    async fn test_post_snapshots_author() {
        let (feed, room) = feed_with_room().await;

        let announcement = feed
            .post(&room.id, "  Rent is due Friday  ", &alice())
            .await
            .unwrap();

        assert_eq!(announcement.text, "Rent is due Friday");
        assert_eq!(announcement.created_by_uid, "alice");
        assert_eq!(announcement.created_by_name, "Alice");
    }

    #[tokio::test]
    async fn test_post_rejects_empty_text() {
        let (feed, room) = feed_with_room().await;

        let result = feed.post(&room.id, "   ", &alice()).await;
        assert!(matches!(result, Err(AnnouncementError::EmptyText)));
    }

    #[tokio::test]
    async fn test_feed_is_newest_first() {
        let (feed, room) = feed_with_room().await;

        feed.post(&room.id, "first", &alice()).await.unwrap();
        feed.post(&room.id, "second", &alice()).await.unwrap();

        let list = feed.list(&room.id).await.unwrap();
        assert_eq!(list[0].text, "second");
        assert_eq!(list[1].text, "first");
    }

    #[tokio::test]
    async fn test_watch_pushes_full_feed() {
        let (feed, room) = feed_with_room().await;

        let mut announcements = feed.watch(&room.id);
        assert!(announcements.current().is_empty());

        feed.post(&room.id, "hello", &alice()).await.unwrap();

        let list = announcements.next().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].text, "hello");
    }
}
