use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for store-assigned document ids.
pub type DocumentId = String;
pub type RoomId = DocumentId;
/// A stable user id issued by the identity provider.
pub type Uid = String;

/// An identity snapshot taken at the time of an action. Records created from
/// it freeze the name and email as of that moment and are never re-resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub uid: Uid,
    pub name: String,
    pub email: String,
}

/// A shared living-group with a single admin and a unique invite code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub id: RoomId,
    pub name: String,
    /// Six uppercase characters drawn from an alphabet without ambiguous symbols
    pub code: String,
    /// The sole administrator, set at creation and never reassigned
    pub admin_uid: Uid,
}

/// A user's association with a room, keyed by `(room_id, uid)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberData {
    pub uid: Uid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A pending, admin-reviewable request to join a room, keyed by
/// `(room_id, uid)`. At most one exists per user per room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestData {
    pub uid: Uid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user's own record: which rooms they belong to and which one their
/// session is currently focused on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub uid: Uid,
    pub email: String,
    pub name: String,
    pub room_ids: Vec<RoomId>,
    pub current_room_id: Option<RoomId>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// A message posted to a room's announcement feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementData {
    pub id: DocumentId,
    pub text: String,
    pub created_by_uid: Uid,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn test_room_wire_shape() {
        let room = RoomData {
            id: "r1".to_string(),
            name: "Hostel 3".to_string(),
            code: "K7M2QZ".to_string(),
            admin_uid: "alice".to_string(),
        };

        assert_eq!(
            to_value(&room).unwrap(),
            json!({
                "id": "r1",
                "name": "Hostel 3",
                "code": "K7M2QZ",
                "adminUid": "alice",
            })
        );
    }

    #[test]
    fn test_role_wire_shape() {
        assert_eq!(to_value(Role::Admin).unwrap(), json!("admin"));
        assert_eq!(to_value(Role::Member).unwrap(), json!("member"));
    }

    #[test]
    fn test_user_wire_shape() {
        let user = UserData {
            uid: "bob".to_string(),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            room_ids: vec!["r1".to_string()],
            current_room_id: Some("r1".to_string()),
            photo_url: None,
        };

        let value = to_value(&user).unwrap();
        assert_eq!(value["roomIds"], json!(["r1"]));
        assert_eq!(value["currentRoomId"], json!("r1"));
        // photoURL only appears once set
        assert!(value.get("photoURL").is_none());

        let with_photo = UserData {
            photo_url: Some("https://example.com/p.png".to_string()),
            ..user
        };
        assert_eq!(
            to_value(&with_photo).unwrap()["photoURL"],
            json!("https://example.com/p.png")
        );
    }
}
