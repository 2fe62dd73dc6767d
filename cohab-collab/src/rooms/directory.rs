use std::sync::Arc;

use cohab_store::{RoomData, Store};

use super::RoomError;
use crate::util::random_code;

pub const CODE_LENGTH: usize = 6;

/// How many candidate codes issuance tries before giving up. With a 32^6
/// code space a collision is already rare, so a handful is plenty.
const CODE_ATTEMPTS: usize = 5;

/// Maps invite codes to rooms and issues codes for new ones
pub struct Directory<S> {
    store: Arc<S>,
}

impl<S> Directory<S>
where
    S: Store,
{
    pub fn new(store: &Arc<S>) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Issues a code no existing room uses, re-querying per candidate
    pub async fn issue_code(&self) -> Result<String, RoomError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = random_code(CODE_LENGTH);

            if self.store.rooms_by_code(&code).await?.is_empty() {
                return Ok(code);
            }
        }

        Err(RoomError::CodeSpaceExhausted)
    }

    /// Case-insensitive lookup of a room by its invite code
    pub async fn find_room_by_code(&self, code: &str) -> Result<RoomData, RoomError> {
        let code = code.trim();

        if code.is_empty() {
            return Err(RoomError::EmptyCode);
        }

        self.store
            .rooms_by_code(&code.to_uppercase())
            .await?
            .into_iter()
            .next()
            .ok_or(RoomError::CodeNotFound)
    }
}
