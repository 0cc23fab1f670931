use std::collections::HashMap;

use crate::db::models::Reservation;
use crate::error::AppResult;
use crate::AppState;

/// Room and user display names for a batch of reservations. Ids that no
/// longer resolve are simply absent.
#[derive(Debug, Default)]
pub struct NameDirectory {
    rooms: HashMap<String, String>,
    users: HashMap<String, String>,
}

impl NameDirectory {
    pub async fn load(state: &AppState, reservations: &[Reservation]) -> AppResult<Self> {
        let mut directory = NameDirectory::default();

        for r in reservations {
            if !directory.rooms.contains_key(&r.room_id) {
                if let Some(room) = state.rooms.fetch_by_id(&r.room_id).await? {
                    directory.rooms.insert(room.id, room.name);
                }
            }
            if !directory.users.contains_key(&r.user_id) {
                if let Some(user) = state.users.fetch_by_id(&r.user_id).await? {
                    directory.users.insert(user.id, user.name);
                }
            }
        }

        Ok(directory)
    }

    pub fn room_name(&self, room_id: &str) -> Option<&str> {
        self.rooms.get(room_id).map(String::as_str)
    }

    pub fn user_name(&self, user_id: &str) -> Option<&str> {
        self.users.get(user_id).map(String::as_str)
    }
}
