use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = Arc<SyncMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Per-room async mutexes serializing the fetch -> validate -> write sequence
/// of reservation writes. Entries live only while some writer holds or awaits
/// them.
#[derive(Default)]
pub struct RoomLocks {
    rooms: LockTable,
}

/// Guards held for the duration of a write. Dropping releases every room.
pub struct RoomGuards {
    guards: Vec<OwnedMutexGuard<()>>,
    room_ids: Vec<String>,
    rooms: LockTable,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, room_id: &str) -> Arc<Mutex<()>> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.entry(room_id.to_string()).or_default().clone()
    }

    /// Lock every listed room. Ids are deduplicated and taken in sorted order
    /// so two writers touching the same pair of rooms cannot deadlock.
    pub async fn acquire(&self, room_ids: &[&str]) -> RoomGuards {
        let mut ids: Vec<&str> = room_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = RoomGuards {
            guards: Vec::with_capacity(ids.len()),
            room_ids: ids.iter().map(|id| id.to_string()).collect(),
            rooms: self.rooms.clone(),
        };
        for id in ids {
            let handle = self.handle(id);
            guards.guards.push(handle.lock_owned().await);
        }
        guards
    }

    /// Number of rooms currently locked or awaited.
    pub fn tracked_rooms(&self) -> usize {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for RoomGuards {
    fn drop(&mut self) {
        self.guards.clear();

        // An entry only referenced by the table has no holder and no waiter.
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.room_ids {
            if rooms.get(id).map_or(false, |lock| Arc::strong_count(lock) == 1) {
                rooms.remove(id);
            }
        }
    }
}
