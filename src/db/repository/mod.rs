pub mod memory;
pub mod reservation;
pub mod room;
pub mod traits;
pub mod user;

pub use memory::{InMemoryReservationStore, InMemoryRoomStore, InMemoryUserStore};
pub use reservation::SqliteReservationRepository;
pub use room::SqliteRoomRepository;
pub use traits::{ReservationStore, RoomStore, UserStore};
pub use user::SqliteUserRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::SqlitePool;

    /// Migrated in-memory database. One connection that never recycles, since
    /// every `:memory:` connection is a separate database.
    pub async fn sqlite_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }
}
