pub mod brackets;
pub mod connection;
pub mod ladders;
pub mod matches;
pub mod models;
pub mod setup;
pub mod tournaments;

pub use connection::{create_pool, get_connection, DbConn, DbPool};
pub use models::*;

#[cfg(test)]
pub(crate) mod testing {
    use r2d2_sqlite::SqliteConnectionManager;

    use super::{setup, DbPool};

    /// In-memory pool capped at one connection so every checkout sees the
    /// same database.
    pub fn memory_pool() -> DbPool {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("failed to build in-memory pool");

        let mut conn = pool.get().expect("failed to open in-memory connection");
        setup::reset_database(&mut conn).expect("failed to apply schema");
        pool
    }
}
