pub mod progression;
pub mod server;
pub mod sweeper;
pub mod tournaments;
