pub mod directory;
pub mod identity;
pub mod notify;

pub use directory::{DirectoryClient, ParticipantProfile};
pub use identity::IdentityClient;
pub use notify::{NotificationEvent, Notifier};
