pub mod error;
pub mod messages;
pub mod state;
pub mod users;
