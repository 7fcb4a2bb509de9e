pub mod handlers;
pub mod service;
pub mod types;

pub use handlers::{reset_team_session, start_session};
pub use service::SessionService;
