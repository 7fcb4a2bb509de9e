pub mod handlers;
pub mod service;
pub mod types;

pub use handlers::{enlist, enroll, generate_invitation, unenroll};
pub use service::PlayerService;
pub use types::PlayerView;
