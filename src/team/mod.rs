pub mod handlers;
pub mod service;
pub mod types;

pub use handlers::{get_team, promote_captain};
pub use service::TeamService;
pub use types::TeamView;
