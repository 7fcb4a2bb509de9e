pub mod handlers;
pub mod ranking;
pub mod service;
pub mod types;

pub use handlers::{re_rank, session_forecast, standings};
pub use service::GameService;
