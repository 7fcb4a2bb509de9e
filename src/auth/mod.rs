pub mod middleware;
pub mod token;
pub mod types;

pub use middleware::jwt_auth;
pub use token::TokenConfig;
pub use types::{Actor, ActorClaims};
