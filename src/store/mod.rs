pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod repository;
pub mod unit_of_work;

pub use errors::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{ChallengeQuery, PlayerPatch, PlayerQuery};
pub use repository::Store;
pub use unit_of_work::{StoreCommand, UnitOfWork};
