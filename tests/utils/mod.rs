pub mod actions;
pub mod builders;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use builders::{game_start, now, spec, ChallengeBuilder, GameBuilder, PlayerBuilder};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
