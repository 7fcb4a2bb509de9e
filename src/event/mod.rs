// Team notification plumbing: events, the broadcast bus and the notifier seam
// services publish through.

pub use bus::EventBus;
pub use events::TeamEvent;
pub use notifier::TeamNotifier;

mod bus;
mod events;
mod notifier;
