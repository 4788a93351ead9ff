pub mod audio;
pub mod config;
pub mod daemon;
pub mod dispatcher;
pub mod monitor;
pub mod presence;
pub mod speech;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::MonitorConfig;
pub use daemon::Daemon;
pub use dispatcher::Dispatcher;
pub use presence::PresenceManager;
pub use tracker::{FocusState, FocusTracker, Intent, PresenceStatus};
