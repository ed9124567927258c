// Library surface for the binary and headless/integration tests.
// main.rs only owns terminal setup and the event loop.
pub mod achievements;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod metrics;
pub mod notifications;
pub mod passages;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod ui;
pub mod util;
pub mod worker;

pub use app::App;
pub use session::{RaceState, Session};
