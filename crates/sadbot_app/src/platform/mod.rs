mod app;
mod config;
mod logging;
mod store;
mod transport;

pub use app::run_app;
pub use config::DEFAULT_CONFIG_PATH;
