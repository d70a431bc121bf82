pub mod clock;
pub mod config;
pub mod constants;
pub mod expiration;
pub mod logging;
pub mod store;
pub mod sweep;
pub mod trashbin;
pub mod workers;
