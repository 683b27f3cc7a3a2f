pub mod config;
pub mod db;
pub mod engine;
pub mod messages;
pub mod store;
pub mod transport;

pub use engine::Engine;
