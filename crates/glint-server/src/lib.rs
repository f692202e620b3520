pub mod auth;
pub mod config;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod game;
pub mod handlers;
pub mod proxy;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use server::Server;
