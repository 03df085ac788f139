// proxy module - registry gateway service

pub mod auth;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod route_table;
pub mod server;
pub mod upstream;

pub use config::GatewayConfig;
pub use route_table::{RouteTable, UpstreamTarget};
pub use server::AxumServer;
pub use upstream::UpstreamClient;
