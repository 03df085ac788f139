// Upstream module - outbound HTTP to registries and their token services

pub mod client;

pub use client::UpstreamClient;
