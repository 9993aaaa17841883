pub mod client;
pub mod dispatch;
pub mod netinfo;
pub mod server;

pub use client::{ClientId, ClientRegistry};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
