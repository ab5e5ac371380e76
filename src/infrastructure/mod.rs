// Infrastructure layer: gRPC server lifecycle

pub mod server;

pub use server::{serve_with_listener, start_server, ServerConfig};
