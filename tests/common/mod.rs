//! Integration test common infrastructure.
//!
//! Builds an in-memory server state and connects test clients whose
//! sessions are bounded channels the tests can inspect.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
