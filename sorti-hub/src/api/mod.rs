//! HTTP API for the hub service

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{run, AppContext};
