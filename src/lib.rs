//! Breeze Bridge — ICICI Direct Breeze API exposed as HTTP tools.
//!
//! The server side maps tool names onto Breeze calls and caches live ticks;
//! the client side lets a local language model discover and call those tools.

pub mod agent;
pub mod breeze;
pub mod config;
pub mod remote;
pub mod server;
pub mod state;
pub mod tools;
pub mod types;
