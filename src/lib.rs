//! An async Redis client built on tokio.
//!
//! Commands run through a [Client], which checks a [Connection] out of its [Pool] for each
//! round trip. Blocking commands and the long-lived [PubSub], [ShardedPubSub] and [Monitor]
//! sessions take a connection out of the pool for good.
//!
//! ```no_run
//! # async fn run() -> redline::Result<()> {
//! use redline::{command::{Get, Set}, Client};
//!
//! let client = Client::new("redis://localhost:6379/0".parse()?)?;
//! client.run(Set::new("key", "value")).await?;
//! assert_eq!(client.run(Get::new("key")).await?.as_deref(), Some(&b"value"[..]));
//! # Ok(())
//! # }
//! ```

/// The command execution facade.
pub mod client;
/// Typed command wrappers.
pub mod command;
/// Connection and pool settings.
pub mod config;
/// Items for connecting to Redis.
pub mod connection;
mod error;
/// Redis models.
pub mod model;
pub mod monitor;
/// Items for pooling Redis connections with Deadpool.
pub mod pool;
/// Pub/Sub sessions.
pub mod pubsub;
mod stream;

pub use client::{Client, Dedicated, Executor};
pub use config::{Address, Config, Timeouts};
pub use connection::{Connection, ConnectionState};
pub use error::{Error, Result};
pub use monitor::Monitor;
pub use pool::Pool;
pub use pubsub::{PubSub, SessionState, ShardedPubSub};
pub use redline_resp as resp;
