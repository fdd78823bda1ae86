//! RESP (REdis Serialization Protocol) for the redline client: the [`Reply`] model, the outgoing
//! [`Cmd`] builder and a streaming parser.

pub use cmd::{Cmd, IntoArg};
pub use error::{DataType, Error, Result};
pub use nom;
pub use reply::{de::from_reply, Reply};

/// Outgoing commands.
mod cmd;
/// Tokio codec for RESP.
#[cfg(feature = "codec")]
pub mod codec;
/// RESP errors.
mod error;
/// RESP parsing.
pub mod parser;
/// Parsed replies.
mod reply;
