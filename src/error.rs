use thiserror::Error;

use crate::resp::{self, Reply};

#[derive(Debug, Error)]
pub enum Error {
	/// A read or write failed on an established connection.
	#[error("IO error: {0}")]
	Io(#[from] ::std::io::Error),
	/// The connection could not be established.
	#[error("failed to connect to {addr}: {source}")]
	Dial {
		addr: String,
		#[source]
		source: ::std::io::Error,
	},
	/// A dial, read or write did not finish in time.
	#[error("{0} timed out")]
	Timeout(&'static str),
	/// The server sent bytes which are not valid RESP.
	#[error("Protocol error: {0}")]
	Protocol(resp::Error),
	/// The server replied with an error. The connection is still usable.
	#[error("{0}")]
	Redis(String),
	/// The reply was null where a value was expected.
	#[error("nil reply")]
	Nil,
	/// A well-formed reply could not be converted to the requested type.
	#[error("Decode error: {0}")]
	Decode(resp::Error),
	/// No connection became available within the pool's wait timeout.
	#[error("connection pool exhausted")]
	PoolExhausted,
	#[error("connection pool closed")]
	PoolClosed,
	/// The connection was closed or broken by an earlier failure.
	#[error("connection closed")]
	Closed,
	#[error("Invalid configuration: {0}")]
	Config(String),
	/// The server sent a reply that makes no sense for the command.
	#[error("unexpected reply: {0:?}")]
	UnexpectedReply(Reply),
}

impl Error {
	/// Whether this error leaves the connection unusable. Such connections are never returned
	/// to the pool.
	pub fn is_connection_breaking(&self) -> bool {
		matches!(
			self,
			Self::Io(_) | Self::Dial { .. } | Self::Timeout(_) | Self::Protocol(_) | Self::Closed
		)
	}

	/// Whether the command itself failed on the server (e.g. `WRONGTYPE`).
	pub fn is_server_error(&self) -> bool {
		matches!(self, Self::Redis(_))
	}

	/// Classify an error from the wire codec: I/O stays I/O, anything else is a protocol error.
	pub(crate) fn from_codec(err: resp::Error) -> Self {
		match err {
			resp::Error::Io(err) => Self::Io(err),
			other => Self::Protocol(other),
		}
	}
}

/// Errors from reply conversion. A server error reply stays [Error::Redis].
impl From<resp::Error> for Error {
	fn from(err: resp::Error) -> Self {
		match err {
			resp::Error::Redis(msg) => Self::Redis(msg),
			resp::Error::Nil => Self::Nil,
			other => Self::Decode(other),
		}
	}
}

pub type Result<T, E = Error> = ::std::result::Result<T, E>;
