use std::{
	future::Future,
	io,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};

use futures::{SinkExt, StreamExt};
use tokio::{io::AsyncWriteExt, time::timeout};
use tokio_util::codec::{Decoder, Framed};
use tracing::{debug, instrument, trace, warn};

use crate::{
	config::{Address, Timeouts},
	error::{Error, Result},
	resp::{codec::Codec, Cmd, Reply},
	stream::Stream,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Liveness of a [Connection].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Open,
	/// An I/O, timeout or protocol error left the stream at an unknown position.
	Broken,
	Closed,
}

/// A connection to a Redis server.
///
/// Commands and replies are strictly FIFO. [Self::send_cmd] and [Self::read_reply] are
/// independent so that callers can pipeline, or read the unsolicited pushes of pubsub and
/// `MONITOR`. Any I/O error, timeout or malformed reply marks the connection
/// [ConnectionState::Broken], after which every operation fails with [Error::Closed]. A
/// connection never reconnects by itself.
#[derive(Debug)]
pub struct Connection {
	id: u64,
	framed: Framed<Stream, Codec>,
	addr: Address,
	timeouts: Timeouts,
	state: ConnectionState,
	pending: usize,
}

async fn deadline<F, T>(limit: Option<Duration>, op: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match limit {
		Some(limit) => timeout(limit, fut).await.map_err(|_| Error::Timeout(op))?,
		None => fut.await,
	}
}

impl Connection {
	/// Connect to the Redis server at `addr` using default timeouts.
	pub async fn new(addr: impl Into<Address>) -> Result<Self> {
		Self::dial(&addr.into(), Timeouts::default()).await
	}

	/// Connect to the Redis server at `addr`. Never retries.
	#[instrument(level = "debug", skip_all, fields(addr = %addr))]
	pub async fn dial(addr: &Address, timeouts: Timeouts) -> Result<Self> {
		let connect = async {
			Stream::connect(addr).await.map_err(|source| Error::Dial {
				addr: addr.to_string(),
				source,
			})
		};
		let stream = deadline(timeouts.dial, "dial", connect).await?;

		let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
		debug!(id, "connected");

		Ok(Self {
			id,
			framed: Codec.framed(stream),
			addr: addr.clone(),
			timeouts,
			state: ConnectionState::Open,
			pending: 0,
		})
	}

	/// A process-unique identifier for this connection.
	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn addr(&self) -> &Address {
		&self.addr
	}

	pub fn timeouts(&self) -> Timeouts {
		self.timeouts
	}

	/// Replies owed by the server for commands already sent. A command abandoned half-way
	/// (e.g. a dropped future) leaves this non-zero, and the connection is then unfit for
	/// reuse.
	pub fn pending(&self) -> usize {
		self.pending
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	pub fn is_broken(&self) -> bool {
		self.state == ConnectionState::Broken
	}

	/// Whether the connection can still be used.
	pub fn is_open(&self) -> bool {
		self.state == ConnectionState::Open
	}

	fn ensure_open(&self) -> Result<()> {
		if self.is_open() {
			Ok(())
		} else {
			Err(Error::Closed)
		}
	}

	fn track<T>(&mut self, res: Result<T>) -> Result<T> {
		if let Err(err) = &res {
			if err.is_connection_breaking() {
				self.mark_broken(err);
			}
		}

		res
	}

	pub(crate) fn mark_broken(&mut self, err: &Error) {
		if self.state == ConnectionState::Open {
			warn!(id = self.id, error = %err, "connection broken");
			self.state = ConnectionState::Broken;
		}
	}

	/// Send a command without waiting for a response.
	pub async fn send_cmd(&mut self, cmd: &Cmd) -> Result<()> {
		self.ensure_open()?;
		trace!(id = self.id, ?cmd, "send");
		self.pending += 1;

		let framed = &mut self.framed;
		let write = async { framed.send(cmd).await.map_err(Error::from_codec) };
		let res = deadline(self.timeouts.write, "write", write).await;
		self.track(res)
	}

	/// Send several commands in one write without waiting for responses.
	pub async fn send_all(&mut self, cmds: &[Cmd]) -> Result<()> {
		self.ensure_open()?;
		trace!(id = self.id, count = cmds.len(), "send all");
		self.pending += cmds.len();

		let framed = &mut self.framed;
		let write = async {
			for cmd in cmds {
				framed.feed(cmd).await.map_err(Error::from_codec)?;
			}

			SinkExt::<&Cmd>::flush(framed).await.map_err(Error::from_codec)
		};
		let res = deadline(self.timeouts.write, "write", write).await;
		self.track(res)
	}

	/// Read the next reply using the configured read timeout. Error replies are returned as
	/// [Reply::Error], not as `Err`.
	pub async fn read_reply(&mut self) -> Result<Reply> {
		self.read_reply_timeout(self.timeouts.read).await
	}

	/// Read the next reply, waiting at most `limit` (or indefinitely for `None`).
	pub async fn read_reply_timeout(&mut self, limit: Option<Duration>) -> Result<Reply> {
		self.ensure_open()?;

		let framed = &mut self.framed;
		let read = async {
			match framed.next().await {
				Some(res) => res.map_err(Error::from_codec),
				None => Err(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					"connection closed by server",
				)
				.into()),
			}
		};
		let res = deadline(limit, "read", read).await;
		let reply = self.track(res)?;
		self.pending = self.pending.saturating_sub(1);

		trace!(id = self.id, ?reply, "receive");
		Ok(reply)
	}

	/// Send a command to the server, awaiting a single response. An error reply becomes
	/// [Error::Redis] and leaves the connection open.
	pub async fn cmd(&mut self, cmd: &Cmd) -> Result<Reply> {
		self.send_cmd(cmd).await?;
		Ok(self.read_reply().await?.into_result()?)
	}

	/// Like [Self::cmd], overriding the read timeout for this one reply. Used for commands
	/// which block on the server.
	pub async fn cmd_timeout(&mut self, cmd: &Cmd, limit: Option<Duration>) -> Result<Reply> {
		self.send_cmd(cmd).await?;
		Ok(self.read_reply_timeout(limit).await?.into_result()?)
	}

	/// Send all commands, then read one reply per command in order. Error replies are kept
	/// in place as [Reply::Error] since each belongs to its own command.
	pub async fn pipeline(&mut self, cmds: &[Cmd]) -> Result<Vec<Reply>> {
		self.send_all(cmds).await?;

		let mut replies = Vec::with_capacity(cmds.len());
		for _ in cmds {
			replies.push(self.read_reply().await?);
		}

		Ok(replies)
	}

	/// Release the socket. Calling this more than once is a no-op.
	pub async fn close(&mut self) {
		if self.state == ConnectionState::Closed {
			return;
		}

		debug!(id = self.id, "closing connection");
		self.state = ConnectionState::Closed;
		// the peer may already be gone
		let _ = self.framed.get_mut().shutdown().await;
	}
}
