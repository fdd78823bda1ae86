use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::{
	command::Command,
	config::Config,
	connection::Connection,
	error::Result,
	monitor::Monitor,
	pool::Pool,
	pubsub::{PubSub, ShardedPubSub},
	resp::{Cmd, Reply},
};

/// Anything that can execute a single command and return its reply. Command wrappers are
/// written against this, so they run the same on a pooled [Client] as on an owned
/// [Connection] (or a fake, in tests).
#[async_trait]
pub trait Executor: Send {
	/// Execute one command. A server error reply is returned as
	/// [Error::Redis](crate::Error::Redis).
	async fn execute(&mut self, cmd: Cmd) -> Result<Reply>;
}

/// An [Executor] with a connection of its own, which nothing else can use while a command
/// blocks on it. Only owned [Connection]s are dedicated: blocking commands can never run on a
/// shared pooled checkout.
#[async_trait]
pub trait Dedicated: Executor {
	/// Execute a command which may block on the server for up to `block`. A zero `block`
	/// waits indefinitely.
	async fn execute_blocking(&mut self, cmd: Cmd, block: Duration) -> Result<Reply>;
}

#[async_trait]
impl Executor for Connection {
	async fn execute(&mut self, cmd: Cmd) -> Result<Reply> {
		self.cmd(&cmd).await
	}
}

#[async_trait]
impl Dedicated for Connection {
	async fn execute_blocking(&mut self, cmd: Cmd, block: Duration) -> Result<Reply> {
		let limit = if block.is_zero() {
			None
		} else {
			self.timeouts().read.map(|read| read + block)
		};

		self.cmd_timeout(&cmd, limit).await
	}
}

/// A Redis client: the entry point for executing commands over a [Pool].
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Client {
	pool: Pool,
}

impl Client {
	pub fn new(config: Config) -> Result<Self> {
		Ok(Self::from_pool(Pool::new(config)?))
	}

	pub fn from_pool(pool: Pool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &Pool {
		&self.pool
	}

	/// Execute one command on a pooled connection: exactly one round trip, never retried.
	///
	/// The connection goes back to the pool afterwards unless the transport failed. A server
	/// error reply fails the call with [Error::Redis](crate::Error::Redis) but keeps the
	/// connection.
	#[instrument(level = "trace", skip(self))]
	pub async fn execute_command(&self, cmd: &Cmd) -> Result<Reply> {
		let mut conn = self.pool.get().await?;

		if let Err(err) = conn.send_cmd(cmd).await {
			self.pool.put(conn, true).await;
			return Err(err);
		}

		match conn.read_reply().await {
			Ok(reply) => {
				self.pool.put(conn, false).await;
				Ok(reply.into_result()?)
			}
			Err(err) => {
				self.pool.put(conn, true).await;
				Err(err)
			}
		}
	}

	/// Send all commands on one pooled connection, then read their replies in order. Server
	/// error replies stay in place as [Reply::Error].
	#[instrument(level = "trace", skip(self), fields(count = cmds.len()))]
	pub async fn pipeline(&self, cmds: &[Cmd]) -> Result<Vec<Reply>> {
		let mut conn = self.pool.get().await?;
		let res = conn.pipeline(cmds).await;

		self.pool.put(conn, res.is_err()).await;
		res
	}

	/// Run a typed command wrapper on a pooled connection.
	pub async fn run<C>(&self, command: C) -> Result<C::Response>
	where
		C: Command,
	{
		command.run(&mut self.clone()).await
	}

	/// Check a connection out of the pool for good, for blocking commands. Its pool slot is
	/// freed immediately.
	pub async fn dedicated(&self) -> Result<Connection> {
		let conn = self.pool.get().await?;
		Ok(self.pool.detach(conn))
	}

	/// Open a Pub/Sub session on a dedicated connection.
	pub async fn pubsub(&self) -> Result<PubSub> {
		Ok(PubSub::new(self.dedicated().await?))
	}

	/// Open a Sharded Pub/Sub session on a dedicated connection.
	pub async fn sharded_pubsub(&self) -> Result<ShardedPubSub> {
		Ok(ShardedPubSub::new(self.dedicated().await?))
	}

	/// Put a dedicated connection into `MONITOR` mode.
	pub async fn monitor(&self) -> Result<Monitor> {
		Monitor::start(self.dedicated().await?).await
	}

	/// Close the pool. Sessions already opened keep their connections.
	pub fn close(&self) {
		self.pool.close();
	}
}

#[async_trait]
impl Executor for Client {
	async fn execute(&mut self, cmd: Cmd) -> Result<Reply> {
		self.execute_command(&cmd).await
	}
}
