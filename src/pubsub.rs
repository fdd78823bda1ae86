use std::{collections::HashSet, time::Duration};

use bytes::Bytes;
use tracing::{debug, instrument, trace};

use crate::{
	connection::Connection,
	error::{Error, Result},
	model::pubsub::{Kind, Response},
	resp::{self, from_reply, Cmd, IntoArg, Reply},
};

/// Where a subscription session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	/// Open with nothing subscribed.
	Idle,
	/// At least one subscription is acknowledged.
	Subscribed,
	/// Closed explicitly or after a connection-breaking error.
	Closed,
}

/// The connection and acknowledged subscriptions behind both kinds of pubsub session.
#[derive(Debug)]
struct Session {
	conn: Connection,
	channels: HashSet<Bytes>,
	patterns: HashSet<Bytes>,
	shards: HashSet<Bytes>,
}

impl Session {
	fn new(conn: Connection) -> Self {
		Self {
			conn,
			channels: HashSet::new(),
			patterns: HashSet::new(),
			shards: HashSet::new(),
		}
	}

	fn state(&self) -> SessionState {
		if !self.conn.is_open() {
			SessionState::Closed
		} else if self.channels.is_empty() && self.patterns.is_empty() && self.shards.is_empty()
		{
			SessionState::Idle
		} else {
			SessionState::Subscribed
		}
	}

	fn set(&mut self, kind: Kind) -> &mut HashSet<Bytes> {
		match kind {
			Kind::Channel => &mut self.channels,
			Kind::Pattern => &mut self.patterns,
			Kind::Shard => &mut self.shards,
		}
	}

	async fn send<I>(&mut self, name: &str, args: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.conn.send_cmd(&Cmd::new(name).args(args)).await
	}

	/// Like [Self::send], but a subscribe with nothing to subscribe to is skipped rather than
	/// sent, since the server would reject it.
	async fn subscribe<I>(&mut self, name: &str, args: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		let cmd = Cmd::new(name).args(args);
		if cmd.arguments().is_empty() {
			return Ok(());
		}

		self.conn.send_cmd(&cmd).await
	}

	async fn receive(&mut self, limit: Option<Duration>) -> Result<Response> {
		let reply = self.conn.read_reply_timeout(limit).await?;

		let res = match reply {
			Reply::Error(msg) => return Err(Error::Redis(msg)),
			// PING outside of subscribed mode gets a regular reply
			Reply::Status(status) if status.eq_ignore_ascii_case("pong") => {
				Response::Pong(Bytes::new())
			}
			Reply::Bulk(Some(data)) => Response::Pong(data),
			reply => match from_reply::<Response>(reply) {
				Ok(res) => res,
				Err(err) => {
					let err = Error::Protocol(resp::Error::Protocol(format!(
						"unexpected pubsub reply: {}",
						err
					)));
					self.conn.mark_broken(&err);
					return Err(err);
				}
			},
		};

		self.apply(&res);
		Ok(res)
	}

	fn apply(&mut self, res: &Response) {
		match res {
			Response::Subscribe(sub) => {
				if let Some(name) = &sub.name {
					trace!(kind = ?sub.kind, name = ?name, count = sub.count, "subscribed");
					self.set(sub.kind).insert(name.clone());
				}
			}
			Response::Unsubscribe(sub) => {
				if let Some(name) = &sub.name {
					trace!(kind = ?sub.kind, name = ?name, count = sub.count, "unsubscribed");
					self.set(sub.kind).remove(name);
				}

				// the server's count is authoritative
				if sub.count == 0 {
					match sub.kind {
						Kind::Shard => self.shards.clear(),
						Kind::Channel | Kind::Pattern => {
							self.channels.clear();
							self.patterns.clear();
						}
					}
				}
			}
			Response::Message(_) | Response::Pong(_) => {}
		}
	}

	async fn close(&mut self) {
		self.channels.clear();
		self.patterns.clear();
		self.shards.clear();
		self.conn.close().await;
	}
}

/// A Pub/Sub session holding a dedicated connection for its whole lifetime.
///
/// Subscribe and unsubscribe only send their commands. Each is acknowledged by a later
/// [Self::receive], in order and possibly interleaved with messages, and [Self::channels] and
/// [Self::patterns] change only when those acknowledgments arrive. The connection is never
/// returned to a pool.
///
/// ```no_run
/// # async fn run(client: redline::Client) -> redline::Result<()> {
/// use redline::model::pubsub::Response;
///
/// let mut pubsub = client.pubsub().await?;
/// pubsub.subscribe(["news"]).await?;
///
/// loop {
/// 	if let Response::Message(msg) = pubsub.receive().await? {
/// 		println!("{:?}", msg.data);
/// 	}
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct PubSub {
	session: Session,
}

impl PubSub {
	pub fn new(conn: Connection) -> Self {
		debug!(id = conn.id(), "opened pubsub session");
		Self {
			session: Session::new(conn),
		}
	}

	pub fn state(&self) -> SessionState {
		self.session.state()
	}

	/// Channels with an acknowledged subscription.
	pub fn channels(&self) -> &HashSet<Bytes> {
		&self.session.channels
	}

	/// Patterns with an acknowledged subscription.
	pub fn patterns(&self) -> &HashSet<Bytes> {
		&self.session.patterns
	}

	#[instrument(level = "debug", skip_all)]
	pub async fn subscribe<I>(&mut self, channels: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.session.subscribe("SUBSCRIBE", channels).await
	}

	#[instrument(level = "debug", skip_all)]
	pub async fn psubscribe<I>(&mut self, patterns: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.session.subscribe("PSUBSCRIBE", patterns).await
	}

	/// Unsubscribe from `channels`, or from every channel if it is empty.
	#[instrument(level = "debug", skip_all)]
	pub async fn unsubscribe<I>(&mut self, channels: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.session.send("UNSUBSCRIBE", channels).await
	}

	/// Unsubscribe from `patterns`, or from every pattern if it is empty.
	#[instrument(level = "debug", skip_all)]
	pub async fn punsubscribe<I>(&mut self, patterns: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.session.send("PUNSUBSCRIBE", patterns).await
	}

	/// Send a `PING`, answered by a [Response::Pong] from [Self::receive].
	pub async fn ping(&mut self, message: Option<&[u8]>) -> Result<()> {
		self.session.send("PING", message).await
	}

	/// Wait for the next acknowledgment, message or pong.
	///
	/// Waits indefinitely: messages may be arbitrarily far apart. Any error other than
	/// [Error::Redis] leaves the session [SessionState::Closed].
	pub async fn receive(&mut self) -> Result<Response> {
		self.session.receive(None).await
	}

	/// Like [Self::receive], but timing out breaks the session like any other read timeout.
	pub async fn receive_timeout(&mut self, limit: Duration) -> Result<Response> {
		self.session.receive(Some(limit)).await
	}

	/// Release the connection. It is never reused.
	pub async fn close(&mut self) {
		debug!(id = self.session.conn.id(), "closing pubsub session");
		self.session.close().await;
	}
}

/// A Sharded Pub/Sub session (`SSUBSCRIBE`), otherwise behaving like [PubSub].
#[derive(Debug)]
pub struct ShardedPubSub {
	session: Session,
}

impl ShardedPubSub {
	pub fn new(conn: Connection) -> Self {
		debug!(id = conn.id(), "opened sharded pubsub session");
		Self {
			session: Session::new(conn),
		}
	}

	pub fn state(&self) -> SessionState {
		self.session.state()
	}

	/// Shard channels with an acknowledged subscription.
	pub fn channels(&self) -> &HashSet<Bytes> {
		&self.session.shards
	}

	#[instrument(level = "debug", skip_all)]
	pub async fn ssubscribe<I>(&mut self, channels: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.session.subscribe("SSUBSCRIBE", channels).await
	}

	/// Unsubscribe from `channels`, or from every shard channel if it is empty.
	#[instrument(level = "debug", skip_all)]
	pub async fn sunsubscribe<I>(&mut self, channels: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.session.send("SUNSUBSCRIBE", channels).await
	}

	pub async fn receive(&mut self) -> Result<Response> {
		self.session.receive(None).await
	}

	pub async fn receive_timeout(&mut self, limit: Duration) -> Result<Response> {
		self.session.receive(Some(limit)).await
	}

	pub async fn close(&mut self) {
		debug!(id = self.session.conn.id(), "closing sharded pubsub session");
		self.session.close().await;
	}
}
