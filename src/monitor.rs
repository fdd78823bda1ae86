use std::time::Duration;

use tracing::debug;

use crate::{
	connection::Connection,
	error::{Error, Result},
	model::monitor::MonitorEvent,
	resp::{self, Cmd, Reply},
};

/// A connection in `MONITOR` mode, streaming every command the server executes.
#[derive(Debug)]
pub struct Monitor {
	conn: Connection,
}

impl Monitor {
	/// Send `MONITOR` on `conn` and wait for the server to accept it.
	pub async fn start(mut conn: Connection) -> Result<Self> {
		let reply = match conn.cmd(&Cmd::new("MONITOR")).await {
			Ok(reply) => reply,
			Err(err) => {
				conn.close().await;
				return Err(err);
			}
		};

		if !reply.is_ok() {
			conn.close().await;
			return Err(Error::UnexpectedReply(reply));
		}

		debug!(id = conn.id(), "monitoring");
		Ok(Self { conn })
	}

	pub fn is_open(&self) -> bool {
		self.conn.is_open()
	}

	/// Wait indefinitely for the next event.
	pub async fn receive(&mut self) -> Result<MonitorEvent> {
		self.read(None).await
	}

	/// Wait at most `limit` for the next event. Timing out closes the monitor.
	pub async fn receive_timeout(&mut self, limit: Duration) -> Result<MonitorEvent> {
		self.read(Some(limit)).await
	}

	async fn read(&mut self, limit: Option<Duration>) -> Result<MonitorEvent> {
		let err = match self.conn.read_reply_timeout(limit).await? {
			Reply::Status(line) => match MonitorEvent::parse(&line) {
				Some(event) => return Ok(event),
				None => format!("malformed monitor line {:?}", line),
			},
			Reply::Error(msg) => return Err(Error::Redis(msg)),
			other => format!("unexpected monitor reply {:?}", other),
		};

		let err = Error::Protocol(resp::Error::Protocol(err));
		self.conn.mark_broken(&err);
		Err(err)
	}

	/// Release the connection. It is never reused.
	pub async fn close(&mut self) {
		debug!(id = self.conn.id(), "closing monitor");
		self.conn.close().await;
	}
}
