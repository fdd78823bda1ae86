use async_trait::async_trait;

use crate::{
	client::{Dedicated, Executor},
	error::{Error, Result},
	resp::{Cmd, Reply},
};

/// [Connection](https://redis.io/commands/?group=connection) commands.
pub mod connection;
/// [List](https://redis.io/commands/?group=list) commands.
pub mod list;
/// [PubSub](https://redis.io/commands/?group=pubsub) commands.
pub mod pubsub;
/// [String](https://redis.io/commands/?group=string) and
/// [generic](https://redis.io/commands/?group=generic) key commands.
pub mod string;

pub use self::{
	connection::{Auth, ClientSetName, Echo, Ping, Select},
	list::{BLPop, RPush},
	pubsub::{Publish, SPublish},
	string::{Del, Get, Set},
};

/// Types that can be executed on the Redis server as a command.
#[async_trait]
pub trait Command: Send {
	/// The expected response type of this command.
	type Response;

	/// Run the command using the given executor.
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized;
}

/// Commands which block on the server, and so need a [Dedicated] connection.
#[async_trait]
pub trait BlockingCommand: Send {
	type Response;

	async fn run<D>(self, connection: &mut D) -> Result<Self::Response>
	where
		D: Dedicated + ?Sized;
}

#[async_trait]
impl Command for Cmd {
	type Response = Reply;

	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		executor.execute(self).await
	}
}

/// Expect a `+OK` reply.
pub(crate) fn ok(reply: Reply) -> Result<()> {
	if reply.is_ok() {
		Ok(())
	} else {
		Err(Error::UnexpectedReply(reply))
	}
}
