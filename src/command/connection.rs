use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use crate::{
	client::Executor,
	resp::{Cmd, IntoArg},
	Result,
};

use super::{ok, Command};

/// A [`PING`](https://redis.io/commands/ping/) command, optionally echoing a message.
#[derive(Debug, Clone, Default)]
pub struct Ping(pub Option<Bytes>);

impl Ping {
	pub fn with_message(message: impl IntoArg) -> Self {
		Self(Some(message.into_arg()))
	}
}

#[async_trait]
impl Command for Ping {
	type Response = Bytes;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		let mut cmd = Cmd::new("PING");
		if let Some(message) = self.0 {
			cmd.push_arg(message);
		}

		Ok(executor.execute(cmd).await?.into_bytes()?)
	}
}

/// An [`ECHO`](https://redis.io/commands/echo/) command.
#[derive(Debug, Clone)]
pub struct Echo(pub Bytes);

impl Echo {
	pub fn new(message: impl IntoArg) -> Self {
		Self(message.into_arg())
	}
}

#[async_trait]
impl Command for Echo {
	type Response = Bytes;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		Ok(executor
			.execute(Cmd::new("ECHO").arg(self.0))
			.await?
			.into_bytes()?)
	}
}

/// An [`AUTH`](https://redis.io/commands/auth/) command. Without a username this authenticates
/// as the default user.
#[derive(Clone)]
pub struct Auth {
	pub username: Option<String>,
	pub password: String,
}

impl std::fmt::Debug for Auth {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Auth")
			.field("username", &self.username)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl Command for Auth {
	type Response = ();

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		let cmd = match self.username {
			Some(username) => Cmd::new("AUTH").arg(username).arg(self.password),
			None => Cmd::new("AUTH").arg(self.password),
		};

		ok(executor.execute(cmd).await?)
	}
}

/// A [`SELECT`](https://redis.io/commands/select/) command.
#[derive(Debug, Clone, Copy)]
pub struct Select(pub i64);

#[async_trait]
impl Command for Select {
	type Response = ();

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		ok(executor.execute(Cmd::new("SELECT").arg(self.0)).await?)
	}
}

/// A [`CLIENT SETNAME`](https://redis.io/commands/client-setname/) command.
#[derive(Debug, Clone)]
pub struct ClientSetName(pub String);

#[async_trait]
impl Command for ClientSetName {
	type Response = ();

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		ok(executor
			.execute(Cmd::new("CLIENT").arg("SETNAME").arg(self.0))
			.await?)
	}
}
