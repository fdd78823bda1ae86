use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use crate::{
	client::Executor,
	resp::{Cmd, IntoArg},
	Result,
};

use super::Command;

/// A [`PUBLISH`](https://redis.io/commands/publish/) command. Responds with the number of
/// subscribers which received the message.
#[derive(Debug, Clone)]
pub struct Publish {
	pub channel: Bytes,
	pub message: Bytes,
}

impl Publish {
	pub fn new(channel: impl IntoArg, message: impl IntoArg) -> Self {
		Self {
			channel: channel.into_arg(),
			message: message.into_arg(),
		}
	}
}

#[async_trait]
impl Command for Publish {
	type Response = i64;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		Ok(executor
			.execute(Cmd::new("PUBLISH").arg(self.channel).arg(self.message))
			.await?
			.into_int()?)
	}
}

/// An [`SPUBLISH`](https://redis.io/commands/spublish/) command, publishing to a shard channel.
#[derive(Debug, Clone)]
pub struct SPublish {
	pub channel: Bytes,
	pub message: Bytes,
}

impl SPublish {
	pub fn new(channel: impl IntoArg, message: impl IntoArg) -> Self {
		Self {
			channel: channel.into_arg(),
			message: message.into_arg(),
		}
	}
}

#[async_trait]
impl Command for SPublish {
	type Response = i64;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		Ok(executor
			.execute(Cmd::new("SPUBLISH").arg(self.channel).arg(self.message))
			.await?
			.into_int()?)
	}
}
