use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use crate::{
	client::Executor,
	resp::{Cmd, IntoArg},
	Result,
};

use super::{ok, Command};

/// A [`GET`](https://redis.io/commands/get/) command. A missing key is `None`, which is distinct
/// from an empty value.
#[derive(Debug, Clone)]
pub struct Get(pub Bytes);

impl Get {
	pub fn new(key: impl IntoArg) -> Self {
		Self(key.into_arg())
	}
}

#[async_trait]
impl Command for Get {
	type Response = Option<Bytes>;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		Ok(executor
			.execute(Cmd::new("GET").arg(self.0))
			.await?
			.into_optional_bytes()?)
	}
}

/// A [`SET`](https://redis.io/commands/set/) command, with an optional expiry.
#[derive(Debug, Clone)]
pub struct Set {
	pub key: Bytes,
	pub value: Bytes,
	pub expire: Option<Duration>,
}

impl Set {
	pub fn new(key: impl IntoArg, value: impl IntoArg) -> Self {
		Self {
			key: key.into_arg(),
			value: value.into_arg(),
			expire: None,
		}
	}

	/// Expire the key after `expire`, with millisecond precision.
	#[must_use]
	pub fn expire(mut self, expire: Duration) -> Self {
		self.expire = Some(expire);
		self
	}
}

#[async_trait]
impl Command for Set {
	type Response = ();

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		let mut cmd = Cmd::new("SET").arg(self.key).arg(self.value);
		if let Some(expire) = self.expire {
			cmd = cmd.arg("PX").arg(expire.as_millis() as u64);
		}

		ok(executor.execute(cmd).await?)
	}
}

/// A [`DEL`](https://redis.io/commands/del/) command. Responds with the number of keys removed.
#[derive(Debug, Clone)]
pub struct Del(pub Vec<Bytes>);

impl Del {
	pub fn new<I>(keys: I) -> Self
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		Self(keys.into_iter().map(IntoArg::into_arg).collect())
	}
}

#[async_trait]
impl Command for Del {
	type Response = i64;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		Ok(executor
			.execute(Cmd::new("DEL").args(self.0))
			.await?
			.into_int()?)
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use crate::{
		command::{test::Fake, Command},
		resp::{cmd, Reply},
	};

	use super::{Del, Get, Set};

	#[tokio::test]
	async fn get_missing_and_empty() {
		let mut fake = Fake::replying([Reply::Bulk(None), Reply::bulk("")]);

		assert_eq!(Get::new("missing").run(&mut fake).await.unwrap(), None);
		assert_eq!(
			Get::new("empty").run(&mut fake).await.unwrap().as_deref(),
			Some(&b""[..])
		);
	}

	#[tokio::test]
	async fn set_with_expiry() {
		let mut fake = Fake::replying([Reply::status("OK")]);

		Set::new("k", "v")
			.expire(Duration::from_secs(2))
			.run(&mut fake)
			.await
			.unwrap();

		assert_eq!(fake.sent, [cmd!("SET", "k", "v", "PX", 2000)]);
	}

	#[tokio::test]
	async fn del_many() {
		let mut fake = Fake::replying([Reply::Integer(2)]);

		let removed = Del::new(["a", "b", "c"]).run(&mut fake).await.unwrap();
		assert_eq!(removed, 2);
		assert_eq!(fake.sent, [cmd!("DEL", "a", "b", "c")]);
	}
}
