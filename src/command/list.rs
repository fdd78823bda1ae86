use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use crate::{
	client::{Dedicated, Executor},
	resp::{Cmd, IntoArg, Reply},
	Error, Result,
};

use super::{BlockingCommand, Command};

/// An [`RPUSH`](https://redis.io/commands/rpush/) command. Responds with the new list length.
#[derive(Debug, Clone)]
pub struct RPush {
	pub key: Bytes,
	pub values: Vec<Bytes>,
}

impl RPush {
	pub fn new<I>(key: impl IntoArg, values: I) -> Self
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		Self {
			key: key.into_arg(),
			values: values.into_iter().map(IntoArg::into_arg).collect(),
		}
	}
}

#[async_trait]
impl Command for RPush {
	type Response = i64;

	#[instrument(level = "debug", skip(executor))]
	async fn run<E>(self, executor: &mut E) -> Result<Self::Response>
	where
		E: Executor + ?Sized,
	{
		Ok(executor
			.execute(Cmd::new("RPUSH").arg(self.key).args(self.values))
			.await?
			.into_int()?)
	}
}

/// A [`BLPOP`](https://redis.io/commands/blpop/) command. Responds with the key and the
/// popped element, or `None` if `timeout` elapsed first. A zero timeout blocks indefinitely.
#[derive(Debug, Clone)]
pub struct BLPop {
	pub keys: Vec<Bytes>,
	pub timeout: Duration,
}

impl BLPop {
	pub fn new<I>(keys: I, timeout: Duration) -> Self
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		Self {
			keys: keys.into_iter().map(IntoArg::into_arg).collect(),
			timeout,
		}
	}
}

#[async_trait]
impl BlockingCommand for BLPop {
	type Response = Option<(Bytes, Bytes)>;

	#[instrument(level = "debug", skip(connection))]
	async fn run<D>(self, connection: &mut D) -> Result<Self::Response>
	where
		D: Dedicated + ?Sized,
	{
		let cmd = Cmd::new("BLPOP")
			.args(self.keys)
			.arg(self.timeout.as_secs_f64());

		match connection.execute_blocking(cmd, self.timeout).await? {
			Reply::Array(None) => Ok(None),
			reply => {
				let [key, value]: [Reply; 2] = reply
					.into_array()?
					.try_into()
					.map_err(|items| Error::UnexpectedReply(Reply::Array(Some(items))))?;

				Ok(Some((key.into_bytes()?, value.into_bytes()?)))
			}
		}
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use bytes::Bytes;

	use crate::{
		command::{test::Fake, BlockingCommand, Command},
		resp::{array, cmd, Reply},
		Error,
	};

	use super::{BLPop, RPush};

	#[tokio::test]
	async fn rpush() {
		let mut fake = Fake::replying([Reply::Integer(3)]);

		let len = RPush::new("list", ["a", "b", "c"])
			.run(&mut fake)
			.await
			.unwrap();
		assert_eq!(len, 3);
	}

	#[tokio::test]
	async fn blpop_timed_out() {
		let mut fake = Fake::replying([Reply::Array(None)]);

		let res = BLPop::new(["empty"], Duration::from_millis(100))
			.run(&mut fake)
			.await
			.unwrap();

		assert_eq!(res, None);
		assert_eq!(fake.sent, [cmd!("BLPOP", "empty", 0.1f64)]);
		assert_eq!(fake.blocked_for, [Duration::from_millis(100)]);
	}

	#[tokio::test]
	async fn blpop_popped() {
		let mut fake = Fake::replying([array![Reply::bulk("list"), Reply::bulk("a")]]);

		let res = BLPop::new(["list"], Duration::ZERO)
			.run(&mut fake)
			.await
			.unwrap();

		assert_eq!(res, Some((Bytes::from("list"), Bytes::from("a"))));
	}

	#[tokio::test]
	async fn blpop_malformed() {
		let mut fake = Fake::replying([array![Reply::bulk("list")]]);

		let err = BLPop::new(["list"], Duration::ZERO)
			.run(&mut fake)
			.await
			.unwrap_err();

		assert!(matches!(err, Error::UnexpectedReply(_)));
	}
}
