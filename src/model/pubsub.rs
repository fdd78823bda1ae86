use std::fmt;

use bytes::Bytes;
use serde::de::{self, Unexpected};
use serde_bytes::ByteBuf;

/// What a subscription or message is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
	/// A plain channel (`SUBSCRIBE`).
	Channel,
	/// A glob-style channel pattern (`PSUBSCRIBE`).
	Pattern,
	/// A shard channel (`SSUBSCRIBE`).
	Shard,
}

/// Information about a subscription, returned from `(p|s)(un)subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
	pub kind: Kind,
	/// The channel or pattern. `None` when unsubscribing from everything while nothing was
	/// subscribed.
	pub name: Option<Bytes>,
	/// The number of remaining subscriptions with this connection.
	pub count: i64,
}

impl Subscription {
	/// Whether the connection is still in pubsub mode.
	pub fn is_in_pubsub_mode(&self) -> bool {
		self.count > 0
	}
}

/// A message received from a PubSub subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	/// How the subscription which matched this message was made.
	pub kind: Kind,
	/// The pattern which was matched (only for [Kind::Pattern]).
	pub pattern: Option<Bytes>,
	/// The channel this message was published to.
	pub channel: Bytes,
	/// The data that was published.
	pub data: Bytes,
}

/// A pubsub push from Redis. Once a connection has subscribed to anything, every reply it
/// receives deserializes into this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
	/// Subscribed to a channel, pattern or shard channel.
	Subscribe(Subscription),
	/// Unsubscribed from a channel, pattern or shard channel.
	Unsubscribe(Subscription),
	/// Received a new message from one of the active subscriptions.
	Message(Message),
	/// Reply to a `PING` sent while subscribed.
	Pong(Bytes),
}

impl<'de> de::Deserialize<'de> for Response {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		struct Visitor;

		impl Visitor {
			fn exp_len<E>(&self, len: usize) -> impl FnOnce() -> E + '_
			where
				E: de::Error,
			{
				move || de::Error::invalid_length(len, self)
			}

			fn next_bytes<'de, A>(&self, seq: &mut A, len: usize) -> Result<Bytes, A::Error>
			where
				A: de::SeqAccess<'de>,
			{
				let bytes = seq
					.next_element::<ByteBuf>()?
					.ok_or_else(self.exp_len(len))?;

				Ok(bytes.into_vec().into())
			}

			fn subscription<'de, A>(&self, seq: &mut A, kind: Kind) -> Result<Subscription, A::Error>
			where
				A: de::SeqAccess<'de>,
			{
				let name = seq
					.next_element::<Option<ByteBuf>>()?
					.ok_or_else(self.exp_len(1))?
					.map(|name| name.into_vec().into());

				Ok(Subscription {
					kind,
					name,
					count: seq.next_element()?.ok_or_else(self.exp_len(2))?,
				})
			}
		}

		impl<'de> de::Visitor<'de> for Visitor {
			type Value = Response;

			fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
				write!(formatter, "a pubsub push")
			}

			fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
			where
				A: de::SeqAccess<'de>,
			{
				let kind = seq.next_element::<String>()?.ok_or_else(self.exp_len(0))?;

				match &*kind {
					"subscribe" => Ok(Response::Subscribe(self.subscription(&mut seq, Kind::Channel)?)),
					"psubscribe" => Ok(Response::Subscribe(self.subscription(&mut seq, Kind::Pattern)?)),
					"ssubscribe" => Ok(Response::Subscribe(self.subscription(&mut seq, Kind::Shard)?)),
					"unsubscribe" => Ok(Response::Unsubscribe(self.subscription(&mut seq, Kind::Channel)?)),
					"punsubscribe" => Ok(Response::Unsubscribe(self.subscription(&mut seq, Kind::Pattern)?)),
					"sunsubscribe" => Ok(Response::Unsubscribe(self.subscription(&mut seq, Kind::Shard)?)),
					"message" => Ok(Response::Message(Message {
						kind: Kind::Channel,
						pattern: None,
						channel: self.next_bytes(&mut seq, 1)?,
						data: self.next_bytes(&mut seq, 2)?,
					})),
					"pmessage" => Ok(Response::Message(Message {
						kind: Kind::Pattern,
						pattern: Some(self.next_bytes(&mut seq, 1)?),
						channel: self.next_bytes(&mut seq, 2)?,
						data: self.next_bytes(&mut seq, 3)?,
					})),
					"smessage" => Ok(Response::Message(Message {
						kind: Kind::Shard,
						pattern: None,
						channel: self.next_bytes(&mut seq, 1)?,
						data: self.next_bytes(&mut seq, 2)?,
					})),
					"pong" => Ok(Response::Pong(self.next_bytes(&mut seq, 1)?)),
					s => Err(de::Error::invalid_value(
						Unexpected::Str(s),
						&"one of (p|s)(un)subscribe, (p|s)message or pong",
					)),
				}
			}
		}

		deserializer.deserialize_seq(Visitor)
	}
}
