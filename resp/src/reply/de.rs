use std::str::from_utf8;

use itertools::Itertools;
use serde::{
	de::{
		self,
		value::{MapDeserializer, SeqDeserializer},
		Unexpected,
	},
	forward_to_deserialize_any, Deserialize,
};

use crate::{DataType, Error, Reply};

/// Deserialize a `T` from a reply.
///
/// Error replies always fail with [Error::Redis]. Integers are read loosely from integer, bulk
/// and status replies, maps from flat `[key, value, ...]` arrays, and `Option<T>` is `None` for
/// null bulk strings and null arrays.
pub fn from_reply<'de, T>(reply: Reply) -> Result<T, Error>
where
	T: Deserialize<'de>,
{
	T::deserialize(reply)
}

impl<'de> de::Deserialize<'de> for Reply {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		struct Visitor;

		impl<'de> de::Visitor<'de> for Visitor {
			type Value = Reply;

			fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
				write!(formatter, "valid RESP data")
			}

			fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				Ok(Reply::Integer(v))
			}

			fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				Ok(Reply::Status(v))
			}

			fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				self.visit_string(v.to_owned())
			}

			fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				Ok(Reply::Bulk(Some(v.into())))
			}

			fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				Ok(Reply::bulk(v))
			}

			fn visit_none<E>(self) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				Ok(Reply::Bulk(None))
			}

			fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
			where
				D: serde::Deserializer<'de>,
			{
				de::Deserialize::deserialize(deserializer)
			}

			fn visit_unit<E>(self) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				self.visit_none()
			}

			fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
			where
				A: de::SeqAccess<'de>,
			{
				let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
				while let Some(v) = seq.next_element()? {
					out.push(v);
				}

				Ok(Reply::Array(Some(out)))
			}
		}

		deserializer.deserialize_any(Visitor)
	}
}

fn visit_array<'de, V>(array: Vec<Reply>, visitor: V) -> Result<V::Value, Error>
where
	V: de::Visitor<'de>,
{
	let mut deserializer = SeqDeserializer::new(array.into_iter());
	let seq = visitor.visit_seq(&mut deserializer)?;
	deserializer.end()?;
	Ok(seq)
}

fn visit_map<'de, V>(array: Vec<Reply>, visitor: V) -> Result<V::Value, Error>
where
	V: de::Visitor<'de>,
{
	if array.len() % 2 != 0 {
		return Err(Error::unexpected(DataType::Map, Reply::Array(Some(array))));
	}

	let mut deserializer = MapDeserializer::new(array.into_iter().tuples::<(_, _)>());
	let map = visitor.visit_map(&mut deserializer)?;
	deserializer.end()?;
	Ok(map)
}

impl Reply {
	fn text(self) -> Result<String, Error> {
		match self {
			Reply::Integer(int) => Ok(int.to_string()),
			other => other.into_string(),
		}
	}
}

impl<'de> de::Deserializer<'de> for Reply {
	type Error = Error;

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Reply::Array(Some(items)) => visit_array(items, visitor),
			Reply::Array(None) | Reply::Bulk(None) => visitor.visit_none(),
			Reply::Bulk(Some(bytes)) => visitor.visit_byte_buf(bytes.to_vec()),
			Reply::Integer(i) => visitor.visit_i64(i),
			Reply::Status(status) => visitor.visit_string(status),
			Reply::Error(msg) => Err(Error::Redis(msg)),
		}
	}

	fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		visitor.visit_bool(self.into_bool()?)
	}

	fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		visitor.visit_i64(self.into_int()?)
	}

	fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Reply::Bulk(Some(bytes)) => visitor.visit_u64(from_utf8(&bytes)?.parse()?),
			other => visitor.visit_i64(other.into_int()?),
		}
	}

	fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Reply::Integer(int) => visitor.visit_i64(int),
			other => visitor.visit_f64(other.text()?.parse()?),
		}
	}

	fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		visitor.visit_string(self.text()?)
	}

	fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_str(visitor)
	}

	fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Reply::Bulk(Some(bytes)) => visitor.visit_byte_buf(bytes.to_vec()),
			Reply::Status(status) => visitor.visit_byte_buf(status.into_bytes()),
			Reply::Bulk(None) => visitor.visit_none(),
			other => Err(Error::unexpected(DataType::Bulk, other)),
		}
	}

	fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_bytes(visitor)
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Reply::Bulk(None) | Reply::Array(None) => visitor.visit_none(),
			Reply::Error(msg) => Err(Error::Redis(msg)),
			other => visitor.visit_some(other),
		}
	}

	fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		match self {
			Reply::Error(msg) => Err(Error::Redis(msg)),
			_ => visitor.visit_unit(),
		}
	}

	fn deserialize_newtype_struct<V>(
		self,
		_name: &'static str,
		visitor: V,
	) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		fn make_err<T, E>(unex: Unexpected) -> Result<T, E>
		where
			E: de::Error,
		{
			Err(de::Error::invalid_type(unex, &"flat key/value array"))
		}

		match self {
			Reply::Array(Some(items)) => visit_map(items, visitor),
			Reply::Error(msg) => Err(Error::Redis(msg)),
			Reply::Array(None) | Reply::Bulk(None) => make_err(Unexpected::Unit),
			Reply::Bulk(Some(b)) => make_err(Unexpected::Bytes(&b)),
			Reply::Integer(i) => make_err(Unexpected::Signed(i)),
			Reply::Status(str) => make_err(Unexpected::Str(&str)),
		}
	}

	fn deserialize_struct<V>(
		self,
		_name: &'static str,
		_fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_map(visitor)
	}

	fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_i64(visitor)
	}

	fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_i64(visitor)
	}

	fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_i64(visitor)
	}

	fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_u64(visitor)
	}

	fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_u64(visitor)
	}

	fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_u64(visitor)
	}

	fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Error>
	where
		V: de::Visitor<'de>,
	{
		self.deserialize_f64(visitor)
	}

	forward_to_deserialize_any! {
		i128 u128 char unit_struct seq tuple
		tuple_struct enum identifier ignored_any
	}
}

impl<'de> de::IntoDeserializer<'de, Error> for Reply {
	type Deserializer = Self;

	fn into_deserializer(self) -> Self::Deserializer {
		self
	}
}
