use std::{collections::HashMap, fmt::Display, str::from_utf8};

use bytes::{BufMut, Bytes, BytesMut};
use itertools::Itertools;

use crate::{DataType, Error, Result};

pub mod de;

/// A single parsed RESP reply. Read the [Redis documentation](https://redis.io/commands) for
/// details on which type to expect as a response.
///
/// Null bulk strings and null arrays are kept distinct from their empty counterparts:
/// `Bulk(None)` is a missing value (e.g. `GET` on a missing key) while `Bulk(Some(""))` is an
/// empty string, and `Array(None)` is "no data" (e.g. a timed out blocking pop) while
/// `Array(Some(vec![]))` is an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	/// `+OK`
	Status(String),
	/// `-ERR message`. Always a failed command.
	Error(String),
	/// `:1000`
	Integer(i64),
	/// `$5 hello`, or `$-1` for null.
	Bulk(Option<Bytes>),
	/// `*2 ...` (multi-bulk), or `*-1` for null.
	Array(Option<Vec<Reply>>),
}

impl Reply {
	/// Convenience method to create a [Reply::Status].
	pub fn status(status: impl Into<String>) -> Self {
		Self::Status(status.into())
	}

	/// Convenience method to create a [Reply::Bulk] containing a copy of `bytes`.
	pub fn bulk<T>(bytes: &T) -> Self
	where
		T: AsRef<[u8]> + ?Sized,
	{
		Self::Bulk(Some(Bytes::copy_from_slice(bytes.as_ref())))
	}

	/// Whether this is a null bulk string or a null array.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Bulk(None) | Self::Array(None))
	}

	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error(_))
	}

	/// Whether this is the `+OK` status.
	pub fn is_ok(&self) -> bool {
		matches!(self, Self::Status(status) if status == "OK")
	}

	/// Turn an error reply into [Error::Redis], passing any other reply through.
	pub fn into_result(self) -> Result<Self> {
		match self {
			Self::Error(msg) => Err(Error::Redis(msg)),
			other => Ok(other),
		}
	}

	pub fn into_string(self) -> Result<String> {
		match self {
			Self::Status(status) => Ok(status),
			Self::Bulk(Some(bytes)) => Ok(from_utf8(&bytes)?.to_owned()),
			other => Err(Error::unexpected(DataType::Bulk, other)),
		}
	}

	pub fn into_bytes(self) -> Result<Bytes> {
		match self {
			Self::Bulk(Some(bytes)) => Ok(bytes),
			Self::Status(status) => Ok(status.into()),
			other => Err(Error::unexpected(DataType::Bulk, other)),
		}
	}

	/// Like [Self::into_bytes], but a null bulk string is `None` instead of [Error::Nil].
	pub fn into_optional_bytes(self) -> Result<Option<Bytes>> {
		match self {
			Self::Bulk(bytes) => Ok(bytes),
			Self::Status(status) => Ok(Some(status.into())),
			other => Err(Error::unexpected(DataType::Bulk, other)),
		}
	}

	/// Integers are also read from their decimal text in bulk and status replies.
	pub fn into_int(self) -> Result<i64> {
		match self {
			Self::Integer(int) => Ok(int),
			Self::Bulk(Some(bytes)) => Ok(from_utf8(&bytes)?.parse()?),
			Self::Status(status) => Ok(status.parse()?),
			other => Err(Error::unexpected(DataType::Integer, other)),
		}
	}

	pub fn into_bool(self) -> Result<bool> {
		match self {
			Self::Integer(int) => Ok(int != 0),
			Self::Status(status) if status == "OK" => Ok(true),
			Self::Bulk(Some(bytes)) => parse_bool(from_utf8(&bytes)?),
			Self::Status(status) => parse_bool(&status),
			other => Err(Error::unexpected(DataType::Integer, other)),
		}
	}

	pub fn into_array(self) -> Result<Vec<Reply>> {
		match self {
			Self::Array(Some(items)) => Ok(items),
			other => Err(Error::unexpected(DataType::Array, other)),
		}
	}

	/// Read a flat `[key, value, key, value, ...]` array, as returned by `HGETALL` and
	/// `CONFIG GET`.
	pub fn into_map(self) -> Result<HashMap<Bytes, Reply>> {
		let items = match self {
			Self::Array(Some(items)) if items.len() % 2 == 0 => items,
			other => return Err(Error::unexpected(DataType::Map, other)),
		};

		items
			.into_iter()
			.tuples()
			.map(|(key, value)| Ok((key.into_bytes()?, value)))
			.collect()
	}

	/// Write this reply in RESP framing.
	pub fn encode(&self, dst: &mut BytesMut) {
		match self {
			Self::Status(status) => put_line(dst, b'+', status),
			Self::Error(msg) => put_line(dst, b'-', msg),
			Self::Integer(int) => put_line(dst, b':', int),
			Self::Bulk(None) => dst.put_slice(b"$-1\r\n"),
			Self::Bulk(Some(bytes)) => put_bulk(dst, bytes),
			Self::Array(None) => dst.put_slice(b"*-1\r\n"),
			Self::Array(Some(items)) => {
				put_line(dst, b'*', items.len());
				for item in items {
					item.encode(dst);
				}
			}
		}
	}
}

fn parse_bool(text: &str) -> Result<bool> {
	match text {
		"1" => Ok(true),
		"0" => Ok(false),
		other => Ok(other.parse()?),
	}
}

pub(crate) fn put_line(dst: &mut BytesMut, prefix: u8, line: impl Display) {
	dst.put_u8(prefix);
	dst.put_slice(line.to_string().as_bytes());
	dst.put_slice(b"\r\n");
}

pub(crate) fn put_bulk(dst: &mut BytesMut, bytes: &[u8]) {
	put_line(dst, b'$', bytes.len());
	dst.reserve(bytes.len() + 2);
	dst.put_slice(bytes);
	dst.put_slice(b"\r\n");
}

impl From<&str> for Reply {
	fn from(str: &str) -> Self {
		Reply::Status(str.into())
	}
}

impl From<String> for Reply {
	fn from(str: String) -> Self {
		Reply::Status(str)
	}
}

impl From<i64> for Reply {
	fn from(i: i64) -> Self {
		Reply::Integer(i)
	}
}

impl<const N: usize> From<&[u8; N]> for Reply {
	fn from(bytes: &[u8; N]) -> Self {
		Self::bulk(bytes)
	}
}

impl From<&[u8]> for Reply {
	fn from(bytes: &[u8]) -> Self {
		Self::bulk(bytes)
	}
}

impl From<Vec<u8>> for Reply {
	fn from(bytes: Vec<u8>) -> Self {
		Self::Bulk(Some(bytes.into()))
	}
}

impl From<Bytes> for Reply {
	fn from(bytes: Bytes) -> Self {
		Self::Bulk(Some(bytes))
	}
}

impl From<Vec<Reply>> for Reply {
	fn from(items: Vec<Reply>) -> Self {
		Self::Array(Some(items))
	}
}

impl From<()> for Reply {
	fn from(_: ()) -> Self {
		Reply::Bulk(None)
	}
}

impl PartialEq<str> for Reply {
	fn eq(&self, other: &str) -> bool {
		matches!(self, Reply::Status(str) if str == other)
	}
}

impl PartialEq<&str> for Reply {
	fn eq(&self, other: &&str) -> bool {
		matches!(self, Reply::Status(str) if str == other)
	}
}

impl PartialEq<[u8]> for Reply {
	fn eq(&self, other: &[u8]) -> bool {
		matches!(self, Reply::Bulk(Some(bytes)) if bytes.as_ref() == other)
	}
}

impl<const N: usize> PartialEq<&[u8; N]> for Reply {
	fn eq(&self, other: &&[u8; N]) -> bool {
		matches!(self, Reply::Bulk(Some(bytes)) if bytes.as_ref() == *other)
	}
}

impl PartialEq<i64> for Reply {
	fn eq(&self, other: &i64) -> bool {
		matches!(self, Reply::Integer(i) if *i == *other)
	}
}

/// Macro to simplify making a non-null [Reply::Array].
///
/// ```rust
/// # use redline_resp::{array, Reply};
/// assert_eq!(
/// 	array!("OK", 1i64, b"foo"),
/// 	Reply::Array(Some(vec![Reply::status("OK"), Reply::Integer(1), Reply::bulk("foo")]))
/// );
/// ```
#[macro_export]
macro_rules! array {
	($($items:expr),* $(,)?) => {
		$crate::Reply::Array(Some(vec![$($crate::Reply::from($items)),*]))
	};
}
