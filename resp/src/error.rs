use std::{
	num::{ParseFloatError, ParseIntError},
	str::{ParseBoolError, Utf8Error},
};

use serde::de;
use thiserror::Error;

use crate::Reply;

/// A RESP data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
	Status,
	Integer,
	Bulk,
	Array,
	Map,
}

/// An error that can occur when parsing RESP or transforming a [Reply].
#[derive(Debug, Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),
	/// The bytes on the wire are not valid RESP.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// The reply was a server error.
	#[error("{0}")]
	Redis(String),
	/// The reply was a null bulk string or null array.
	#[error("nil reply")]
	Nil,
	/// The reply had a different shape than requested.
	#[error("expected {expected:?} but got {found:?}")]
	UnexpectedType {
		/// The data type which was expected.
		expected: DataType,
		/// The reply which was found.
		found: Reply,
	},
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	/// Expected a UTF-8 string but got something else.
	#[error("invalid string: {0}")]
	InvalidString(#[from] Utf8Error),
	/// Expected an integer but got something else.
	#[error("invalid integer: {0}")]
	InvalidInt(#[from] ParseIntError),
	/// Expected a float (in string format) but got something else.
	#[error("invalid float: {0}")]
	InvalidFloat(#[from] ParseFloatError),
	/// Expected a boolean but got something else.
	#[error("invalid bool: {0}")]
	InvalidBool(#[from] ParseBoolError),
}

impl Error {
	pub(crate) fn unexpected(expected: DataType, found: Reply) -> Self {
		match found {
			Reply::Error(msg) => Self::Redis(msg),
			Reply::Bulk(None) | Reply::Array(None) => Self::Nil,
			found => Self::UnexpectedType { expected, found },
		}
	}
}

impl de::Error for Error {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self::Message(msg.to_string())
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
