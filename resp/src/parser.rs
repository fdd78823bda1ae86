use std::str::from_utf8;

use bytes::Bytes;
use nom::{
	bytes::streaming::take,
	character::streaming::{char, crlf, i64, not_line_ending},
	combinator::{map, map_res},
	error::ErrorKind,
	sequence::{delimited, terminated},
	IResult, Needed,
};

use crate::Reply;

pub type Error<'a> = nom::Err<nom::error::Error<&'a [u8]>>;

/// The largest bulk string accepted, matching the server's default `proto-max-bulk-len`.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

fn failure(data: &[u8], kind: ErrorKind) -> Error<'_> {
	nom::Err::Failure(nom::error::Error::new(data, kind))
}

pub fn parse_str(data: &[u8]) -> IResult<&[u8], &str> {
	map_res(delimited(char('+'), not_line_ending, crlf), from_utf8)(data)
}

pub fn parse_err(data: &[u8]) -> IResult<&[u8], &str> {
	map_res(delimited(char('-'), not_line_ending, crlf), from_utf8)(data)
}

pub fn parse_int(data: &[u8]) -> IResult<&[u8], i64> {
	delimited(char(':'), i64, crlf)(data)
}

pub fn parse_bytes(data: &[u8]) -> IResult<&[u8], Option<&[u8]>> {
	let (data, len) = delimited(char('$'), i64, crlf)(data)?;
	match len {
		-1 => Ok((data, None)),
		0..=MAX_BULK_LEN => map(terminated(take(len as usize), crlf), Some)(data),
		_ => Err(failure(data, ErrorKind::LengthValue)),
	}
}

pub fn parse_array(data: &[u8]) -> IResult<&[u8], i64> {
	let (rem, len) = delimited(char('*'), i64, crlf)(data)?;
	if len < -1 {
		return Err(failure(data, ErrorKind::LengthValue));
	}

	Ok((rem, len))
}

/// Parse exactly one reply, recursing into arrays.
///
/// Returns [nom::Err::Incomplete] when `data` ends before the reply does; any other error means
/// the input is not valid RESP and the stream cannot be resynchronized.
pub fn parse(data: &[u8]) -> IResult<&[u8], Reply> {
	match data.first() {
		None => Err(nom::Err::Incomplete(Needed::new(1))),
		Some(b'+') => map(parse_str, |status| Reply::Status(status.to_owned()))(data),
		Some(b'-') => map(parse_err, |msg| Reply::Error(msg.to_owned()))(data),
		Some(b':') => map(parse_int, Reply::Integer)(data),
		Some(b'$') => map(parse_bytes, |bytes| {
			Reply::Bulk(bytes.map(Bytes::copy_from_slice))
		})(data),
		Some(b'*') => {
			let (mut rem, len) = parse_array(data)?;
			if len < 0 {
				return Ok((rem, Reply::Array(None)));
			}

			// the count is untrusted until the elements actually arrive
			let mut items = Vec::with_capacity((len as usize).min(1024));
			for _ in 0..len {
				let (next, item) = parse(rem)?;
				items.push(item);
				rem = next;
			}

			Ok((rem, Reply::Array(Some(items))))
		}
		Some(_) => Err(failure(data, ErrorKind::Char)),
	}
}
