use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// One command executed by the server, as reported by `MONITOR`.
///
/// Parsed from status lines like
/// `1339518083.107412 [0 127.0.0.1:60866] "keys" "*"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
	pub timestamp: SystemTime,
	/// The logical database the command ran against.
	pub database: i64,
	/// The client address, or `lua` for commands run from scripts.
	pub client: String,
	/// Command name and arguments, unescaped.
	pub args: Vec<Bytes>,
	/// The line as received.
	pub raw: String,
}

impl MonitorEvent {
	/// Parse a monitor line, returning `None` if it is malformed.
	pub fn parse(line: &str) -> Option<Self> {
		let (timestamp, rest) = line.split_once(' ')?;
		let (source, args) = rest.strip_prefix('[')?.split_once("] ")?;
		let (database, client) = source.split_once(' ')?;

		Some(Self {
			timestamp: parse_timestamp(timestamp)?,
			database: database.parse().ok()?,
			client: client.to_owned(),
			args: parse_args(args.as_bytes())?,
			raw: line.to_owned(),
		})
	}

	/// The command name, if any.
	pub fn command(&self) -> Option<&[u8]> {
		self.args.first().map(|name| &name[..])
	}
}

fn parse_timestamp(timestamp: &str) -> Option<SystemTime> {
	let (secs, frac) = timestamp.split_once('.').unwrap_or((timestamp, ""));
	let secs = secs.parse().ok()?;

	let nanos = if frac.is_empty() {
		0
	} else if frac.len() <= 9 && frac.bytes().all(|b| b.is_ascii_digit()) {
		frac.parse::<u32>().ok()? * 10u32.pow(9 - frac.len() as u32)
	} else {
		return None;
	};

	UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

/// Split space separated, double quoted arguments, undoing the server's escaping.
fn parse_args(mut input: &[u8]) -> Option<Vec<Bytes>> {
	let mut args = Vec::new();

	loop {
		while let [b' ', rest @ ..] = input {
			input = rest;
		}

		match input {
			[] => return Some(args),
			[b'"', rest @ ..] => {
				let (arg, rest) = parse_quoted(rest)?;
				args.push(arg.into());
				input = rest;
			}
			_ => return None,
		}
	}
}

fn parse_quoted(mut input: &[u8]) -> Option<(Vec<u8>, &[u8])> {
	let mut out = Vec::new();

	loop {
		match input {
			[b'"', rest @ ..] => return Some((out, rest)),
			[b'\\', b'x', hi, lo, rest @ ..] => {
				out.push(hex(*hi)? << 4 | hex(*lo)?);
				input = rest;
			}
			[b'\\', escaped, rest @ ..] => {
				out.push(match escaped {
					b'n' => b'\n',
					b'r' => b'\r',
					b't' => b'\t',
					b'a' => 0x07,
					b'b' => 0x08,
					other => *other,
				});
				input = rest;
			}
			[byte, rest @ ..] => {
				out.push(*byte);
				input = rest;
			}
			// unterminated
			[] => return None,
		}
	}
}

fn hex(digit: u8) -> Option<u8> {
	(digit as char).to_digit(16).map(|d| d as u8)
}
