use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::{
	reply::{put_bulk, put_line},
	DataType, Error, Reply,
};

/// An outgoing command: a name followed by its arguments, each sent as a bulk string.
///
/// Every element is length-prefixed on the wire, so arguments may contain any bytes (including
/// `\r\n`).
#[derive(Clone, PartialEq, Eq)]
pub struct Cmd {
	parts: Vec<Bytes>,
}

impl Cmd {
	/// Start a new command with the given name.
	pub fn new(name: impl IntoArg) -> Self {
		Self {
			parts: vec![name.into_arg()],
		}
	}

	/// Append an argument.
	pub fn arg(mut self, arg: impl IntoArg) -> Self {
		self.push_arg(arg);
		self
	}

	/// Append every argument from an iterator.
	pub fn args<I>(mut self, args: I) -> Self
	where
		I: IntoIterator,
		I::Item: IntoArg,
	{
		self.parts.extend(args.into_iter().map(IntoArg::into_arg));
		self
	}

	pub fn push_arg(&mut self, arg: impl IntoArg) {
		self.parts.push(arg.into_arg());
	}

	pub fn name(&self) -> &[u8] {
		&self.parts[0]
	}

	/// The arguments, not including the command name.
	pub fn arguments(&self) -> &[Bytes] {
		&self.parts[1..]
	}

	/// Whether the name matches `name`, ignoring ASCII case.
	pub fn is(&self, name: &str) -> bool {
		self.name().eq_ignore_ascii_case(name.as_bytes())
	}

	/// Write this command as a RESP array of bulk strings.
	pub fn encode(&self, dst: &mut BytesMut) {
		put_line(dst, b'*', self.parts.len());
		for part in &self.parts {
			put_bulk(dst, part);
		}
	}

	pub fn to_bytes(&self) -> Bytes {
		let mut dst = BytesMut::new();
		self.encode(&mut dst);
		dst.freeze()
	}
}

impl fmt::Debug for Cmd {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(
				self.parts
					.iter()
					.map(|part| String::from_utf8_lossy(part).into_owned()),
			)
			.finish()
	}
}

/// Read a command back from a decoded request, as a server would.
impl TryFrom<Reply> for Cmd {
	type Error = Error;

	fn try_from(reply: Reply) -> Result<Self, Self::Error> {
		let parts = reply
			.into_array()?
			.into_iter()
			.map(|part| match part {
				Reply::Bulk(Some(bytes)) => Ok(bytes),
				other => Err(Error::unexpected(DataType::Bulk, other)),
			})
			.collect::<Result<Vec<_>, _>>()?;

		if parts.is_empty() {
			return Err(Error::Protocol("empty command".into()));
		}

		Ok(Self { parts })
	}
}

/// Types which can be sent as a command argument. Numbers are sent as their decimal text.
pub trait IntoArg {
	fn into_arg(self) -> Bytes;
}

impl IntoArg for Bytes {
	fn into_arg(self) -> Bytes {
		self
	}
}

impl IntoArg for &Bytes {
	fn into_arg(self) -> Bytes {
		self.clone()
	}
}

impl IntoArg for &str {
	fn into_arg(self) -> Bytes {
		Bytes::copy_from_slice(self.as_bytes())
	}
}

impl IntoArg for String {
	fn into_arg(self) -> Bytes {
		self.into()
	}
}

impl IntoArg for &String {
	fn into_arg(self) -> Bytes {
		self.as_str().into_arg()
	}
}

impl IntoArg for &[u8] {
	fn into_arg(self) -> Bytes {
		Bytes::copy_from_slice(self)
	}
}

impl<const N: usize> IntoArg for &[u8; N] {
	fn into_arg(self) -> Bytes {
		Bytes::copy_from_slice(self)
	}
}

impl IntoArg for Vec<u8> {
	fn into_arg(self) -> Bytes {
		self.into()
	}
}

impl IntoArg for &Vec<u8> {
	fn into_arg(self) -> Bytes {
		self.as_slice().into_arg()
	}
}

macro_rules! display_arg {
	($($ty:ty),*) => {
		$(
			impl IntoArg for $ty {
				fn into_arg(self) -> Bytes {
					self.to_string().into()
				}
			}
		)*
	};
}

display_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Macro to simplify building a [Cmd].
///
/// ```rust
/// # use redline_resp::{cmd, Cmd};
/// assert_eq!(cmd!("SET", "key", 10), Cmd::new("SET").arg("key").arg(10));
/// ```
#[macro_export]
macro_rules! cmd {
	($name:expr $(, $args:expr)* $(,)?) => {
		$crate::Cmd::new($name)$(.arg($args))*
	};
}
