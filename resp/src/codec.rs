use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::{
	nom::{Err, Needed},
	parser::parse,
	Cmd, Error, Reply,
};

/// Tokio codec with [`Encoder`] and [`Decoder`] for RESP.
///
/// Decodes one [Reply] per frame. Both [Cmd]s (client side) and [Reply]s (server side) can be
/// encoded. Any decode error is a [Error::Protocol] and leaves the stream unusable: the codec
/// never skips ahead looking for the next reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec;

impl Decoder for Codec {
	type Item = Reply;

	type Error = Error;

	fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
		if src.is_empty() {
			return Ok(None);
		}

		let (consumed, reply) = match parse(src) {
			Ok((rem, reply)) => (src.len() - rem.len(), reply),
			Err(Err::Incomplete(needed)) => {
				if let Needed::Size(size) = needed {
					src.reserve(size.get());
				}

				return Ok(None);
			}
			Err(Err::Error(e) | Err::Failure(e)) => {
				let offset = src.len() - e.input.len();
				return Err(Error::Protocol(format!(
					"invalid RESP at byte {} ({:?})",
					offset, e.code
				)));
			}
		};

		src.advance(consumed);
		trace!(?reply, "decoded");
		Ok(Some(reply))
	}
}

impl Encoder<&Cmd> for Codec {
	type Error = Error;

	fn encode(&mut self, item: &Cmd, dst: &mut BytesMut) -> Result<(), Self::Error> {
		trace!(cmd = ?item, "encoding");
		item.encode(dst);
		Ok(())
	}
}

impl Encoder<Cmd> for Codec {
	type Error = Error;

	fn encode(&mut self, item: Cmd, dst: &mut BytesMut) -> Result<(), Self::Error> {
		self.encode(&item, dst)
	}
}

impl Encoder<Reply> for Codec {
	type Error = Error;

	fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
		item.encode(dst);
		Ok(())
	}
}
