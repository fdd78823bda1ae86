use std::{
	io,
	pin::Pin,
	task::{Context, Poll},
};

#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::{
	io::{AsyncRead, AsyncWrite, ReadBuf},
	net::TcpStream,
};

use crate::config::Address;

/// The transport under a [Connection](crate::Connection).
#[derive(Debug)]
pub enum Stream {
	Tcp(TcpStream),
	#[cfg(unix)]
	Unix(UnixStream),
}

impl Stream {
	pub(crate) async fn connect(addr: &Address) -> io::Result<Self> {
		match addr {
			Address::Tcp { host, port } => {
				let stream = TcpStream::connect((host.as_str(), *port)).await?;
				stream.set_nodelay(true)?;
				Ok(Self::Tcp(stream))
			}
			#[cfg(unix)]
			Address::Unix(path) => Ok(Self::Unix(UnixStream::connect(path).await?)),
			#[cfg(not(unix))]
			Address::Unix(_) => Err(io::Error::new(
				io::ErrorKind::Unsupported,
				"unix sockets are not supported on this platform",
			)),
		}
	}
}

impl AsyncRead for Stream {
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
			#[cfg(unix)]
			Self::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
		}
	}
}

impl AsyncWrite for Stream {
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<io::Result<usize>> {
		match self.get_mut() {
			Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
			#[cfg(unix)]
			Self::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
		}
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
			#[cfg(unix)]
			Self::Unix(stream) => Pin::new(stream).poll_flush(cx),
		}
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
			#[cfg(unix)]
			Self::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
		}
	}
}
