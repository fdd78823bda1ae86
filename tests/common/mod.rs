//! An in-process fake Redis server speaking RESP through the crate's own codec. It implements
//! just enough of the command set to exercise connections, pooling and subscriptions, plus a
//! few commands for injecting failures:
//!
//! - `CRASH` hangs up without replying
//! - `GARBAGE` replies with bytes that are not RESP
//! - `SLEEP <ms>` replies `+OK` after a delay
//! - `STALL <ms>` replies `+OK`, then stops reading from the socket for a while
#![allow(dead_code)]

use std::{
	collections::{HashMap, HashSet, VecDeque},
	sync::{
		atomic::{AtomicU64, AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use redline::{
	resp::{array, codec::Codec, Cmd, Reply},
	Address, Config,
};
use tokio::{
	io::{AsyncRead, AsyncWrite, AsyncWriteExt},
	net::TcpListener,
	sync::mpsc,
	time::sleep,
};
use tokio_util::codec::Framed;

pub struct Server {
	address: Address,
	shared: Arc<Shared>,
}

impl Server {
	pub async fn start() -> Self {
		Self::start_with(None).await
	}

	/// Start a server which requires `AUTH <password>` before anything else.
	pub async fn with_password(password: &str) -> Self {
		Self::start_with(Some(password.to_owned())).await
	}

	async fn start_with(password: Option<String>) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let shared = Arc::new(Shared::new(password));

		let accepting = Arc::clone(&shared);
		tokio::spawn(async move {
			while let Ok((stream, peer)) = listener.accept().await {
				accepting.accepted.fetch_add(1, Ordering::SeqCst);
				tokio::spawn(serve(Arc::clone(&accepting), stream, peer.to_string()));
			}
		});

		Self {
			address: Address::tcp("127.0.0.1", port),
			shared,
		}
	}

	/// Serve on a Unix domain socket at `path`.
	#[cfg(unix)]
	pub async fn start_unix(path: std::path::PathBuf) -> Self {
		let _ = std::fs::remove_file(&path);
		let listener = tokio::net::UnixListener::bind(&path).unwrap();
		let shared = Arc::new(Shared::new(None));

		let accepting = Arc::clone(&shared);
		tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				accepting.accepted.fetch_add(1, Ordering::SeqCst);
				tokio::spawn(serve(Arc::clone(&accepting), stream, "unix".to_owned()));
			}
		});

		Self {
			address: Address::Unix(path),
			shared,
		}
	}

	pub fn address(&self) -> Address {
		self.address.clone()
	}

	pub fn config(&self) -> Config {
		Config::new(self.address())
	}

	/// Connections accepted so far.
	pub fn accepted(&self) -> usize {
		self.shared.accepted.load(Ordering::SeqCst)
	}

	/// The string stored at `key` in database `db`.
	pub fn value(&self, db: i64, key: &str) -> Option<Bytes> {
		self.shared
			.strings
			.lock()
			.unwrap()
			.get(&(db, Bytes::copy_from_slice(key.as_bytes())))
			.cloned()
	}

	/// Names set with `CLIENT SETNAME`, in order.
	pub fn client_names(&self) -> Vec<Bytes> {
		self.shared.names.lock().unwrap().clone()
	}
}

struct Subscriber {
	tx: mpsc::UnboundedSender<Reply>,
	channels: HashSet<Bytes>,
	patterns: HashSet<Bytes>,
	shards: HashSet<Bytes>,
}

impl Subscriber {
	fn set(&mut self, kind: &str) -> &mut HashSet<Bytes> {
		match kind {
			"subscribe" | "unsubscribe" => &mut self.channels,
			"psubscribe" | "punsubscribe" => &mut self.patterns,
			_ => &mut self.shards,
		}
	}

	fn count(&self, kind: &str) -> i64 {
		match kind {
			"ssubscribe" | "sunsubscribe" => self.shards.len() as i64,
			_ => (self.channels.len() + self.patterns.len()) as i64,
		}
	}

	fn is_subscribed(&self) -> bool {
		!self.channels.is_empty() || !self.patterns.is_empty()
	}
}

struct Shared {
	password: Option<String>,
	accepted: AtomicUsize,
	next_id: AtomicU64,
	strings: Mutex<HashMap<(i64, Bytes), Bytes>>,
	lists: Mutex<HashMap<(i64, Bytes), VecDeque<Bytes>>>,
	names: Mutex<Vec<Bytes>>,
	subscribers: Mutex<HashMap<u64, Subscriber>>,
	monitors: Mutex<Vec<mpsc::UnboundedSender<Reply>>>,
}

struct Session {
	id: u64,
	db: i64,
	authenticated: bool,
	peer: String,
	tx: mpsc::UnboundedSender<Reply>,
}

enum Outcome {
	Replies(Vec<Reply>),
	Raw(&'static [u8]),
	Stall(Duration),
	Hangup,
}

fn error(msg: &str) -> Outcome {
	Outcome::Replies(vec![Reply::Error(msg.to_owned())])
}

fn reply(reply: impl Into<Reply>) -> Outcome {
	Outcome::Replies(vec![reply.into()])
}

fn ok() -> Outcome {
	reply(Reply::status("OK"))
}

async fn serve<S>(shared: Arc<Shared>, stream: S, peer: String)
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let (tx, mut rx) = mpsc::unbounded_channel();
	let mut session = Session {
		id: shared.next_id.fetch_add(1, Ordering::SeqCst),
		db: 0,
		authenticated: shared.password.is_none(),
		peer,
		tx,
	};
	let mut framed = Framed::new(stream, Codec);

	loop {
		tokio::select! {
			// pushes already queued go out before replies to later requests
			biased;

			Some(push) = rx.recv() => {
				if framed.send(push).await.is_err() {
					break;
				}
			}
			req = framed.next() => {
				let cmd = match req.map(|req| req.map(Cmd::try_from)) {
					Some(Ok(Ok(cmd))) => cmd,
					_ => break,
				};

				let written = match shared.handle(&mut session, cmd).await {
					Outcome::Replies(replies) => write_all(&mut framed, replies).await,
					Outcome::Raw(raw) => framed.get_mut().write_all(raw).await.is_ok(),
					Outcome::Stall(delay) => {
						let written = write_all(&mut framed, vec![Reply::status("OK")]).await;
						sleep(delay).await;
						written
					}
					Outcome::Hangup => false,
				};

				if !written {
					break;
				}
			}
		}
	}

	shared.subscribers.lock().unwrap().remove(&session.id);
}

async fn write_all<S>(framed: &mut Framed<S, Codec>, replies: Vec<Reply>) -> bool
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	for reply in replies {
		if framed.feed(reply).await.is_err() {
			return false;
		}
	}

	SinkExt::<Reply>::flush(framed).await.is_ok()
}

impl Shared {
	fn new(password: Option<String>) -> Self {
		Self {
			password,
			accepted: AtomicUsize::new(0),
			next_id: AtomicU64::new(1),
			strings: Mutex::default(),
			lists: Mutex::default(),
			names: Mutex::default(),
			subscribers: Mutex::default(),
			monitors: Mutex::default(),
		}
	}

	async fn handle(&self, session: &mut Session, cmd: Cmd) -> Outcome {
		let name = String::from_utf8_lossy(cmd.name()).to_ascii_uppercase();
		let args = cmd.arguments();

		if !session.authenticated && name != "AUTH" {
			return error("NOAUTH Authentication required.");
		}

		if name != "MONITOR" {
			self.broadcast(session, &cmd);
		}

		match (name.as_str(), args) {
			("PING", []) if self.is_subscribed(session) => {
				reply(array![Reply::bulk("pong"), Reply::bulk("")])
			}
			("PING", [message]) if self.is_subscribed(session) => {
				reply(array![Reply::bulk("pong"), message.clone()])
			}
			("PING", []) => reply(Reply::status("PONG")),
			("PING", [message]) | ("ECHO", [message]) => reply(message.clone()),
			("AUTH", [.., password]) => {
				if self.password.as_deref().map(str::as_bytes) == Some(&password[..]) {
					session.authenticated = true;
					ok()
				} else {
					error("WRONGPASS invalid username-password pair or user is disabled.")
				}
			}
			("SELECT", [db]) => match std::str::from_utf8(db).ok().and_then(|db| db.parse().ok()) {
				Some(db) => {
					session.db = db;
					ok()
				}
				None => error("ERR value is not an integer or out of range"),
			},
			("CLIENT", [sub, name]) if sub.eq_ignore_ascii_case(b"SETNAME") => {
				self.names.lock().unwrap().push(name.clone());
				ok()
			}
			("SET", [key, value, ..]) => {
				self.strings
					.lock()
					.unwrap()
					.insert((session.db, key.clone()), value.clone());
				ok()
			}
			("GET", [key]) => reply(
				self.strings
					.lock()
					.unwrap()
					.get(&(session.db, key.clone()))
					.cloned()
					.map_or(Reply::Bulk(None), Reply::from),
			),
			("DEL", keys) if !keys.is_empty() => {
				let mut strings = self.strings.lock().unwrap();
				let mut lists = self.lists.lock().unwrap();
				let removed = keys
					.iter()
					.filter(|key| {
						let key = (session.db, (*key).clone());
						let string = strings.remove(&key).is_some();
						let list = lists.remove(&key).is_some();
						string || list
					})
					.count();
				reply(removed as i64)
			}
			("RPUSH", [key, values @ ..]) if !values.is_empty() => {
				let mut lists = self.lists.lock().unwrap();
				let list = lists.entry((session.db, key.clone())).or_default();
				list.extend(values.iter().cloned());
				reply(list.len() as i64)
			}
			("BLPOP", [keys @ .., timeout]) if !keys.is_empty() => {
				let timeout = std::str::from_utf8(timeout)
					.ok()
					.and_then(|timeout| timeout.parse::<f64>().ok());
				match timeout {
					Some(timeout) => self.blpop(session.db, keys, timeout).await,
					None => error("ERR timeout is not a float or out of range"),
				}
			}
			("PUBLISH", [channel, message]) => reply(self.publish(channel, message, false)),
			("SPUBLISH", [channel, message]) => reply(self.publish(channel, message, true)),
			("SUBSCRIBE" | "PSUBSCRIBE" | "SSUBSCRIBE", names) if !names.is_empty() => {
				Outcome::Replies(self.subscribe(session, &name.to_ascii_lowercase(), names))
			}
			("UNSUBSCRIBE" | "PUNSUBSCRIBE" | "SUNSUBSCRIBE", names) => {
				Outcome::Replies(self.unsubscribe(session, &name.to_ascii_lowercase(), names))
			}
			("MONITOR", []) => {
				self.monitors.lock().unwrap().push(session.tx.clone());
				ok()
			}
			("SLEEP", [millis]) => {
				let millis = std::str::from_utf8(millis)
					.ok()
					.and_then(|millis| millis.parse().ok())
					.unwrap_or(0);
				sleep(Duration::from_millis(millis)).await;
				ok()
			}
			("STALL", [millis]) => {
				let millis = std::str::from_utf8(millis)
					.ok()
					.and_then(|millis| millis.parse().ok())
					.unwrap_or(0);
				Outcome::Stall(Duration::from_millis(millis))
			}
			("CRASH", []) => Outcome::Hangup,
			("GARBAGE", []) => Outcome::Raw(b"%garbage\r\n"),
			_ => error(&format!(
				"ERR unknown command '{}'",
				String::from_utf8_lossy(cmd.name())
			)),
		}
	}

	fn is_subscribed(&self, session: &Session) -> bool {
		self.subscribers
			.lock()
			.unwrap()
			.get(&session.id)
			.map_or(false, Subscriber::is_subscribed)
	}

	async fn blpop(&self, db: i64, keys: &[Bytes], timeout: f64) -> Outcome {
		let deadline = (timeout > 0.0).then(|| Instant::now() + Duration::from_secs_f64(timeout));

		loop {
			{
				let mut lists = self.lists.lock().unwrap();
				for key in keys {
					if let Some(value) = lists
						.get_mut(&(db, key.clone()))
						.and_then(VecDeque::pop_front)
					{
						return reply(array![key.clone(), value]);
					}
				}
			}

			if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
				return reply(Reply::Array(None));
			}

			sleep(Duration::from_millis(5)).await;
		}
	}

	fn publish(&self, channel: &Bytes, message: &Bytes, sharded: bool) -> i64 {
		let subscribers = self.subscribers.lock().unwrap();
		let mut receivers = 0;

		for sub in subscribers.values() {
			if sharded {
				if sub.shards.contains(channel) {
					let _ = sub.tx.send(array![
						Reply::bulk("smessage"),
						channel.clone(),
						message.clone()
					]);
					receivers += 1;
				}
				continue;
			}

			if sub.channels.contains(channel) {
				let _ = sub.tx.send(array![
					Reply::bulk("message"),
					channel.clone(),
					message.clone()
				]);
				receivers += 1;
			}

			for pattern in &sub.patterns {
				if glob(pattern, channel) {
					let _ = sub.tx.send(array![
						Reply::bulk("pmessage"),
						pattern.clone(),
						channel.clone(),
						message.clone()
					]);
					receivers += 1;
				}
			}
		}

		receivers
	}

	fn subscribe(&self, session: &Session, kind: &str, names: &[Bytes]) -> Vec<Reply> {
		let mut subscribers = self.subscribers.lock().unwrap();
		let sub = subscribers.entry(session.id).or_insert_with(|| Subscriber {
			tx: session.tx.clone(),
			channels: HashSet::new(),
			patterns: HashSet::new(),
			shards: HashSet::new(),
		});

		names
			.iter()
			.map(|name| {
				sub.set(kind).insert(name.clone());
				array![Reply::bulk(kind), name.clone(), sub.count(kind)]
			})
			.collect()
	}

	fn unsubscribe(&self, session: &Session, kind: &str, names: &[Bytes]) -> Vec<Reply> {
		let mut subscribers = self.subscribers.lock().unwrap();
		let sub = match subscribers.get_mut(&session.id) {
			Some(sub) => sub,
			None => return vec![array![Reply::bulk(kind), (), 0i64]],
		};

		let mut names = names.to_vec();
		if names.is_empty() {
			names = sub.set(kind).iter().cloned().collect();
			names.sort();
		}

		if names.is_empty() {
			return vec![array![Reply::bulk(kind), (), sub.count(kind)]];
		}

		names
			.into_iter()
			.map(|name| {
				sub.set(kind).remove(&name);
				array![Reply::bulk(kind), name, sub.count(kind)]
			})
			.collect()
	}

	fn broadcast(&self, session: &Session, cmd: &Cmd) {
		let mut monitors = self.monitors.lock().unwrap();
		if monitors.is_empty() {
			return;
		}

		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default();
		let mut line = format!(
			"{}.{:06} [{} {}]",
			now.as_secs(),
			now.subsec_micros(),
			session.db,
			session.peer
		);
		for part in std::iter::once(cmd.name()).chain(cmd.arguments().iter().map(|arg| &arg[..])) {
			line.push_str(" \"");
			line.push_str(&escape(part));
			line.push('"');
		}

		monitors.retain(|monitor| monitor.send(Reply::Status(line.clone())).is_ok());
	}
}

fn escape(bytes: &[u8]) -> String {
	let mut out = String::new();
	for &byte in bytes {
		match byte {
			b'"' => out.push_str("\\\""),
			b'\\' => out.push_str("\\\\"),
			b'\n' => out.push_str("\\n"),
			b'\r' => out.push_str("\\r"),
			b'\t' => out.push_str("\\t"),
			0x20..=0x7e => out.push(byte as char),
			other => out.push_str(&format!("\\x{:02x}", other)),
		}
	}
	out
}

fn glob(pattern: &[u8], text: &[u8]) -> bool {
	match (pattern.split_first(), text.split_first()) {
		(None, _) => text.is_empty(),
		(Some((b'*', rest)), _) => glob(rest, text) || (!text.is_empty() && glob(pattern, &text[1..])),
		(Some((b'?', rest)), Some((_, text))) => glob(rest, text),
		(Some((p, rest)), Some((t, text))) if p == t => glob(rest, text),
		_ => false,
	}
}
