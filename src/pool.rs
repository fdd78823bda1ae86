use std::{
	fmt,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

use async_trait::async_trait;
use deadpool::{
	managed::{self, PoolError, RecycleError, RecycleResult},
	Runtime,
};
use tracing::{debug, instrument, warn};

use crate::{
	command::{Auth, ClientSetName, Command, Select},
	config::Config,
	connection::Connection,
	error::{Error, Result},
};

/// A Deadpool [managed::Manager] for a Redis [Connection].
///
/// New connections are authenticated, switched to the configured database and named before
/// they are handed out.
#[derive(Debug, Clone)]
pub struct Manager {
	config: Config,
	/// Healthy connections returned with [Pool::put] and not yet reused.
	idle: Arc<AtomicUsize>,
}

impl Manager {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			idle: Arc::default(),
		}
	}

	async fn setup(&self, conn: &mut Connection) -> Result<()> {
		if let Some(password) = &self.config.password {
			Auth {
				username: self.config.username.clone(),
				password: password.clone(),
			}
			.run(&mut *conn)
			.await?;
		}

		if self.config.database != 0 {
			Select(self.config.database).run(&mut *conn).await?;
		}

		if let Some(name) = &self.config.client_name {
			ClientSetName(name.clone()).run(&mut *conn).await?;
		}

		Ok(())
	}
}

#[async_trait]
impl managed::Manager for Manager {
	type Type = Connection;
	type Error = Error;

	#[instrument(level = "debug", skip(self), fields(addr = %self.config.address))]
	async fn create(&self) -> Result<Connection> {
		let mut conn = Connection::dial(&self.config.address, self.config.timeouts).await?;

		if let Err(err) = self.setup(&mut conn).await {
			conn.close().await;
			return Err(err);
		}

		Ok(conn)
	}

	async fn recycle(&self, conn: &mut Connection) -> RecycleResult<Error> {
		if !conn.is_open() {
			return Err(RecycleError::StaticMessage("connection is not open"));
		}

		if conn.pending() > 0 {
			return Err(RecycleError::StaticMessage("connection has unread replies"));
		}

		let _ = self
			.idle
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |idle| idle.checked_sub(1));
		Ok(())
	}
}

/// A checked out connection. Return it with [Pool::put]; simply dropping it also returns it,
/// but bypasses the idle limit.
pub type Object = managed::Object<Manager>;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
	/// Capacity: the most connections that may exist at once.
	pub max_size: usize,
	/// Connections currently existing, idle or checked out.
	pub size: usize,
	/// Healthy connections waiting for reuse.
	pub idle: usize,
}

/// A bounded pool of [Connection]s to one server identity.
///
/// Connections are dialed lazily on checkout. At most `max_active` exist at once; a checkout
/// beyond that waits up to `wait_timeout` for one to be returned. There is no health checking
/// beyond the last operation on a connection: one that broke is never handed out again.
#[derive(Clone)]
pub struct Pool {
	inner: managed::Pool<Manager>,
	config: Arc<Config>,
	idle: Arc<AtomicUsize>,
}

impl fmt::Debug for Pool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pool")
			.field("address", &self.config.address)
			.field("status", &self.status())
			.finish()
	}
}

impl Pool {
	pub fn new(config: Config) -> Result<Self> {
		if config.max_active == 0 {
			return Err(Error::Config("max_active must be at least 1".into()));
		}

		let manager = Manager::new(config.clone());
		let idle = Arc::clone(&manager.idle);

		let inner = managed::Pool::builder(manager)
			.max_size(config.max_active)
			.wait_timeout(config.wait_timeout)
			.runtime(Runtime::Tokio1)
			.build()
			.map_err(|err| Error::Config(err.to_string()))?;

		Ok(Self {
			inner,
			config: Arc::new(config),
			idle,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Check out a connection, reusing an idle one or dialing a new one.
	pub async fn get(&self) -> Result<Object> {
		self.inner.get().await.map_err(|err| match err {
			PoolError::Backend(err) => err,
			PoolError::Timeout(_) => Error::PoolExhausted,
			PoolError::Closed => Error::PoolClosed,
			other => Error::Config(other.to_string()),
		})
	}

	/// Return a connection. Broken connections, and healthy ones beyond the idle limit, are
	/// closed instead of kept.
	pub async fn put(&self, conn: Object, broken: bool) {
		if broken || !conn.is_open() || conn.pending() > 0 {
			let mut conn = Object::take(conn);
			warn!(id = conn.id(), "discarding broken connection");
			conn.close().await;
			return;
		}

		if self.is_closed() {
			let mut conn = Object::take(conn);
			debug!(id = conn.id(), "pool closed, closing returned connection");
			conn.close().await;
			return;
		}

		let max_idle = self.config.max_idle;
		let kept = self
			.idle
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |idle| {
				(idle < max_idle).then(|| idle + 1)
			})
			.is_ok();

		if !kept {
			let mut conn = Object::take(conn);
			debug!(id = conn.id(), "idle limit reached, closing connection");
			conn.close().await;
		}
	}

	/// Take a connection out of rotation for good, freeing its slot. The caller owns the
	/// returned connection and is responsible for closing it.
	pub fn detach(&self, conn: Object) -> Connection {
		let conn = Object::take(conn);
		debug!(id = conn.id(), "detached connection from pool");
		conn
	}

	pub fn status(&self) -> Status {
		let status = self.inner.status();
		Status {
			max_size: status.max_size,
			size: status.size,
			idle: self.idle.load(Ordering::SeqCst),
		}
	}

	/// Close idle connections and fail every later checkout with [Error::PoolClosed].
	/// Connections still checked out are closed when they are returned.
	pub fn close(&self) {
		debug!("closing pool");
		self.inner.close();
		self.idle.store(0, Ordering::SeqCst);
	}

	pub fn is_closed(&self) -> bool {
		self.inner.is_closed()
	}
}
