/// Events decoded from a `MONITOR` stream.
pub mod monitor;
/// Push replies received in Pub/Sub mode.
pub mod pubsub;
