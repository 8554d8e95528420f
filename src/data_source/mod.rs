//! Access to the hosted realtime database.
//!
//! The dashboard only ever needs two things from the store: a live stream of
//! values at a path, and a single read of a subtree. Both are expressed by
//! [`DataSource`] so the routes can run against Firebase in production and an
//! in-memory store under test.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use log::debug;

use crate::error::Result;

pub mod firebase;
mod tree;

#[cfg(test)]
pub mod memory;

pub use firebase::FirebaseSource;



pub type SharedSource = Arc<dyn DataSource>;

#[rocket::async_trait]
pub trait DataSource: Send + Sync {
	/// Starts streaming the value at `path`.
	///
	/// The first event carries the current value (or an empty snapshot) and
	/// every later write produces another. The stream runs until the returned
	/// [`Subscription`] is released or dropped.
	async fn subscribe(&self, path: &str) -> Result<Subscription>;

	/// Reads the value at `path` and all of its descendants once.
	async fn read_once(&self, path: &str) -> Result<Snapshot>;
}

/// Point-in-time value of one subtree.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct Snapshot {
	key: String,
	value: Option<Value>,
}

impl Snapshot {
	pub fn new(path: &str, value: Option<Value>) -> Self {
		let key = path.trim_matches('/').rsplit('/').next().unwrap_or_default().to_string();
		Snapshot {
			key,
			value: value.filter(|v| !v.is_null()),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn exists(&self) -> bool {
		self.value.is_some()
	}

	pub fn val(&self) -> Option<&Value> {
		self.value.as_ref()
	}

	/// Direct children in the snapshot's own order. Scalars have none.
	pub fn children(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.value
			.as_ref()
			.and_then(Value::as_object)
			.into_iter()
			.flat_map(|map| map.iter())
			.map(|(key, value)| (key.as_str(), value))
	}
}

/// Handle on a live subscription.
///
/// Yields one item per value change. A transport failure is delivered as an
/// `Err` item, after which the stream ends. Releasing or dropping the handle
/// stops the task feeding it.
pub struct Subscription {
	path: String,
	events: mpsc::Receiver<Result<Snapshot>>,
	feeder: Option<JoinHandle<()>>,
}

impl Subscription {
	pub fn new(path: &str, events: mpsc::Receiver<Result<Snapshot>>, feeder: JoinHandle<()>) -> Self {
		Subscription {
			path: path.to_string(),
			events,
			feeder: Some(feeder),
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub async fn next(&mut self) -> Option<Result<Snapshot>> {
		self.events.recv().await
	}

	pub fn release(mut self) {
		self.stop();
	}

	fn stop(&mut self) {
		if let Some(feeder) = self.feeder.take() {
			debug!("Releasing subscription to {}", self.path);
			feeder.abort();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.stop();
	}
}

impl Stream for Subscription {
	type Item = Result<Snapshot>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.get_mut().events.poll_recv(cx)
	}
}
