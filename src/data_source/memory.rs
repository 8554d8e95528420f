use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::data_source::{tree, DataSource, Snapshot, Subscription};
use crate::error::{Error, Result};



/// In-process stand-in for the realtime database.
pub struct MemorySource {
	root: watch::Sender<Value>,
	reads: AtomicUsize,
	offline: AtomicBool,
}

impl MemorySource {
	pub fn new(root: Value) -> Self {
		let (root, _) = watch::channel(root);
		MemorySource {
			root,
			reads: AtomicUsize::new(0),
			offline: AtomicBool::new(false),
		}
	}

	pub fn set(&self, path: &str, value: Value) {
		self.root.send_modify(|root| tree::put(root, path, value));
	}

	/// Number of one-shot reads issued so far.
	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}

	pub fn set_offline(&self, offline: bool) {
		self.offline.store(offline, Ordering::SeqCst);
	}

	fn check_online(&self) -> Result<()> {
		if self.offline.load(Ordering::SeqCst) {
			Err(Error::Transport("connection refused".to_string()))
		} else {
			Ok(())
		}
	}
}

#[rocket::async_trait]
impl DataSource for MemorySource {
	async fn subscribe(&self, path: &str) -> Result<Subscription> {
		self.check_online()?;

		let mut updates = self.root.subscribe();
		let (events, receiver) = mpsc::channel(16);
		let watched = path.to_string();
		let feeder = tokio::spawn(async move {
			loop {
				let value = {
					let root = updates.borrow_and_update();
					tree::get(&root, &watched).cloned()
				};
				if events.send(Ok(Snapshot::new(&watched, value))).await.is_err() {
					return;
				}
				if updates.changed().await.is_err() {
					return;
				}
			}
		});
		Ok(Subscription::new(path, receiver, feeder))
	}

	async fn read_once(&self, path: &str) -> Result<Snapshot> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		self.check_online()?;
		let value = tree::get(&self.root.borrow(), path).cloned();
		Ok(Snapshot::new(path, value))
	}
}
