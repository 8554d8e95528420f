use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use log::{debug, error, info, warn};

use crate::common::{camera_path, CameraId, CameraMap, LiftRecord};
use crate::data_source::SharedSource;
use crate::registry::LiftRegistry;



/// Owns one live subscription per camera and keeps the registry current.
///
/// Dropping the feed does not stop its tasks; call [`LiveFeed::release`].
pub struct LiveFeed {
	registry: Arc<RwLock<LiftRegistry>>,
	updates: Arc<watch::Sender<CameraMap>>,
	failures: Arc<RwLock<BTreeMap<CameraId, String>>>,
	followers: Mutex<Vec<JoinHandle<()>>>,
}

impl LiveFeed {
	pub fn start(source: SharedSource, ids: &[&str]) -> Self {
		let registry = LiftRegistry::new(ids.iter().copied());
		let (updates, _) = watch::channel(registry.snapshot());

		// Using tokio::sync::RwLock so renders can read the registry concurrently
		// while each follower only takes the write lock for its own slot.
		let registry = Arc::new(RwLock::new(registry));
		let updates = Arc::new(updates);
		let failures = Arc::new(RwLock::new(BTreeMap::new()));

		let followers = ids
			.iter()
			.map(|id| {
				tokio::spawn(follow_camera(
					source.clone(),
					id.to_string(),
					registry.clone(),
					updates.clone(),
					failures.clone(),
				))
			})
			.collect();

		LiveFeed {
			registry,
			updates,
			failures,
			followers: Mutex::new(followers),
		}
	}

	pub fn registry(&self) -> &RwLock<LiftRegistry> {
		&self.registry
	}

	pub async fn snapshot(&self) -> CameraMap {
		self.registry.read().await.snapshot()
	}

	pub async fn get(&self, id: &str) -> Option<LiftRecord> {
		self.registry.read().await.get(id).cloned()
	}

	/// Receives a copy of the registry after every applied update.
	pub fn watch(&self) -> watch::Receiver<CameraMap> {
		self.updates.subscribe()
	}

	/// Cameras whose subscription has failed, with the reason.
	pub async fn failures(&self) -> BTreeMap<CameraId, String> {
		self.failures.read().await.clone()
	}

	/// Stops every follower, releasing its subscription.
	pub async fn release(&self) {
		let followers: Vec<JoinHandle<()>> = self.followers.lock().await.drain(..).collect();
		for follower in &followers {
			follower.abort();
		}
		for follower in followers {
			let _ = follower.await;
		}
		info!("Live feed released");
	}
}

async fn follow_camera(
	source: SharedSource,
	id: CameraId,
	registry: Arc<RwLock<LiftRegistry>>,
	updates: Arc<watch::Sender<CameraMap>>,
	failures: Arc<RwLock<BTreeMap<CameraId, String>>>,
) {
	let path = camera_path(&id);
	let mut subscription = match source.subscribe(&path).await {
		Ok(subscription) => subscription,
		Err(err) => {
			error!("Failed to subscribe to {}; error was {}", path, err);
			failures.write().await.insert(id, err.to_string());
			return;
		}
	};
	info!("Subscribed to {}", subscription.path());

	while let Some(event) = subscription.next().await {
		match event {
			Ok(snapshot) => {
				debug!("{} changed", snapshot.key());
				let lifts = {
					let mut registry = registry.write().await;
					registry.apply_update(&id, snapshot.val());
					registry.snapshot()
				};
				failures.write().await.remove(&id);
				updates.send_replace(lifts);
			},
			Err(err) => {
				warn!("Live updates for {} failed; error was {}", path, err);
				failures.write().await.insert(id.clone(), err.to_string());
			},
		}
	}

	subscription.release();
}
