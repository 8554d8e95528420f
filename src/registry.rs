use std::collections::BTreeSet;

use serde_json::Value;

use crate::common::{CameraId, CameraMap, LiftRecord, CAMERA_IDS};



/// Latest known record for each tracked camera.
///
/// Seeded with a sentinel record per camera so readers always see the full
/// set; `reported` tracks which cameras have delivered a real event.
#[derive(Clone)]
#[derive(Debug)]
pub struct LiftRegistry {
	records: CameraMap,
	reported: BTreeSet<CameraId>,
}

impl LiftRegistry {
	pub fn new<I, S>(ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<CameraId>,
	{
		LiftRegistry {
			records: ids.into_iter().map(|id| (id.into(), LiftRecord::no_data())).collect(),
			reported: BTreeSet::new(),
		}
	}

	/// Replaces the record for `id` with one built from `raw`. An absent value
	/// stores the sentinel record. Never fails.
	pub fn apply_update(&mut self, id: &str, raw: Option<&Value>) {
		self.records.insert(id.to_string(), LiftRecord::from_value(raw));
		self.reported.insert(id.to_string());
	}

	pub fn get(&self, id: &str) -> Option<&LiftRecord> {
		self.records.get(id)
	}

	/// Copy of the current records, safe to render while updates continue.
	pub fn snapshot(&self) -> CameraMap {
		self.records.clone()
	}

	pub fn all_reported(&self) -> bool {
		self.records.keys().all(|id| self.reported.contains(id))
	}

	/// Cameras that have not delivered a first event yet.
	pub fn pending(&self) -> Vec<CameraId> {
		self.records
			.keys()
			.filter(|id| !self.reported.contains(*id))
			.cloned()
			.collect()
	}
}

impl Default for LiftRegistry {
	fn default() -> Self {
		LiftRegistry::new(CAMERA_IDS)
	}
}
