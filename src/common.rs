use std::collections::BTreeMap;

use serde_json::Value;



pub type CameraId = String;
pub type CameraMap = BTreeMap<CameraId, LiftRecord>;

pub const CAMERAS_PATH: &str = "cameras";
pub const CAMERA_IDS: [&str; 4] = ["camera1", "camera2", "camera3", "camera4"];

pub const UNKNOWN_LOCATION: &str = "Unknown location";
pub const NO_DATA: &str = "No data";

pub fn camera_path(id: &str) -> String {
	format!("{}/{}", CAMERAS_PATH, id)
}

/// Latest occupancy report for one lift camera.
///
/// Every field is carried as the opaque string the publisher wrote; only
/// `crowd_density` is ever interpreted, and only for display.
#[derive(Clone)]
#[derive(Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct LiftRecord {
	pub location: String,
	pub people_count: String,
	pub crowd_density: String,
	pub timestamp: String,
}

impl LiftRecord {
	/// Placeholder shown for a camera that has never reported.
	pub fn no_data() -> Self {
		Self::from_value(None)
	}

	/// Builds a record from a raw database value, filling in a sentinel for
	/// each field that is absent, null, empty or not a scalar.
	pub fn from_value(value: Option<&Value>) -> Self {
		let field = |name: &str, default: &str| {
			value
				.and_then(|v| v.get(name))
				.and_then(opaque_string)
				.unwrap_or_else(|| default.to_string())
		};

		LiftRecord {
			location: field("location", UNKNOWN_LOCATION),
			people_count: field("people_count", NO_DATA),
			crowd_density: field("crowd_density", NO_DATA),
			timestamp: field("timestamp", NO_DATA),
		}
	}

	pub fn density(&self) -> CrowdDensity {
		CrowdDensity::classify(&self.crowd_density)
	}
}

// The publisher writes counts as JSON numbers; keep their textual form.
fn opaque_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum CrowdDensity {
	Low,
	Medium,
	High,
	Unknown,
}

impl CrowdDensity {
	pub fn classify(raw: &str) -> Self {
		match raw {
			"low" => CrowdDensity::Low,
			"medium" => CrowdDensity::Medium,
			"high" => CrowdDensity::High,
			_ => CrowdDensity::Unknown,
		}
	}

	pub fn border_color(self) -> &'static str {
		match self {
			CrowdDensity::Low => "green",
			CrowdDensity::Medium => "orange",
			CrowdDensity::High => "red",
			CrowdDensity::Unknown => "gray",
		}
	}
}
