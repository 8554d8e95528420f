use log::debug;

use crate::common::{CameraMap, LiftRecord, CAMERAS_PATH};
use crate::data_source::DataSource;
use crate::error::{Error, Result};



pub const INVALID_LOCATION: &str = "Please enter a valid location";
pub const NO_MATCHES: &str = "No cameras found for this location";
pub const NO_CAMERA_DATA: &str = "No data available for this search.";

/// Trims the input, rejecting it when nothing is left.
pub fn validate(input: &str) -> Result<&str> {
	let term = input.trim();
	if term.is_empty() {
		return Err(Error::Validation(INVALID_LOCATION.to_string()));
	}
	Ok(term)
}

/// Reads every camera once and keeps those whose location equals `input`,
/// ignoring case. Each call issues a fresh read.
pub async fn find_by_location(source: &dyn DataSource, input: &str) -> Result<CameraMap> {
	let term = validate(input)?.to_lowercase();

	let snapshot = source.read_once(CAMERAS_PATH).await?;
	if !snapshot.exists() {
		return Err(Error::NotFound(NO_CAMERA_DATA.to_string()));
	}

	let matches: CameraMap = snapshot
		.children()
		.filter(|(_, value)| {
			value
				.get("location")
				.and_then(|location| location.as_str())
				.map_or(false, |location| location.to_lowercase() == term)
		})
		.map(|(id, value)| (id.to_string(), LiftRecord::from_value(Some(value))))
		.collect();

	debug!("Search for {:?} matched {} camera(s)", term, matches.len());
	if matches.is_empty() {
		return Err(Error::NotFound(NO_MATCHES.to_string()));
	}
	Ok(matches)
}
