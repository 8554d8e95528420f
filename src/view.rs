//! Dashboard page state and rendering.
//!
//! A [`View`] is either following the live registry or showing the result of
//! one search. It starts in `Loading` and only leaves it on the live path once
//! every camera has reported; until then the cameras received so far are shown
//! beneath the loading indicator.

use crate::common::{CameraId, CameraMap, LiftRecord};
use crate::data_source::DataSource;
use crate::error::Error;
use crate::registry::LiftRegistry;
use crate::search;



pub const SEARCH_FAILED: &str = "An error occurred while searching.";
const LIVE_REFRESH_SECS: u32 = 5;

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum ViewState {
	Loading,
	LiveFeed,
	SearchResults,
}

#[derive(Debug)]
pub struct View {
	state: ViewState,
	search_pending: bool,
	displayed: CameraMap,
	pending: Vec<CameraId>,
	notice: Option<String>,
}

/// One rendered camera.
#[derive(Debug, PartialEq)]
pub struct Card<'a> {
	pub id: &'a str,
	pub title: String,
	pub record: &'a LiftRecord,
	pub border: &'static str,
}

impl View {
	pub fn mount() -> Self {
		View {
			state: ViewState::Loading,
			search_pending: false,
			displayed: CameraMap::new(),
			pending: Vec::new(),
			notice: None,
		}
	}

	pub fn state(&self) -> ViewState {
		self.state
	}

	pub fn displayed(&self) -> &CameraMap {
		&self.displayed
	}

	pub fn notice(&self) -> Option<&str> {
		self.notice.as_deref()
	}

	/// Follows the registry unless a search owns the display.
	pub fn on_registry_update(&mut self, registry: &LiftRegistry) {
		if self.search_pending || self.state == ViewState::SearchResults {
			return;
		}
		self.displayed = registry.snapshot();
		self.pending = registry.pending();
		self.state = if registry.all_reported() {
			ViewState::LiveFeed
		} else {
			ViewState::Loading
		};
	}

	/// Returns to the live registry, dropping any search result.
	pub fn show_live(&mut self, registry: &LiftRegistry) {
		self.search_pending = false;
		self.state = ViewState::Loading;
		self.notice = None;
		self.on_registry_update(registry);
	}

	pub fn begin_search(&mut self) {
		self.state = ViewState::Loading;
		self.search_pending = true;
		self.displayed.clear();
		self.pending.clear();
		self.notice = None;
	}

	pub fn finish_search(&mut self, result: Result<CameraMap, Error>) {
		self.search_pending = false;
		self.state = ViewState::SearchResults;
		match result {
			Ok(matches) => self.displayed = matches,
			Err(err) => {
				self.displayed.clear();
				self.notice = Some(notice_for(&err));
			},
		}
	}

	/// Runs a search end to end. Blank input only sets the notice and leaves
	/// the current display alone.
	pub async fn search(&mut self, source: &dyn DataSource, input: &str) {
		if let Err(err) = search::validate(input) {
			self.notice = Some(notice_for(&err));
			return;
		}
		self.begin_search();
		let result = search::find_by_location(source, input).await;
		self.finish_search(result);
	}

	pub fn attach_notice(&mut self, notice: impl Into<String>) {
		self.notice = Some(notice.into());
	}

	pub fn cards(&self) -> Vec<Card<'_>> {
		self.displayed
			.iter()
			.map(|(id, record)| Card {
				id,
				title: lift_title(id),
				record,
				border: record.density().border_color(),
			})
			.collect()
	}

	pub fn render(&self, search_term: &str) -> String {
		let refresh = match self.state {
			ViewState::SearchResults => String::new(),
			// Always back to the plain live page, so a search notice is not repeated.
			_ => format!(r#"<meta http-equiv="refresh" content="{}; url=/">"#, LIVE_REFRESH_SECS),
		};

		let loading = if self.state == ViewState::Loading {
			let waiting = if self.pending.is_empty() {
				String::new()
			} else {
				format!(" waiting for {}", html_escape(&self.pending.join(", ")))
			};
			format!(r#"<p class="loading">Loading...{}</p>"#, waiting)
		} else {
			String::new()
		};

		let notice = self
			.notice
			.as_deref()
			.map(|notice| format!(r#"<p class="notice">{}</p>"#, html_escape(notice)))
			.unwrap_or_default();

		let cards: String = self.cards().iter().map(render_card).collect();

		format!(
			r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	{refresh}
	<title>Elevator Crowd Management System</title>
	<style>
		body {{ font-family: sans-serif; margin: 0; }}
		nav {{ background: #030712; padding: 1.25rem; text-align: center; }}
		nav a {{ color: #fff; font-size: 1.5rem; font-weight: bold; text-decoration: none; }}
		form {{ display: flex; flex-direction: column; align-items: center; margin: 20px 0; }}
		input {{ padding: 10px; width: 300px; border: 1px solid #ccc; border-radius: 5px; }}
		button {{ padding: 10px 20px; margin-top: 10px; background: #007BFF; color: #fff; border: none; border-radius: 5px; }}
		.notice {{ color: red; text-align: center; }}
		.loading {{ text-align: center; }}
		.lifts {{ padding: 1rem; }}
		.card {{ margin-bottom: 1.5rem; padding: 1rem; border: 3px solid; border-radius: 0.5rem; }}
	</style>
</head>
<body>
	<nav><a href="/">Elevator Crowd Management System</a></nav>
	<form method="get" action="/">
		<input type="text" name="location" placeholder="Search by location" value="{term}">
		<button type="submit">Search</button>
	</form>
	{notice}
	{loading}
	<div class="lifts">
{cards}	</div>
</body>
</html>
"#,
			refresh = refresh,
			term = html_escape(search_term),
			notice = notice,
			loading = loading,
			cards = cards,
		)
	}
}

fn notice_for(err: &Error) -> String {
	match err {
		Error::Transport(_) => SEARCH_FAILED.to_string(),
		other => other.to_string(),
	}
}

/// `camera3` is shown as "Lift 3"; other ids are shown as-is.
pub fn lift_title(id: &str) -> String {
	match id.strip_prefix("camera") {
		Some(number) if !number.is_empty() => format!("Lift {}", number),
		_ => id.to_string(),
	}
}

fn render_card(card: &Card<'_>) -> String {
	format!(
		r#"		<div class="card" id="{id}" style="border-color: {border}">
			<h2>{title}</h2>
			<p><strong>Location:</strong> <span>{location}</span></p>
			<p><strong>People Count:</strong> <span>{people_count}</span></p>
			<p><strong>Crowd Density:</strong> <span>{crowd_density}</span></p>
			<p><strong>Last Updated:</strong> <span>{timestamp}</span></p>
		</div>
"#,
		id = html_escape(card.id),
		border = card.border,
		title = html_escape(&card.title),
		location = html_escape(&card.record.location),
		people_count = html_escape(&card.record.people_count),
		crowd_density = html_escape(&card.record.crowd_density),
		timestamp = html_escape(&card.record.timestamp),
	)
}

fn html_escape(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#39;")
}
