//! Firebase Realtime Database over its REST interface.
//!
//! One-shot reads are plain `GET {path}.json` requests. Subscriptions use the
//! same URL with `Accept: text/event-stream`; the server then streams `put` and
//! `patch` events relative to the subscribed path, starting with a `put` of
//! the whole current value.

use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use log::{debug, info, warn};

use crate::config::FirebaseConfig;
use crate::data_source::{tree, DataSource, Snapshot, Subscription};
use crate::error::{Error, Result};



const EVENT_BUFFER: usize = 16;

pub struct FirebaseSource {
	client: reqwest::Client,
	database_url: Url,
	auth_token: Option<String>,
}

impl FirebaseSource {
	pub fn new(config: &FirebaseConfig) -> Result<Self> {
		let client = reqwest::Client::builder()
			.build()
			.map_err(|err| Error::Config(format!("failed to build HTTP client: {}", err)))?;

		Ok(FirebaseSource {
			client,
			database_url: config.database_url.clone(),
			auth_token: config.auth_token.clone(),
		})
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		let mut url = self.database_url.join(&format!("{}.json", path.trim_matches('/')))?;
		if let Some(token) = &self.auth_token {
			url.query_pairs_mut().append_pair("auth", token);
		}
		Ok(url)
	}
}

#[rocket::async_trait]
impl DataSource for FirebaseSource {
	async fn subscribe(&self, path: &str) -> Result<Subscription> {
		let response = self.client
			.get(self.endpoint(path)?)
			.header(ACCEPT, "text/event-stream")
			.send()
			.await?
			.error_for_status()?;

		let (events, receiver) = mpsc::channel(EVENT_BUFFER);
		let feeder = tokio::spawn(pump_events(path.to_string(), response, events));
		info!("Streaming {} from {}", path, self.database_url);
		Ok(Subscription::new(path, receiver, feeder))
	}

	async fn read_once(&self, path: &str) -> Result<Snapshot> {
		let response = self.client
			.get(self.endpoint(path)?)
			.send()
			.await?
			.error_for_status()?;
		let value: Value = response.json().await?;
		debug!("Read {} once", path);
		Ok(Snapshot::new(path, Some(value)))
	}
}

async fn pump_events(path: String, response: reqwest::Response, events: mpsc::Sender<Result<Snapshot>>) {
	let mut body = response.bytes_stream();
	let mut parser = EventParser::default();
	let mut value = Value::Null;

	while let Some(chunk) = body.next().await {
		let chunk = match chunk {
			Ok(chunk) => chunk,
			Err(err) => {
				let _ = events.send(Err(err.into())).await;
				return;
			}
		};

		for event in parser.feed(&chunk) {
			let outcome = apply_event(&mut value, &event);
			let item = match outcome {
				Ok(true) => Ok(Snapshot::new(&path, Some(value.clone()))),
				Ok(false) => continue,
				Err(err) => Err(err),
			};
			let failed = item.is_err();
			if events.send(item).await.is_err() || failed {
				return;
			}
		}
	}

	warn!("Event stream for {} closed by server", path);
	let _ = events.send(Err(Error::Transport(format!("event stream for {} closed", path)))).await;
}

#[derive(Deserialize)]
struct Change {
	path: String,
	data: Value,
}

/// Applies one server event to the local copy. Returns whether the value
/// changed; events that end the stream come back as errors.
fn apply_event(value: &mut Value, event: &ServerEvent) -> Result<bool> {
	match event.name.as_str() {
		"put" | "patch" => {
			let change: Change = match serde_json::from_str(&event.data) {
				Ok(change) => change,
				Err(err) => {
					warn!("Ignoring malformed {} event; error was {}", event.name, err);
					return Ok(false);
				}
			};
			if event.name == "put" {
				tree::put(value, &change.path, change.data);
			} else {
				tree::patch(value, &change.path, change.data);
			}
			Ok(true)
		},
		"keep-alive" => Ok(false),
		"cancel" => Err(Error::Transport(format!("stream cancelled by server: {}", event.data))),
		"auth_revoked" => Err(Error::Transport("stream credential expired".to_string())),
		other => {
			debug!("Ignoring unknown event {}", other);
			Ok(false)
		},
	}
}

#[derive(Debug, PartialEq)]
struct ServerEvent {
	name: String,
	data: String,
}

/// Splits a `text/event-stream` body into events. Chunks may end anywhere,
/// including inside a UTF-8 sequence, so bytes are buffered until a blank line.
#[derive(Default)]
struct EventParser {
	buffer: Vec<u8>,
}

impl EventParser {
	fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
		self.buffer.extend(chunk.iter().filter(|&&b| b != b'\r'));

		let mut events = Vec::new();
		while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
			let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
			if let Some(event) = parse_block(&String::from_utf8_lossy(&block[..end])) {
				events.push(event);
			}
		}
		events
	}
}

fn parse_block(block: &str) -> Option<ServerEvent> {
	let mut name = None;
	let mut data: Vec<&str> = Vec::new();

	for line in block.lines() {
		let (field, rest) = match line.split_once(':') {
			Some((field, rest)) => (field, rest.strip_prefix(' ').unwrap_or(rest)),
			None => (line, ""),
		};
		match field {
			"event" => name = Some(rest.to_string()),
			"data" => data.push(rest),
			// Comment lines start with ':' and leave an empty field name.
			_ => {},
		}
	}

	name.map(|name| ServerEvent {
		name,
		data: data.join("\n"),
	})
}
