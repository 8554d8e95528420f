use clap::{Arg, ArgMatches, Command};
use url::Url;

use crate::error::{Error, Result};



// (argument id, environment variable, help)
const CONNECTION_ARGS: [(&str, &str, &str); 5] = [
	("api-key", "FIREBASE_API_KEY", "Firebase web API key"),
	("auth-domain", "FIREBASE_AUTH_DOMAIN", "Firebase auth domain"),
	("database-url", "FIREBASE_DATABASE_URL", "Realtime database URL"),
	("project-id", "FIREBASE_PROJECT_ID", "Firebase project id"),
	("storage-bucket", "FIREBASE_STORAGE_BUCKET", "Firebase storage bucket"),
];

pub fn command() -> Command {
	let mut command = Command::new("ecm-dashboard")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Elevator crowd monitoring dashboard.");

	for (id, var, help) in CONNECTION_ARGS {
		command = command.arg(
			Arg::new(id)
				.long(id)
				.env(var)
				.help(help)
		);
	}

	command.arg(
		Arg::new("auth-token")
			.long("auth-token")
			.env("FIREBASE_AUTH_TOKEN")
			.help("Database secret or ID token sent as the `auth` query parameter")
	)
}

/// Connection parameters for the hosted database.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct FirebaseConfig {
	pub api_key: String,
	pub auth_domain: String,
	pub database_url: Url,
	pub project_id: String,
	pub storage_bucket: String,
	pub auth_token: Option<String>,
}

impl FirebaseConfig {
	pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
		Self::from_lookup(|id| matches.get_one::<String>(id).cloned())
	}

	/// Builds the config from a lookup keyed by argument id. Every missing
	/// parameter is reported at once.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut missing = Vec::new();
		let mut values = Vec::new();
		for (id, var, _) in CONNECTION_ARGS {
			match lookup(id).filter(|value| !value.trim().is_empty()) {
				Some(value) => values.push(value.trim().to_string()),
				None => missing.push(var),
			}
		}
		if !missing.is_empty() {
			return Err(Error::Config(format!("missing {}", missing.join(", "))));
		}

		let mut values = values.into_iter();
		let mut next = || values.next().unwrap_or_default();
		let api_key = next();
		let auth_domain = next();
		let database_url = parse_database_url(&next())?;
		let project_id = next();
		let storage_bucket = next();

		Ok(FirebaseConfig {
			api_key,
			auth_domain,
			database_url,
			project_id,
			storage_bucket,
			auth_token: lookup("auth-token").filter(|token| !token.is_empty()),
		})
	}

	/// Last four characters of the API key, for logs.
	pub fn api_key_hint(&self) -> String {
		let start = self.api_key.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
		format!("…{}", &self.api_key[start..])
	}
}

// Relative joins need the base path to end in a slash.
fn parse_database_url(raw: &str) -> Result<Url> {
	let mut url = Url::parse(raw)?;
	if url.scheme() != "https" && url.scheme() != "http" {
		return Err(Error::Config(format!("database URL must be http(s), got {}", raw)));
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());
		url.set_path(&path);
	}
	Ok(url)
}



#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn full() -> HashMap<&'static str, String> {
		HashMap::from([
			("api-key", "AIzaSyDemoKey1234".to_string()),
			("auth-domain", "ecm-demo.firebaseapp.com".to_string()),
			("database-url", "https://ecm-demo-default-rtdb.firebaseio.com".to_string()),
			("project-id", "ecm-demo".to_string()),
			("storage-bucket", "ecm-demo.appspot.com".to_string()),
		])
	}

	fn load(values: &HashMap<&'static str, String>) -> Result<FirebaseConfig> {
		FirebaseConfig::from_lookup(|id| values.get(id).cloned())
	}

	#[test]
	fn complete_config_loads() {
		let config = load(&full()).unwrap();
		assert_eq!(config.project_id, "ecm-demo");
		assert_eq!(config.database_url.as_str(), "https://ecm-demo-default-rtdb.firebaseio.com/");
		assert_eq!(config.auth_token, None);
		assert_eq!(config.api_key_hint(), "…1234");
	}

	#[test]
	fn every_missing_parameter_is_named() {
		let mut values = full();
		values.remove("api-key");
		values.insert("storage-bucket", "   ".to_string());
		match load(&values) {
			Err(Error::Config(message)) => {
				assert!(message.contains("FIREBASE_API_KEY"));
				assert!(message.contains("FIREBASE_STORAGE_BUCKET"));
				assert!(!message.contains("FIREBASE_PROJECT_ID"));
			},
			other => panic!("expected config error, got {:?}", other),
		}
	}

	#[test]
	fn database_url_must_be_http() {
		let mut values = full();
		values.insert("database-url", "ftp://example.com".to_string());
		assert!(matches!(load(&values), Err(Error::Config(_))));

		values.insert("database-url", "not a url".to_string());
		assert!(matches!(load(&values), Err(Error::Config(_))));
	}

	#[test]
	fn database_url_keeps_its_path() {
		let mut values = full();
		values.insert("database-url", "http://localhost:9000/ns".to_string());
		assert_eq!(load(&values).unwrap().database_url.as_str(), "http://localhost:9000/ns/");
	}

	#[test]
	fn command_line_flags_are_accepted() {
		let matches = command().try_get_matches_from([
			"ecm-dashboard",
			"--api-key", "key",
			"--auth-domain", "ecm-demo.firebaseapp.com",
			"--database-url", "https://ecm-demo.firebaseio.com/",
			"--project-id", "ecm-demo",
			"--storage-bucket", "ecm-demo.appspot.com",
			"--auth-token", "secret",
		]).unwrap();
		let config = FirebaseConfig::from_matches(&matches).unwrap();
		assert_eq!(config.auth_token.as_deref(), Some("secret"));
		assert_eq!(config.api_key_hint(), "…key");
	}
}
