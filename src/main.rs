#[macro_use] extern crate rocket;
#[macro_use] extern crate serde_derive;

use std::sync::Arc;

use rocket::{Request, Response};
use rocket::fairing::{AdHoc, Fairing, Info, Kind};
use rocket::http::Header;

use log::info;

use crate::config::FirebaseConfig;
use crate::data_source::{FirebaseSource, SharedSource};

mod common;
mod config;
mod data_source;
mod error;
mod live_feed;
mod registry;
mod rest_api;
mod search;
mod view;



// The JSON endpoints and event stream may be consumed from pages served elsewhere.
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
	fn info(&self) -> Info {
		Info {
			name: "Add CORS headers to responses",
			kind: Kind::Response
		}
	}

	async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
		response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
		response.set_header(Header::new("Access-Control-Allow-Methods", "GET, OPTIONS"));
		response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
	}
}


#[rocket::main]
async fn main() -> anyhow::Result<()> {
	let matches = config::command().get_matches();

	// Missing connection parameters are fatal before anything is served.
	let firebase = FirebaseConfig::from_matches(&matches)?;
	let source: SharedSource = Arc::new(FirebaseSource::new(&firebase)?);

	rocket::build()
		.attach(AdHoc::on_liftoff("Firebase summary", move |_| Box::pin(async move {
			info!(
				"Using Firebase project {} (auth domain {}, bucket {}, api key {}) at {}",
				firebase.project_id,
				firebase.auth_domain,
				firebase.storage_bucket,
				firebase.api_key_hint(),
				firebase.database_url,
			);
		})))
		.attach(rest_api::stage(source))
		.attach(CORS)
		.launch()
		.await?;

	anyhow::Ok(())
}
