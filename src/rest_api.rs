use rocket::fairing::AdHoc;
use rocket::response::content::RawHtml;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::{json, Json, Value};
use rocket::{Shutdown, State};

use log::{debug, info};

use crate::common::{CameraMap, LiftRecord, CAMERA_IDS};
use crate::data_source::SharedSource;
use crate::error::Result;
use crate::live_feed::LiveFeed;
use crate::search;
use crate::view::View;



#[get("/?<location>")]
async fn dashboard(location: Option<&str>, feed: &State<LiveFeed>, source: &State<SharedSource>) -> RawHtml<String> {
	let mut view = View::mount();
	{
		let registry = feed.registry().read().await;
		view.show_live(&registry);
	}

	match location {
		Some(term) => view.search(source.inner().as_ref(), term).await,
		None => {
			let failures = feed.failures().await;
			if !failures.is_empty() {
				let cameras: Vec<&str> = failures.keys().map(String::as_str).collect();
				view.attach_notice(format!("Live updates unavailable for {}", cameras.join(", ")));
			}
		},
	}

	debug!("Rendering {:?} view with {} lift(s)", view.state(), view.displayed().len());
	if let Some(notice) = view.notice() {
		debug!("Showing notice: {}", notice);
	}
	RawHtml(view.render(location.unwrap_or_default()))
}

#[get("/")]
async fn list_lifts(feed: &State<LiveFeed>) -> Json<CameraMap> {
	Json(feed.snapshot().await)
}

#[get("/<id>")]
async fn get_lift(id: &str, feed: &State<LiveFeed>) -> Option<Json<LiftRecord>> {
	feed.get(id).await.map(Json)
}

#[get("/events")]
fn lift_events(feed: &State<LiveFeed>, mut shutdown: Shutdown) -> EventStream![] {
	let mut updates = feed.watch();
	EventStream! {
		loop {
			let lifts = updates.borrow_and_update().clone();
			yield Event::json(&lifts).event("lifts");
			rocket::tokio::select! {
				changed = updates.changed() => if changed.is_err() { break; },
				_ = &mut shutdown => break,
			}
		}
	}
}

#[get("/?<location>")]
async fn search_lifts(location: Option<&str>, source: &State<SharedSource>) -> Result<Json<CameraMap>> {
	let matches = search::find_by_location(source.inner().as_ref(), location.unwrap_or_default()).await?;
	Ok(Json(matches))
}

#[catch(404)]
fn not_found() -> Value {
	json!({
		"status": "error",
		"reason": "Resource was not found."
	})
}



pub fn stage(source: SharedSource) -> AdHoc {
	AdHoc::on_ignite("Lift dashboard", |rocket| async move {
		let feed = LiveFeed::start(source.clone(), &CAMERA_IDS);
		info!("Following {} cameras", CAMERA_IDS.len());

		rocket
			.manage(feed)
			.manage(source)
			.register("/", catchers![not_found])
			.mount("/", routes![dashboard])
			.mount("/v0/lifts", routes![list_lifts, get_lift, lift_events])
			.mount("/v0/search", routes![search_lifts])
			.attach(AdHoc::on_shutdown("Release live feed", |rocket| Box::pin(async move {
				if let Some(feed) = rocket.state::<LiveFeed>() {
					feed.release().await;
				}
			})))
	})
}



#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::time::Duration;

	use rocket::http::Status;
	use rocket::local::asynchronous::Client;

	use crate::data_source::memory::MemorySource;

	fn reading(location: &str, count: u32, density: &str) -> Value {
		json!({ "location": location, "people_count": count, "crowd_density": density, "timestamp": "2024-10-01T09:15:00" })
	}

	async fn client(source: Arc<MemorySource>) -> Client {
		let rocket = rocket::build().attach(stage(source));
		let client = Client::tracked(rocket).await.expect("valid rocket instance");

		let feed = client.rocket().state::<LiveFeed>().expect("live feed managed");
		for _ in 0..200 {
			if feed.registry().read().await.all_reported() {
				break;
			}
			rocket::tokio::time::sleep(Duration::from_millis(5)).await;
		}
		client
	}

	fn backing() -> Arc<MemorySource> {
		Arc::new(MemorySource::new(json!({
			"cameras": {
				"camera1": reading("Placement Office", 4, "low"),
				"camera2": reading("Lobby", 12, "medium"),
				"camera3": reading("I Mac Lab", 25, "high"),
				"camera4": reading("I Mac Lab", 0, "Under Maintenance"),
			}
		})))
	}

	#[rocket::async_test]
	async fn lists_all_lifts() {
		let client = client(backing()).await;
		let response = client.get("/v0/lifts").dispatch().await;
		assert_eq!(response.status(), Status::Ok);

		let lifts: CameraMap = response.into_json().await.unwrap();
		assert_eq!(lifts.len(), 4);
		assert_eq!(lifts["camera3"].people_count, "25");
		assert_eq!(lifts["camera4"].crowd_density, "Under Maintenance");
	}

	#[rocket::async_test]
	async fn gets_single_lift_or_404() {
		let client = client(backing()).await;
		let lift: LiftRecord = client.get("/v0/lifts/camera2").dispatch().await.into_json().await.unwrap();
		assert_eq!(lift.location, "Lobby");

		let response = client.get("/v0/lifts/camera9").dispatch().await;
		assert_eq!(response.status(), Status::NotFound);
		let body: Value = response.into_json().await.unwrap();
		assert_eq!(body["status"], "error");
	}

	#[rocket::async_test]
	async fn search_api_reports_each_outcome() {
		let client = client(backing()).await;

		let matches: CameraMap = client.get("/v0/search?location=i%20mac%20lab").dispatch().await.into_json().await.unwrap();
		let ids: Vec<&String> = matches.keys().collect();
		assert_eq!(ids, vec!["camera3", "camera4"]);

		let response = client.get("/v0/search?location=%20%20").dispatch().await;
		assert_eq!(response.status(), Status::BadRequest);
		let body: Value = response.into_json().await.unwrap();
		assert_eq!(body["kind"], "validation");

		let response = client.get("/v0/search").dispatch().await;
		assert_eq!(response.status(), Status::BadRequest);

		let response = client.get("/v0/search?location=Basement").dispatch().await;
		assert_eq!(response.status(), Status::NotFound);
		let body: Value = response.into_json().await.unwrap();
		assert_eq!(body["reason"], search::NO_MATCHES);
	}

	#[rocket::async_test]
	async fn search_api_surfaces_transport_errors() {
		let source = backing();
		let client = client(source.clone()).await;
		source.set_offline(true);

		let response = client.get("/v0/search?location=Lobby").dispatch().await;
		assert_eq!(response.status(), Status::BadGateway);
	}

	#[rocket::async_test]
	async fn dashboard_renders_live_cards() {
		let client = client(backing()).await;
		let response = client.get("/").dispatch().await;
		assert_eq!(response.status(), Status::Ok);

		let page = response.into_string().await.unwrap();
		for title in ["Lift 1", "Lift 2", "Lift 3", "Lift 4"] {
			assert!(page.contains(title), "missing {}", title);
		}
		assert!(page.contains("border-color: red"));
		assert!(!page.contains("Loading..."));
	}

	#[rocket::async_test]
	async fn dashboard_search_shows_only_matches() {
		let source = backing();
		let client = client(source.clone()).await;

		let page = client.get("/?location=lobby").dispatch().await.into_string().await.unwrap();
		assert!(page.contains("Lift 2"));
		assert!(!page.contains("Lift 1"));
		assert!(page.contains("value=\"lobby\""));

		let page = client.get("/?location=").dispatch().await.into_string().await.unwrap();
		assert!(page.contains(search::INVALID_LOCATION));
		assert!(page.contains("Lift 1"));
		assert_eq!(source.reads(), 1);
	}

	#[rocket::async_test]
	async fn live_updates_reach_the_dashboard() {
		let source = backing();
		let client = client(source.clone()).await;

		source.set("cameras/camera1/people_count", json!(31));
		let feed = client.rocket().state::<LiveFeed>().unwrap();
		for _ in 0..200 {
			if feed.get("camera1").await.map(|lift| lift.people_count) == Some("31".to_string()) {
				break;
			}
			rocket::tokio::time::sleep(Duration::from_millis(5)).await;
		}

		let lift: LiftRecord = client.get("/v0/lifts/camera1").dispatch().await.into_json().await.unwrap();
		assert_eq!(lift.people_count, "31");
		assert_eq!(lift.location, "Placement Office");
	}

	#[rocket::async_test]
	async fn event_stream_sends_lifts_until_shutdown() {
		let client = client(backing()).await;
		let response = client.get("/v0/lifts/events").dispatch().await;
		assert_eq!(response.status(), Status::Ok);

		client.rocket().shutdown().notify();
		let body = response.into_string().await.unwrap();
		assert!(body.contains("event:lifts"), "{}", body);
		assert!(body.contains("Placement Office"), "{}", body);
		assert!(body.contains("\"people_count\":\"25\""), "{}", body);
	}

	#[rocket::async_test]
	async fn shutdown_releases_live_subscriptions() {
		let source = backing();
		let client = client(source.clone()).await;

		let rocket = client.terminate().await;
		source.set("cameras/camera1/people_count", json!(31));
		rocket::tokio::time::sleep(Duration::from_millis(50)).await;

		let feed = rocket.state::<LiveFeed>().unwrap();
		assert_eq!(feed.get("camera1").await.unwrap().people_count, "4");
		assert!(feed.failures().await.is_empty());
	}
}
