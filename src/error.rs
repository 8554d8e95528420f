use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};

use log::warn;



pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Search input was empty or whitespace.
	#[error("{0}")]
	Validation(String),

	/// Search completed but nothing matched.
	#[error("{0}")]
	NotFound(String),

	/// The backing store could not be read or subscribed to.
	#[error("transport error: {0}")]
	Transport(String),

	/// Connection parameters are missing or malformed.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	pub fn status(&self) -> Status {
		match self {
			Error::Validation(_) => Status::BadRequest,
			Error::NotFound(_) => Status::NotFound,
			Error::Transport(_) => Status::BadGateway,
			Error::Config(_) => Status::InternalServerError,
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			Error::Validation(_) => "validation",
			Error::NotFound(_) => "not_found",
			Error::Transport(_) => "transport",
			Error::Config(_) => "config",
		}
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Error::Transport(err.to_string())
	}
}

impl From<url::ParseError> for Error {
	fn from(err: url::ParseError) -> Self {
		Error::Config(err.to_string())
	}
}

impl<'r> Responder<'r, 'static> for Error {
	fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
		warn!("{} {} failed; error was {}", request.method(), request.uri(), self);
		let body = json!({
			"status": "error",
			"kind": self.kind(),
			"reason": self.to_string(),
		});
		(self.status(), Json(body)).respond_to(request)
	}
}
