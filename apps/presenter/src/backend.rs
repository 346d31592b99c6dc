//! The HTTP API the front end talks to.
//!
//! The wasm shell implements [`Backend`] over `fetch`; tests use in-memory
//! fakes. Presenters only see the trait.

use serde::de::DeserializeOwned;

use crate::dto::{ChatReply, ChatRequest, IncidentId, MapData, RecommendationReport};
use crate::error::{PresenterError, Result};

pub const MAP_DATA_PATH: &str = "/api/map-data";
pub const CHAT_PATH: &str = "/api/chat";

pub fn recommendations_path(incident_id: IncidentId) -> String {
    format!("/api/incidents/{incident_id}/recommend-resources")
}

/// Joins an API base (possibly empty for same-origin) and a path.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Decodes a response body, naming the endpoint in the error.
pub fn decode<T: DeserializeOwned>(what: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| PresenterError::parse(what, source))
}

// Futures stay on the single browser thread, so no Send bound is wanted.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn fetch_map_data(&self) -> Result<MapData>;

    async fn fetch_recommendations(&self, incident_id: IncidentId) -> Result<RecommendationReport>;

    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;

    use super::*;

    /// Serves canned JSON bodies and records chat requests.
    #[derive(Default)]
    pub struct FakeBackend {
        pub map_data: Option<String>,
        pub recommendations: Option<String>,
        pub chat_reply: Option<String>,
        pub chat_requests: RefCell<Vec<ChatRequest>>,
    }

    fn body(path: &str, canned: Option<&String>) -> Result<String> {
        canned
            .cloned()
            .ok_or_else(|| PresenterError::transport(path, "connection refused"))
    }

    impl Backend for FakeBackend {
        async fn fetch_map_data(&self) -> Result<MapData> {
            decode(MAP_DATA_PATH, &body(MAP_DATA_PATH, self.map_data.as_ref())?)
        }

        async fn fetch_recommendations(
            &self,
            incident_id: IncidentId,
        ) -> Result<RecommendationReport> {
            let path = recommendations_path(incident_id);
            decode(&path, &body(&path, self.recommendations.as_ref())?)
        }

        async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
            self.chat_requests.borrow_mut().push(request.clone());
            decode(CHAT_PATH, &body(CHAT_PATH, self.chat_reply.as_ref())?)
        }
    }
}
