use crisis_presenter::backend::{
    decode, endpoint, recommendations_path, Backend, CHAT_PATH, MAP_DATA_PATH,
};
use crisis_presenter::dto::{ChatReply, ChatRequest, IncidentId, MapData, RecommendationReport};
use crisis_presenter::{PresenterError, Result};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

/// `api-base` may name another origin, so requests go out as CORS.
const FETCH_MODE: RequestMode = RequestMode::Cors;

/// [`Backend`] over the browser's `fetch`.
pub struct HttpBackend {
    base: String,
}

impl HttpBackend {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    async fn request(&self, method: &str, path: &str, body: Option<String>) -> Result<String> {
        let url = endpoint(&self.base, path);
        let failed = |error: JsValue| PresenterError::transport(&url, format!("{error:?}"));

        let window = web_sys::window().ok_or_else(|| PresenterError::transport(&url, "no window"))?;

        let opts = RequestInit::new();
        opts.set_method(method);
        opts.set_mode(FETCH_MODE);
        if let Some(body) = &body {
            opts.set_body(&JsValue::from_str(body));
        }

        let request = Request::new_with_str_and_init(&url, &opts).map_err(failed)?;
        if body.is_some() {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(failed)?;
        }

        let response_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(failed)?;
        let response = response_value.dyn_into::<Response>().map_err(failed)?;
        // Error statuses still carry a JSON `{error}` body worth decoding.
        if !response.ok() {
            log::warn!("{url} answered HTTP {}", response.status());
        }

        let text = JsFuture::from(response.text().map_err(failed)?)
            .await
            .map_err(failed)?;
        text.as_string()
            .ok_or_else(|| PresenterError::transport(&url, "response body is not text"))
    }
}

impl Backend for HttpBackend {
    async fn fetch_map_data(&self) -> Result<MapData> {
        let body = self.request("GET", MAP_DATA_PATH, None).await?;
        decode(MAP_DATA_PATH, &body)
    }

    async fn fetch_recommendations(&self, incident_id: IncidentId) -> Result<RecommendationReport> {
        let path = recommendations_path(incident_id);
        let body = self.request("GET", &path, None).await?;
        decode(&path, &body)
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let payload = serde_json::to_string(request)
            .map_err(|source| PresenterError::parse("chat request", source))?;
        let body = self.request("POST", CHAT_PATH, Some(payload)).await?;
        decode(CHAT_PATH, &body)
    }
}
