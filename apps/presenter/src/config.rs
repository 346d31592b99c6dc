use std::str::FromStr;

use log::Level;

use crate::stream::ReconnectPolicy;

pub const DEFAULT_STREAM_PATH: &str = "/stream/stream";

/// Where page settings come from: `<meta>` tags and the page origin.
pub trait PageEnv {
    fn meta(&self, name: &str) -> Option<String>;

    fn origin(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub stream_url: String,
    pub api_base: String,
    pub google_api_key: Option<String>,
    pub log_level: Level,
    pub reconnect: ReconnectPolicy,
}

impl PageConfig {
    pub fn from_env(env: &impl PageEnv) -> Self {
        Self {
            stream_url: get_stream_url(env),
            api_base: get_api_base(env),
            google_api_key: non_empty(env, "google-api-key"),
            log_level: get_log_level(env),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

fn non_empty(env: &impl PageEnv, name: &str) -> Option<String> {
    env.meta(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Push endpoint; the `stream-url` meta tag overrides the default path.
pub fn get_stream_url(env: &impl PageEnv) -> String {
    non_empty(env, "stream-url").unwrap_or_else(|| DEFAULT_STREAM_PATH.to_string())
}

/// API base URL; same origin unless `api-base` says otherwise.
pub fn get_api_base(env: &impl PageEnv) -> String {
    non_empty(env, "api-base").unwrap_or_else(|| env.origin())
}

pub fn get_log_level(env: &impl PageEnv) -> Level {
    non_empty(env, "log-level")
        .and_then(|raw| Level::from_str(&raw).ok())
        .unwrap_or(Level::Info)
}
