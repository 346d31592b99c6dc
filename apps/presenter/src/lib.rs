// Presentation models for the CrisisConnect front end.
// Everything here is DOM-free so the wasm shell stays thin and the logic runs under host tests.

pub mod backend;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod detail;
pub mod domain;
pub mod dto;
pub mod error;
pub mod feed;
pub mod format;
pub mod map;
pub mod notify;
pub mod palette;
pub mod recommend;
pub mod stream;

pub use domain::{BadgeClass, IncidentStatus, Severity};
pub use error::{PresenterError, Result};
