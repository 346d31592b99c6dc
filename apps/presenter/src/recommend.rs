//! The "recommend resources" panel on an incident page.

use crate::domain::{severity_badge, BadgeClass};
use crate::dto::{IncidentId, Recommendation, RecommendationReport};
use crate::error::Result;
use crate::format::escape_html;

pub const FAILED: &str = "Error loading recommendations";

const LOADING_HTML: &str = concat!(
    r#"<div class="d-flex justify-content-center"><div class="spinner-border text-primary" role="status">"#,
    r#"<span class="visually-hidden">Loading recommendations...</span></div></div>"#
);

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub priority: String,
    pub badge: BadgeClass,
    pub rows: Vec<Recommendation>,
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationView {
    Loading,
    /// The server answered with an `error` field.
    Unavailable(String),
    Ready(ReadyView),
    /// The request itself failed.
    Failed,
}

impl RecommendationView {
    pub fn from_result(result: Result<RecommendationReport>) -> Self {
        let report = match result {
            Ok(report) => report,
            Err(error) => {
                log::error!("error getting resource recommendations: {error}");
                return Self::Failed;
            }
        };
        if let Some(error) = report.error {
            return Self::Unavailable(error);
        }
        let priority = report
            .priority_level
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        Self::Ready(ReadyView {
            badge: severity_badge(&priority),
            priority,
            rows: report.recommendations,
            gaps: report.resource_gaps,
        })
    }

    pub fn html(&self) -> String {
        match self {
            Self::Loading => LOADING_HTML.to_string(),
            Self::Unavailable(message) => {
                format!(r#"<div class="alert alert-warning">{}</div>"#, escape_html(message))
            }
            Self::Failed => format!(r#"<div class="alert alert-danger">{FAILED}</div>"#),
            Self::Ready(view) => view.html(),
        }
    }

    /// Row behind the Allocate button with the given `data-index`.
    pub fn row(&self, index: usize) -> Option<&Recommendation> {
        match self {
            Self::Ready(view) => view.rows.get(index),
            _ => None,
        }
    }
}

impl ReadyView {
    fn html(&self) -> String {
        let mut html = format!(
            concat!(
                r#"<div class="card"><div class="card-header d-flex justify-content-between align-items-center">"#,
                r#"<h5 class="mb-0">AI Recommended Resources</h5>"#,
                r#"<span class="badge bg-{}">{} PRIORITY</span></div><div class="card-body">"#
            ),
            self.badge.as_str(),
            escape_html(&self.priority.to_uppercase())
        );

        if self.rows.is_empty() {
            html.push_str("<p>No specific resources recommended.</p>");
        } else {
            html.push_str(r#"<div class="table-responsive"><table class="table table-hover">"#);
            html.push_str(
                "<thead><tr><th>Resource</th><th>Quantity</th><th>Rationale</th><th>Action</th></tr></thead><tbody>",
            );
            for (index, row) in self.rows.iter().enumerate() {
                html.push_str(&format!(
                    concat!(
                        "<tr><td>{name}</td><td>{quantity}</td><td>{rationale}</td><td>",
                        r#"<button class="btn btn-sm btn-primary allocate-resource-btn" data-index="{index}">"#,
                        "Allocate</button></td></tr>"
                    ),
                    name = escape_html(&row.resource_name),
                    quantity = row.quantity,
                    rationale = escape_html(&row.rationale),
                    index = index,
                ));
            }
            html.push_str("</tbody></table></div>");
        }

        if !self.gaps.is_empty() {
            html.push_str(r#"<div class="mt-3"><h6>Resource Gaps Identified:</h6><ul>"#);
            for gap in &self.gaps {
                html.push_str(&format!("<li>{}</li>", escape_html(gap)));
            }
            html.push_str("</ul></div>");
        }

        html.push_str("</div></div>");
        html
    }
}

/// Values the allocation modal is filled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDraft {
    pub resource_id: i64,
    pub incident_id: IncidentId,
    pub quantity: i64,
    pub resource_name: String,
}

impl AllocationDraft {
    pub fn new(incident_id: IncidentId, row: &Recommendation) -> Self {
        Self {
            resource_id: row.resource_id,
            incident_id,
            quantity: row.quantity,
            resource_name: row.resource_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::Backend;
    use crate::error::PresenterError;

    #[tokio::test]
    async fn report_renders_priority_rows_and_gaps() {
        let backend = FakeBackend {
            recommendations: Some(
                r#"{"priority_level": "high",
                    "recommendations": [{"resource_id": 4, "resource_name": "Generators",
                                         "quantity": 3, "rationale": "Power is out"}],
                    "resource_gaps": ["No medics on site"]}"#
                    .into(),
            ),
            ..FakeBackend::default()
        };

        let view = RecommendationView::from_result(backend.fetch_recommendations(7).await);

        let html = view.html();
        assert!(html.contains(r#"<span class="badge bg-warning">HIGH PRIORITY</span>"#));
        assert!(html.contains("<td>Generators</td><td>3</td>"));
        assert!(html.contains("<li>No medics on site</li>"));

        let draft = AllocationDraft::new(7, view.row(0).unwrap());
        assert_eq!(draft.resource_id, 4);
        assert_eq!(draft.incident_id, 7);
        assert_eq!(draft.quantity, 3);
    }

    #[tokio::test]
    async fn transport_failure_shows_the_fixed_error() {
        let backend = FakeBackend::default();

        let view = RecommendationView::from_result(backend.fetch_recommendations(7).await);

        assert_eq!(view, RecommendationView::Failed);
        assert!(view.html().contains("Error loading recommendations"));
    }

    #[test]
    fn server_error_is_shown_as_a_warning() {
        let view = RecommendationView::from_result(Ok(RecommendationReport {
            error: Some("AI service unavailable".into()),
            ..RecommendationReport::default()
        }));
        assert_eq!(
            view.html(),
            r#"<div class="alert alert-warning">AI service unavailable</div>"#
        );
    }

    #[test]
    fn empty_report_says_so() {
        let view = RecommendationView::from_result(Ok(RecommendationReport::default()));

        let html = view.html();
        assert!(html.contains("No specific resources recommended."));
        assert!(html.contains("UNKNOWN PRIORITY"));
        assert!(view.row(0).is_none());
        assert!(RecommendationView::from_result(Err(PresenterError::transport("x", "y")))
            .html()
            .contains("alert-danger"));
    }
}
