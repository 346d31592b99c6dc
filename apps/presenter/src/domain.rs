/// Bootstrap contextual classes used for badges and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeClass {
    Danger,
    Warning,
    Primary,
    Info,
    Success,
    Secondary,
}

impl BadgeClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Primary => "primary",
            Self::Info => "info",
            Self::Success => "success",
            Self::Secondary => "secondary",
        }
    }

    /// Class attribute for a badge, e.g. `badge bg-danger`.
    pub fn badge(self) -> String {
        format!("badge bg-{}", self.as_str())
    }
}

/// Marker pin colors available in the map icon set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Red,
    Orange,
    Yellow,
    Blue,
    Green,
}

impl MarkerColor {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }

    pub fn icon_url(self) -> String {
        format!(
            "https://maps.google.com/mapfiles/ms/icons/{}-dot.png",
            self.as_str()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Position of this severity in the dashboard bar chart.
    pub const fn index(self) -> usize {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub const fn badge_class(self) -> BadgeClass {
        match self {
            Self::Critical => BadgeClass::Danger,
            Self::High => BadgeClass::Warning,
            Self::Medium => BadgeClass::Primary,
            Self::Low => BadgeClass::Info,
        }
    }

    pub const fn marker_color(self) -> MarkerColor {
        match self {
            Self::Critical => MarkerColor::Red,
            Self::High => MarkerColor::Orange,
            Self::Medium => MarkerColor::Yellow,
            Self::Low => MarkerColor::Blue,
        }
    }

    /// Bar color in the open-incidents chart.
    pub const fn chart_color(self) -> &'static str {
        match self {
            Self::Critical => "#dc3545",
            Self::High => "#ffc107",
            Self::Medium => "#0d6efd",
            Self::Low => "#0dcaf0",
        }
    }

    /// Id of the DOM counter holding the open count for this severity.
    pub fn counter_id(self) -> String {
        format!("{}-count", self.as_str())
    }
}

/// Badge class for a raw severity string, `secondary` when unrecognised.
pub fn severity_badge(value: &str) -> BadgeClass {
    Severity::parse(value).map_or(BadgeClass::Secondary, Severity::badge_class)
}

/// Marker color for a raw severity string, green when unrecognised.
pub fn severity_marker(value: &str) -> MarkerColor {
    Severity::parse(value).map_or(MarkerColor::Green, Severity::marker_color)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncidentStatus {
    Reported,
    Validated,
    InProgress,
    Resolved,
}

impl IncidentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Validated => "validated",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reported" => Some(Self::Reported),
            "validated" => Some(Self::Validated),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Reported => "Reported",
            Self::Validated => "Validated",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }

    pub const fn badge_class(self) -> BadgeClass {
        match self {
            Self::Reported => BadgeClass::Secondary,
            Self::Validated => BadgeClass::Info,
            Self::InProgress => BadgeClass::Primary,
            Self::Resolved => BadgeClass::Success,
        }
    }

    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

pub fn status_badge(value: &str) -> BadgeClass {
    IncidentStatus::parse(value).map_or(BadgeClass::Secondary, IncidentStatus::badge_class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(Severity::parse(" Critical "), Some(Severity::Critical));
        assert_eq!(Severity::parse("LOW"), Some(Severity::Low));
        assert_eq!(Severity::parse("severe"), None);
    }

    #[test]
    fn unknown_values_fall_back_to_neutral_styles() {
        assert_eq!(severity_badge("catastrophic"), BadgeClass::Secondary);
        assert_eq!(status_badge("archived"), BadgeClass::Secondary);
        assert_eq!(severity_marker(""), MarkerColor::Green);
    }

    #[test]
    fn style_tables_match_bootstrap_palette() {
        assert_eq!(Severity::High.badge_class().badge(), "badge bg-warning");
        assert_eq!(IncidentStatus::InProgress.badge_class(), BadgeClass::Primary);
        assert_eq!(IncidentStatus::parse("in_progress").map(IncidentStatus::label), Some("In Progress"));
        assert_eq!(
            Severity::Critical.marker_color().icon_url(),
            "https://maps.google.com/mapfiles/ms/icons/red-dot.png"
        );
    }
}
