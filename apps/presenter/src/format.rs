use chrono::{DateTime, NaiveDateTime};

/// Turns `in_progress` into `In Progress`: underscores become spaces and
/// the first letter of every word is upper-cased.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if at_word_start && ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !ch.is_alphanumeric();
    }
    out
}

pub fn format_status(status: &str) -> String {
    title_case(status)
}

pub fn format_incident_type(kind: Option<&str>) -> String {
    match kind.map(str::trim) {
        Some(kind) if !kind.is_empty() => title_case(kind),
        _ => "Unknown".to_string(),
    }
}

/// Human readable form of an ISO-8601 `created_at` value.
pub fn format_created_at(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return "Unknown".to_string();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y-%m-%d %H:%M:%S").to_string();
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map_or_else(
        |_| raw.to_string(),
        |parsed| parsed.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Formats a counter with thousands separators: `1234567` → `1,234,567`.
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parses a counter rendered by [`format_count`]; anything unreadable counts as zero.
pub fn parse_count(text: &str) -> i64 {
    text.trim().replace(',', "").parse().unwrap_or(0)
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Shortens `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_replaces_every_underscore() {
        assert_eq!(title_case("in_progress"), "In Progress");
        assert_eq!(title_case("gas_line_leak"), "Gas Line Leak");
        assert_eq!(title_case("fire"), "Fire");
    }

    #[test]
    fn missing_incident_type_reads_unknown() {
        assert_eq!(format_incident_type(None), "Unknown");
        assert_eq!(format_incident_type(Some("  ")), "Unknown");
        assert_eq!(format_incident_type(Some("medical_emergency")), "Medical Emergency");
    }

    #[test]
    fn created_at_accepts_naive_and_offset_timestamps() {
        assert_eq!(
            format_created_at(Some("2025-03-14T09:26:53.589793")),
            "2025-03-14 09:26:53"
        );
        assert_eq!(
            format_created_at(Some("2025-03-14T09:26:53+00:00")),
            "2025-03-14 09:26:53"
        );
        assert_eq!(format_created_at(None), "Unknown");
        assert_eq!(format_created_at(Some("yesterday")), "yesterday");
    }

    #[test]
    fn counts_round_trip_through_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(-1_234_567), "-1,234,567");
        assert_eq!(parse_count("12,345"), 12_345);
        assert_eq!(parse_count("n/a"), 0);
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
