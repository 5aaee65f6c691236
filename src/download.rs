//! Export helpers: filename negotiation and saving downloaded payloads.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::i18n::Messages;
use crate::models::{AnalyzeResponse, Coordinates, DownloadFormat, DownloadRequest};
use crate::{Result, WayraError};

/// Placeholder the UI uses as city label for pin-only analyses
const COORDS_PLACEHOLDER: &str = "(coords)";

/// A file returned by `GET /download`
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPayload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Parsed `X-WayraMeta` header, passed through uninterpreted
    pub meta: Option<Value>,
}

/// Extracts the filename from a `Content-Disposition` header value.
///
/// The RFC 5987 `filename*=` form wins over a plain `filename=`.
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let mut plain = None;

    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find("filename") {
        let after_name = search_from + found + "filename".len();
        search_from = after_name;

        let rest = header[after_name..].trim_start();
        if let Some(star_rest) = rest.strip_prefix('*') {
            if let Some(value) = star_rest.trim_start().strip_prefix('=') {
                let raw = value.split(';').next().unwrap_or_default();
                if let Some(decoded) = decode_filename_value(raw) {
                    return Some(decoded);
                }
            }
        } else if let Some(value) = rest.strip_prefix('=') {
            if plain.is_none() {
                let value = value.trim_start();
                let value = value.strip_prefix('"').unwrap_or(value);
                let raw = value.split(['"', ';']).next().unwrap_or_default();
                plain = decode_filename_value(raw);
            }
        }
    }
    plain
}

fn decode_filename_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix(['"', '\'']).unwrap_or(cleaned);

    // charset'language'value
    if let Some((_, encoded)) = cleaned.split_once("''") {
        return decode_filename_value(encoded);
    }

    let decoded = if has_percent_escape(cleaned) {
        urlencoding::decode(cleaned)
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| cleaned.to_string())
    } else {
        cleaned.to_string()
    };

    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

fn has_percent_escape(value: &str) -> bool {
    value
        .as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit())
}

/// Makes `value` safe to use as part of a filename.
///
/// Accents are stripped, every run of characters outside `[A-Za-z0-9._-]`
/// becomes a single `_` and leading or trailing underscores are removed.
#[must_use]
pub fn sanitize_filename_segment(value: &str) -> String {
    let mut sanitized = String::with_capacity(value.len());
    for c in value.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            if c == '_' && sanitized.ends_with('_') {
                continue;
            }
            sanitized.push(c);
        } else if !sanitized.ends_with('_') {
            sanitized.push('_');
        }
    }

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Name used when the server does not announce one, e.g.
/// `wayrascope_Cusco_2024-05-01.csv`
#[must_use]
pub fn fallback_filename(request: &DownloadRequest) -> String {
    let base = match (&request.city, request.coordinates) {
        (Some(city), _) => city.clone(),
        (None, Some(coords)) => format!("{:.3}_{:.3}", coords.lat, coords.lon),
        (None, None) => "wayrascope".to_string(),
    };
    format!(
        "wayrascope_{}_{}.{}",
        sanitize_filename_segment(&base),
        sanitize_filename_segment(&request.date.format("%Y-%m-%d").to_string()),
        request.format.extension()
    )
}

/// Parses the opaque `X-WayraMeta` header; malformed values are logged and dropped
#[must_use]
pub fn parse_meta_header(raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(meta) => {
            debug!(?meta, "Download metadata received");
            Some(meta)
        }
        Err(e) => {
            warn!(error = %e, "Could not parse X-WayraMeta header");
            None
        }
    }
}

fn usable_city(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(COORDS_PLACEHOLDER) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Picks what an export is requested for: the analyzed city, else the typed
/// city, else the analyzed coordinates.
pub fn resolve_download_request(
    result: Option<&AnalyzeResponse>,
    city_input: &str,
    date: NaiveDate,
    format: DownloadFormat,
    messages: &Messages,
) -> Result<DownloadRequest> {
    let city = result
        .and_then(|result| usable_city(&result.location.city))
        .or_else(|| usable_city(city_input));

    let coordinates: Option<Coordinates> = match city {
        Some(_) => None,
        None => result.map(|result| result.location.coordinates()),
    };

    if city.is_none() && coordinates.is_none() {
        return Err(WayraError::validation(messages.download_target));
    }

    Ok(DownloadRequest {
        city,
        coordinates,
        date,
        format,
    })
}

/// Writes the payload into `dir` and returns the file path
pub fn save_payload(payload: &DownloadPayload, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(sanitize_filename_segment(&payload.filename));
    fs::write(&path, &payload.bytes)?;
    info!(
        path = %path.display(),
        bytes = payload.bytes.len(),
        content_type = %payload.content_type,
        "Saved download"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::models::analyze::fixtures::analyze_response;
    use rstest::rstest;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[rstest]
    #[case("attachment; filename=\"wayra.csv\"", Some("wayra.csv"))]
    #[case("attachment; filename=wayra.json", Some("wayra.json"))]
    #[case("attachment; filename*=UTF-8''Cuzco%20%C3%B1.csv", Some("Cuzco ñ.csv"))]
    #[case(
        "attachment; filename=\"plain.csv\"; filename*=UTF-8''preferred.csv",
        Some("preferred.csv")
    )]
    #[case("attachment; FILENAME=\"upper.csv\"", Some("upper.csv"))]
    #[case("attachment", None)]
    #[case("attachment; filename=\"\"", None)]
    fn test_parse_content_disposition(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_content_disposition(header).as_deref(), expected);
    }

    #[rstest]
    #[case("São Paulo", "Sao_Paulo")]
    #[case("  Cusco / Perú  ", "Cusco_Peru")]
    #[case("a__b", "a_b")]
    #[case("2024-05-01", "2024-05-01")]
    #[case("", "file")]
    #[case("///", "file")]
    fn test_sanitize_filename_segment(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_filename_segment(input), expected);
    }

    #[test]
    fn test_fallback_filename() {
        let mut request = DownloadRequest {
            city: Some("La Paz".to_string()),
            coordinates: None,
            date: date(),
            format: DownloadFormat::Csv,
        };
        assert_eq!(fallback_filename(&request), "wayrascope_La_Paz_2024-05-01.csv");

        request.city = None;
        request.coordinates = Some(Coordinates::new(-16.5, -68.15));
        request.format = DownloadFormat::Json;
        assert_eq!(
            fallback_filename(&request),
            "wayrascope_-16.500_-68.150_2024-05-01.json"
        );

        request.coordinates = None;
        assert_eq!(fallback_filename(&request), "wayrascope_wayrascope_2024-05-01.json");
    }

    #[test]
    fn test_meta_header_failures_are_swallowed() {
        assert_eq!(
            parse_meta_header("{\"rows\": 3}"),
            Some(serde_json::json!({"rows": 3}))
        );
        assert_eq!(parse_meta_header("{not json"), None);
    }

    #[test]
    fn test_resolve_download_request() {
        let messages = Language::Es.messages();
        let result = analyze_response();

        let request =
            resolve_download_request(Some(&result), "", date(), DownloadFormat::Csv, messages)
                .unwrap();
        assert_eq!(request.city.as_deref(), Some("Cusco"));
        assert!(request.coordinates.is_none());

        let request =
            resolve_download_request(None, "  Lima ", date(), DownloadFormat::Csv, messages)
                .unwrap();
        assert_eq!(request.city.as_deref(), Some("Lima"));

        let mut unnamed = analyze_response();
        unnamed.location.city = "(coords)".to_string();
        let request =
            resolve_download_request(Some(&unnamed), " ", date(), DownloadFormat::Json, messages)
                .unwrap();
        assert!(request.city.is_none());
        assert_eq!(request.coordinates, Some(unnamed.location.coordinates()));

        let err = resolve_download_request(None, "", date(), DownloadFormat::Csv, messages)
            .unwrap_err();
        assert_eq!(err.user_message().as_deref(), Some(messages.download_target));
    }

    #[test]
    fn test_save_payload() {
        let temp_dir = TempDir::new().unwrap();
        let payload = DownloadPayload {
            filename: "../wayrascope_Cusco_2024-05-01.csv".to_string(),
            content_type: "text/csv;charset=UTF-8".to_string(),
            bytes: b"date,temperature\n2024-05-01,12.5\n".to_vec(),
            meta: None,
        };

        let path = save_payload(&payload, &temp_dir.path().join("exports")).unwrap();
        assert_eq!(path.parent().unwrap(), temp_dir.path().join("exports"));
        assert_eq!(fs::read(&path).unwrap(), payload.bytes);
    }
}
