//! Download-key handling: request building, response parsing and the
//! save-versus-open decision.

use super::ApiError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;

/// Characters escaped the same way a browser's `encodeURIComponent` does.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a storage key unless it already looks encoded.
///
/// A key without any `/` is assumed to be pre-encoded and is passed through.
pub fn encode_file_key(file_key: &str) -> String {
    if file_key.contains('/') {
        utf8_percent_encode(file_key, COMPONENT).to_string()
    } else {
        file_key.to_string()
    }
}

/// Build the download-resolve request URL for a storage key.
pub fn build_download_request(endpoint: &Url, file_key: &str) -> Url {
    let mut url = endpoint.clone();
    url.set_query(Some(&format!("fileKey={}", encode_file_key(file_key))));
    url
}

/// Extract the presigned URL from a download-resolve response body.
///
/// JSON objects are searched for `downloadUrl`, `download_url` or `url`; a JSON
/// string is used as is; a body that is not JSON is taken as the URL itself.
pub fn extract_download_url(body: &str) -> Result<String, ApiError> {
    let candidate = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(map)) => ["downloadUrl", "download_url", "url"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
            .map(str::to_string)
            .ok_or(ApiError::MissingDownloadUrl)?,
        Ok(_) => return Err(ApiError::MissingDownloadUrl),
        Err(_) => body.trim().to_string(),
    };

    if candidate.is_empty() {
        return Err(ApiError::MissingDownloadUrl);
    }
    let lower = candidate.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(ApiError::InvalidDownloadUrl(candidate));
    }
    Ok(candidate)
}

/// True when the key's path (query suffix ignored) has a `.txt` extension.
pub fn is_text_target(file_key: &str) -> bool {
    let path = file_key.split('?').next().unwrap_or("");
    path.to_ascii_lowercase().ends_with(".txt")
}

/// True when a resolved URL points at a `.txt` object.
pub fn url_is_text_target(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.ends_with(".txt") || lower.contains(".txt?")
}

/// Last path segment of a key, used as the suggested file name.
pub fn basename(file_key: &str) -> &str {
    match file_key.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => "download",
    }
}

/// What to do with a resolved download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPlan {
    /// Fetch the bytes and write them to disk under `filename`.
    Save { url: String, filename: String },
    /// Hand the URL to the platform opener.
    Open { url: String },
}

pub fn plan_download(file_key: &str, resolved_url: &str) -> DownloadPlan {
    if is_text_target(file_key) || url_is_text_target(resolved_url) {
        DownloadPlan::Save {
            url: resolved_url.to_string(),
            filename: basename(file_key).to_string(),
        }
    } else {
        DownloadPlan::Open {
            url: resolved_url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://api.example.com/Prod/automation-testing/download-url").unwrap()
    }

    #[test]
    fn download_request_encodes_slashes() {
        let url = build_download_request(&endpoint(), "AgentsValidation/x/log.txt");
        assert_eq!(url.query(), Some("fileKey=AgentsValidation%2Fx%2Flog.txt"));
        let url = build_download_request(&endpoint(), "AgentsValidation/x/file.pdf");
        assert!(url
            .as_str()
            .ends_with("download-url?fileKey=AgentsValidation%2Fx%2Ffile.pdf"));
    }

    #[test]
    fn pre_encoded_keys_are_not_encoded_twice() {
        let url = build_download_request(&endpoint(), "AgentsValidation%2Fx%2Flog.txt");
        assert_eq!(url.query(), Some("fileKey=AgentsValidation%2Fx%2Flog.txt"));
    }

    #[test]
    fn spaces_encode_like_uri_components() {
        assert_eq!(encode_file_key("a b/c(1).txt"), "a%20b%2Fc(1).txt");
    }

    #[test]
    fn text_target_ignores_query_suffix() {
        assert!(is_text_target("foo/bar/log.txt"));
        assert!(is_text_target("foo/bar/LOG.TXT?x=1"));
        assert!(!is_text_target("foo/bar/file.pdf?x=1"));
        assert!(url_is_text_target("https://s3/log.txt?X-Amz-Signature=abc"));
        assert!(!url_is_text_target("https://s3/report.pdf?X-Amz-Signature=abc"));
    }

    #[test]
    fn basename_takes_last_segment() {
        assert_eq!(basename("a/b/c/log.txt"), "log.txt");
        assert_eq!(basename("log.txt"), "log.txt");
        assert_eq!(basename("a/b/"), "download");
        assert_eq!(basename(""), "download");
    }

    #[test]
    fn extracts_url_from_known_fields() {
        for body in [
            r#"{"downloadUrl":"https://s3/x"}"#,
            r#"{"download_url":"https://s3/x"}"#,
            r#"{"url":"https://s3/x"}"#,
            r#"{"downloadUrl":"","url":"https://s3/x"}"#,
            r#"{"downloadUrl":null,"download_url":"https://s3/x"}"#,
            r#""https://s3/x""#,
            "https://s3/x\n",
        ] {
            assert_eq!(extract_download_url(body).unwrap(), "https://s3/x");
        }
    }

    #[test]
    fn rejects_missing_or_non_http_urls() {
        assert!(matches!(
            extract_download_url(r#"{"other":"https://s3/x"}"#),
            Err(ApiError::MissingDownloadUrl)
        ));
        assert!(matches!(
            extract_download_url("ftp://s3/x"),
            Err(ApiError::InvalidDownloadUrl(_))
        ));
        assert!(matches!(
            extract_download_url(r#"{"url":"s3://bucket/x"}"#),
            Err(ApiError::InvalidDownloadUrl(_))
        ));
    }

    #[test]
    fn plans_save_for_text_and_open_for_everything_else() {
        assert_eq!(
            plan_download("a/b/log.txt", "https://s3/obj?sig=1"),
            DownloadPlan::Save {
                url: "https://s3/obj?sig=1".into(),
                filename: "log.txt".into()
            }
        );
        assert_eq!(
            plan_download("a/b/report", "https://s3/report.txt?sig=1"),
            DownloadPlan::Save {
                url: "https://s3/report.txt?sig=1".into(),
                filename: "report".into()
            }
        );
        assert_eq!(
            plan_download("a/b/report.pdf", "https://s3/report.pdf?sig=1"),
            DownloadPlan::Open {
                url: "https://s3/report.pdf?sig=1".into()
            }
        );
    }
}
