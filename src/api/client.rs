//! REST client for the meme backend.
//!
//! Thin blocking HTTP wrapper. Response bodies go through the pure
//! `parse_*` functions so the wire format is testable without a server.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Url;
use reqwest::blocking::{Client, Response, multipart};
use serde::Deserialize;

use super::{ApiError, ListQuery, Meme, MemeApi, MemeId, MemePage};
use crate::export::ExportArtifact;

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct HttpMemeApi {
    http: Client,
    base_url: String,
}

impl HttpMemeApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Image URLs the backend sends relative to its own origin, made absolute
    fn absolute(&self, mut meme: Meme) -> Meme {
        if let Some(url) = meme.image_url.take() {
            meme.image_url = match resolve_url(&self.base_url, &url) {
                Ok(absolute) => Some(absolute),
                Err(err) => {
                    warn!("Keeping unresolvable image URL: {err}");
                    Some(url)
                }
            };
        }
        meme
    }
}

impl MemeApi for HttpMemeApi {
    fn list_memes(&self, query: &ListQuery) -> Result<MemePage, ApiError> {
        debug!("GET {} page={} size={} search={:?} sort={}", self.base_url, query.page, query.size, query.search, query.sort.as_param());
        let params = [
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
            ("search", query.search.clone()),
            ("sortDir", query.sort.as_param().to_owned()),
        ];
        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let mut page = parse_page(&success_text(response)?)?;
        page.items = page.items.into_iter().map(|meme| self.absolute(meme)).collect();
        Ok(page)
    }

    fn create_meme(&self, file: &ExportArtifact, title: &str) -> Result<Meme, ApiError> {
        debug!("POST {} file={} ({} bytes)", self.base_url, file.file_name, file.bytes.len());
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime)
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let form = multipart::Form::new().part("file", part).text("title", title.to_owned());

        let response = self
            .http
            .post(&self.base_url)
            .multipart(form)
            .send()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        parse_meme(&success_text(response)?).map(|meme| self.absolute(meme))
    }

    fn delete_meme(&self, id: &MemeId) -> Result<(), ApiError> {
        let url = format!("{}/{id}", self.base_url);
        debug!("DELETE {url}");
        let response = self
            .http
            .delete(&url)
            .send()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        success_text(response).map(|_| ())
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let url = resolve_url(&self.base_url, url)?;
        debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: format!("image download failed with HTTP {}", status.as_u16()),
            });
        }
        let bytes = response.bytes().map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Body of a 2xx response, or the server's error message
fn success_text(response: Response) -> Result<String, ApiError> {
    let status = response.status().as_u16();
    let text = response.text().map_err(|e| ApiError::Request(e.to_string()))?;
    if !(200..300).contains(&status) {
        warn!("Backend answered HTTP {status}");
        return Err(ApiError::Status {
            status,
            message: error_message(status, &text),
        });
    }
    Ok(text)
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRecord {
    #[serde(default)]
    content: Vec<MemeRecord>,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemeRecord {
    id: MemeId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<MemeRecord> for Meme {
    fn from(record: MemeRecord) -> Self {
        let image_url = [record.image_url, record.url, record.file]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty());
        Meme {
            id: record.id,
            title: record.title.unwrap_or_default(),
            image_url,
            created_at: record.created_at,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

/// `{"data": {"content": [...], "totalPages": n}}`
pub fn parse_page(json: &str) -> Result<MemePage, ApiError> {
    let envelope: Envelope<PageRecord> = serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(MemePage {
        items: envelope.data.content.into_iter().map(Meme::from).collect(),
        total_pages: envelope.data.total_pages,
    })
}

/// `{"data": {...meme...}}`
pub fn parse_meme(json: &str) -> Result<Meme, ApiError> {
    let envelope: Envelope<MemeRecord> = serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(envelope.data.into())
}

/// `url` if it is already absolute, otherwise joined onto `base_url`
/// (`/files/7.png` lands on the backend's origin)
pub fn resolve_url(base_url: &str, url: &str) -> Result<String, ApiError> {
    let url = url.trim();
    if let Ok(absolute) = Url::parse(url) {
        return Ok(absolute.to_string());
    }
    let base = Url::parse(base_url).map_err(|e| ApiError::Request(format!("invalid backend URL '{base_url}': {e}")))?;
    base.join(url)
        .map(|joined| joined.to_string())
        .map_err(|e| ApiError::Request(format!("invalid image URL '{url}': {e}")))
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let json = r#"{"data":{"content":[
            {"id":1,"title":"first","imageUrl":"http://x/1.png","createdAt":"2024-01-02T03:04:05"},
            {"id":"b2","title":"second","url":"http://x/2.png"}
        ],"totalPages":3,"number":0}}"#;
        let page = parse_page(json).expect("page");
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, MemeId::Number(1));
        assert_eq!(page.items[0].image_url.as_deref(), Some("http://x/1.png"));
        assert_eq!(page.items[1].id, MemeId::Text("b2".to_owned()));
        assert_eq!(page.items[1].image_url.as_deref(), Some("http://x/2.png"));
        assert_eq!(page.items[1].created_at, None);
    }

    #[test]
    fn test_parse_empty_page() {
        let page = parse_page(r#"{"data":{"content":[],"totalPages":0}}"#).expect("page");
        assert_eq!(page, MemePage::default());
    }

    #[test]
    fn test_image_url_fallbacks() {
        let meme = parse_meme(r#"{"data":{"id":7,"title":"t","imageUrl":"","file":"/files/7.png"}}"#).expect("meme");
        assert_eq!(meme.image_url.as_deref(), Some("/files/7.png"));
    }

    #[test]
    fn test_parse_rejects_missing_envelope() {
        assert!(matches!(parse_page(r#"{"content":[]}"#), Err(ApiError::Parse(_))));
        assert!(matches!(parse_meme("not json"), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_error_message_prefers_server_text() {
        assert_eq!(error_message(400, r#"{"message":"Title too long"}"#), "Title too long");
        assert_eq!(error_message(500, r#"{"error":"Internal Server Error"}"#), "Internal Server Error");
        assert_eq!(error_message(502, "<html>bad gateway</html>"), "request failed with HTTP 502");
    }

    #[test]
    fn test_relative_image_urls_resolve_against_backend() {
        let base = "http://localhost:8080/api/memes";
        assert_eq!(resolve_url(base, "/files/7.png").unwrap(), "http://localhost:8080/files/7.png");
        assert_eq!(resolve_url(base, "https://cdn.example.com/7.png").unwrap(), "https://cdn.example.com/7.png");
        assert!(resolve_url("not a url", "/files/7.png").is_err());
    }

    #[test]
    fn test_parsed_memes_get_absolute_image_urls() {
        let api = HttpMemeApi::new("http://localhost:8080/api/memes", Duration::from_secs(5)).expect("client");
        let meme = parse_meme(r#"{"data":{"id":7,"title":"t","file":"/files/7.png"}}"#).expect("meme");
        assert_eq!(api.absolute(meme).image_url.as_deref(), Some("http://localhost:8080/files/7.png"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = HttpMemeApi::new("http://localhost:8080/api/memes/", Duration::from_secs(5)).expect("client");
        assert_eq!(api.base_url(), "http://localhost:8080/api/memes");
    }
}
