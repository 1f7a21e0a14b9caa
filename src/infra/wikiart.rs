//! Metadata and image fetcher for WikiArt artwork pages.
//!
//! Every artwork page answers `?json=2` with a JSON description of the
//! painting. The fields we keep are mapped onto [`MetadataRecord`]; text
//! fields are lower-cased so labels compare case-insensitively.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::artwork::{file_name_from_image_url, MetadataRecord, LARGE_IMAGE_SUFFIX};
use crate::domain::traits::{ImageSource, MetadataSource};
use crate::infra::http::{FetchError, HttpClient, RetryConfig};

const MAX_METADATA_BYTES: usize = 1024 * 1024;
const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

// Pages differ in which id and year keys they send, and some send
// several at once. Each key gets its own slot; `record_from_payload`
// picks `_id`, then `id`, then `contentId`, and `completitionYear`
// before `year`.
#[derive(Debug, Default, Deserialize)]
struct PaintingPayload {
    #[serde(rename = "_id", default)]
    underscore_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(rename = "contentId", default)]
    content_id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "artistName", default)]
    artist_name: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(rename = "completitionYear", default)]
    completition_year: Option<Value>,
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    genre: Option<String>,
}

/// Fetches artwork metadata over HTTP with bounded retries.
#[derive(Debug, Clone, Default)]
pub struct WikiArtFetcher {
    client: HttpClient,
    retry:  RetryConfig,
}

impl WikiArtFetcher {
    pub fn new(retry: RetryConfig) -> Self {
        Self { client: HttpClient::default(), retry }
    }

    fn get_with_retry(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>, FetchError> {
        self.retry.run(
            || self.client.get(url, max_bytes),
            |err: &FetchError| {
                let retry = err.is_retryable();
                if retry {
                    tracing::debug!("Retrying after: {err}");
                }
                retry
            },
        )
    }
}

impl MetadataSource for WikiArtFetcher {
    fn fetch(&self, url: &str) -> Result<MetadataRecord, FetchError> {
        let json_url = json_endpoint(url)?;
        let bytes = self.get_with_retry(&json_url, MAX_METADATA_BYTES)?;
        let payload: PaintingPayload =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Payload {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        record_from_payload(url, payload)
    }
}

impl ImageSource for WikiArtFetcher {
    fn download(&self, image_url: &str) -> Result<Vec<u8>, FetchError> {
        self.get_with_retry(image_url, MAX_IMAGE_BYTES)
    }
}

/// URL of the large rendition the dataset's `file_name` refers to.
pub fn large_image_url(image_url: &str) -> String {
    let base = image_url.split('!').next().unwrap_or(image_url);
    format!("{base}{LARGE_IMAGE_SUFFIX}")
}

fn json_endpoint(url: &str) -> Result<String, FetchError> {
    let mut parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed.query_pairs_mut().append_pair("json", "2");
    Ok(parsed.into())
}

fn record_from_payload(url: &str, payload: PaintingPayload) -> Result<MetadataRecord, FetchError> {
    let image = payload.image.unwrap_or_default();
    let file_name = file_name_from_image_url(&image).ok_or_else(|| FetchError::Payload {
        url: url.to_string(),
        reason: format!("no usable image URL ({image:?})"),
    })?;
    let lower = |s: Option<String>| s.map(|v| v.trim().to_lowercase()).unwrap_or_default();
    let id = first_present([payload.underscore_id, payload.id, payload.content_id]);
    let year = first_present([payload.completition_year, payload.year]);
    Ok(MetadataRecord {
        id,
        title:      lower(payload.title),
        artistname: lower(payload.artist_name),
        image,
        year,
        style:      lower(payload.style),
        genre:      lower(payload.genre),
        file_name,
    })
}

/// First candidate that is neither absent, null nor an empty string.
fn first_present<const N: usize>(candidates: [Option<Value>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(value_to_string)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn value_to_string(v: Value) -> String {
    match v {
        Value::Null      => String::new(),
        Value::String(s) => s,
        other            => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::http::tests::serve_once;
    use std::time::Duration;

    fn no_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 1,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
        }
    }

    #[test]
    fn test_fetch_maps_payload() {
        let body = r#"{"_id":"5772847bedc2cb3880fded05","title":"Self-Portrait",
            "artistName":"Hans von Aachen",
            "image":"https://uploads4.wikiart.org/images/hans-von-aachen/self-portrait-1574.jpg",
            "completitionYear":1574,"style":"Mannerism (Late Renaissance)","genre":"self-portrait"}"#;
        let base = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ));
        let fetcher = WikiArtFetcher::new(no_retry());
        let rec = fetcher.fetch(&format!("{base}/en/hans-von-aachen/self-portrait-1574")).unwrap();
        assert_eq!(rec.id, "5772847bedc2cb3880fded05");
        assert_eq!(rec.title, "self-portrait");
        assert_eq!(rec.artistname, "hans von aachen");
        assert_eq!(rec.year, "1574");
        assert_eq!(rec.style, "mannerism (late renaissance)");
        assert_eq!(rec.file_name, "hans-von-aachen_self-portrait-1574.jpg!Large.jpg");
    }

    #[test]
    fn test_missing_image_is_payload_error() {
        let payload = PaintingPayload { title: Some("x".into()), ..Default::default() };
        let err = record_from_payload("http://x", payload).unwrap_err();
        assert!(matches!(err, FetchError::Payload { .. }));
    }

    #[test]
    fn test_payload_with_every_id_and_year_key() {
        let body = r#"{"_id":"57728","id":"other","contentId":12345,
            "image":"https://uploads.wikiart.org/images/a/b.jpg",
            "completitionYear":1890,"year":"c. 1890"}"#;
        let payload: PaintingPayload = serde_json::from_str(body).unwrap();
        let rec = record_from_payload("http://x", payload).unwrap();
        assert_eq!(rec.id, "57728");
        assert_eq!(rec.year, "1890");
    }

    #[test]
    fn test_payload_falls_back_past_null_keys() {
        let body = r#"{"_id":null,"contentId":12345,
            "image":"https://uploads.wikiart.org/images/a/b.jpg",
            "completitionYear":null,"year":"1890"}"#;
        let payload: PaintingPayload = serde_json::from_str(body).unwrap();
        let rec = record_from_payload("http://x", payload).unwrap();
        assert_eq!(rec.id, "12345");
        assert_eq!(rec.year, "1890");
    }

    #[test]
    fn test_json_endpoint_appends_query() {
        assert_eq!(
            json_endpoint("https://www.wikiart.org/en/a/b").unwrap(),
            "https://www.wikiart.org/en/a/b?json=2"
        );
        assert!(matches!(json_endpoint("nope"), Err(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn test_large_image_url() {
        assert_eq!(large_image_url("https://h/a.jpg"), "https://h/a.jpg!Large.jpg");
        assert_eq!(large_image_url("https://h/a.jpg!Large.jpg"), "https://h/a.jpg!Large.jpg");
    }
}
