use std::time::Duration;

use url::Url;

use crate::core::error::Result;

/// A raw HTTP exchange: status line, headers, body bytes. The crawler makes
/// every protocol decision (redirects, content types) itself, so the
/// transport stays a dumb pipe.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// First header with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// `200` with a `text/html` content type is the only indexable shape.
    pub fn is_indexable(&self) -> bool {
        self.status == 200
            && self
                .header("content-type")
                .is_some_and(|value| value.to_ascii_lowercase().starts_with("text/html"))
    }
}

pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<FetchResponse>;
}

/// Blocking HTTP client with automatic redirects disabled; the crawler
/// follows `Location` headers manually and under its own hop limit.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        let response = self.client.get(url.as_str()).send()?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes()?.to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
