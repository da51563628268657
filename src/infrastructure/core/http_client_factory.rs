use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("coinpulse/", env!("CARGO_PKG_VERSION"));

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Plain client without retry middleware; the request broker owns retries.
    pub fn create_client(timeout: Duration) -> Client {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Join `path` onto `base_url` and append query parameters.
///
/// `base_url` keeps its own path prefix (e.g. `/api/v3`) whether or not it
/// ends with a slash.
pub fn build_url_with_query<K, V>(base_url: &str, path: &str, params: &[(K, V)]) -> Result<Url>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).with_context(|| format!("Invalid URL: {}", joined))?;

    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k.as_ref(), v.as_ref());
        }
    }
    Ok(url)
}

/// Path plus query, used as the cache key so the host can change freely
pub fn cache_key_for(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
