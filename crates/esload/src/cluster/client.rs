//! # 📡 THE CLUSTER CLIENT
//!
//! 🎬 COLD OPEN: INT. LAPTOP. 2:14 AM.
//!
//! A terminal. A `curl localhost:9200`. A long pause. "Connection refused."
//! Somebody forgot to start the docker container again. Somebody is us.
//!
//! 🚀 This module owns the single `reqwest::Client` a run uses, configured once with a
//! request timeout, a transport retry count, and whether timeouts count as retryable.
//! It also owns the liveness check, the bouncer every mutating operation must get past.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use tracing::{debug, trace, warn};

use crate::app_config::ClusterConfig;
use crate::errors::ClusterError;

/// 🔌 The one handle to the cluster. Cheap to clone, the connection pool is shared.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    client: reqwest::Client,
    host: String,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
    max_retries: u32,
    retry_on_timeout: bool,
}

impl ClusterClient {
    /// 🏗️ Build the client. No network traffic happens here, this only validates and wires.
    pub fn new(config: &ClusterConfig) -> Result<Self, ClusterError> {
        let base_url = Url::parse(&config.host).map_err(|e| {
            ClusterError::Client(format!("invalid cluster host '{}': {}", config.host, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClusterError::Client(format!(
                "invalid cluster host '{}': not something a path can hang off",
                config.host
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10).min(request_timeout(config)))
            .timeout(request_timeout(config))
            .build()
            .map_err(|e| {
                ClusterError::Client(format!(
                    "💀 The HTTP client refused to be born. The TLS stack wept: {e}"
                ))
            })?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_on_timeout: config.retry_on_timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// 🔗 `path` is relative to the host. `"/"` and `""` both mean the root.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path.trim_start_matches('/'))
    }

    /// 🏷️ `{host}/{index}`, with the index name escaped as a single path segment.
    ///
    /// A `?` or `#` in a name stays part of the name instead of starting a query string.
    pub(crate) fn index_url(&self, index: &str) -> Result<Url, ClusterError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClusterError::Client(format!("host '{}' cannot carry an index path", self.host))
            })?
            .pop_if_empty()
            .push(index);
        Ok(url)
    }

    /// 📝 Start a request with auth already applied. API key beats basic auth, always.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorize(self.client.request(method, self.url(path)))
    }

    /// 📝 Same as `request`, aimed at one index.
    pub(crate) fn index_request(
        &self,
        method: Method,
        index: &str,
    ) -> Result<RequestBuilder, ClusterError> {
        Ok(self.authorize(self.client.request(method, self.index_url(index)?)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(ref api_key) = self.api_key {
            request.header("Authorization", format!("ApiKey {}", api_key))
        } else if let Some(ref username) = self.username {
            request.basic_auth(username, self.password.as_ref())
        } else {
            request
        }
    }

    /// 📡 Send with transport-level retries.
    ///
    /// Connection failures are retried up to `max_retries` times, back to back.
    /// Timeouts are retried too, but only when `retry_on_timeout` is set.
    /// HTTP statuses are never retried here; a 503 is an answer, not a dropped call.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ClusterError> {
        let mut retries = 0u32;
        loop {
            let this_try = request.try_clone().ok_or_else(|| {
                ClusterError::Client("request body is a stream and cannot be retried".to_string())
            })?;

            match this_try.send().await {
                Ok(response) => {
                    trace!("📬 {} answered {}", response.url(), response.status());
                    return Ok(response);
                }
                Err(err) if retries < self.max_retries && self.is_retryable(&err) => {
                    retries += 1;
                    debug!(
                        "🔄 transport hiccup ({}), retry {}/{}",
                        err, retries, self.max_retries
                    );
                }
                Err(err) => return Err(ClusterError::Transport(err)),
            }
        }
    }

    fn is_retryable(&self, err: &reqwest::Error) -> bool {
        err.is_connect() || (err.is_timeout() && self.retry_on_timeout)
    }

    /// 💓 The liveness check. `HEAD /`, true on 2xx, false on literally anything else.
    ///
    /// Never errors. A ping that throws is a ping that failed, and we say so with `false`.
    pub async fn is_connected(&self) -> bool {
        match self.send(self.request(Method::HEAD, "/")).await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(
                    "⚠️ cluster at '{}' answered the ping with {}",
                    self.host,
                    response.status()
                );
                false
            }
            Err(err) => {
                warn!("⚠️ cluster at '{}' is not answering: {}", self.host, err);
                false
            }
        }
    }

    /// 🚧 `is_connected`, but as a gate: `Err(Connection)` when the ping fails.
    pub(crate) async fn ensure_connected(&self) -> Result<(), ClusterError> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(ClusterError::Connection {
                host: self.host.clone(),
            })
        }
    }
}

fn request_timeout(config: &ClusterConfig) -> Duration {
    Duration::from_secs(config.request_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str) -> ClusterConfig {
        ClusterConfig {
            host: host.to_string(),
            ..ClusterConfig::default()
        }
    }

    #[test]
    fn the_one_where_slashes_are_kept_under_control() {
        let client = ClusterClient::new(&config("http://localhost:9200/"))
            .expect("💀 a valid host should build");
        assert_eq!(client.host(), "http://localhost:9200");
        assert_eq!(client.url("/"), "http://localhost:9200/");
        assert_eq!(client.url("/_bulk"), "http://localhost:9200/_bulk");
        assert_eq!(client.url("base_index"), "http://localhost:9200/base_index");
    }

    #[test]
    fn the_one_where_the_host_is_not_a_url_at_all() {
        let err = ClusterClient::new(&config("definitely not a url"))
            .expect_err("💀 garbage hosts must be rejected");
        assert!(matches!(err, ClusterError::Client(_)));
    }

    #[tokio::test]
    async fn the_one_where_nobody_is_home() {
        // 🔌 port 9 (discard) on loopback: nothing listens, the kernel says no immediately
        let client = ClusterClient::new(&ClusterConfig {
            max_retries: 1,
            ..config("http://127.0.0.1:9")
        })
        .expect("💀 a valid host should build");

        assert!(!client.is_connected().await);
        assert!(matches!(
            client.ensure_connected().await,
            Err(ClusterError::Connection { .. })
        ));
    }

    #[test]
    fn the_one_where_a_weird_index_name_stays_in_its_lane() -> Result<(), ClusterError> {
        let client = ClusterClient::new(&config("http://localhost:9200/"))?;

        assert_eq!(
            client.index_url("base_index")?.as_str(),
            "http://localhost:9200/base_index"
        );
        // -- '?' and '#' would start a query and a fragment, '/' would start a new segment
        assert_eq!(
            client.index_url("we?ird#name")?.as_str(),
            "http://localhost:9200/we%3Fird%23name"
        );
        assert_eq!(
            client.index_url("logs/2021")?.as_str(),
            "http://localhost:9200/logs%2F2021"
        );
        Ok(())
    }

    #[test]
    fn the_one_where_the_cluster_lives_under_a_path_prefix() -> Result<(), ClusterError> {
        let client = ClusterClient::new(&config("http://gateway:8080/es/"))?;
        assert_eq!(
            client.index_url("tweets")?.as_str(),
            "http://gateway:8080/es/tweets"
        );
        Ok(())
    }
}
