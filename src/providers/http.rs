//! Shared HTTP fetch helper with a bounded retry loop.
//!
//! Mirrors how flaky public weather APIs behave in practice: server errors
//! and geocoder throttling get retried immediately, transport failures and
//! client errors retry on a delay only when the caller opts in.

use std::time::Duration;

use serde_json::Value;

use super::ProviderError;

/// Attempts before the retry loop gives up.
const MAX_ATTEMPTS: u32 = 10;
/// Delay between early retries.
const EARLY_RETRY_DELAY: Duration = Duration::from_millis(1_100);
/// Delay once several retries have already failed.
const LATE_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Attempt number after which the longer delay applies.
const LATE_RETRY_AFTER: u32 = 5;

/// Reqwest client wrapper shared by all providers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build the shared client. api.weather.gov rejects requests without a
    /// User-Agent, so one is always set.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Request`] if the TLS backend fails to
    /// initialize.
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| ProviderError::Request {
                info: "http client".to_owned(),
                source,
            })?;
        Ok(Self { client })
    }

    /// GET a JSON document.
    ///
    /// `info` names the upstream API in logs and error messages.
    /// `check_throttled` additionally retries geocode.xyz throttle bodies,
    /// which arrive as a 200 with "Throttled" in the `latt` field.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the request fails terminally, the body
    /// is not JSON, or all attempts are exhausted.
    pub async fn fetch_json(
        &self,
        info: &str,
        url: &str,
        keep_trying: bool,
        check_throttled: bool,
    ) -> Result<Value, ProviderError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() {
                        tracing::debug!(
                            info,
                            url,
                            status = status.as_u16(),
                            attempt,
                            "server error, retrying"
                        );
                        continue;
                    }
                    if !status.is_success() {
                        if !keep_trying {
                            return Err(ProviderError::HttpStatus {
                                info: info.to_owned(),
                                status: status.as_u16(),
                            });
                        }
                        tracing::debug!(
                            info,
                            url,
                            status = status.as_u16(),
                            attempt,
                            "non-success status, will retry"
                        );
                    } else {
                        match response.text().await {
                            Ok(body) => {
                                let value: Value = serde_json::from_str(&body).map_err(
                                    |source| ProviderError::Parse {
                                        info: info.to_owned(),
                                        source,
                                    },
                                )?;
                                if check_throttled && is_throttled(&value) {
                                    tracing::debug!(info, attempt, "geocoder throttled, retrying");
                                    continue;
                                }
                                return Ok(value);
                            }
                            Err(source) => {
                                if !keep_trying {
                                    return Err(ProviderError::Request {
                                        info: info.to_owned(),
                                        source,
                                    });
                                }
                                tracing::debug!(
                                    info,
                                    url,
                                    error = %source,
                                    attempt,
                                    "body read failed, will retry"
                                );
                            }
                        }
                    }
                }
                Err(source) => {
                    if !keep_trying {
                        return Err(ProviderError::Request {
                            info: info.to_owned(),
                            source,
                        });
                    }
                    tracing::debug!(info, url, error = %source, attempt, "request failed, will retry");
                }
            }
            tokio::time::sleep(retry_delay(attempt)).await;
        }
        Err(ProviderError::RetriesExhausted {
            info: info.to_owned(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

fn retry_delay(attempt: u32) -> Duration {
    if attempt <= LATE_RETRY_AFTER {
        EARLY_RETRY_DELAY
    } else {
        LATE_RETRY_DELAY
    }
}

/// geocode.xyz signals rate limiting inside an otherwise valid body.
fn is_throttled(value: &Value) -> bool {
    value
        .get("latt")
        .and_then(Value::as_str)
        .is_some_and(|s| s.to_ascii_lowercase().contains("throttled"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn throttle_detection_reads_the_latt_field() {
        assert!(is_throttled(&json!({
            "latt": "Throttled! See geocode.xyz pricing"
        })));
        assert!(!is_throttled(&json!({ "latt": "38.84", "longt": "-105.04" })));
        assert!(!is_throttled(&json!({ "error": "nope" })));
    }

    #[test]
    fn retry_delays_step_up_after_early_attempts() {
        assert_eq!(retry_delay(1), EARLY_RETRY_DELAY);
        assert_eq!(retry_delay(5), EARLY_RETRY_DELAY);
        assert_eq!(retry_delay(6), LATE_RETRY_DELAY);
        assert_eq!(retry_delay(10), LATE_RETRY_DELAY);
    }
}
