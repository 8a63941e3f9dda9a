//! HTTP implementation of the action invoker

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::outcome::{RawActionResult, RetryAfterHint, RETRY_AFTER_FALLBACK};
use crate::store::{InputStore, StoreError};
use crate::substrate::{ActionInvoker, ActivityError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// POSTs the instance's stored payload to a fixed endpoint
///
/// The attempt number travels as a query parameter so the receiving
/// service can correlate retries. Transport failures surface as
/// retryable errors; a missing payload is permanent.
pub struct HttpAction {
    client: reqwest::Client,
    endpoint: String,
    input_store: Arc<dyn InputStore>,
}

impl HttpAction {
    /// Create an action targeting `endpoint`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(
        endpoint: impl Into<String>,
        input_store: Arc<dyn InputStore>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            input_store,
        })
    }
}

#[async_trait]
impl ActionInvoker for HttpAction {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn invoke(&self, instance_id: &str, attempt: u32) -> Result<RawActionResult, ActivityError> {
        let payload = match self.input_store.read(instance_id).await {
            Ok(payload) => payload,
            Err(StoreError::NotFound(_)) => {
                return Err(ActivityError::non_retryable(format!(
                    "no input payload for instance {instance_id}"
                )));
            }
            Err(err) => return Err(ActivityError::retryable(err.to_string())),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("attempt", attempt.to_string())])
            .body(payload)
            .send()
            .await
            .map_err(|err| ActivityError::retryable(err.to_string()))?;

        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .map(|value| parse_retry_after(value.to_str().ok()));

        debug!(instance_id, attempt, status_code, "action responded");

        let mut result = RawActionResult::status(status_code);
        if let Some(hint) = retry_after {
            result = result.with_retry_after(hint);
        }
        Ok(result)
    }
}

// A Retry-After header that is present but unreadable still counts as a
// hint; it falls back to the baseline delay instead of being dropped.
fn parse_retry_after(value: Option<&str>) -> RetryAfterHint {
    value
        .and_then(RetryAfterHint::parse)
        .unwrap_or(RetryAfterHint::Delta {
            delay: RETRY_AFTER_FALLBACK,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInputStore;

    #[test]
    fn test_unparseable_retry_after_falls_back() {
        let hint = parse_retry_after(Some("soonish"));
        assert_eq!(
            hint,
            RetryAfterHint::Delta {
                delay: RETRY_AFTER_FALLBACK
            }
        );
    }

    #[test]
    fn test_non_utf8_retry_after_falls_back() {
        let hint = parse_retry_after(None);
        assert_eq!(
            hint,
            RetryAfterHint::Delta {
                delay: RETRY_AFTER_FALLBACK
            }
        );
    }

    #[test]
    fn test_delta_retry_after_parses() {
        let hint = parse_retry_after(Some("7"));
        assert_eq!(
            hint,
            RetryAfterHint::Delta {
                delay: Duration::from_secs(7)
            }
        );
    }

    #[tokio::test]
    async fn test_missing_payload_is_permanent() {
        let store = Arc::new(InMemoryInputStore::new());
        let action =
            HttpAction::new("http://127.0.0.1:1/never", store).expect("client builds");

        let err = action.invoke("ghost", 1).await.expect_err("should fail");
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retryable() {
        let store = Arc::new(InMemoryInputStore::new());
        store.put("inst", b"{}".to_vec()).await.expect("put");
        // Port 1 is never listening
        let action =
            HttpAction::new("http://127.0.0.1:1/never", store).expect("client builds");

        let err = action.invoke("inst", 1).await.expect_err("should fail");
        assert!(err.retryable);
    }
}
