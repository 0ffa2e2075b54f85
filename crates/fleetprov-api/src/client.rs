// Control-plane HTTP client
//
// Wraps `reqwest::Client` with action URL construction, bearer auth, and
// error-body classification. Every provisioning action is a JSON POST to
// `{base}/v1/{service}/{action}`; the response body is returned unwrapped.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::call::ApiCall;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Structured error body returned on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "__type", alias = "Code")]
    code: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

/// Raw HTTP client for the provisioning control plane.
///
/// Stateless apart from the connection pool: idempotency and retries are
/// the engine's concern, not the client's.
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The default headers carry the bearer token; only the URL is shown.
        f.debug_struct("ControlPlaneClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ControlPlaneClient {
    /// Create a client that authenticates every request with `token`.
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| Error::Authentication {
                message: "API token contains characters not allowed in a header".into(),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Used by tests and by callers that manage their own auth headers.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The control-plane base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/v1/{service}/{action}`
    pub(crate) fn action_url(&self, service: &str, action: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/v1/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            service,
            action
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Perform one provisioning action and return its response payload.
    pub async fn invoke(&self, call: &ApiCall) -> Result<Value, Error> {
        let url = self.action_url(&call.service, &call.action)?;
        debug!(action = %call, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&call.parameters)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_response(call, resp).await
    }

    /// Return the JSON body on success, or classify the error body.
    async fn parse_response(call: &ApiCall, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = resp.text().await.map_err(Error::Transport)?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Object(serde_json::Map::new()));
            }
            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body_len: body.len(),
            });
        }

        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let code = parsed
            .code
            .map(|c| c.rsplit('#').next().unwrap_or_default().to_owned())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_owned());
        let message = parsed.message.unwrap_or_else(|| format!("HTTP {status}"));

        Err(Error::from_remote(
            &call.service,
            &call.action,
            status.as_u16(),
            code,
            message,
            retry_after,
        ))
    }
}
