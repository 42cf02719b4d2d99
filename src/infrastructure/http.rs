use crate::domain::gateway::{InitiationRequest, InitiationResult, VerificationResult};
use crate::domain::ports::{PaymentGateway, RedirectProbe};
use crate::domain::reference::TransactionReference;
use crate::error::{CheckoutError, Result};
use crate::settings::GatewaySettings;
use async_trait::async_trait;
use reqwest::{Method, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to the hosted gateway over HTTPS.
///
/// `POST {base}/checkout/initiate` starts a transaction,
/// `GET {base}/checkout/{reference}/verify` reads its status. The public key
/// travels as a bearer token on verify and in the body on initiate.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        Self::with_client(settings, reqwest::Client::new())
    }

    pub fn with_client(settings: &GatewaySettings, client: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            CheckoutError::Configuration(format!(
                "invalid gateway URL {:?}: {e}",
                settings.base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CheckoutError::Configuration(format!(
                "gateway URL {:?} cannot be used as a base",
                settings.base_url
            )));
        }
        Ok(Self {
            base_url,
            timeout: settings.request_timeout,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CheckoutError::Configuration("gateway URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[instrument(skip_all, fields(reference = %request.transaction_reference))]
    async fn initiate(&self, request: InitiationRequest) -> Result<InitiationResult> {
        let url = self.endpoint(&["checkout", "initiate"])?;
        debug!(url = %url, "initiating transaction");
        let resp = self
            .client
            .post(url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        InitiationResult::from_response(read_json(resp).await?)
    }

    #[instrument(skip_all, fields(reference = %reference))]
    async fn verify(
        &self,
        reference: &TransactionReference,
        public_key: &str,
    ) -> Result<VerificationResult> {
        let url = self.endpoint(&["checkout", reference.as_str(), "verify"])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(public_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        Ok(VerificationResult::from_response(read_json(resp).await?))
    }
}

/// Sends a body-less `OPTIONS` request; any 2xx counts as reachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
    client: reqwest::Client,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RedirectProbe for HttpProbe {
    async fn probe(&self, url: &Url) -> Result<bool> {
        let resp = self
            .client
            .request(Method::OPTIONS, url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        debug!(url = %url, status = resp.status().as_u16(), "probed return URL");
        Ok(resp.status().is_success())
    }
}

fn transport_error(e: reqwest::Error) -> CheckoutError {
    if e.is_timeout() {
        CheckoutError::Network("gateway timeout".to_string())
    } else {
        CheckoutError::Network(e.to_string())
    }
}

/// 2xx → body, 4xx → `GatewayRejected`, anything else → `Network`.
async fn read_json(resp: Response) -> Result<Value> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<Value>().await.map_err(|e| {
            CheckoutError::GatewayRejected(format!("malformed gateway response: {e}"))
        });
    }

    let body = resp.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    if status.is_client_error() {
        Err(CheckoutError::GatewayRejected(format!(
            "HTTP {}: {detail}",
            status.as_u16()
        )))
    } else {
        Err(CheckoutError::Network(format!(
            "HTTP {}: {detail}",
            status.as_u16()
        )))
    }
}

/// The gateway's `message` when the body is JSON, otherwise the first 200 characters.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::VerificationStatus;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers a single HTTP request with `status_line` and `body`, returning the
    /// base URL and a handle yielding the raw request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break buf.len();
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}/api/v1"), handle)
    }

    fn gateway(base_url: String) -> HttpGateway {
        HttpGateway::new(&GatewaySettings {
            base_url,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_reference() {
        let gateway = gateway("https://api.gateway.test/api/v1/".to_string());
        let url = gateway
            .endpoint(&["checkout", "ref with space", "verify"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.gateway.test/api/v1/checkout/ref%20with%20space/verify"
        );
    }

    #[test]
    fn test_invalid_base_url_is_a_configuration_error() {
        let err = HttpGateway::new(&GatewaySettings {
            base_url: "not a url".to_string(),
            request_timeout: Duration::from_secs(1),
        })
        .unwrap_err();
        assert!(matches!(err, CheckoutError::Configuration(_)));
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"message":"Invalid public key"}"#), "Invalid public key");
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_detail(&"x".repeat(500)).len(), 200);
    }

    #[tokio::test]
    async fn test_verify_reads_status() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"data":{"status":"SUCCESSFUL"},"message":"Transaction verified"}"#,
        )
        .await;
        let reference = TransactionReference::new("ref-1").unwrap();

        let result = gateway(base).verify(&reference, "pk_test").await.unwrap();
        assert_eq!(result.status, VerificationStatus::Successful);
        assert_eq!(result.message.as_deref(), Some("Transaction verified"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/v1/checkout/ref-1/verify"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer pk_test"));
    }

    #[tokio::test]
    async fn test_initiate_rejection_maps_to_gateway_rejected() {
        let (base, server) = serve_once(
            "HTTP/1.1 401 Unauthorized",
            r#"{"message":"Invalid public key"}"#,
        )
        .await;
        let request = InitiationRequest {
            public_key: "pk_bad".to_string(),
            transaction_reference: TransactionReference::new("ref-2").unwrap(),
            amount: rust_decimal::Decimal::ONE_HUNDRED,
            currency: "NGN".to_string(),
            checkout_customer_data: crate::domain::gateway::CheckoutCustomerData {
                email: "a@b.test".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                phone_number: String::new(),
            },
            checkout_customization_data: crate::domain::gateway::CheckoutCustomizationData {
                logo_url: String::new(),
                checkout_modal_title: "T".to_string(),
                payment_description: "D".to_string(),
            },
        };

        let err = gateway(base).initiate(request).await.unwrap_err();
        assert_eq!(
            err,
            CheckoutError::GatewayRejected("HTTP 401: Invalid public key".to_string())
        );
        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/v1/checkout/initiate"));
        assert!(raw.contains(r#""transactionReference":"ref-2""#));
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let (base, _server) = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;
        let reference = TransactionReference::new("ref-3").unwrap();
        let err = gateway(base).verify(&reference, "pk").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_probe_success_and_failure() {
        let (base, _server) = serve_once("HTTP/1.1 200 OK", "").await;
        let url = Url::parse(&base).unwrap();
        assert!(HttpProbe::default().probe(&url).await.unwrap());

        let (base, _server) = serve_once("HTTP/1.1 404 Not Found", "").await;
        let url = Url::parse(&base).unwrap();
        assert!(!HttpProbe::default().probe(&url).await.unwrap());
    }
}
