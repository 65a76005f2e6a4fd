//! Minimal W3C WebDriver client used to bake rendered chapter pages.
//!
//! Only the capabilities baking needs are implemented: open a session,
//! navigate, find an element by class and read its `innerHTML`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// One live browser that can be driven page by page.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Inner HTML of the first element carrying `class`.
    async fn inner_html_by_class(&mut self, class: &str) -> Result<String, BrowserError>;
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Launches Firefox sessions through a geckodriver endpoint.
pub struct WebDriverLauncher {
    http: Client,
    base_url: String,
    headless: bool,
}

impl WebDriverLauncher {
    pub fn new(base_url: &str, headless: bool) -> Result<Self, BrowserError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            headless,
        })
    }
}

#[derive(Deserialize)]
struct WebDriverResponse<T> {
    value: T,
}

#[derive(Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Deserialize)]
struct WebDriverFault {
    error: String,
    message: String,
}

/// Turn a WebDriver reply into its `value`, or the protocol error it reports.
async fn decode<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, BrowserError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(match serde_json::from_str::<WebDriverResponse<WebDriverFault>>(&body) {
            Ok(fault) if fault.value.error == "no such element" => {
                BrowserError::ElementNotFound(fault.value.message)
            }
            Ok(fault) => BrowserError::Protocol {
                error: fault.value.error,
                message: fault.value.message,
            },
            Err(_) => BrowserError::Protocol {
                error: format!("HTTP {status}"),
                message: body,
            },
        });
    }
    let parsed: WebDriverResponse<T> = serde_json::from_str(&body)?;
    Ok(parsed.value)
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let args: Vec<&str> = if self.headless { vec!["-headless"] } else { vec![] };
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": args }
                }
            }
        });

        let response = self
            .http
            .post(format!("{}/session", self.base_url))
            .json(&body)
            .send()
            .await?;
        let session: NewSession = decode(response).await?;

        tracing::debug!(session_id = %session.session_id, headless = self.headless, "Browser session started");

        Ok(Box::new(WebDriverSession {
            http: self.http.clone(),
            session_url: format!("{}/session/{}", self.base_url, session.session_id),
        }))
    }
}

pub struct WebDriverSession {
    http: Client,
    session_url: String,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let response = self
            .http
            .post(format!("{}/url", self.session_url))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn inner_html_by_class(&mut self, class: &str) -> Result<String, BrowserError> {
        let response = self
            .http
            .post(format!("{}/element", self.session_url))
            .json(&json!({ "using": "css selector", "value": format!(".{class}") }))
            .send()
            .await?;
        let element: serde_json::Map<String, serde_json::Value> = decode(response).await?;
        let element_id = element
            .get(ELEMENT_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrowserError::ElementNotFound(class.to_string()))?;

        let response = self
            .http
            .get(format!(
                "{}/element/{}/property/innerHTML",
                self.session_url, element_id
            ))
            .send()
            .await?;
        let html: Option<String> = decode(response).await?;
        Ok(html.unwrap_or_default())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected WebDriver response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("WebDriver error {error}: {message}")]
    Protocol { error: String, message: String },
}
