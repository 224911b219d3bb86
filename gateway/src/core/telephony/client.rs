use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use zeroize::Zeroize;

use crate::config::ServerConfig;

/// Default Twilio REST endpoint
pub const TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from the telephony REST API.
#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("Telephony provider not configured: missing {0}")]
    NotConfigured(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Telephony request failed: {0}")]
    Request(String),

    #[error("Telephony API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected telephony API response: {0}")]
    InvalidResponse(String),
}

#[derive(Clone)]
struct TwilioCredentials {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl Drop for TwilioCredentials {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

/// Minimal Twilio REST client for placing outbound calls.
///
/// The HTTP client is shared and holds no per-call state.
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    api_base: String,
    credentials: Result<TwilioCredentials, &'static str>,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<u32>,
}

impl TwilioClient {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: Option<String>,
        auth_token: Option<String>,
        from_number: Option<String>,
    ) -> Self {
        let credentials = match (non_empty(account_sid), non_empty(auth_token), non_empty(from_number)) {
            (None, _, _) => Err("TWILIO_ACCOUNT_SID"),
            (_, None, _) => Err("TWILIO_AUTH_TOKEN"),
            (_, _, None) => Err("TWILIO_PHONE_NUMBER"),
            (Some(account_sid), Some(auth_token), Some(from_number)) => Ok(TwilioCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
        };

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.twilio_api_base_url.clone(),
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_phone_number.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_ok()
    }

    /// Ask Twilio to dial `to` and fetch call instructions from `callback_url`.
    ///
    /// Returns the new call's sid.
    pub async fn place_call(&self, to: &str, callback_url: &str) -> Result<String, TelephonyError> {
        let credentials = self
            .credentials
            .as_ref()
            .map_err(|missing| TelephonyError::NotConfigured((*missing).to_string()))?;

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base, credentials.account_sid
        );
        let form = [
            ("To", to),
            ("From", credentials.from_number.as_str()),
            ("Url", callback_url),
            ("Method", "POST"),
            ("Record", "false"),
        ];

        info!(to, callback_url, "Placing outbound call");

        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| match (b.message, b.code) {
                    (Some(message), Some(code)) => Some(format!("{message} (code {code})")),
                    (message, _) => message,
                })
                .unwrap_or(body);
            error!(status = status.as_u16(), %message, "Twilio rejected call request");
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))?;

        info!(
            call_sid = %call.sid,
            status = call.status.as_deref().unwrap_or("unknown"),
            "Outbound call created"
        );
        Ok(call.sid)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
