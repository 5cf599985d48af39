//! Telegram Bot API delivery over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use herald_common::config::AppConfig;
use herald_common::error::AppError;

use crate::sender::{MessageSender, SendError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`MessageSender`] that talks to the Telegram Bot API.
///
/// Construct it once at startup with [`TelegramSender::connect`] and share it
/// between broadcasts.
#[derive(Debug, Clone)]
pub struct TelegramSender {
    client: reqwest::Client,
    /// `{api_url}/bot{token}`; never logged.
    endpoint: String,
    parse_mode: Option<String>,
}

/// The bot account behind a token, as reported by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendPhotoBody<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

impl TelegramSender {
    /// Build a sender without contacting the API.
    pub fn new(api_url: &str, token: &str) -> Result<Self, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::Config("Telegram bot token is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Telegram(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            parse_mode: Some("Markdown".to_string()),
        })
    }

    /// Formatting mode sent with every message; `None` sends plain text.
    pub fn with_parse_mode(mut self, parse_mode: Option<String>) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    /// Build a sender and verify the token with `getMe`.
    ///
    /// A bad token or an unreachable API fails here, before any broadcast
    /// can be accepted.
    pub async fn connect(api_url: &str, token: &str) -> Result<Self, AppError> {
        let sender = Self::new(api_url, token)?;
        let bot = sender
            .get_me()
            .await
            .map_err(|e| AppError::Telegram(format!("failed to create telegram bot: {e}")))?;

        tracing::info!(
            bot_id = bot.id,
            bot_username = bot.username.as_deref().unwrap_or("unknown"),
            "Telegram bot authorized"
        );
        Ok(sender)
    }

    /// [`connect`](Self::connect) using the application configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(
            Self::connect(&config.telegram_api_url, &config.telegram_bot_token)
                .await?
                .with_parse_mode(config.telegram_parse_mode.clone()),
        )
    }

    pub async fn get_me(&self) -> Result<BotIdentity, SendError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, SendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .json(body)
            .send()
            .await
            .map_err(|e| SendError::from(e.without_url()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SendError::from(e.without_url()))?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(SendError::Api {
                    code: status.as_u16(),
                    description: status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string(),
                    retry_after: None,
                });
            }
            Err(e) => return Err(SendError::Decode(format!("{method}: {e}"))),
        };

        if !envelope.ok {
            return Err(SendError::Api {
                code: envelope.error_code.unwrap_or(status.as_u16()),
                description: envelope.description.unwrap_or_default(),
                retry_after: envelope.parameters.and_then(|p| p.retry_after),
            });
        }

        envelope
            .result
            .ok_or_else(|| SendError::Decode(format!("{method}: response has no result")))
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), SendError> {
        let body = SendMessageBody {
            chat_id: recipient,
            text,
            parse_mode: self.parse_mode.as_deref(),
        };
        self.call::<_, IgnoredAny>("sendMessage", &body).await?;
        Ok(())
    }

    async fn send_image(
        &self,
        recipient: i64,
        image_url: &str,
        caption: &str,
    ) -> Result<(), SendError> {
        let body = SendPhotoBody {
            chat_id: recipient,
            photo: image_url,
            caption,
            parse_mode: self.parse_mode.as_deref(),
        };
        self.call::<_, IgnoredAny>("sendPhoto", &body).await?;
        Ok(())
    }
}
