//! Melipayamak: token-less form API authenticated per request.

use async_trait::async_trait;
use reqwest::Client;

use super::{http_client, id_string, read_json, ProviderReceipt, ProviderSettings, SmsMessage, SmsProvider};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://rest.payamak-resan.com";
const NAME: &str = "melipayamak";

pub struct MelipayamakProvider {
    settings: ProviderSettings,
    base_url: String,
    client: Client,
}

impl MelipayamakProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            client: http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl SmsProvider for MelipayamakProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, sms: &SmsMessage) -> Result<ProviderReceipt, ProviderError> {
        let url = format!("{}/api/SendSMS/SendSMS", self.base_url);
        // The account's API key doubles as username and password.
        let form = [
            ("username", self.settings.api_key.as_str()),
            ("password", self.settings.api_key.as_str()),
            ("to", sms.to.as_str()),
            ("from", self.settings.sender.as_str()),
            ("text", sms.body.as_str()),
            ("isFlash", "false"),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;
        let result = read_json(NAME, response).await?;

        if result["RetStatus"].as_i64() != Some(1) {
            let message = result["StrRetStatus"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ProviderError::Rejected {
                message,
                response: result,
            });
        }

        tracing::info!(to = %sms.to, "SMS sent successfully via Melipayamak");

        Ok(ProviderReceipt {
            message_id: id_string(&result["StrRetStatus"]),
            cost: None,
            raw_response: result,
        })
    }
}
