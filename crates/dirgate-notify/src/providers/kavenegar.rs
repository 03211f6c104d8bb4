//! Kavenegar: token-less REST API keyed in the URL path.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{http_client, id_string, read_json, ProviderReceipt, ProviderSettings, SmsMessage, SmsProvider};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.kavenegar.com";
const NAME: &str = "kavenegar";

pub struct KavenegarProvider {
    settings: ProviderSettings,
    base_url: String,
    client: Client,
}

impl KavenegarProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            client: http_client(settings.timeout)?,
            settings,
        })
    }

    /// `return.status == 200` marks success; anything else carries `return.message`.
    fn check_envelope(result: Value) -> Result<Value, ProviderError> {
        if result["return"]["status"].as_i64() == Some(200) {
            return Ok(result);
        }
        let message = result["return"]["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        Err(ProviderError::Rejected {
            message,
            response: result,
        })
    }
}

#[async_trait]
impl SmsProvider for KavenegarProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, sms: &SmsMessage) -> Result<ProviderReceipt, ProviderError> {
        let url = format!("{}/v1/{}/sms/send.json", self.base_url, self.settings.api_key);
        let form = [
            ("receptor", sms.to.as_str()),
            ("message", sms.body.as_str()),
            ("sender", self.settings.sender.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        let result = Self::check_envelope(read_json(NAME, response).await?)?;
        let entry = &result["entries"][0];

        tracing::info!(to = %sms.to, "SMS sent successfully via Kavenegar");

        Ok(ProviderReceipt {
            message_id: id_string(&entry["messageid"]),
            cost: entry["cost"].as_f64(),
            raw_response: result,
        })
    }

    async fn balance(&self) -> Result<f64, ProviderError> {
        let url = format!("{}/v1/{}/account/info.json", self.base_url, self.settings.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        let result = Self::check_envelope(read_json(NAME, response).await?)?;
        result["entries"][0]["remaincredit"].as_f64().ok_or_else(|| {
            ProviderError::InvalidResponse("Kavenegar account info has no remaincredit".to_string())
        })
    }
}
