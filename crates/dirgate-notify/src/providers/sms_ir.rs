//! SMS.ir: token-based API. Every send first exchanges the key for a token.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{http_client, id_string, read_json, ProviderReceipt, ProviderSettings, SmsMessage, SmsProvider};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://RestfulSms.com";
const NAME: &str = "sms_ir";
const TOKEN_HEADER: &str = "x-sms-ir-secure-token";

pub struct SmsIrProvider {
    settings: ProviderSettings,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TokenRequest<'a> {
    user_api_key: &'a str,
    secret_key: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageSendRequest<'a> {
    messages: [&'a str; 1],
    mobile_numbers: [&'a str; 1],
    line_number: &'a str,
    send_date_time: Option<&'a str>,
    can_continue_in_case_of_error: bool,
}

impl SmsIrProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            client: http_client(settings.timeout)?,
            settings,
        })
    }

    async fn token(&self) -> Result<String, ProviderError> {
        let request = TokenRequest {
            user_api_key: &self.settings.api_key,
            secret_key: &self.settings.api_key,
        };
        let response = self
            .client
            .post(format!("{}/api/Token", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;
        let result = read_json(NAME, response).await?;

        match (result["IsSuccessful"].as_bool(), result["TokenKey"].as_str()) {
            (Some(true), Some(token)) => Ok(token.to_string()),
            _ => Err(ProviderError::Rejected {
                message: "Authentication failed".to_string(),
                response: result,
            }),
        }
    }
}

#[async_trait]
impl SmsProvider for SmsIrProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, sms: &SmsMessage) -> Result<ProviderReceipt, ProviderError> {
        let token = self.token().await?;

        let request = MessageSendRequest {
            messages: [sms.body.as_str()],
            mobile_numbers: [sms.to.as_str()],
            line_number: self.settings.sender.as_str(),
            send_date_time: None,
            can_continue_in_case_of_error: false,
        };
        let response = self
            .client
            .post(format!("{}/api/MessageSend", self.base_url))
            .header(TOKEN_HEADER, token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;
        let result = read_json(NAME, response).await?;

        if result["IsSuccessful"].as_bool() != Some(true) {
            let message = result["Message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ProviderError::Rejected {
                message,
                response: result,
            });
        }

        tracing::info!(to = %sms.to, "SMS sent successfully via SMS.ir");

        Ok(ProviderReceipt {
            message_id: id_string(&result["Ids"][0]),
            cost: None,
            raw_response: result,
        })
    }
}
