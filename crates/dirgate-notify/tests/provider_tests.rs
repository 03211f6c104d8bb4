//! Provider envelopes against a local HTTP double.

use std::time::Duration;

use dirgate_notify::{
    KavenegarProvider, MelipayamakProvider, ProviderError, ProviderSettings, SmsIrProvider,
    SmsMessage, SmsProvider, SmsProviderKind,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sms() -> SmsMessage {
    SmsMessage {
        to: "09121234567".to_string(),
        body: "Password: Xk9#mQ2!vB".to_string(),
    }
}

fn settings(kind: SmsProviderKind, server: &MockServer) -> ProviderSettings {
    ProviderSettings::new(kind, "API-KEY", "10004346").with_base_url(server.uri())
}

#[tokio::test]
async fn test_kavenegar_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/API-KEY/sms/send.json"))
        .and(body_string_contains("receptor=09121234567"))
        .and(body_string_contains("sender=10004346"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return": {"status": 200, "message": "تایید شد"},
            "entries": [{"messageid": 8792343, "cost": 120, "status": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = KavenegarProvider::new(settings(SmsProviderKind::Kavenegar, &server)).unwrap();
    let receipt = provider.send(&sms()).await.unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("8792343"));
    assert_eq!(receipt.cost, Some(120.0));
}

#[tokio::test]
async fn test_kavenegar_failure_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/API-KEY/sms/send.json"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "return": {"status": 403, "message": "Invalid API key"},
            "entries": null
        })))
        .mount(&server)
        .await;

    let provider = KavenegarProvider::new(settings(SmsProviderKind::Kavenegar, &server)).unwrap();
    let err = provider.send(&sms()).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid API key");
    assert!(err.raw_response().is_some());
}

#[tokio::test]
async fn test_kavenegar_balance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/API-KEY/account/info.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return": {"status": 200, "message": "OK"},
            "entries": {"remaincredit": 150000, "expiredate": 1893456000, "type": "Master"}
        })))
        .mount(&server)
        .await;

    let provider = KavenegarProvider::new(settings(SmsProviderKind::Kavenegar, &server)).unwrap();
    // `entries` as an object has no index 0
    assert!(matches!(
        provider.balance().await,
        Err(ProviderError::InvalidResponse(_))
    ));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/v1/API-KEY/account/info.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return": {"status": 200, "message": "OK"},
            "entries": [{"remaincredit": 150000}]
        })))
        .mount(&server)
        .await;
    assert_eq!(provider.balance().await.unwrap(), 150000.0);
}

#[tokio::test]
async fn test_melipayamak_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/SendSMS/SendSMS"))
        .and(body_string_contains("username=API-KEY"))
        .and(body_string_contains("isFlash=false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Value": "2423423", "RetStatus": 1, "StrRetStatus": "Ok"
        })))
        .mount(&server)
        .await;

    let provider =
        MelipayamakProvider::new(settings(SmsProviderKind::Melipayamak, &server)).unwrap();
    let receipt = provider.send(&sms()).await.unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("Ok"));

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/SendSMS/SendSMS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Value": "0", "RetStatus": 0, "StrRetStatus": "InvalidUserPass"
        })))
        .mount(&server)
        .await;
    let err = provider.send(&sms()).await.unwrap_err();
    assert_eq!(err.to_string(), "InvalidUserPass");
}

#[tokio::test]
async fn test_sms_ir_token_then_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/Token"))
        .and(body_json(json!({"UserApiKey": "API-KEY", "SecretKey": "API-KEY"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "TokenKey": "tok-123", "IsSuccessful": true, "Message": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/MessageSend"))
        .and(header("x-sms-ir-secure-token", "tok-123"))
        .and(body_json(json!({
            "Messages": ["Password: Xk9#mQ2!vB"],
            "MobileNumbers": ["09121234567"],
            "LineNumber": "10004346",
            "SendDateTime": null,
            "CanContinueInCaseOfError": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "Ids": [45612], "IsSuccessful": true, "Message": "sent"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SmsIrProvider::new(settings(SmsProviderKind::SmsIr, &server)).unwrap();
    let receipt = provider.send(&sms()).await.unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("45612"));
    assert!(receipt.raw_response["IsSuccessful"].as_bool().unwrap());
}

#[tokio::test]
async fn test_sms_ir_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/Token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "TokenKey": null, "IsSuccessful": false, "Message": "bad key"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/MessageSend"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = SmsIrProvider::new(settings(SmsProviderKind::SmsIr, &server)).unwrap();
    let err = provider.send(&sms()).await.unwrap_err();
    assert_eq!(err.to_string(), "Authentication failed");
}

#[tokio::test]
async fn test_sms_ir_send_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/Token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "TokenKey": "tok", "IsSuccessful": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/MessageSend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Ids": null, "IsSuccessful": false, "Message": "Line number not valid"
        })))
        .mount(&server)
        .await;

    let provider = SmsIrProvider::new(settings(SmsProviderKind::SmsIr, &server)).unwrap();
    let err = provider.send(&sms()).await.unwrap_err();
    assert_eq!(err.to_string(), "Line number not valid");
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"return": {"status": 200}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let provider = KavenegarProvider::new(
        settings(SmsProviderKind::Kavenegar, &server).with_timeout(Duration::from_millis(100)),
    )
    .unwrap();
    let err = provider.send(&sms()).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let provider =
        MelipayamakProvider::new(settings(SmsProviderKind::Melipayamak, &server)).unwrap();
    assert!(matches!(
        provider.send(&sms()).await,
        Err(ProviderError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_unreachable_provider_is_connection_error() {
    let settings = ProviderSettings::new(SmsProviderKind::Kavenegar, "API-KEY", "1")
        .with_base_url("http://127.0.0.1:1");
    let provider = KavenegarProvider::new(settings).unwrap();
    assert!(matches!(
        provider.send(&sms()).await,
        Err(ProviderError::Connection(_))
    ));
}
