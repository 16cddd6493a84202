use crate::helpers::{FakeMailer, TestApp};

#[tokio::test]
async fn verify_returns_200_when_credentials_are_accepted() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.post_smtp_verify().await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn verify_returns_401_when_credentials_are_refused() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        refuse_login: true,
        ..Default::default()
    })
    .await;

    let response = test_app.post_smtp_verify().await;

    assert_eq!(401, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("app password"));
}

#[tokio::test]
async fn verify_returns_502_when_relay_is_unreachable() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        unreachable: true,
        ..Default::default()
    })
    .await;

    let response = test_app.post_smtp_verify().await;

    assert_eq!(502, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
}
