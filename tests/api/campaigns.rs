use crate::helpers::{campaign_body, pdf_attachment, FakeMailer, TestApp};

#[tokio::test]
async fn create_campaign_returns_201_and_lists_invalid_recipients() {
    let test_app = TestApp::spawn_app().await;
    let body = campaign_body(serde_json::json!("name,email\nAlice,a@x.com\nBob,not-an-email"));

    let response = test_app.post_campaign(&body).await;

    assert_eq!(201, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["campaign_id"].is_string());
    assert_eq!(body["total"], 2);
    assert_eq!(body["invalid"].as_array().unwrap().len(), 1);
    assert_eq!(body["invalid"][0]["input"], "Bob,not-an-email");
}

#[tokio::test]
async fn create_campaign_does_not_send_anything() {
    let test_app = TestApp::spawn_app().await;

    let campaign_id = test_app
        .create_campaign(serde_json::json!(["a@x.com", "b@x.com"]))
        .await;

    let report: serde_json::Value = test_app.get_campaign(&campaign_id).await.json().await.unwrap();

    assert_eq!(report["state"], "ready");
    assert_eq!(report["pending"], 2);
    assert!(test_app.mailer.sent_to().is_empty());
}

#[tokio::test]
async fn create_campaign_returns_400_when_body_require_field_is_missing() {
    let test_app = TestApp::spawn_app().await;

    // This is a common practice and it is called table-driven tests. In this case, it simulates different kind of possible request bodies
    // where API should return 400.
    let test_cases = vec![
        (serde_json::json!({}), "missing body parameters"),
        (
            serde_json::json!({
                "subject": "Application",
                "body": "Hello",
                "attachment": pdf_attachment(),
            }),
            "missing recipients",
        ),
        (
            serde_json::json!({
                "recipients": "a@x.com",
                "subject": "Application",
                "body": "Hello",
            }),
            "missing attachment",
        ),
        (
            serde_json::json!({
                "recipients": "a@x.com",
                "body": "Hello",
                "attachment": pdf_attachment(),
            }),
            "missing subject",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_campaign(&invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
    }
}

#[tokio::test]
async fn create_campaign_returns_400_when_body_is_present_but_not_valid() {
    let test_app = TestApp::spawn_app().await;

    let mut blank_subject = campaign_body(serde_json::json!("a@x.com"));
    blank_subject["subject"] = serde_json::json!("   ");
    let mut unknown_placeholder = campaign_body(serde_json::json!("a@x.com"));
    unknown_placeholder["body"] = serde_json::json!("Dear {{company}} team");
    let mut word_document = campaign_body(serde_json::json!("a@x.com"));
    word_document["attachment"]["filename"] = serde_json::json!("cv.docx");
    let mut empty_attachment = campaign_body(serde_json::json!("a@x.com"));
    empty_attachment["attachment"]["content_base64"] = serde_json::json!("");

    let test_cases = vec![
        (blank_subject, "blank subject"),
        (unknown_placeholder, "unknown placeholder"),
        (word_document, "attachment is not a pdf"),
        (empty_attachment, "attachment is empty"),
        (
            campaign_body(serde_json::json!("\n# nobody\n")),
            "empty recipient list",
        ),
        (campaign_body(serde_json::json!([])), "empty recipient array"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_campaign(&invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn starting_an_unknown_campaign_returns_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .start_campaign("00000000-0000-0000-0000-000000000000")
        .await;

    assert_eq!(404, response.status().as_u16());
    assert_eq!(404, test_app.get_campaign("not-a-uuid").await.status().as_u16());
}

#[tokio::test]
async fn starting_a_campaign_twice_returns_409() {
    let test_app = TestApp::spawn_app().await;
    let campaign_id = test_app.create_campaign(serde_json::json!("a@x.com")).await;

    let first = test_app.start_campaign(&campaign_id).await;
    let second = test_app.start_campaign(&campaign_id).await;

    assert_eq!(202, first.status().as_u16());
    assert_eq!(409, second.status().as_u16());
}

#[tokio::test]
async fn malformed_address_is_reported_while_the_rest_is_sent() {
    let test_app = TestApp::spawn_app().await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!([
            { "name": "Alice", "email": "a@x.com" },
            { "name": "Bob", "email": "not-an-email" }
        ]))
        .await;

    test_app.run_campaign(&campaign_id).await;

    let report: serde_json::Value = test_app.get_campaign(&campaign_id).await.json().await.unwrap();

    assert_eq!(report["state"], "completed");
    assert_eq!(report["sent"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["pending"], 0);
    assert_eq!(report["recipients"][0]["status"], "sent");
    assert_eq!(report["recipients"][1]["status"], "failed");
    assert_eq!(report["recipients"][1]["kind"], "validation");
    assert_eq!(test_app.mailer.sent_to(), vec![String::from("a@x.com")]);
}

#[tokio::test]
async fn every_recipient_has_a_final_status_after_the_run() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        rejected: vec![String::from("c@x.com")],
        ..Default::default()
    })
    .await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!("a@x.com\nb@x.com\nc@x.com\nd@x.com"))
        .await;

    test_app.run_campaign(&campaign_id).await;

    let report: serde_json::Value = test_app.get_campaign(&campaign_id).await.json().await.unwrap();
    let recipients = report["recipients"].as_array().unwrap();

    assert_eq!(recipients.len(), 4);
    assert!(recipients.iter().all(|r| r["status"] != "pending"));
    assert_eq!(report["sent"], 3);
    assert_eq!(report["failed"], 1);
    assert_eq!(recipients[2]["kind"], "send");
}

#[tokio::test]
async fn sent_messages_are_personalized_and_carry_the_cv() {
    let test_app = TestApp::spawn_app().await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!("Jane Doe <jane@acme.com>"))
        .await;

    test_app.run_campaign(&campaign_id).await;

    let sent = test_app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Application for a Rust position");
    assert!(sent[0].body.starts_with("Hello jane@acme.com,"));
    assert_eq!(sent[0].attachment.filename(), "Frank_CV.pdf");
    assert_eq!(sent[0].from.name.as_deref(), Some("Frank Parejo"));
    assert_eq!(sent[0].to.name.as_deref(), Some("Jane Doe"));
}

#[tokio::test]
async fn refused_credentials_abort_the_campaign() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        refuse_login: true,
        ..Default::default()
    })
    .await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!(["a@x.com", "b@x.com"]))
        .await;

    test_app.run_campaign(&campaign_id).await;

    let report: serde_json::Value = test_app.get_campaign(&campaign_id).await.json().await.unwrap();

    assert_eq!(report["state"], "aborted");
    assert!(report["reason"]
        .as_str()
        .unwrap()
        .starts_with("Authentication failed"));
    assert_eq!(report["pending"], 2);
    assert!(test_app.mailer.sent_to().is_empty());
}

#[tokio::test]
async fn unreachable_relay_aborts_the_campaign_with_everyone_pending() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        unreachable: true,
        ..Default::default()
    })
    .await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!(["a@x.com", "b@x.com", "c@x.com"]))
        .await;

    let events = test_app.run_campaign(&campaign_id).await;

    let report: serde_json::Value = test_app.get_campaign(&campaign_id).await.json().await.unwrap();
    let recipients = report["recipients"].as_array().unwrap();

    assert_eq!(report["state"], "aborted");
    assert_eq!(report["pending"], 3);
    assert!(recipients.iter().all(|r| r["status"] == "pending"));
    assert_eq!(
        events
            .iter()
            .filter(|event| event["type"] == "aborted")
            .count(),
        1
    );
    assert!(test_app.mailer.sent_to().is_empty());
}
