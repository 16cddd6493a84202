use crate::helpers::{parse_feed, FakeMailer, TestApp};

#[tokio::test]
async fn events_of_an_unknown_campaign_return_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .get_campaign_events("00000000-0000-0000-0000-000000000000")
        .await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn progress_feed_is_ndjson_and_ends_with_completion() {
    let test_app = TestApp::spawn_app().await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!("a@x.com\nnot-an-email\nc@x.com"))
        .await;
    test_app.start_campaign(&campaign_id).await;

    let response = test_app.get_campaign_events(&campaign_id).await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/x-ndjson"
    );

    let events = parse_feed(&response.text().await.unwrap());
    let last = events.last().unwrap();

    assert_eq!(last["type"], "complete");
    assert_eq!(last["sent"], 2);
    assert_eq!(last["failed"], 1);
    assert!(events
        .iter()
        .any(|event| event["type"] == "log" && event["message"] == "Invalid email: not-an-email"));
}

#[tokio::test]
async fn progress_counts_never_decrease() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        rejected: vec![String::from("b@x.com")],
        ..Default::default()
    })
    .await;
    let campaign_id = test_app
        .create_campaign(serde_json::json!(["a@x.com", "b@x.com", "c@x.com", "d@x.com"]))
        .await;

    let events = test_app.run_campaign(&campaign_id).await;

    let progress: Vec<&serde_json::Value> = events
        .iter()
        .filter(|event| event["type"] == "progress")
        .collect();

    assert_eq!(progress.len(), 4);
    let mut previous = 0;
    for event in progress {
        let processed = event["sent"].as_u64().unwrap() + event["failed"].as_u64().unwrap();
        let total = event["total"].as_u64().unwrap();

        assert!(processed > previous);
        assert!(processed <= total);
        assert_eq!(processed + event["pending"].as_u64().unwrap(), total);
        previous = processed;
    }
    assert_eq!(previous, 4);
}

#[tokio::test]
async fn aborted_campaign_reports_the_failure_once() {
    let test_app = TestApp::spawn_app_with(FakeMailer {
        refuse_login: true,
        ..Default::default()
    })
    .await;
    let campaign_id = test_app.create_campaign(serde_json::json!("a@x.com")).await;

    let events = test_app.run_campaign(&campaign_id).await;

    let aborted: Vec<&serde_json::Value> = events
        .iter()
        .filter(|event| event["type"] == "aborted")
        .collect();

    assert_eq!(aborted.len(), 1);
    assert_eq!(events.last(), Some(aborted[0]));
    assert!(events.iter().all(|event| event["type"] != "progress"));
}

#[tokio::test]
async fn feed_of_a_finished_campaign_replays_its_history() {
    let test_app = TestApp::spawn_app().await;
    let campaign_id = test_app.create_campaign(serde_json::json!("a@x.com")).await;

    let first = test_app.run_campaign(&campaign_id).await;
    let replay = parse_feed(
        &test_app
            .get_campaign_events(&campaign_id)
            .await
            .text()
            .await
            .unwrap(),
    );

    assert_eq!(first, replay);
}
