//! Event Grid client and topic poller against a mock broker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventgrid_subscriber::config::GridSettings;
use eventgrid_subscriber::eventgrid::{
    build_subscription, register_subscription, EventGridApi, EventGridClient, EventGridError,
    TopicPoller,
};
use eventgrid_subscriber::resilience::FixedBackoff;
use tokio_util::sync::CancellationToken;

mod common;

fn client_for(addr: std::net::SocketAddr) -> EventGridClient {
    EventGridClient::new(&format!("http://127.0.0.1:{}", addr.port()), reqwest::Client::new()).unwrap()
}

fn grid() -> GridSettings {
    GridSettings {
        url: "https://eventgridmodule:4438".into(),
        topic_name: "sampleTopic1".into(),
        subscription_name: "sampleSubscription1".into(),
        event_schema: "EventGridSchema".into(),
        subscription_url: "https://subscriber:4430/api/subscriber".into(),
    }
}

#[tokio::test]
async fn test_get_topic() {
    let (addr, recorded) =
        common::start_programmable_broker(|_| async { (200, common::topic_json("sampleTopic1")) }).await;

    let topic = client_for(addr)
        .get_topic("sampleTopic1", Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(topic.name, "sampleTopic1");
    assert_eq!(topic.properties.input_schema.as_deref(), Some("EventGridSchema"));

    let requests = recorded.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/topics/sampleTopic1?api-version=2019-01-01-preview");
}

#[tokio::test]
async fn test_resource_names_stay_in_their_path_segment() {
    let (addr, recorded) = common::start_programmable_broker(|request| async move {
        if request.method == "GET" {
            (200, common::topic_json("sensors#1"))
        } else {
            (200, request.body)
        }
    })
    .await;
    let client = client_for(addr);

    let topic = client.get_topic("sensors#1", Duration::from_secs(5)).await.unwrap();
    assert_eq!(topic.name, "sensors#1");

    let mut settings = grid();
    settings.topic_name = "a/b".into();
    settings.subscription_name = "sub?x=1".into();
    let subscription = build_subscription(&settings).unwrap();
    register_subscription(&client, &subscription, Duration::from_secs(5))
        .await
        .unwrap();

    let requests = recorded.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].target, "/topics/sensors%231?api-version=2019-01-01-preview");
    assert_eq!(
        requests[1].target,
        "/topics/a%2Fb/eventSubscriptions/sub%3Fx=1?api-version=2019-01-01-preview"
    );
}

#[tokio::test]
async fn test_missing_topic_is_api_error() {
    let (addr, _) = common::start_programmable_broker(|_| async {
        (404, common::error_json("NotFound", "Topic sampleTopic1 could not be found"))
    })
    .await;

    let err = client_for(addr)
        .get_topic("sampleTopic1", Duration::from_secs(5))
        .await
        .unwrap_err();

    match &err {
        EventGridError::Api { status, code, message } => {
            assert_eq!(*status, 404);
            assert_eq!(code, "NotFound");
            assert!(message.contains("could not be found"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_put_subscription_sends_descriptor() {
    let (addr, recorded) =
        common::start_programmable_broker(|request| async move { (200, request.body) }).await;
    let subscription = build_subscription(&grid()).unwrap();

    let created = register_subscription(&client_for(addr), &subscription, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(created, subscription);

    let requests = recorded.lock().unwrap();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(
        requests[0].path(),
        "/topics/sampleTopic1/eventSubscriptions/sampleSubscription1"
    );
    let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(sent["name"], "sampleSubscription1");
    assert_eq!(sent["properties"]["eventDeliverySchema"], "EventGridSchema");
    assert_eq!(sent["properties"]["destination"]["endpointType"], "WebHook");
    assert_eq!(
        sent["properties"]["destination"]["properties"]["endpointUrl"],
        "https://subscriber:4430/api/subscriber"
    );
}

#[tokio::test]
async fn test_slow_broker_times_out() {
    let (addr, _) = common::start_programmable_broker(|_| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, common::topic_json("t"))
    })
    .await;

    let err = client_for(addr)
        .get_topic("t", Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, EventGridError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_broker_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr)
        .get_topic("t", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EventGridError::Transport(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_poller_retries_until_topic_exists() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let (addr, recorded) = common::start_programmable_broker(move |_| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < 2 {
                (503, common::error_json("ServiceUnavailable", "starting"))
            } else {
                (200, common::topic_json("sampleTopic1"))
            }
        }
    })
    .await;

    let poller = TopicPoller::new(Duration::from_secs(5), FixedBackoff::from_millis(25));
    let started = std::time::Instant::now();
    let topic = poller
        .wait_for_topic(&client_for(addr), "sampleTopic1", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(topic.name, "sampleTopic1");
    assert_eq!(recorded.lock().unwrap().len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(50));
}
