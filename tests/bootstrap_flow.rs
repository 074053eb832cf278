//! End-to-end startup against a mock broker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventgrid_subscriber::config::schema::{SubscriptionConfig, TopicConfig};
use eventgrid_subscriber::config::{
    BootstrapConfig, GridConfiguration, GridSettings, SubscriberConfig, WebhookConfig,
};
use eventgrid_subscriber::eventgrid::{
    ConnectError, EventGridApi, EventGridClient, EventGridConnector, EventGridEndpoint,
};
use eventgrid_subscriber::lifecycle::{Bootstrap, BootstrapError, Registration, Shutdown};
use eventgrid_subscriber::net::install_crypto_provider;
use eventgrid_subscriber::security::TrustStore;

mod common;

/// Connects over plain HTTP to the mock broker, whatever the configured URL says.
struct PlainConnector {
    broker: std::net::SocketAddr,
}

#[async_trait]
impl EventGridConnector for PlainConnector {
    async fn connect(&self, grid: &GridSettings) -> Result<Arc<dyn EventGridApi>, ConnectError> {
        EventGridEndpoint::parse(&grid.url)?;
        let endpoint = EventGridEndpoint::parse(&format!("http://127.0.0.1:{}", self.broker.port()))?;
        Ok(Arc::new(EventGridClient::with_endpoint(endpoint, reqwest::Client::new())))
    }
}

fn settings(create: bool) -> SubscriberConfig {
    SubscriberConfig {
        create_event_grid_subscription: create,
        event_grid: Some(GridConfiguration {
            url: Some("https://eventgridmodule:4438".into()),
            topic: Some(TopicConfig {
                name: Some("sampleTopic1".into()),
            }),
            subscription: Some(SubscriptionConfig {
                name: Some("sampleSubscription1".into()),
                event_schema: Some("CustomEventSchema".into()),
                url: Some("https://subscriber:4430/api/subscriber".into()),
            }),
        }),
        webhook: WebhookConfig {
            bind_address: "127.0.0.1:0".into(),
            shutdown_grace_secs: 1,
            ..Default::default()
        },
        bootstrap: BootstrapConfig {
            certificate_propagation_ms: 10,
            topic_retry_interval_ms: 20,
            request_timeout_ms: 2_000,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_startup_registers_subscription() {
    install_crypto_provider();
    let topic_lookups = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = topic_lookups.clone();
    let (broker, recorded) = common::start_programmable_broker(move |request| {
        let lookups = if request.method == "GET" {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        } else {
            u32::MAX
        };
        async move {
            match request.method.as_str() {
                "GET" if lookups < 2 => (404, common::error_json("NotFound", "no topic yet")),
                "GET" => (200, common::topic_json("sampleTopic1")),
                _ => (200, request.body),
            }
        }
    })
    .await;

    let shutdown = Arc::new(Shutdown::new());
    let bootstrap = Bootstrap::new(
        settings(true),
        Arc::new(common::GeneratedCertificates::new()),
        Arc::new(PlainConnector { broker }),
        Arc::new(TrustStore::new()),
        shutdown.token(),
    );
    let run = tokio::spawn(bootstrap.run());

    common::eventually(|| recorded.lock().unwrap().iter().any(|r| r.method == "PUT")).await;
    {
        let requests = recorded.lock().unwrap();
        let gets = requests.iter().filter(|r| r.method == "GET").count();
        assert_eq!(gets, 3);
        assert_eq!(requests.last().map(|r| r.method.as_str()), Some("PUT"));
    }
    assert!(!run.is_finished());

    assert!(shutdown.trigger());
    assert!(!shutdown.trigger());
    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(shutdown.complete());

    let Registration::Registered(created) = outcome else {
        panic!("expected the subscription to be registered");
    };
    assert_eq!(created.name, "sampleSubscription1");
}

#[tokio::test]
async fn test_disabled_registration_never_contacts_broker() {
    install_crypto_provider();
    let (broker, recorded) =
        common::start_programmable_broker(|_| async { (200, common::topic_json("sampleTopic1")) }).await;

    let shutdown = Arc::new(Shutdown::new());
    let run = tokio::spawn(
        Bootstrap::new(
            settings(false),
            Arc::new(common::GeneratedCertificates::new()),
            Arc::new(PlainConnector { broker }),
            Arc::new(TrustStore::new()),
            shutdown.token(),
        )
        .run(),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!run.is_finished());
    assert!(recorded.lock().unwrap().is_empty());

    shutdown.trigger();
    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome, Registration::Disabled);
}

#[tokio::test]
async fn test_rejected_registration_stops_host_with_error() {
    install_crypto_provider();
    let (broker, _) = common::start_programmable_broker(|request| async move {
        if request.method == "GET" {
            (200, common::topic_json("sampleTopic1"))
        } else {
            (400, common::error_json("InvalidDestination", "endpoint unreachable"))
        }
    })
    .await;

    let shutdown = Arc::new(Shutdown::new());
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        Bootstrap::new(
            settings(true),
            Arc::new(common::GeneratedCertificates::new()),
            Arc::new(PlainConnector { broker }),
            Arc::new(TrustStore::new()),
            shutdown.token(),
        )
        .run(),
    )
    .await
    .unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, BootstrapError::EventGrid(_)));
    assert!(err.to_string().contains("InvalidDestination"));
    assert!(!shutdown.is_triggered());
}
