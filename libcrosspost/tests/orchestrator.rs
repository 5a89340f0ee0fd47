//! Fan-out behavior of the publish orchestrator

use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

use libcrosspost::mock::{MockPublisher, MockTransport};
use libcrosspost::{
    AccessCredential, ErrorKind, ErrorRecord, MemoryCredentialStore, PostPayload, Provider,
    PublishOrchestrator, TargetContainer,
};

#[tokio::test]
async fn one_failure_does_not_affect_others() {
    let linkedin = MockPublisher::success(Provider::LinkedIn);
    let linkedin_config = linkedin.config();

    let mut orchestrator = PublishOrchestrator::new();
    orchestrator.add(Box::new(linkedin), None);
    orchestrator.add(
        Box::new(MockPublisher::failure(ErrorRecord::new(
            Provider::Facebook,
            ErrorKind::ApiError,
            500,
            "Internal error",
        ))),
        None,
    );

    let report = orchestrator.publish(&PostPayload::new("Launch")).await.unwrap();

    let linkedin = report.get(Provider::LinkedIn).unwrap();
    assert!(linkedin.success);
    assert!(linkedin.data.as_ref().unwrap().id.is_some());

    let facebook = report.get(Provider::Facebook).unwrap();
    assert!(!facebook.success);
    assert_eq!(facebook.error_code.as_deref(), Some("FacebookApiError"));
    assert_eq!(facebook.http_status, Some(500));

    assert_eq!(*linkedin_config.published_text.lock().unwrap(), vec!["Launch".to_string()]);
    assert!(report.overall_success());
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn providers_publish_concurrently() {
    let mut orchestrator = PublishOrchestrator::new();
    for provider in Provider::ALL {
        orchestrator.add(
            Box::new(MockPublisher::with_delay(provider, Duration::from_millis(200))),
            None,
        );
    }

    let started = Instant::now();
    let report = orchestrator.publish(&PostPayload::new("Same time")).await.unwrap();

    assert!(report.all_succeeded());
    assert!(started.elapsed() < Duration::from_millis(550));
}

#[tokio::test]
async fn missing_credential_reported_without_request() {
    let mut store = MemoryCredentialStore::new();
    store.insert(
        Provider::LinkedIn,
        AccessCredential::new("li-token").with_user_id("member-1"),
    );

    let linkedin_transport = Arc::new(MockTransport::new());
    linkedin_transport.push_json(201, json!({"id": "urn:li:share:1"}));
    let wordpress_transport = Arc::new(MockTransport::new());

    let mut orchestrator = PublishOrchestrator::new();
    orchestrator.add_provider(Provider::LinkedIn, &store, linkedin_transport.clone(), None);
    orchestrator.add_provider(
        Provider::WordPress,
        &store,
        wordpress_transport.clone(),
        Some(TargetContainer::WordPressSite {
            site_id: 5,
            parent_id: None,
        }),
    );
    assert_eq!(
        orchestrator.providers(),
        vec![Provider::LinkedIn, Provider::WordPress]
    );

    let report = orchestrator.publish(&PostPayload::new("hello")).await.unwrap();

    assert!(report.get(Provider::LinkedIn).unwrap().success);
    let wordpress = report.get(Provider::WordPress).unwrap();
    assert!(!wordpress.success);
    assert_eq!(wordpress.error_code.as_deref(), Some("AuthRequired"));
    assert_eq!(wordpress.http_status, Some(401));

    assert_eq!(linkedin_transport.call_count(), 1);
    assert_eq!(wordpress_transport.call_count(), 0);
}

#[tokio::test]
async fn validation_failures_are_per_provider() {
    let store = {
        let mut store = MemoryCredentialStore::new();
        for provider in Provider::ALL {
            store.insert(provider, AccessCredential::new("token").with_user_id("member-1"));
        }
        store
    };

    let linkedin_transport = Arc::new(MockTransport::new());
    linkedin_transport.push_json(201, json!({"id": "urn:li:share:2"}));
    let facebook_transport = Arc::new(MockTransport::new());

    let mut orchestrator = PublishOrchestrator::new();
    orchestrator.add_provider(Provider::LinkedIn, &store, linkedin_transport.clone(), None);
    // No Page selected
    orchestrator.add_provider(Provider::Facebook, &store, facebook_transport.clone(), None);

    let report = orchestrator.publish(&PostPayload::new("hello")).await.unwrap();

    assert!(report.get(Provider::LinkedIn).unwrap().success);
    let facebook = report.get(Provider::Facebook).unwrap();
    assert_eq!(facebook.error_code.as_deref(), Some("ValidationError"));
    assert_eq!(facebook.http_status, Some(400));
    assert_eq!(facebook_transport.call_count(), 0);
}

#[tokio::test]
async fn report_serializes_per_provider() {
    let mut orchestrator = PublishOrchestrator::new();
    orchestrator.add(Box::new(MockPublisher::success(Provider::WordPress)), None);
    orchestrator.add_unavailable(ErrorRecord::auth_required(Provider::Facebook, "no token"));

    let report = orchestrator.publish(&PostPayload::new("hello")).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["results"]["wordpress"]["success"], true);
    assert_eq!(value["results"]["facebook"]["error_code"], "AuthRequired");
    assert!(value["results"]["facebook"]["user_message"].is_string());
    assert!(value["id"].is_string());
}

#[tokio::test]
async fn target_reaches_the_provider_request() {
    let mut store = MemoryCredentialStore::new();
    store.insert(Provider::WordPress, AccessCredential::new("wp-token"));

    let transport = Arc::new(MockTransport::new());
    transport.push_json(200, json!({"ID": 300, "URL": "https://example.wordpress.com/child/"}));

    let mut orchestrator = PublishOrchestrator::new();
    orchestrator.add_provider(
        Provider::WordPress,
        &store,
        transport.clone(),
        Some(TargetContainer::WordPressSite {
            site_id: 5,
            parent_id: Some(9),
        }),
    );

    let report = orchestrator.publish(&PostPayload::new("Child page")).await.unwrap();
    assert!(report.get(Provider::WordPress).unwrap().success);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.ends_with("/sites/5/posts/new"));
    assert_eq!(requests[0].json_body().unwrap()["parent_id"], 9);
}
