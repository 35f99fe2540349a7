//! Remote directory backend against a mock HTTP server.

#![cfg(feature = "remote-resolver")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use hashpost_lib::resolver::RemoteRepository;
use hashpost_lib::{Address, Hash, MailError, ResolverService, RoutingInfo};
use wiremock::{
    matchers::{header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn service(server: &MockServer) -> ResolverService {
    let repo = RemoteRepository::new(server.uri(), Duration::from_secs(5)).unwrap();
    ResolverService::new(Arc::new(repo)).with_min_proof_of_work_bits(common::POW_BITS)
}

#[tokio::test]
async fn test_resolve_address() {
    let server = MockServer::start().await;
    let keys = common::keypair("jane!");
    let jane = Address::parse("jane!").unwrap();
    let info = common::address_info(&jane, &keys);

    Mock::given(method("GET"))
        .and(path(format!("/address/{}", info.hash)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&info))
        .mount(&server)
        .await;

    let found = service(&server).resolve_address_by_name(&jane).await.unwrap();
    assert_eq!(found, info);
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let server = MockServer::start().await;
    let id = Hash::new("unknown");

    Mock::given(method("GET"))
        .and(path(format!("/routing/{id}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = service(&server).resolve_routing(&id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_upload_is_signed() {
    let server = MockServer::start().await;
    let keys = common::keypair("server");
    let info = RoutingInfo {
        routing_id: Hash::new("routing-1"),
        public_key: keys.public_key.clone(),
        routing: "mail.example.org:2424".to_string(),
    };

    Mock::given(method("POST"))
        .and(path(format!("/routing/{}", info.routing_id)))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    service(&server)
        .upload_routing(&info, &keys.private_key)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let signature = hashpost_lib::encoding::from_base64(
        "authorization",
        auth.strip_prefix("Bearer ").unwrap(),
    )
    .unwrap();
    keys.public_key.verify(&requests[0].body, &signature).unwrap();
}

#[tokio::test]
async fn test_refused_write_is_unauthorized() {
    let server = MockServer::start().await;
    let keys = common::keypair("server");
    let info = RoutingInfo {
        routing_id: Hash::new("routing-1"),
        public_key: keys.public_key.clone(),
        routing: "mail.example.org:2424".to_string(),
    };

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = service(&server)
        .upload_routing(&info, &keys.private_key)
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::AuthenticationFailed));
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    let server = MockServer::start().await;
    let id = Hash::new("slow");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let repo = RemoteRepository::new(server.uri(), Duration::from_millis(100)).unwrap();
    let svc = ResolverService::new(Arc::new(repo));
    let err = svc.resolve_address(&id).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_error_hides_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string("sqlite: disk I/O error at /var/db"),
        )
        .mount(&server)
        .await;

    let err = service(&server)
        .resolve_address(&Hash::new("x"))
        .await
        .unwrap_err();
    assert!(!err.to_string().contains("/var/db"));
}
