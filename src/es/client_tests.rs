// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! HTTP-level tests of the versioned clients, against a mock server.

use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{new_client, EsError, UserAuth};

fn version(v: &str) -> semver::Version {
    semver::Version::parse(v).unwrap()
}

async fn client_for(server: &MockServer, v: &str) -> std::sync::Arc<dyn super::Elasticsearch> {
    new_client(None, &server.uri(), None, version(v), Vec::new()).unwrap()
}

#[tokio::test]
async fn test_license_path_v6() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_xpack/license"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "license": {"uid": "u1", "type": "basic", "status": "active"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "6.8.0").await;
    let license = client.get_license().await.unwrap();
    assert_eq!(license.r#type, "basic");
}

#[tokio::test]
async fn test_license_path_v7() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_license"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "license": {"uid": "u1", "type": "platinum", "status": "active"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    let license = client.get_license().await.unwrap();
    assert_eq!(license.r#type, "platinum");
}

#[tokio::test]
async fn test_voting_config_exclusions_pre_7_8_uses_path_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_cluster/voting_config_exclusions/a,b"))
        .and(query_param("timeout", "30s"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.7.0").await;
    client
        .add_voting_config_exclusions(&["a".to_string(), "b".to_string()], "")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_voting_config_exclusions_7_8_uses_node_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_cluster/voting_config_exclusions"))
        .and(query_param("node_names", "a,b"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.8.0").await;
    client
        .add_voting_config_exclusions(&["a".to_string(), "b".to_string()], "")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_voting_config_exclusions_v8_uses_node_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_cluster/voting_config_exclusions"))
        .and(query_param("node_names", "a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "8.1.0").await;
    client
        .add_voting_config_exclusions(&["a".to_string()], "")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_voting_config_exclusions() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/_cluster/voting_config_exclusions"))
        .and(query_param("wait_for_removal", "false"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    client.delete_voting_config_exclusions(false).await.unwrap();
}

#[tokio::test]
async fn test_voting_config_exclusions_not_supported_on_v6() {
    // no server interaction at all
    let client = new_client(
        None,
        "http://localhost:1",
        None,
        version("6.8.0"),
        Vec::new(),
    )
    .unwrap();
    let err = client
        .add_voting_config_exclusions(&["a".to_string()], "")
        .await
        .unwrap_err();
    assert!(matches!(err, EsError::NotSupported { major: 6, .. }));

    let err = client.delete_voting_config_exclusions(true).await.unwrap_err();
    assert!(matches!(err, EsError::NotSupported { major: 6, .. }));
}

#[tokio::test]
async fn test_synced_flush_not_supported_on_v8() {
    let client = new_client(
        None,
        "http://localhost:1",
        None,
        version("8.1.0"),
        Vec::new(),
    )
    .unwrap();
    let err = client.synced_flush().await.unwrap_err();
    assert!(matches!(err, EsError::NotSupported { major: 8, .. }));
}

#[tokio::test]
async fn test_synced_flush_works_on_v7() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_flush/synced"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    client.synced_flush().await.unwrap();
}

#[tokio::test]
async fn test_minimum_master_nodes_not_supported_on_v8() {
    let client = new_client(
        None,
        "http://localhost:1",
        None,
        version("8.1.0"),
        Vec::new(),
    )
    .unwrap();
    let err = client.set_minimum_master_nodes(2).await.unwrap_err();
    assert!(matches!(err, EsError::NotSupported { major: 8, .. }));
}

#[tokio::test]
async fn test_minimum_master_nodes_writes_zen_settings() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/_cluster/settings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "6.8.0").await;
    client.set_minimum_master_nodes(2).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["transient"]["discovery.zen.minimum_master_nodes"], 2);
    assert_eq!(body["persistent"]["discovery.zen.minimum_master_nodes"], 2);
}

#[tokio::test]
async fn test_health_wait_for_all_events_tolerates_408() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_cluster/health"))
        .and(query_param("wait_for_events", "languid"))
        .and(query_param("timeout", "0s"))
        .respond_with(ResponseTemplate::new(408).set_body_json(json!({
            "cluster_name": "main",
            "status": "yellow",
            "timed_out": true,
            "number_of_pending_tasks": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    let health = client.get_cluster_health_wait_for_all_events().await.unwrap();
    assert!(health.timed_out);
    assert_eq!(health.number_of_pending_tasks, 3);
}

#[tokio::test]
async fn test_api_error_parsing_and_predicates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_cluster/health"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": "no such index",
                "root_cause": [{"type": "index_not_found_exception", "reason": "no such index"}]
            },
            "status": 404
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    let err = client.get_cluster_health().await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.is_4xx());
    assert!(!err.is_conflict());
    let EsError::Api(api) = err else {
        panic!("expected ApiError");
    };
    assert_eq!(api.status, 404);
    assert_eq!(api.reason(), "no such index");
    assert_eq!(
        api.body.as_ref().unwrap().error.r#type,
        "index_not_found_exception"
    );
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(basic_auth("elastic", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cluster_name": "main", "cluster_uuid": "u", "version": {"number": "7.6.0"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = new_client(
        None,
        &server.uri(),
        Some(UserAuth {
            name: "elastic".to_string(),
            password: "secret".to_string(),
        }),
        version("7.6.0"),
        Vec::new(),
    )
    .unwrap();
    let info = client.get_cluster_info().await.unwrap();
    assert_eq!(info.version.number, "7.6.0");
}

#[tokio::test]
async fn test_cluster_bootstrapped_for_zen2() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": {"id1": {"name": "main-es-0", "version": "7.5.0", "roles": ["master"]}}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "7.5.0").await;
    assert!(client.cluster_bootstrapped_for_zen2().await.unwrap());
}

#[tokio::test]
async fn test_cluster_not_bootstrapped_when_master_is_v6() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": {"id1": {"name": "main-es-0", "version": "6.8.0", "roles": ["master"]}}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "7.5.0").await;
    assert!(!client.cluster_bootstrapped_for_zen2().await.unwrap());
}

#[tokio::test]
async fn test_cluster_not_bootstrapped_without_master() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nodes": {}})))
        .mount(&server)
        .await;

    let client = client_for(&server, "7.5.0").await;
    assert!(!client.cluster_bootstrapped_for_zen2().await.unwrap());
}

#[tokio::test]
async fn test_reload_secure_settings_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_nodes/reload_secure_settings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    client.reload_secure_settings().await.unwrap();
}

#[tokio::test]
async fn test_get_nodes_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/no-metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": {"id1": {"name": "main-es-0", "version": "7.6.0", "roles": []}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_nodes/_all/stats/os"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": {"id1": {"name": "main-es-0", "os": {"cpu": {"percent": 5}}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    let nodes = client.get_nodes().await.unwrap();
    assert_eq!(nodes.nodes.len(), 1);
    let stats = client.get_nodes_stats().await.unwrap();
    assert_eq!(stats.nodes["id1"].name, "main-es-0");
}

#[tokio::test]
async fn test_start_basic_and_trial_paths_v7() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_license/start_basic"))
        .and(query_param("acknowledge", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "acknowledged": true, "basic_was_started": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_license/start_trial"))
        .and(query_param("acknowledge", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "acknowledged": true, "trial_was_started": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "7.6.0").await;
    assert!(client.start_basic().await.unwrap().basic_was_started);
    assert!(client.start_trial().await.unwrap().trial_was_started);
}

#[test]
fn test_handle_equality() {
    let ca_a = b"-----BEGIN CERTIFICATE-----A".to_vec();
    let ca_b = b"-----BEGIN CERTIFICATE-----B".to_vec();

    let make = |url: &str, user: Option<&str>, v: &str, ca: Vec<Vec<u8>>| {
        // bypass TLS building by not passing CA material through new_client;
        // descriptors compare the raw bytes
        super::ClientDescriptor {
            version: version(v),
            endpoint: url.to_string(),
            user: user.map(ToString::to_string),
            ca_certs: ca,
        }
    };

    let base = make("https://es:9200", Some("elastic"), "7.6.0", vec![ca_a.clone()]);
    assert_eq!(base, make("https://es:9200", Some("elastic"), "7.6.0", vec![ca_a.clone()]));
    assert_ne!(base, make("https://other:9200", Some("elastic"), "7.6.0", vec![ca_a.clone()]));
    assert_ne!(base, make("https://es:9200", Some("other"), "7.6.0", vec![ca_a.clone()]));
    assert_ne!(base, make("https://es:9200", Some("elastic"), "7.7.0", vec![ca_a.clone()]));
    assert_ne!(base, make("https://es:9200", Some("elastic"), "7.6.0", vec![ca_b]));
    assert_ne!(base, make("https://es:9200", Some("elastic"), "7.6.0", vec![]));
}

#[test]
fn test_unsupported_major_version() {
    let err = match new_client(None, "http://localhost:1", None, version("5.6.0"), Vec::new()) {
        Ok(_) => panic!("expected unsupported-version error"),
        Err(e) => e,
    };
    assert!(matches!(err, EsError::UnsupportedVersion { major: 5 }));
}
