//! Executor behavior against a mocked API: bearer injection, outcome
//! classification per status code, and the single-hop pagination rule.

use mockito::Matcher;
use serde_json::json;
use vulncheck_client_core::{ClientConfig, Error, RequestDescriptor, RequestExecutor};
use vulncheck_test_utils::builders::{
    auth_token, placeholder_items, search_page, search_page_with_cursor, token_body, vuln_item,
};

fn executor_for(server: &mockito::ServerGuard) -> RequestExecutor {
    let config = ClientConfig {
        base_url: server.url(),
        ..ClientConfig::test()
    };
    RequestExecutor::new(&config).unwrap()
}

#[tokio::test]
async fn test_bearer_and_query_are_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v3/search")
        .match_header("authorization", "Bearer test-access-token")
        .match_query(Matcher::UrlEncoded(
            "aql".into(),
            "in:vulnerabilities CVE-2023-0001".into(),
        ))
        .with_status(200)
        .with_body(search_page(vec![vuln_item("CVE-2023-0001", 7.5)]).to_string())
        .create_async()
        .await;

    let executor = executor_for(&server);
    let descriptor = RequestDescriptor::get("search")
        .with_correlation_id("CVE-2023-0001")
        .with_query("aql", "in:vulnerabilities CVE-2023-0001");
    let result = executor
        .execute_with_token(&descriptor, &auth_token(3600))
        .await
        .unwrap();

    assert_eq!(result.status, 200);
    assert_eq!(result.correlation_id.as_deref(), Some("CVE-2023-0001"));
    assert!(result.body.is_some());
    assert!(!result.limit_hit);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_is_empty_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .with_status(404)
        .with_body(r#"{"message": "no documents found"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let result = executor
        .execute_with_token(&RequestDescriptor::get("search"), &auth_token(3600))
        .await
        .unwrap();

    assert_eq!(result.status, 404);
    assert!(result.body.is_none());
    assert!(!result.limit_hit);
}

#[tokio::test]
async fn test_non_routable_rejection_is_empty_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .with_status(400)
        .with_body(r#"{"message": "10.0.0.1 is not a valid routable IPv4 address"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let result = executor
        .execute_with_token(&RequestDescriptor::get("search"), &auth_token(3600))
        .await
        .unwrap();

    assert!(result.body.is_none());
    assert!(!result.limit_hit);
}

#[tokio::test]
async fn test_bad_request_surfaces_detail() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .with_status(400)
        .with_body(r#"{"message": "aql expression malformed"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let err = executor
        .execute_with_token(&RequestDescriptor::get("search"), &auth_token(3600))
        .await
        .unwrap_err();

    match err {
        Error::BadRequest { detail } => assert_eq!(detail, "aql expression malformed"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_permission_denied_is_fatal_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .with_status(403)
        .with_body(r#"{"message": "token expired"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let err = executor
        .execute_with_token(&RequestDescriptor::get("search"), &auth_token(3600))
        .await
        .unwrap_err();

    assert!(err.requires_reauth());
    assert!(err.is_fatal());
    let message = err.to_string();
    assert!(message.contains("Validate your API key"), "{message}");
    assert!(message.contains("token expired"), "{message}");
}

#[tokio::test]
async fn test_rate_limit_becomes_limit_marked_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .with_status(429)
        .with_body(r#"{"message": "limit exceeded"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let result = executor
        .execute_with_token(
            &RequestDescriptor::get("search").with_correlation_id("8.8.8.8"),
            &auth_token(3600),
        )
        .await
        .unwrap();

    assert_eq!(result.status, 429);
    assert!(result.limit_hit);
    assert!(result.body.is_none());
    assert_eq!(result.correlation_id.as_deref(), Some("8.8.8.8"));
}

#[tokio::test]
async fn test_server_error_propagates() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .with_status(500)
        .with_body(r#"{"message": "upstream index unavailable"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let err = executor
        .execute_with_token(&RequestDescriptor::get("search"), &auth_token(3600))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Server { status: 500, .. }));
}

#[tokio::test]
async fn test_continuation_followed_once_and_pages_merged() {
    let mut server = mockito::Server::new_async().await;
    let first_page = server
        .mock("GET", "/v3/search")
        .match_query(Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()))
        .with_status(200)
        .with_body(search_page_with_cursor(placeholder_items(2), json!("page-2")).to_string())
        .expect(1)
        .create_async()
        .await;
    // Registered after the first-page mock so it is matched first; only
    // the follow-up request carries the cursor parameter.
    let second_page = server
        .mock("GET", "/v3/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()),
            Matcher::UrlEncoded("from".into(), "page-2".into()),
        ]))
        .with_status(200)
        .with_body(search_page(placeholder_items(3)).to_string())
        .expect(1)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let result = executor
        .execute_with_token(
            &RequestDescriptor::get("search").with_query("aql", "8.8.8.8"),
            &auth_token(3600),
        )
        .await
        .unwrap();

    let body = result.body.unwrap();
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["next"], serde_json::Value::Null);
    first_page.assert_async().await;
    second_page.assert_async().await;
}

#[tokio::test]
async fn test_continuation_skipped_when_first_page_is_large() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .match_query(Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()))
        .with_status(200)
        .with_body(search_page_with_cursor(placeholder_items(31), json!("page-2")).to_string())
        .create_async()
        .await;
    let follow_up = server
        .mock("GET", "/v3/search")
        .match_query(Matcher::UrlEncoded("from".into(), "page-2".into()))
        .expect(0)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let result = executor
        .execute_with_token(
            &RequestDescriptor::get("search").with_query("aql", "8.8.8.8"),
            &auth_token(3600),
        )
        .await
        .unwrap();

    let body = result.body.unwrap();
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 31);
    // The unfollowed cursor stays in the body.
    assert_eq!(body["data"]["next"], json!("page-2"));
    follow_up.assert_async().await;
}

#[tokio::test]
async fn test_limit_hit_on_continuation_keeps_first_page() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .match_query(Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()))
        .with_status(200)
        .with_body(search_page_with_cursor(placeholder_items(2), json!("page-2")).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/v3/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()),
            Matcher::UrlEncoded("from".into(), "page-2".into()),
        ]))
        .with_status(429)
        .with_body(r#"{"message": "limit exceeded"}"#)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let result = executor
        .execute_with_token(
            &RequestDescriptor::get("search").with_query("aql", "8.8.8.8"),
            &auth_token(3600),
        )
        .await
        .unwrap();

    assert!(result.limit_hit);
    assert_eq!(result.status, 429);
    let body = result.body.unwrap();
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_integer_cursor_resubmitted_as_string() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v3/search")
        .match_query(Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()))
        .with_status(200)
        .with_body(search_page_with_cursor(placeholder_items(1), json!(30)).to_string())
        .create_async()
        .await;
    let follow_up = server
        .mock("GET", "/v3/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("aql".into(), "8.8.8.8".into()),
            Matcher::UrlEncoded("from".into(), "30".into()),
        ]))
        .with_status(200)
        .with_body(search_page(placeholder_items(1)).to_string())
        .expect(1)
        .create_async()
        .await;

    let executor = executor_for(&server);
    executor
        .execute_with_token(
            &RequestDescriptor::get("search").with_query("aql", "8.8.8.8"),
            &auth_token(3600),
        )
        .await
        .unwrap();

    follow_up.assert_async().await;
}

#[tokio::test]
async fn test_execute_exchanges_token_once_across_calls() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/v3/access_token")
        .with_status(200)
        .with_body(token_body(3600))
        .expect(1)
        .create_async()
        .await;
    let search_mock = server
        .mock("GET", "/v3/search")
        .match_header("authorization", "Bearer test-access-token")
        .with_status(200)
        .with_body(search_page(placeholder_items(1)).to_string())
        .expect(2)
        .create_async()
        .await;

    let executor = executor_for(&server);
    let descriptor = RequestDescriptor::get("search");
    executor.execute(&descriptor).await.unwrap();
    executor.execute(&descriptor).await.unwrap();

    token_mock.assert_async().await;
    search_mock.assert_async().await;
}

#[tokio::test]
async fn test_post_descriptor_sends_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/search")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"values": ["8.8.8.8"]})))
        .with_status(200)
        .with_body(search_page(vec![]).to_string())
        .create_async()
        .await;

    let executor = executor_for(&server);
    let descriptor =
        RequestDescriptor::post("search").with_body(json!({"values": ["8.8.8.8"]}));
    executor
        .execute_with_token(&descriptor, &auth_token(3600))
        .await
        .unwrap();

    mock.assert_async().await;
}
