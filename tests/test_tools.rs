mod common;

use chrono::{DateTime, Duration, Utc};
use coralogix_mcp::error::{CoralogixError, INTERNAL_ERROR};
use coralogix_mcp::mcp::{process_request, RpcRequest};
use serde_json::{json, Value};

use common::{row_with_timestamp, MockBackend};

fn parse_ts(v: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(v.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

fn window_len(metadata: &Value) -> Duration {
    parse_ts(&metadata["endDate"]) - parse_ts(&metadata["startDate"])
}

#[tokio::test]
async fn search_logs_end_to_end() {
    let body = "{\"result\":{\"results\":[{\"userData\":\"a\"}]}}\nnot-json\n{\"result\":{\"results\":[]}}\n";
    let backend = MockBackend::start(vec![(200, body)]).await;
    let before = Utc::now();

    let payload = backend
        .service()
        .call(
            "search_logs",
            json!({ "query": "error", "severities": ["Critical"], "timeRange": "1h" }),
        )
        .await
        .unwrap();

    assert_eq!(payload["query"], r#"error AND (coralogix.metadata.severity:"Critical")"#);
    assert_eq!(payload["totalResults"], 2);
    assert_eq!(payload["results"].as_array().unwrap().len(), 2);
    let end = parse_ts(&payload["timeRange"]["endDate"]);
    assert!(end >= before - Duration::milliseconds(1) && end <= Utc::now());

    let sent = &backend.requests()[0].body;
    assert_eq!(sent["query"], payload["query"]);
    assert_eq!(sent["metadata"]["syntax"], "QUERY_SYNTAX_LUCENE");
    assert_eq!(sent["metadata"]["tier"], "TIER_FREQUENT_SEARCH");
    assert_eq!(sent["metadata"]["limit"], 100);
    assert!(sent["metadata"].get("defaultSource").is_none());
    assert_eq!(window_len(&sent["metadata"]), Duration::hours(1));
    assert_eq!(sent["metadata"]["startDate"], payload["timeRange"]["startDate"]);
}

#[tokio::test]
async fn dataprime_query_is_passed_through() {
    let backend = MockBackend::start(vec![(200, "{\"x\":1}\n")]).await;
    let text = "source logs | filter $m.severity == ERROR | limit 5";

    let payload = backend
        .service()
        .call("query_logs_dataprime", json!({ "query": text, "timeRange": "2d" }))
        .await
        .unwrap();

    assert_eq!(payload["query"], text);
    assert_eq!(payload["totalResults"], 1);
    let sent = &backend.requests()[0].body;
    assert_eq!(sent["query"], text);
    assert_eq!(sent["metadata"]["syntax"], "QUERY_SYNTAX_DATAPRIME");
    assert_eq!(sent["metadata"]["defaultSource"], "logs");
    assert_eq!(window_len(&sent["metadata"]), Duration::days(2));
}

#[tokio::test]
async fn aggregations_echo_inputs() {
    let backend = MockBackend::start(vec![]).await;

    let payload = backend
        .service()
        .call(
            "get_log_aggregations",
            json!({ "groupBy": ["host"], "aggregations": [{ "type": "sum", "field": "bytes" }] }),
        )
        .await
        .unwrap();

    assert_eq!(
        payload["query"],
        "source logs | groupby $d.host aggregate sum($d.bytes) as sum_bytes"
    );
    assert_eq!(payload["groupBy"], json!(["host"]));
    assert_eq!(payload["aggregations"], json!([{ "type": "sum", "field": "bytes" }]));
    assert_eq!(payload["results"], json!([]));
}

#[tokio::test]
async fn listings_always_use_a_day_window() {
    let backend = MockBackend::start(vec![]).await;
    let service = backend.service();

    let apps = service.call("list_applications", json!({ "timeRange": "1h" })).await.unwrap();
    assert_eq!(apps["query"], "List applications");
    let subs = service
        .call("list_subsystems", json!({ "applications": ["api"] }))
        .await
        .unwrap();
    assert_eq!(subs["applications"], json!(["api"]));

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    for r in &requests {
        assert_eq!(window_len(&r.body["metadata"]), Duration::hours(24));
    }
    assert!(backend.queries()[1].contains(r#"($l.applicationname == "api")"#));
}

#[tokio::test]
async fn log_context_not_found_stops_after_lookup() {
    let backend = MockBackend::start(vec![(200, "")]).await;

    let err = backend
        .service()
        .call("get_log_context", json!({ "logId": "abc" }))
        .await
        .unwrap_err();

    assert!(matches!(err, CoralogixError::NotFound(ref id) if id == "abc"));
    assert!(err.to_string().contains("abc"));
    assert_eq!(backend.queries(), vec![r#"source logs | filter $m.logid == "abc" | limit 1"#]);
}

#[tokio::test]
async fn log_context_narrows_around_timestamp() {
    let lookup = row_with_timestamp("2024-05-01T10:00:00.000Z");
    let backend = MockBackend::start(vec![(200, lookup.as_str()), (200, "{\"n\":1}\n{\"n\":2}\n")]).await;

    let payload = backend
        .service()
        .call("get_log_context", json!({ "logId": "abc", "contextSize": 3 }))
        .await
        .unwrap();

    let queries = backend.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(
        queries[1],
        r#"source logs | filter $m.timestamp >= "2024-05-01T10:00:00.000Z" - 5m AND $m.timestamp <= "2024-05-01T10:00:00.000Z" + 5m | sort $m.timestamp | limit 6"#
    );
    for r in backend.requests() {
        assert!(r.body["metadata"].get("startDate").is_none());
    }
    assert_eq!(payload["logId"], "abc");
    assert_eq!(payload["contextSize"], 3);
    assert_eq!(payload["targetLog"].as_array().unwrap().len(), 1);
    assert_eq!(payload["contextLogs"], json!([{ "n": 1 }, { "n": 2 }]));
}

#[tokio::test]
async fn log_context_without_timestamp_is_unbounded() {
    let backend = MockBackend::start(vec![(200, "{\"queryId\":\"q\"}\n"), (200, "")]).await;

    backend
        .service()
        .call("get_log_context", json!({ "logId": "abc" }))
        .await
        .unwrap();

    assert_eq!(backend.queries()[1], "source logs | sort $m.timestamp | limit 20");
}

#[tokio::test]
async fn security_analysis_runs_three_queries_in_order() {
    let backend = MockBackend::start(vec![
        (200, "{\"q\":1}\n"),
        (200, "{\"q\":2}\n"),
        (200, "{\"q\":3}\n"),
    ])
    .await;

    let payload = backend
        .service()
        .call("security_analysis", json!({ "severity": "ERROR" }))
        .await
        .unwrap();

    let queries = backend.queries();
    assert_eq!(queries.len(), 3);
    let results = payload["results"].as_array().unwrap();
    for (i, entry) in results.iter().enumerate() {
        assert_eq!(entry["query"], queries[i].as_str());
        assert_eq!(entry["result"], json!([{ "q": i + 1 }]));
    }
    assert!(queries[0].contains("failed_attempts"));
    assert!(queries[1].contains(r#"$m.severity >= "ERROR""#));
    assert!(queries[2].contains("incident_count"));
    assert_eq!(payload["analysis"], "Security Analysis");
    assert_eq!(payload["severity"], "ERROR");

    let requests = backend.requests();
    assert!(requests
        .iter()
        .all(|r| r.body["metadata"]["startDate"] == requests[0].body["metadata"]["startDate"]));
    assert_eq!(window_len(&requests[0].body["metadata"]), Duration::hours(24));
}

#[tokio::test]
async fn security_analysis_aborts_on_first_failure() {
    let backend = MockBackend::start(vec![(200, "{\"q\":1}\n"), (500, "boom"), (200, "{\"q\":3}\n")]).await;

    let err = backend
        .service()
        .call("security_analysis", Value::Null)
        .await
        .unwrap_err();

    assert!(matches!(err, CoralogixError::BackendError { status: 500, .. }));
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn custom_template_without_query_sends_nothing() {
    let backend = MockBackend::start(vec![]).await;

    let err = backend
        .service()
        .call("custom_dataprime_query", json!({ "template": "custom", "parameters": {} }))
        .await
        .unwrap_err();

    assert!(matches!(err, CoralogixError::InvalidRequest(_)));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn custom_template_uses_parameter_time_range() {
    let backend = MockBackend::start(vec![]).await;

    let payload = backend
        .service()
        .call(
            "custom_dataprime_query",
            json!({
                "template": "api_performance_monitoring",
                "parameters": { "application": "checkout", "timeRange": "1w", "limit": 5 }
            }),
        )
        .await
        .unwrap();

    let query = payload["query"].as_str().unwrap();
    assert!(query.starts_with(r#"source logs | filter $l.applicationname == "checkout" | filter $d.response_time != null"#));
    assert!(query.ends_with("| limit 5"));
    assert_eq!(payload["template"], "api_performance_monitoring");
    assert_eq!(window_len(&backend.requests()[0].body["metadata"]), Duration::weeks(1));
}

#[tokio::test]
async fn advanced_and_pattern_queries_echo_parameters() {
    let backend = MockBackend::start(vec![]).await;
    let service = backend.service();

    let payload = service
        .call(
            "advanced_dataprime_query",
            json!({ "queryType": "performance_analysis", "application": "api", "timeRange": "6h" }),
        )
        .await
        .unwrap();
    assert_eq!(payload["queryType"], "performance_analysis");
    assert_eq!(
        payload["parameters"],
        json!({ "queryType": "performance_analysis", "application": "api", "timeRange": "6h" })
    );

    let payload = service
        .call("log_pattern_analysis", json!({ "application": "api" }))
        .await
        .unwrap();
    assert_eq!(payload["analysis"], "Log Pattern Analysis");
    assert_eq!(window_len(&backend.requests()[1].body["metadata"]), Duration::hours(24));
}

#[tokio::test]
async fn mcp_call_wraps_payload_and_maps_backend_errors() {
    let backend = MockBackend::start(vec![(200, "{\"a\":1}\n"), (502, "")]).await;
    let service = backend.service();

    let req: RpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": { "name": "query_logs_dataprime", "arguments": { "query": "source logs" } }
    }))
    .unwrap();
    let resp = process_request(&service, req).await.unwrap();
    let text = resp.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
    let inner: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(inner["totalResults"], 1);

    let req: RpcRequest = serde_json::from_value(json!({
        "id": 8,
        "method": "tools/call",
        "params": { "name": "list_applications", "arguments": {} }
    }))
    .unwrap();
    let resp = process_request(&service, req).await.unwrap();
    let err = resp.error.unwrap();
    assert_eq!(err.code, INTERNAL_ERROR);
    assert_eq!(err.message, "Coralogix API request failed: 502 Bad Gateway");
}

#[tokio::test]
async fn unknown_tags_are_echoed_as_sent() {
    let backend = MockBackend::start(vec![]).await;
    let service = backend.service();

    let payload = service
        .call(
            "advanced_dataprime_query",
            json!({ "queryType": "whatever", "application": "api" }),
        )
        .await
        .unwrap();
    assert_eq!(payload["queryType"], "whatever");
    assert_eq!(payload["parameters"], json!({ "queryType": "whatever", "application": "api" }));
    assert_eq!(
        backend.queries()[0],
        r#"source logs | filter $l.applicationname == "api" | limit 100"#
    );

    let payload = service
        .call("custom_dataprime_query", json!({ "template": "nope" }))
        .await
        .unwrap();
    assert_eq!(payload["template"], "nope");
    assert_eq!(payload["parameters"], json!({}));
    assert_eq!(payload["query"], "source logs | limit 100");
}
