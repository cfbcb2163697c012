//! End-to-end pipeline tests
//!
//! The first half exercises the full client against a mock server: embed
//! page, widget data and batch endpoints. The second half runs the pure
//! pipeline (parse, validate, build, decode, align) without any transport.

mod common;

use chrono::{TimeZone, Utc};
use serde_json::json;
use trendwind::align;
use trendwind::client::{ExploreOptions, InterestOverTime, Trends};
use trendwind::config::Config;
use trendwind::decode;
use trendwind::models::BatchWindow;
use trendwind::plan::{self, build};
use trendwind::timeframe::TimeInterval;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.transport.rate_limit = 100.0;
    config
}

#[tokio::test]
async fn test_interest_over_time_single_range() {
    let mock_server = MockServer::start().await;

    let widget = json!({
        "request": { "comparisonItem": [], "time": "today 3-m" },
        "token": "tok123",
        "type": "fe_line_chart"
    });
    Mock::given(method("GET"))
        .and(path("/trends/embed/explore/TIMESERIES"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::embed_page(&widget)))
        .mount(&mock_server)
        .await;

    let payload = common::timeline_payload(&[
        (1_726_200_000, vec![45, 12]),
        (1_726_203_600, vec![50, 15]),
    ]);
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/multiline"))
        .and(query_param("token", "tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::guarded(&payload)))
        .mount(&mock_server)
        .await;

    let client = Trends::with_base_url(&mock_server.uri(), fast_config()).unwrap();
    let result = client
        .interest_over_time(&["rust", "go"], &["today 3-m"], &["US"], &ExploreOptions::default())
        .await
        .unwrap();

    match result {
        InterestOverTime::Single(table) => {
            assert_eq!(table.columns, ["rust", "go"]);
            assert_eq!(table.rows.len(), 2);
            assert_eq!(table.rows[0].values, [Some(45.0), Some(12.0)]);
        }
        other => panic!("expected single-range table, got {other:?}"),
    }
}

#[tokio::test]
async fn test_interest_over_time_multirange_branches() {
    let mock_server = MockServer::start().await;

    let widget = json!({
        "request": { "comparisonItem": [] },
        "token": "tok456",
        "type": "fe_multi_range_chart"
    });
    Mock::given(method("GET"))
        .and(path("/trends/embed/explore/TIMESERIES"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::embed_page(&widget)))
        .mount(&mock_server)
        .await;

    let payload = json!({
        "default": { "timelineData": [
            { "columnData": [
                { "time": "1705104000", "value": 30 },
                { "time": "1716854400", "value": 61 },
            ]},
            { "columnData": [
                { "time": "1705190400", "value": 35 },
                { "time": "1716940800", "value": 59 },
            ]},
        ]}
    });
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/multirange"))
        .and(query_param("token", "tok456"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::guarded(&payload)))
        .mount(&mock_server)
        .await;

    let client = Trends::with_base_url(&mock_server.uri(), fast_config()).unwrap();
    let result = client
        .interest_over_time(
            &["rust"],
            &["2024-01-25 12-d", "2024-06-20 23-d"],
            &["US", "GB"],
            &ExploreOptions::default(),
        )
        .await
        .unwrap();

    match result {
        InterestOverTime::Multirange(table) => {
            assert_eq!(table.branches.len(), 2);
            assert_eq!(table.branches[0].label, "rust | US | 2024-01-13 2024-01-25");
            assert_eq!(table.branches[1].label, "rust | GB | 2024-05-28 2024-06-20");
            // Branches keep their own timestamps instead of merging rows.
            assert_ne!(
                table.branches[0].points[0].timestamp,
                table.branches[1].points[0].timestamp
            );
        }
        other => panic!("expected multirange table, got {other:?}"),
    }
}

#[tokio::test]
async fn test_related_queries_flow() {
    let mock_server = MockServer::start().await;

    let widget = json!({
        "request": { "restriction": {}, "keywordType": "QUERY" },
        "token": "tok789"
    });
    Mock::given(method("GET"))
        .and(path("/trends/embed/explore/RELATED_QUERIES"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::embed_page(&widget)))
        .mount(&mock_server)
        .await;

    let payload = json!({
        "default": { "rankedList": [
            { "rankedKeyword": [
                { "query": "rust lang", "value": 100, "formattedValue": "100" },
            ]},
            { "rankedKeyword": [
                { "query": "rust 2024", "value": 4350, "formattedValue": "Breakout" },
            ]},
        ]}
    });
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/relatedsearches"))
        .and(query_param("token", "tok789"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::guarded(&payload)))
        .mount(&mock_server)
        .await;

    let client = Trends::with_base_url(&mock_server.uri(), fast_config()).unwrap();
    let group = client
        .related_queries("rust", "today 3-m", "US", &ExploreOptions::default())
        .await
        .unwrap();

    assert_eq!(group.top.len(), 1);
    assert_eq!(group.top[0].label, "rust lang");
    assert_eq!(group.rising[0].formatted_value, "Breakout");
}

#[tokio::test]
async fn test_related_topics_flow() {
    let mock_server = MockServer::start().await;

    let widget = json!({
        "request": { "restriction": {}, "keywordType": "ENTITY" },
        "token": "tok790"
    });
    Mock::given(method("GET"))
        .and(path("/trends/embed/explore/RELATED_TOPICS"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::embed_page(&widget)))
        .mount(&mock_server)
        .await;

    let payload = json!({
        "default": { "rankedList": [
            { "rankedKeyword": [
                {
                    "topic": { "mid": "/m/0dsbpg6", "title": "Rust", "type": "Programming language" },
                    "value": 100,
                    "formattedValue": "100"
                },
            ]},
        ]}
    });
    Mock::given(method("GET"))
        .and(path("/trends/api/widgetdata/relatedsearches"))
        .and(query_param("token", "tok790"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::guarded(&payload)))
        .mount(&mock_server)
        .await;

    let client = Trends::with_base_url(&mock_server.uri(), fast_config()).unwrap();
    let group = client
        .related_topics("rust", "today 3-m", "US", &ExploreOptions::default())
        .await
        .unwrap();

    let topic = group.top[0].topic.as_ref().unwrap();
    assert_eq!(group.top[0].label, "Rust");
    assert_eq!(topic.id, "/m/0dsbpg6");
}

#[tokio::test]
async fn test_showcase_timeline_batch() {
    let mock_server = MockServer::start().await;

    let values: Vec<u64> = (0..91).map(|i| i % 101).collect();
    let inner = json!([null, [["rust", values]]]);
    Mock::given(method("POST"))
        .and(path("/_/TrendsUi/data/batchexecute"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::batch_envelope("jpdkv", &inner)),
        )
        .mount(&mock_server)
        .await;

    let client = Trends::with_base_url(&mock_server.uri(), fast_config()).unwrap();
    let table = client
        .showcase_timeline(&["rust"], "US", BatchWindow::Past24H)
        .await
        .unwrap();

    assert_eq!(table.columns, ["rust"]);
    assert_eq!(table.rows.len(), 91);
    // 16-minute spacing throughout the synthesized axis.
    let spacing = table.rows[1].timestamp - table.rows[0].timestamp;
    assert_eq!(spacing.num_seconds(), 960);
}

#[tokio::test]
async fn test_trending_now_batch() {
    let mock_server = MockServer::start().await;

    let inner = json!([null, [[
        "aurora borealis", null, "US", [1_726_100_000], null, null,
        50_000, null, 400, ["northern lights"]
    ]]]);
    Mock::given(method("POST"))
        .and(path("/_/TrendsUi/data/batchexecute"))
        .and(query_param("rpcids", "i0OFE"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::batch_envelope("i0OFE", &inner)),
        )
        .mount(&mock_server)
        .await;

    let client = Trends::with_base_url(&mock_server.uri(), fast_config()).unwrap();
    let trends = client.trending_now("US", 24).await.unwrap();

    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].keyword, "aurora borealis");
    assert_eq!(trends[0].volume, 50_000);
    assert!(!trends[0].is_finished());
}

#[test]
fn test_pipeline_without_transport() {
    // Parse and validate two comparable branches.
    let clock = Utc.with_ymd_and_hms(2024, 9, 13, 22, 0, 0).unwrap();
    let intervals = vec![
        TimeInterval::parse_at("2024-01-25 12-d", clock).unwrap(),
        TimeInterval::parse_at("2024-06-20 23-d", clock).unwrap(),
    ];
    let request_plan = plan::validate(intervals, vec!["US".into(), "GB".into()]).unwrap();

    // Build the explore call.
    let call = build::explore(&request_plan, &["rust".to_string()], "").unwrap();
    let items = call.req["comparisonItem"].as_array().unwrap();
    assert_eq!(items.len(), 2);

    // Decode a multirange payload the way the service would answer.
    let payload = json!({
        "default": { "timelineData": [
            { "columnData": [
                { "time": "1705104000", "value": 30 },
                { "time": "1716854400", "value": 61 },
            ]},
            { "columnData": [
                { "time": "1705190400", "value": 35 },
                { "time": "0", "value": -1 },
            ]},
        ]}
    });
    let labels = vec![
        "rust | US | 2024-01-13 2024-01-25".to_string(),
        "rust | GB | 2024-05-28 2024-06-20".to_string(),
    ];
    let series = decode::timeline::multirange(&payload, &labels).unwrap();

    // Align without merging wall-clock rows across branches.
    let table = align::align_multirange(series);
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.branches[0].points.len(), 2);
    // The -1 cell was outside the second branch's range.
    assert_eq!(table.branches[1].points.len(), 1);
}
