use std::collections::HashMap;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use genius_harvest::clients::{Credential, GeniusClient, SearchApi, errors::Error};
use genius_harvest::harvester::{ConfigBuilder, Harvester};
use genius_harvest::table::Table;
use serde_json::{Value, json};

const TOKEN: &str = "test-token";

fn hits(term: &str, count: usize) -> Value {
    let hits: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "type": "song",
                "result": {
                    "id": i,
                    "title": format!("{term} #{i}"),
                    "stats": {"pageviews": i * 100, "hot": false},
                    "primary_artist": {"id": 42, "name": term}
                }
            })
        })
        .collect();
    json!({"meta": {"status": 200}, "response": {"hits": hits}})
}

// Stand-in for GET /search on the Genius API
async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("access_token").map(String::as_str) != Some(TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"meta": {"status": 401}}))).into_response();
    }
    let term = params.get("q").cloned().unwrap_or_default();
    let per_page: usize = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(10);

    match term.as_str() {
        "busy" => StatusCode::TOO_MANY_REQUESTS.into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "garbled" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "shapeless" => Json(json!({"meta": {"status": 200}})).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(hits(&term, 1)).into_response()
        }
        _ => Json(hits(&term, per_page.min(3))).into_response(),
    }
}

async fn spawn_mock_api() -> String {
    let app = Router::new().route("/search", get(search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, token: &str, timeout: Duration) -> GeniusClient {
    let credential = Credential::try_from_token(token).unwrap();
    GeniusClient::new(credential, base_url, timeout).unwrap()
}

#[tokio::test]
async fn search_returns_hit_results() {
    let base = spawn_mock_api().await;
    let hits = client(&base, TOKEN, Duration::from_secs(5))
        .search("Men I Trust", 2)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["title"], json!("Men I Trust #1"));
    assert_eq!(hits[1]["primary_artist"]["name"], json!("Men I Trust"));
}

#[tokio::test]
async fn bad_token_is_auth_error() {
    let base = spawn_mock_api().await;
    let err = client(&base, "expired", Duration::from_secs(5))
        .search("Slowdive", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthError));
}

#[tokio::test]
async fn status_and_body_failures_are_distinct() {
    let base = spawn_mock_api().await;
    let client = client(&base, TOKEN, Duration::from_secs(5));

    let err = client.search("busy", 5).await.unwrap_err();
    assert!(matches!(err, Error::RateLimitError));

    let err = client.search("broken", 5).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatusError(500)));

    let err = client.search("garbled", 5).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponseError(_)));

    let err = client.search("shapeless", 5).await.unwrap_err();
    assert!(matches!(err, Error::SchemaError(_)));
}

#[tokio::test]
async fn slow_response_is_timeout_error() {
    let base = spawn_mock_api().await;
    let err = client(&base, TOKEN, Duration::from_millis(200))
        .search("slow", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TimeoutError(_)), "got {err:?}");
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"), TOKEN, Duration::from_secs(5))
        .search("Slowdive", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NetworkError(_)), "got {err:?}");
}

#[tokio::test]
async fn harvest_writes_partial_csv_and_reports_failures() {
    let base = spawn_mock_api().await;
    let config = ConfigBuilder::new()
        .client(client(&base, TOKEN, Duration::from_secs(5)))
        .per_page(2)
        .parallelism(2)
        .build()
        .unwrap();
    let terms: Vec<String> = ["The Beatles", "busy", "Missy Elliot"]
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut report = Harvester::new(config).run(&terms).await;
    report.sort_by_input_order();
    assert_eq!(report.succeeded(), 2);
    let failures: Vec<_> = report.failures().map(|(term, _)| term.to_string()).collect();
    assert_eq!(failures, ["busy"]);

    let table = report.into_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genius-multiple-terms-search.csv");
    table.save_csv(&path).await.unwrap();

    let back = Table::load_csv(&path).await.unwrap();
    assert_eq!(back.len(), 4);
    assert_eq!(back.columns(), table.columns());
    for column in ["stat_pageviews", "stat_hot", "primary_artist_id", "primary_artist_name"] {
        assert!(back.columns().iter().any(|c| c == column), "missing {column}");
    }
    assert_eq!(back.cell(0, "primary_artist_name"), Some(&json!("The Beatles")));
    assert_eq!(back.cell(3, "primary_artist_name"), Some(&json!("Missy Elliot")));
}
