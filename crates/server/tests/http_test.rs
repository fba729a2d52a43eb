use pitchmap::{Engine, EngineBuilder};
use pitchmap_server::Handler;
use pitchmap_server::transport::http;
use pitchmap_types::{Entity, NearbyResponse, Role, Sport, ViewportResponse};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;

const BANGALORE_VIEW: &str = "minLat=12.9&maxLat=13.1&minLng=77.5&maxLng=77.7";

fn seeded_engine() -> anyhow::Result<Engine> {
    Ok(EngineBuilder::new()
        .seed([
            Entity::new("1", 12.97, 77.59, Sport::Cricket, Role::Player)
                .with_payload(json!({"name": "Asha", "city": "Bangalore"})),
            Entity::new("2", 12.971, 77.591, Sport::Cricket, Role::Coach),
            Entity::new("3", 13.5, 78.0, Sport::Football, Role::Player),
        ])
        .build()?)
}

async fn spawn_server(engine: Engine) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handler = Handler::with_background_writer(engine, 64);
    tokio::spawn(async move {
        let _ = http::run_server(listener, handler, futures::future::pending()).await;
    });
    Ok(addr)
}

async fn get_json(url: String) -> anyhow::Result<(StatusCode, Value)> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

#[tokio::test]
async fn test_viewport_returns_cluster() -> anyhow::Result<()> {
    tracing_subscriber::fmt::try_init().ok();
    let addr = spawn_server(seeded_engine()?).await?;

    let (status, body) =
        get_json(format!("http://{addr}/api/users/viewport?{BANGALORE_VIEW}&zoom=11")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalInViewport"], 2);
    assert_eq!(body["zoom"], 11);
    assert_eq!(body["viewport"]["minLng"], 77.5);

    let clusters = body["clusters"].as_array().expect("clusters array");
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0]["isCluster"], true);
    assert_eq!(clusters[0]["count"], 2);
    assert_eq!(clusters[0]["sportCounts"], json!({"Cricket": 2}));
    assert_eq!(clusters[0]["id"], "11:2343:5861");
    Ok(())
}

#[tokio::test]
async fn test_viewport_defaults_and_filters() -> anyhow::Result<()> {
    let addr = spawn_server(seeded_engine()?).await?;
    let base = format!("http://{addr}/api/users/viewport?{BANGALORE_VIEW}");

    let response: ViewportResponse = reqwest::get(&base).await?.json().await?;
    assert_eq!(response.zoom, 11);
    assert_eq!(response.total_in_viewport, 2);

    let response: ViewportResponse =
        reqwest::get(format!("{base}&sport=All&role=coaches&zoom=16")).await?.json().await?;
    assert_eq!(response.total_in_viewport, 1);
    assert_eq!(response.clusters[0].id(), "2");

    let response: ViewportResponse =
        reqwest::get(format!("{base}&sport=Football")).await?.json().await?;
    assert_eq!(response.total_in_viewport, 0);
    assert!(response.clusters.is_empty());

    // Individual items carry the full payload.
    let (_, body) = get_json(format!("{base}&zoom=18&role=player")).await?;
    assert_eq!(body["clusters"][0]["isCluster"], false);
    assert_eq!(body["clusters"][0]["entity"]["payload"]["name"], "Asha");
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() -> anyhow::Result<()> {
    let addr = spawn_server(seeded_engine()?).await?;

    let (status, body) = get_json(format!(
        "http://{addr}/api/users/viewport?minLat=13.1&maxLat=12.9&minLng=77.5&maxLng=77.7"
    ))
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_VIEWPORT");
    assert_eq!(body["retryable"], false);

    let (status, body) =
        get_json(format!("http://{addr}/api/users/viewport?{BANGALORE_VIEW}&zoom=40")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_VIEWPORT");

    let (status, body) =
        get_json(format!("http://{addr}/api/users/viewport?minLat=12.9")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");

    let (status, body) =
        get_json(format!("http://{addr}/api/users/viewport?{BANGALORE_VIEW}&sport=Quidditch"))
            .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");

    let (status, body) =
        get_json(format!("http://{addr}/api/users/nearby?lat=12.97&lng=77.59&radius=0")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");
    Ok(())
}

#[tokio::test]
async fn test_loading_index_is_retryable() -> anyhow::Result<()> {
    let engine = EngineBuilder::new().unavailable().build()?;
    let addr = spawn_server(engine.clone()).await?;

    let (status, body) =
        get_json(format!("http://{addr}/api/users/viewport?{BANGALORE_VIEW}")).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "INDEX_UNAVAILABLE");
    assert_eq!(body["retryable"], true);

    let (status, body) = get_json(format!("http://{addr}/api/sports")).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "INDEX_UNAVAILABLE");

    let (_, health) = get_json(format!("http://{addr}/api/health")).await?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["ready"], false);

    engine.mark_ready();
    let (status, body) =
        get_json(format!("http://{addr}/api/users/viewport?{BANGALORE_VIEW}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalInViewport"], 0);
    Ok(())
}

#[tokio::test]
async fn test_nearby_sorted_by_distance() -> anyhow::Result<()> {
    let addr = spawn_server(seeded_engine()?).await?;

    let response: NearbyResponse =
        reqwest::get(format!("http://{addr}/api/users/nearby?lat=12.97&lng=77.59&radius=100"))
            .await?
            .json()
            .await?;
    assert_eq!(response.count, 3);
    assert_eq!(response.users[0].entity.id, "1");
    assert_eq!(response.users[0].distance_km, 0.0);
    assert_eq!(response.users[2].entity.id, "3");

    let response: NearbyResponse = reqwest::get(format!(
        "http://{addr}/api/users/nearby?lat=12.97&lng=77.59&radius=10&sport=cricket&limit=1"
    ))
    .await?
    .json()
    .await?;
    assert_eq!(response.count, 1);
    assert_eq!(response.sport_filter, Some(Sport::Cricket));
    Ok(())
}

#[tokio::test]
async fn test_upsert_get_and_delete() -> anyhow::Result<()> {
    let addr = spawn_server(Engine::new()?).await?;
    let client = reqwest::Client::new();

    let entity = Entity::new("42", 19.07, 72.87, Sport::Kabaddi, Role::Player);
    let response = client
        .put(format!("http://{addr}/api/users"))
        .json(&entity)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Applied by the background writer.
    let mut found = None;
    for _ in 0..100 {
        let response = client.get(format!("http://{addr}/api/users/42")).send().await?;
        if response.status() == StatusCode::OK {
            found = Some(response.json::<Entity>().await?);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(found, Some(entity));

    let response = client.delete(format!("http://{addr}/api/users/42")).send().await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let mut status = StatusCode::OK;
    for _ in 0..100 {
        status = client.get(format!("http://{addr}/api/users/42")).send().await?.status();
        if status == StatusCode::NOT_FOUND {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, StatusCode::NOT_FOUND);

    let bad = json!({"id": "x", "latitude": 91.0, "longitude": 0.0, "sport": "Golf"});
    let response = client
        .put(format!("http://{addr}/api/users"))
        .json(&bad)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_ENTITY");
    Ok(())
}

#[tokio::test]
async fn test_catalog_endpoints() -> anyhow::Result<()> {
    let addr = spawn_server(seeded_engine()?).await?;

    let (status, banner) = get_json(format!("http://{addr}/api/")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banner["status"], "running");

    let (status, sports) = get_json(format!("http://{addr}/api/sports")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sports["count"], 2);
    assert_eq!(sports["sports"], json!(["Cricket", "Football"]));
    assert_eq!(
        sports["details"],
        json!([{"sport": "Cricket", "count": 2}, {"sport": "Football", "count": 1}])
    );

    let (_, stats) = get_json(format!("http://{addr}/api/stats")).await?;
    assert_eq!(stats["entities"], 3);
    assert_eq!(stats["ready"], true);

    let (status, missing) = get_json(format!("http://{addr}/api/users/nope")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["code"], "NOT_FOUND");
    Ok(())
}
