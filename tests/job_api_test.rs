use std::env;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use delivery_backend::error::Result as AppResult;
use delivery_backend::middleware::auth::Claims;
use delivery_backend::services::code_store::InMemoryCodeStore;
use delivery_backend::services::image_store::ImageStore;
use delivery_backend::AppState;

struct FixedImageStore;

#[async_trait::async_trait]
impl ImageStore for FixedImageStore {
    async fn upload(&self, _data: Bytes, file_name: &str, folder: &str) -> AppResult<String> {
        Ok(format!("https://images.example/{}/{}", folder, file_name))
    }
}

struct FailingImageStore;

#[async_trait::async_trait]
impl ImageStore for FailingImageStore {
    async fn upload(&self, _data: Bytes, _file_name: &str, _folder: &str) -> AppResult<String> {
        Err(delivery_backend::error::Error::Internal(
            "image store unavailable".into(),
        ))
    }
}

async fn setup_pool() -> Option<sqlx::PgPool> {
    dotenvy::dotenv().ok();
    let Ok(_) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("REDIS_URL", "redis://127.0.0.1/");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("IMAGE_STORE_URL", "http://localhost:9");
    env::set_var("OTP_TTL_SECS", "60");
    let _ = delivery_backend::config::init_config();

    let pool = delivery_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}

fn app(state: AppState) -> Router {
    let public = Router::new().route(
        "/api/jobs",
        get(delivery_backend::routes::job::list_jobs),
    );
    let authed = Router::new()
        .route(
            "/api/jobs/post_job",
            post(delivery_backend::routes::job::post_job),
        )
        .route(
            "/api/jobs/my_jobs",
            get(delivery_backend::routes::job::my_jobs),
        )
        .route(
            "/api/jobs/accept",
            post(delivery_backend::routes::job::accept_job),
        )
        .layer(axum::middleware::from_fn(
            delivery_backend::middleware::auth::require_bearer_auth,
        ));
    public.merge(authed).with_state(state)
}

fn state(pool: sqlx::PgPool, images: Arc<dyn ImageStore>) -> AppState {
    AppState::new(pool, images, Arc::new(InMemoryCodeStore::new()))
}

async fn seed_user(pool: &sqlx::PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind("Poster")
        .bind(format!("poster_{}@example.com", id))
        .execute(pool)
        .await
        .expect("seed user");
    id
}

async fn seed_shipper(pool: &sqlx::PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO shippers (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind("Shipper")
        .bind(format!("shipper_{}@example.com", id))
        .execute(pool)
        .await
        .expect("seed shipper");
    id
}

fn token_for(user: Uuid) -> String {
    let claims = Claims {
        sub: user.to_string(),
        email: format!("poster_{}@example.com", user),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test_secret_key"),
    )
    .expect("token")
}

fn multipart_body(job: &JsonValue, products: &JsonValue, shipment: &JsonValue) -> (String, Vec<u8>) {
    let boundary = "test-boundary-7f1a".to_string();
    let mut body = Vec::new();
    for (name, value) in [("job", job), ("products", products), ("shipment", shipment)] {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"sofa.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"not-really-a-png");
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (boundary, body)
}

fn post_job_request(token: &str, boundary: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/jobs/post_job")
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn aggregate_counts(pool: &sqlx::PgPool, title: &str) -> (i64, i64, i64) {
    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE title = $1")
        .bind(title)
        .fetch_one(pool)
        .await
        .unwrap();
    let products: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products WHERE job IN (SELECT id FROM jobs WHERE title = $1)",
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .unwrap();
    let shipments: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM shipments WHERE job IN (SELECT id FROM jobs WHERE title = $1)",
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .unwrap();
    (jobs, products, shipments)
}

#[tokio::test]
async fn post_job_creates_the_whole_aggregate() {
    let Some(pool) = setup_pool().await else { return };
    let user = seed_user(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FixedImageStore)));

    let title = format!("Move sofa {}", Uuid::new_v4());
    let job = json!({"title": title, "description": "Third floor, no lift"});
    let products = json!([
        {"name": "Sofa", "quantity": 1},
        {"name": "Coffee table", "quantity": 2, "price": "15.50"}
    ]);
    let shipment = json!({
        "pick_up": {"latitude": 1.0, "longitude": 1.0, "city": "Hanoi"},
        "delivery_address": {"latitude": 2.0, "longitude": 2.0, "city": "Da Nang"},
        "shipping_date": "2024-01-01",
        "expected_delivery_date": "2024-01-05"
    });

    let (boundary, body) = multipart_body(&job, &products, &shipment);
    let resp = app
        .oneshot(post_job_request(&token_for(user), &boundary, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let doc = json_body(resp).await;
    let job_id = doc["job"]["id"].as_str().unwrap().to_string();
    assert_eq!(doc["job"]["poster"].as_str().unwrap(), user.to_string());
    assert!(doc["job"]["image"]
        .as_str()
        .unwrap()
        .starts_with("https://images.example/job_image/"));

    assert_eq!(doc["products"].as_array().unwrap().len(), 2);
    for product in doc["products"].as_array().unwrap() {
        assert_eq!(product["job"].as_str().unwrap(), job_id);
    }

    let pick_up_id = doc["shipment"]["pick_up"]["id"].as_str().unwrap();
    let delivery_id = doc["shipment"]["delivery_address"]["id"].as_str().unwrap();
    assert_ne!(pick_up_id, delivery_id);
    assert_eq!(doc["shipment"]["job"].as_str().unwrap(), job_id);

    let (jobs, products, shipments) = aggregate_counts(&pool, &title).await;
    assert_eq!(jobs, 1);
    assert_eq!(products, 2);
    assert_eq!(shipments, 1);
}

#[tokio::test]
async fn invalid_product_rolls_back_everything() {
    let Some(pool) = setup_pool().await else { return };
    let user = seed_user(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FixedImageStore)));

    let title = format!("Rollback {}", Uuid::new_v4());
    let job = json!({"title": title});
    // second product fails validation after the first one persisted
    let products = json!([{"name": "Ok product"}, {"name": ""}]);
    let shipment = json!({
        "pick_up": {"latitude": 1.0, "longitude": 1.0},
        "delivery_address": {"latitude": 2.0, "longitude": 2.0},
        "shipping_date": "2024-01-01",
        "expected_delivery_date": "2024-01-05"
    });

    let addresses_before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
        .fetch_one(&pool)
        .await
        .unwrap();

    let (boundary, body) = multipart_body(&job, &products, &shipment);
    let resp = app
        .oneshot(post_job_request(&token_for(user), &boundary, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (jobs, products, shipments) = aggregate_counts(&pool, &title).await;
    assert_eq!((jobs, products, shipments), (0, 0, 0));

    let addresses_after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(addresses_before, addresses_after);
}

#[tokio::test]
async fn image_upload_failure_aborts_before_any_write() {
    let Some(pool) = setup_pool().await else { return };
    let user = seed_user(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FailingImageStore)));

    let title = format!("No image {}", Uuid::new_v4());
    let job = json!({"title": title});
    let products = json!([{"name": "Sofa"}]);
    let shipment = json!({
        "pick_up": {"latitude": 1.0, "longitude": 1.0},
        "delivery_address": {"latitude": 2.0, "longitude": 2.0},
        "shipping_date": "2024-01-01",
        "expected_delivery_date": "2024-01-05"
    });

    let (boundary, body) = multipart_body(&job, &products, &shipment);
    let resp = app
        .oneshot(post_job_request(&token_for(user), &boundary, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let (jobs, _, _) = aggregate_counts(&pool, &title).await;
    assert_eq!(jobs, 0);
}

async fn post_dated_job(
    app: &Router,
    user: Uuid,
    title: &str,
    shipping: &str,
    expected: &str,
) -> String {
    let job = json!({"title": title});
    let products = json!([{"name": "Box"}]);
    let shipment = json!({
        "pick_up": {"latitude": 1.0, "longitude": 1.0},
        "delivery_address": {"latitude": 2.0, "longitude": 2.0},
        "shipping_date": shipping,
        "expected_delivery_date": expected
    });
    let (boundary, body) = multipart_body(&job, &products, &shipment);
    let resp = app
        .clone()
        .oneshot(post_job_request(&token_for(user), &boundary, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["job"]["id"].as_str().unwrap().to_string()
}

fn listed_ids(docs: &JsonValue) -> Vec<String> {
    docs.as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn date_range_filter_needs_both_bounds() {
    let Some(pool) = setup_pool().await else { return };
    let user = seed_user(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FixedImageStore)));

    let inside = post_dated_job(&app, user, "In range", "2030-06-10", "2030-06-12").await;
    let outside = post_dated_job(&app, user, "Out of range", "2030-08-01", "2030-08-03").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/jobs?fromDate=01/06/2030&toDate=30/06/2030")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ids = listed_ids(&json_body(resp).await);
    assert!(ids.contains(&inside));
    assert!(!ids.contains(&outside));

    // only one bound supplied: filter is ignored entirely
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/jobs?fromDate=01/06/2030")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ids = listed_ids(&json_body(resp).await);
    assert!(ids.contains(&inside));
    assert!(ids.contains(&outside));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/jobs?fromDate=garbage&toDate=30/06/2030")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_listing_carries_auctions_public_does_not() {
    let Some(pool) = setup_pool().await else { return };
    let user = seed_user(&pool).await;
    let shipper = seed_shipper(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FixedImageStore)));

    let job_id = post_dated_job(&app, user, "Auctioned", "2031-01-01", "2031-01-05").await;
    sqlx::query("INSERT INTO auctions (job, shipper, bid_price) VALUES ($1, $2, $3)")
        .bind(Uuid::parse_str(&job_id).unwrap())
        .bind(shipper)
        .bind(rust_decimal::Decimal::new(12000, 2))
        .execute(&pool)
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/jobs/my_jobs")
                .header("authorization", format!("Bearer {}", token_for(user)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let docs = json_body(resp).await;
    let mine = docs
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_str() == Some(job_id.as_str()))
        .expect("job in owner listing");
    let auctions = mine["auctions"].as_array().expect("auctions array");
    assert_eq!(auctions.len(), 1);
    assert_eq!(
        auctions[0]["shipper"]["id"].as_str().unwrap(),
        shipper.to_string()
    );
    // the nested shipper carries its own fields, not just the id
    assert_eq!(auctions[0]["shipper"]["name"].as_str().unwrap(), "Shipper");
    assert_eq!(
        auctions[0]["shipper"]["email"].as_str().unwrap(),
        format!("shipper_{}@example.com", shipper)
    );

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let docs = json_body(resp).await;
    let public = docs
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_str() == Some(job_id.as_str()))
        .expect("job in public listing");
    assert!(public.get("auctions").is_none());
}

#[tokio::test]
async fn accept_sets_winner_only_for_the_owner() {
    let Some(pool) = setup_pool().await else { return };
    let owner = seed_user(&pool).await;
    let stranger = seed_user(&pool).await;
    let shipper = seed_shipper(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FixedImageStore)));

    let job_id = post_dated_job(&app, owner, "To accept", "2032-01-01", "2032-01-05").await;

    // someone else's token: existence must not leak
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/accept")
                .header("authorization", format!("Bearer {}", token_for(stranger)))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"job": job_id, "shipper": shipper}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let winner: Option<Uuid> = sqlx::query_scalar("SELECT winner FROM jobs WHERE id = $1")
        .bind(Uuid::parse_str(&job_id).unwrap())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(winner.is_none());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/accept")
                .header("authorization", format!("Bearer {}", token_for(owner)))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"job": job_id, "shipper": shipper}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let winner: Option<Uuid> = sqlx::query_scalar("SELECT winner FROM jobs WHERE id = $1")
        .bind(Uuid::parse_str(&job_id).unwrap())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(winner, Some(shipper));

    // unknown shipper id fails after ownership passes
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/accept")
                .header("authorization", format!("Bearer {}", token_for(owner)))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"job": job_id, "shipper": Uuid::new_v4()}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn accept_with_malformed_body_is_a_bad_request() {
    let Some(pool) = setup_pool().await else { return };
    let owner = seed_user(&pool).await;
    let app = app(state(pool.clone(), Arc::new(FixedImageStore)));

    let job_id = post_dated_job(&app, owner, "Half a request", "2032-02-01", "2032-02-05").await;

    // required field missing from the body
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/accept")
                .header("authorization", format!("Bearer {}", token_for(owner)))
                .header("content-type", "application/json")
                .body(Body::from(json!({"job": job_id}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // no body at all
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/accept")
                .header("authorization", format!("Bearer {}", token_for(owner)))
                .header("content-type", "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
