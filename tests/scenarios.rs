//! Database-backed walkthroughs of the main flows. They need a reachable
//! PostgreSQL through `DATABASE_URL`; run them with `cargo test -- --ignored`.

mod common;

use axum::{
    http::{Method, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use common::{app_with_pool, send};

struct Account {
    id: String,
    token: String,
}

async fn register(app: &Router, name: &str, email: &str, role: &str) -> Account {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "full_name": name,
            "email": email,
            "password": "pw1234",
            "phone": "+260700000000",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {}: {}", email, body);

    Account {
        id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        token: body["data"]["token"].as_str().unwrap().to_string(),
    }
}

async fn create_house(app: &Router, landlord: &Account) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/houses",
        Some(&landlord.token),
        Some(json!({
            "title": "Two bedroom house",
            "description": "Quiet street close to the market",
            "address": "12 Independence Avenue, Lusaka",
            "monthly_rent": "5000",
            "house_type": "house",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create house: {}", body);
    assert_eq!(body["data"]["status"], "available");

    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_agreement(
    app: &Router,
    landlord: &Account,
    tenant: &Account,
    house_id: &str,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/v1/rentals",
        Some(&landlord.token),
        Some(json!({
            "house_id": house_id,
            "tenant_id": tenant.id,
            "start_date": "2025-01-01",
            "end_date": "2025-12-31",
            "rent_amount": "5000",
            "deposit": "5000",
        })),
    )
    .await
}

async fn house_status(app: &Router, house_id: &str) -> Value {
    let (status, body) = send(
        app,
        Method::GET,
        &format!("/api/v1/houses/{}", house_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["status"].clone()
}

struct Lease {
    landlord: Account,
    tenant: Account,
    house_id: String,
    agreement_id: String,
}

async fn lease(app: &Router) -> Lease {
    let landlord = register(app, "Lydia Banda", "landlord@example.com", "landlord").await;
    let tenant = register(app, "Ada Phiri", "tenant@example.com", "tenant").await;
    let house_id = create_house(app, &landlord).await;

    let (status, body) = create_agreement(app, &landlord, &tenant, &house_id).await;
    assert_eq!(status, StatusCode::CREATED, "create agreement: {}", body);

    Lease {
        agreement_id: body["data"]["id"].as_str().unwrap().to_string(),
        landlord,
        tenant,
        house_id,
    }
}

async fn pay_rent(app: &Router, lease: &Lease) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/payments",
        Some(&lease.tenant.token),
        Some(json!({
            "agreement_id": lease.agreement_id,
            "amount": 5000,
            "method": "MTN",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "payment: {}", body);
    body
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn registration_hides_hash_and_rejects_duplicate_email(pool: PgPool) {
    let app = app_with_pool(pool);
    let payload = json!({
        "full_name": "Ada",
        "email": "ada@example.com",
        "password": "pw1234",
        "phone": "+260700000000",
        "role": "tenant",
    });

    let (status, body) = send(&app, Method::POST, "/api/v1/auth/register", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert_eq!(body["data"]["user"]["role"], "tenant");

    let (status, body) = send(&app, Method::POST, "/api/v1/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with this email already exists");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "pw1234"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap();

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ada@example.com");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn rental_lifecycle_moves_house_between_available_and_occupied(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;

    assert_eq!(house_status(&app, &lease.house_id).await, "occupied");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/reviews",
        Some(&lease.tenant.token),
        Some(json!({
            "house_id": lease.house_id,
            "rating": 5,
            "comment": "Bright rooms and a responsive landlord",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "review: {}", body);

    let terminate = format!("/api/v1/rentals/{}/terminate", lease.agreement_id);
    let (status, body) = send(&app, Method::PUT, &terminate, Some(&lease.landlord.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "terminated");

    assert_eq!(house_status(&app, &lease.house_id).await, "available");

    let (status, body) = send(&app, Method::PUT, &terminate, Some(&lease.landlord.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only active agreements can be terminated");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn second_active_agreement_for_house_conflicts(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;
    let other = register(&app, "Ben Mwale", "other@example.com", "tenant").await;

    let (status, body) = create_agreement(&app, &lease.landlord, &other, &lease.house_id).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "House already has an active rental agreement");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn mtn_payment_settles_with_commission_and_notifies_landlord(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;

    let body = pay_rent(&app, &lease).await;
    let payment = &body["data"]["payment"];

    assert_eq!(payment["status"], "completed");
    assert_eq!(payment["method"], "MTN");
    assert_eq!(decimal(&payment["commission"]), Decimal::from(250));
    assert!(payment["reference_no"].as_str().unwrap().starts_with("MTN_"));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/notifications?type=payment",
        Some(&lease.landlord.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["user_id"], lease.landlord.id.as_str());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn tenants_cannot_see_each_others_agreements_or_notifications(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;
    let stranger = register(&app, "Ben Mwale", "stranger@example.com", "tenant").await;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/rentals/{}", lease.agreement_id),
        Some(&stranger.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, Method::GET, "/api/v1/notifications", Some(&lease.tenant.token), None).await;
    let notification_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/notifications/{}", notification_id),
        Some(&stranger.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Notification not found");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn payment_report_totals_completed_payments_for_admins_only(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;
    let admin = register(&app, "Root Admin", "admin@example.com", "admin").await;
    pay_rent(&app, &lease).await;

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let uri = format!(
        "/api/v1/admin/reports?type=payments&start_date={}&end_date={}",
        today, today
    );

    let (status, body) = send(&app, Method::GET, &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["summary"]["total_amount"]), Decimal::from(5000));
    assert_eq!(body["data"]["summary"]["total_payments"], 1);

    let (status, body) = send(&app, Method::GET, &uri, Some(&lease.tenant.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin access required");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn favorites_add_and_remove_are_not_repeatable(pool: PgPool) {
    let app = app_with_pool(pool);
    let landlord = register(&app, "Lydia Banda", "landlord@example.com", "landlord").await;
    let tenant = register(&app, "Ada Phiri", "tenant@example.com", "tenant").await;
    let house_id = create_house(&app, &landlord).await;
    let uri = format!("/api/v1/favorites/{}", house_id);

    let (first, _) = send(&app, Method::POST, &uri, Some(&tenant.token), None).await;
    let (second, _) = send(&app, Method::POST, &uri, Some(&tenant.token), None).await;
    assert_eq!((first, second), (StatusCode::CREATED, StatusCode::CONFLICT));

    let (status, body) = send(&app, Method::GET, &format!("{}/check", uri), Some(&tenant.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_favorite"], true);

    let (first, _) = send(&app, Method::DELETE, &uri, Some(&tenant.token), None).await;
    let (second, _) = send(&app, Method::DELETE, &uri, Some(&tenant.token), None).await;
    assert_eq!((first, second), (StatusCode::OK, StatusCode::NOT_FOUND));

    let (status, _) = send(&app, Method::POST, &uri, Some(&landlord.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn mark_all_read_twice_updates_nothing_the_second_time(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;

    let (status, body) = send(&app, Method::PUT, "/api/v1/notifications/read-all", Some(&lease.tenant.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 1);

    let (_, body) = send(&app, Method::PUT, "/api/v1/notifications/read-all", Some(&lease.tenant.token), None).await;
    assert_eq!(body["data"]["updated"], 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn featured_filter_drops_listings_once_their_window_lapses(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let landlord = register(&app, "Lydia Banda", "landlord@example.com", "landlord").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/houses",
        Some(&landlord.token),
        Some(json!({
            "title": "Garden flat",
            "description": "Ground floor flat with a small garden",
            "address": "3 Kabulonga Road, Lusaka",
            "monthly_rent": "4200",
            "house_type": "apartment",
            "is_featured": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create house: {}", body);
    assert_eq!(body["data"]["is_featured"], true);
    let house_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let (_, body) = send(&app, Method::GET, "/api/v1/houses?featured=true", None, None).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);

    sqlx::query("UPDATE houses SET featured_until = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(house_id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(&app, Method::GET, "/api/v1/houses?featured=true", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 0);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (_, body) = send(&app, Method::GET, "/api/v1/houses", None, None).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn zero_coordinates_are_refused_but_omitted_ones_are_not(pool: PgPool) {
    let app = app_with_pool(pool);
    let landlord = register(&app, "Lydia Banda", "landlord@example.com", "landlord").await;
    let listing = |coordinates: Option<(&str, &str)>| {
        let mut body = json!({
            "title": "Two bedroom house",
            "description": "Quiet street close to the market",
            "address": "12 Independence Avenue, Lusaka",
            "monthly_rent": "5000",
            "house_type": "house",
        });
        if let Some((lat, lon)) = coordinates {
            body["latitude"] = json!(lat);
            body["longitude"] = json!(lon);
        }
        body
    };

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/houses",
        Some(&landlord.token),
        Some(listing(Some(("0", "0")))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "zero coordinates: {}", body);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/houses",
        Some(&landlord.token),
        Some(listing(None)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "no coordinates: {}", body);
    let house_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/houses/{}", house_id),
        Some(&landlord.token),
        Some(json!({"latitude": "0", "longitude": "0"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/houses/{}", house_id),
        Some(&landlord.token),
        Some(json!({"latitude": "-15.4167", "longitude": "28.2833"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "real coordinates: {}", body);
    assert_eq!(decimal(&body["data"]["latitude"]), "-15.4167".parse::<Decimal>().unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn page_far_past_the_end_is_empty(pool: PgPool) {
    let app = app_with_pool(pool);
    let landlord = register(&app, "Lydia Banda", "landlord@example.com", "landlord").await;
    create_house(&app, &landlord).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/houses?page=9223372036854775807",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "huge page: {}", body);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn admin_can_return_rented_house_from_maintenance(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;
    let admin = register(&app, "Root Admin", "admin@example.com", "admin").await;
    let uri = format!("/api/v1/houses/{}", lease.house_id);

    let (status, body) = send(&app, Method::PUT, &uri, Some(&admin.token), Some(json!({"status": "maintenance"}))).await;
    assert_eq!(status, StatusCode::OK, "to maintenance: {}", body);
    assert_eq!(house_status(&app, &lease.house_id).await, "maintenance");

    let (status, body) = send(&app, Method::PUT, &uri, Some(&admin.token), Some(json!({"status": "occupied"}))).await;
    assert_eq!(status, StatusCode::OK, "back to occupied: {}", body);
    assert_eq!(house_status(&app, &lease.house_id).await, "occupied");

    let terminate = format!("/api/v1/rentals/{}/terminate", lease.agreement_id);
    let (status, _) = send(&app, Method::PUT, &terminate, Some(&lease.landlord.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(house_status(&app, &lease.house_id).await, "available");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn back_to_back_cash_payments_get_distinct_references(pool: PgPool) {
    let app = app_with_pool(pool);
    let lease = lease(&app).await;

    let mut references = Vec::new();
    for _ in 0..3 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/payments",
            Some(&lease.tenant.token),
            Some(json!({
                "agreement_id": lease.agreement_id,
                "amount": 1000,
                "method": "Cash",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "cash payment: {}", body);
        assert_eq!(body["data"]["payment"]["status"], "completed");
        references.push(body["data"]["payment"]["reference_no"].as_str().unwrap().to_string());
    }

    references.sort();
    references.dedup();
    assert_eq!(references.len(), 3);
}
