// Integration tests for Partner Map

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use partner_map::core::{
    DistanceUnit, GraphOptions, IpLocator, Geocoder, LocationResolver, MapBuilder, ProviderError,
    RawCoordinates, RegionPolicy, SessionContext,
};
use partner_map::models::{DirectorySnapshot, LocationTier, Partner, ReferencePoint};
use partner_map::routes::{self, map::AppState};
use partner_map::services::{SessionStore, StaticDirectory};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const MILES_PER_DEGREE_LAT: f64 = 3958.8 * std::f64::consts::PI / 180.0;

const DIRECTORY: &str = r##"
[[partners]]
id = "near"
name = "Near Partner"
latitude = 39.80
longitude = -84.1916

[[partners]]
id = "mid"
name = "Mid Partner"
latitude = 39.85
longitude = -84.1916

[[partners]]
id = "far"
name = "Far Partner"
latitude = 40.50
longitude = -84.1916

[[partners]]
id = "broken"
name = "Broken Coordinates"
latitude = 123.0
longitude = -84.1916

[[collaborations]]
id = "c1"
name = "Everyone"
status = "active"
color = "#aa0000"

[[collaborations]]
id = "c2"
name = "Old Pair"
status = "ended"

[[memberships]]
collaborationId = "c1"
partnerId = "near"

[[memberships]]
collaborationId = "c1"
partnerId = "mid"

[[memberships]]
collaborationId = "c1"
partnerId = "far"

[[memberships]]
collaborationId = "c1"
partnerId = "broken"

[[memberships]]
collaborationId = "c2"
partnerId = "near"

[[memberships]]
collaborationId = "c2"
partnerId = "mid"
"##;

struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<RawCoordinates>, ProviderError> {
        if query.starts_with("Courthouse Square") {
            Ok(vec![RawCoordinates::from_numbers(39.7589, -84.1916)])
        } else {
            Ok(vec![])
        }
    }
}

struct FixedIp;

#[async_trait]
impl IpLocator for FixedIp {
    async fn locate(&self) -> Result<RawCoordinates, ProviderError> {
        Ok(RawCoordinates::from_numbers(39.7589, -84.1916))
    }
}

fn app_state() -> AppState {
    let resolver = LocationResolver::new(
        Arc::new(FixedGeocoder),
        Arc::new(FixedIp),
        RegionPolicy::default(),
        ", Ohio, USA",
    );

    AppState {
        directory: Arc::new(StaticDirectory::from_toml_str(DIRECTORY).unwrap()),
        resolver,
        sessions: SessionStore::new(100, Duration::from_secs(60)),
        map_builder: MapBuilder::new(GraphOptions::default()),
        default_radius: Some(10.0),
        default_unit: DistanceUnit::Miles,
    }
}

fn partner_ids(map: &Value) -> Vec<String> {
    map["partners"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["partner"]["id"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn test_end_to_end_reference_and_radius() {
    let reference = ReferencePoint {
        point: partner_map::GeoPoint::new(39.7589, -84.1916).unwrap(),
        tier: LocationTier::Device,
        far_from_region: false,
    };
    let at = |id: &str, miles: f64| Partner {
        id: id.to_string(),
        name: id.to_string(),
        latitude: 39.7589 + miles / MILES_PER_DEGREE_LAT,
        longitude: -84.1916,
        is_visible: true,
        collaboration_status: None,
        website: None,
    };
    let directory = DirectorySnapshot {
        partners: vec![at("twelve", 12.0), at("three", 3.0)],
        ..DirectorySnapshot::default()
    };
    let mut context = SessionContext::new(Some(10.0), DistanceUnit::Miles);
    context.reference = Some(reference);

    let snapshot = MapBuilder::default().build(&directory, &context);

    assert_eq!(snapshot.partners.len(), 1);
    assert_eq!(snapshot.partners[0].partner.id, "three");
    let distance = snapshot.partners[0].distance.unwrap();
    assert!((distance - 3.0).abs() < 1e-6, "got {}", distance);
}

#[actix_web::test]
async fn test_session_flow() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(routes::configure_routes),
    )
    .await;

    // Open a session: no reference point, every valid partner, edges among them
    let req = test::TestRequest::post().uri("/api/v1/sessions").set_json(json!({})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    assert_eq!(partner_ids(&body["map"]), vec!["near", "mid", "far"]);
    assert_eq!(body["map"]["edges"].as_array().unwrap().len(), 4);

    // Locate by address: radius 10mi keeps near and mid only
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{}/location/address", session_id))
        .set_json(json!({ "query": "Courthouse Square" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["applied"], true);
    assert_eq!(body["reference"]["tier"], "address-geocode");
    assert_eq!(partner_ids(&body["map"]), vec!["near", "mid"]);
    let edge_ids: Vec<_> = body["map"]["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(edge_ids, vec!["c1:mid:near", "c2:mid:near"]);

    // Active collaborations only
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/sessions/{}/filter", session_id))
        .set_json(json!({ "mode": "active" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["edges"].as_array().unwrap().len(), 1);
    assert_eq!(body["edges"][0]["color"], "#aa0000");

    // Shrink the radius
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/sessions/{}/radius", session_id))
        .set_json(json!({ "radius": 3.5 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(partner_ids(&body), vec!["near"]);
    assert!(body["edges"].as_array().unwrap().is_empty());

    // Clear the reference point
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/sessions/{}/location", session_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["reference"].is_null());
    assert_eq!(partner_ids(&body), vec!["near", "mid", "far"]);
}

#[actix_web::test]
async fn test_address_not_found() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/v1/sessions").set_json(json!({})).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{}/location/address", session_id))
        .set_json(json!({ "query": "Atlantis" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");
}

#[actix_web::test]
async fn test_ip_fallback_requires_device_failure_and_confirmation() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/v1/sessions").set_json(json!({})).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    let ip_uri = format!("/api/v1/sessions/{}/location/ip", session_id);

    // Never automatic: refused before any device failure
    let req = test::TestRequest::post().uri(&ip_uri).set_json(json!({ "confirm": true })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Device permission denied offers the fallback
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{}/location/device", session_id))
        .set_json(json!({ "errorCode": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "permission_denied");
    assert_eq!(body["ipFallbackOffered"], true);

    // Still needs explicit confirmation
    let req = test::TestRequest::post().uri(&ip_uri).set_json(json!({ "confirm": false })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post().uri(&ip_uri).set_json(json!({ "confirm": true })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reference"]["tier"], "ip-approximate");

    // The offer is consumed
    let req = test::TestRequest::post().uri(&ip_uri).set_json(json!({ "confirm": true })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_device_position_is_normalized() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/v1/sessions").set_json(json!({})).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{}/location/device", session_id))
        .set_json(json!({ "latitude": 39.7589, "longitude": 84.1916 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["reference"]["tier"], "device");
    assert_eq!(body["reference"]["point"]["longitude"], -84.1916);
}

#[actix_web::test]
async fn test_normalize_endpoint() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/coordinates/normalize")
        .set_json(json!({ "latitude": "-84.2", "longitude": "40.0" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["point"]["latitude"], 40.0);
    assert_eq!(body["point"]["longitude"], -84.2);
    assert_eq!(body["farFromRegion"], false);

    let req = test::TestRequest::post()
        .uri("/api/v1/coordinates/normalize")
        .set_json(json!({ "latitude": "91.0", "longitude": "0.0" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "out_of_range");
}

#[actix_web::test]
async fn test_unknown_session() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state()))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/sessions/{}/map", uuid::Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
