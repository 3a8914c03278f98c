mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

async fn create_vendor(app: &TestApp, name: &str, medicines: &[&str]) -> i64 {
    let created = app
        .json(
            Method::POST,
            "/api/v1/vendors",
            Some(json!({
                "name": name,
                "contact": "orders@example.com",
                "address": "1 Supply Way",
                "medicines": medicines
            })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(created["data"]["message"], "Vendor created with medicines");
    created["data"]["vendor_id"].as_i64().expect("vendor id")
}

#[tokio::test]
async fn vendor_catalog_is_listed() {
    let app = TestApp::new().await;
    let vendor_id = create_vendor(&app, "Acme Pharma", &["Amoxicillin", "Ibuprofen"]).await;

    let vendors = app
        .json(Method::GET, "/api/v1/vendors", None, StatusCode::OK)
        .await;
    assert_eq!(vendors["data"][0]["id"].as_i64(), Some(vendor_id));
    assert_eq!(vendors["data"][0]["name"], "Acme Pharma");

    let catalog = app
        .json(
            Method::GET,
            &format!("/api/v1/vendors/{}/medicines", vendor_id),
            None,
            StatusCode::OK,
        )
        .await;
    let mut names: Vec<&str> = catalog["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["name"].as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Amoxicillin", "Ibuprofen"]);
}

#[tokio::test]
async fn vendor_without_catalog_is_accepted() {
    let app = TestApp::new().await;

    let created = app
        .json(
            Method::POST,
            "/api/v1/vendors",
            Some(json!({ "name": "Bare", "contact": "c", "address": "a" })),
            StatusCode::CREATED,
        )
        .await;
    let vendor_id = created["data"]["vendor_id"].as_i64().unwrap();

    let catalog = app
        .json(
            Method::GET,
            &format!("/api/v1/vendors/{}/medicines", vendor_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(catalog["data"], Value::Array(vec![]));
}

#[tokio::test]
async fn invalid_vendor_payloads_are_rejected() {
    let app = TestApp::new().await;

    for payload in [
        json!({ "name": "", "contact": "c", "address": "a" }),
        json!({ "name": "V", "contact": "c", "address": "a", "medicines": ["ok", "  "] }),
        json!({ "name": "V", "address": "a" }),
    ] {
        let response = app
            .request(Method::POST, "/api/v1/vendors", Some(payload.clone()))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload {} should be rejected",
            payload
        );
    }

    let vendors = app
        .json(Method::GET, "/api/v1/vendors", None, StatusCode::OK)
        .await;
    assert!(vendors["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_vendor_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/vendors/999/medicines", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(Method::DELETE, "/api/v1/vendors/999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_vendor_removes_its_catalog_and_orders() {
    let app = TestApp::new().await;
    let vendor_id = create_vendor(&app, "Acme Pharma", &["Amoxicillin"]).await;
    let other_id = create_vendor(&app, "Other Co", &["Zinc"]).await;

    let catalog = app
        .json(
            Method::GET,
            &format!("/api/v1/vendors/{}/medicines", vendor_id),
            None,
            StatusCode::OK,
        )
        .await;
    let medicine_id = catalog["data"][0]["id"].as_i64().unwrap();

    let order = app
        .json(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "vendor_id": vendor_id,
                "order_date": "2025-03-01T09:00:00Z",
                "medicines": [{ "medicine_id": medicine_id, "quantity": 5 }]
            })),
            StatusCode::CREATED,
        )
        .await;
    let order_id = order["data"]["id"].as_i64().unwrap();

    let deleted = app
        .json(
            Method::DELETE,
            &format!("/api/v1/vendors/{}", vendor_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(deleted["data"]["message"], "Vendor deleted successfully");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vendors/{}/medicines", vendor_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let vendors = app
        .json(Method::GET, "/api/v1/vendors", None, StatusCode::OK)
        .await;
    let remaining: Vec<i64> = vendors["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["id"].as_i64())
        .collect();
    assert_eq!(remaining, vec![other_id]);
}
