//! Router-level tests over an in-memory database.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use stockroom_db::{Database, DbConfig};

use crate::{app, ApiConfig, AppState};

struct TestApp {
    router: Router,
    uploads_dir: PathBuf,
    _uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let uploads = TempDir::new().unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig {
            uploads_dir: uploads.path().to_path_buf(),
            ..ApiConfig::default()
        };

        TestApp {
            router: app(AppState::new(db, config)),
            uploads_dir: uploads.path().to_path_buf(),
            _uploads: uploads,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Registers the first (admin) user, creates a store and selects it.
    async fn admin_in_store(&self) -> (String, String) {
        let (status, _) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"name": "Owner", "email": "owner@shop.io", "password": "secret123"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = self.login("owner@shop.io", "secret123").await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = self
            .post("/api/stores", &token, json!({"name": "Main Street", "code": "main"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let store_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post("/api/auth/select-store", &token, json!({"storeId": store_id}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        (token, store_id)
    }

    /// Category with one subcategory holding one item; returns the item id.
    async fn stocked_item(&self, token: &str, sku: &str, stock: i64) -> String {
        let (status, body) = self
            .post("/api/categories", token, json!({"name": "Beverages"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let category_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                &format!("/api/categories/{}/subcategories", category_id),
                token,
                json!({"name": "Soft Drinks"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let sub_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                &format!("/api/categories/{}/subcategories/{}/items", category_id, sub_id),
                token,
                json!({
                    "name": "Cola 330ml",
                    "sku": sku,
                    "priceCents": 250,
                    "costCents": 120,
                    "stock": stock,
                    "minStock": 10
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_reports_serving() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_first_registration_is_admin_and_later_ones_need_admin() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"name": "Owner", "email": "owner@shop.io", "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "admin");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"name": "Other", "email": "other@shop.io", "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new().await;
    app.admin_in_store().await;

    let (status, body) = app.login("owner@shop.io", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_token_and_store_are_required() {
    let app = TestApp::new().await;
    let (status, _) = app.send(Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.admin_in_store().await;
    // Admins are never auto-assigned a store at login
    let (_, body) = app.login("owner@shop.io", "secret123").await;
    assert!(body["data"]["selectedStoreId"].is_null());
    let token = body["data"]["token"].as_str().unwrap();

    let (status, body) = app.get("/api/categories", token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No store selected");
}

#[tokio::test]
async fn test_category_tree_and_item_listing() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;
    let item_id = app.stocked_item(&token, "COLA-330", 4).await;

    let (status, _) = app
        .post("/api/categories", &token, json!({"name": "  beverages "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/categories?limit=5", &token).await;
    assert_eq!(status, StatusCode::OK);
    let category = &body["data"]["categories"][0];
    assert_eq!(category["slug"], "beverages");
    assert_eq!(category["subcategoryCount"], 1);
    assert_eq!(category["totalItemCount"], 1);
    assert_eq!(category["canDelete"], false);
    assert_eq!(body["data"]["pagination"]["itemsPerPage"], 5);

    let category_id = category["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/categories/{}", category_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/items?search=cola", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["id"], item_id.as_str());
    assert_eq!(body["data"]["items"][0]["stockStatus"], "low-stock");
    assert_eq!(body["data"]["items"][0]["subcategoryName"], "Soft Drinks");

    let (_, body) = app.get("/api/items/low-stock", &token).await;
    assert_eq!(body["data"]["pagination"]["totalItems"], 1);

    let (status, body) = app.get("/api/items/sku/COLA-330", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["storeName"], "Main Street");

    let (status, _) = app.get("/api/items/missing", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purchase_order_receipt_moves_stock() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;
    let item_id = app.stocked_item(&token, "COLA-330", 5).await;

    let (status, body) = app
        .post("/api/suppliers", &token, json!({"name": "Fizz Wholesale"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let supplier_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/purchase-orders",
            &token,
            json!({
                "supplierId": supplier_id,
                "items": [{"name": "Cola 330ml", "sku": "COLA-330", "quantity": 10, "costPriceCents": 80}],
                "taxCents": 50
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["supplierName"], "Fizz Wholesale");
    let po_body = body;

    let (status, body) = app
        .post(
            "/api/purchase-orders",
            &token,
            json!({
                "supplierId": supplier_id,
                "items": [{"name": "Cola 330ml", "sku": "COLA-330", "quantity": 2, "costPriceCents": i64::MAX / 2 + 1}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "items.costPrice");

    let body = po_body;
    assert_eq!(body["data"]["totalCents"], 850);
    let po_id = body["data"]["id"].as_str().unwrap().to_string();
    let po_number = body["data"]["poNumber"].as_str().unwrap().to_string();

    let receive = format!("/api/purchase-orders/{}/receive", po_id);
    let (status, body) = app
        .post(&receive, &token, json!({"items": [{"sku": "COLA-330", "receivedQuantity": 4}]}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["purchaseOrder"]["status"], "partially_received");
    assert_eq!(body["data"]["updatedItems"][0]["newStock"], 9);

    let (_, body) = app
        .post(&receive, &token, json!({"items": [{"sku": "COLA-330", "receivedQuantity": 6}]}))
        .await;
    assert_eq!(body["data"]["purchaseOrder"]["status"], "completed");
    assert_eq!(
        body["data"]["updatedItems"][0]["batchNumber"],
        format!("{}-1-2", po_number)
    );

    let (_, body) = app.get(&format!("/api/items/{}", item_id), &token).await;
    assert_eq!(body["data"]["stock"], 15);
    assert_eq!(body["data"]["costCents"], 80);

    let (status, _) = app
        .post(&receive, &token, json!({"items": [{"sku": "COLA-330", "receivedQuantity": 1}]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_credit_bill_opens_customer_credit() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;
    let item_id = app.stocked_item(&token, "COLA-330", 10).await;

    let (status, body) = app
        .post(
            "/api/bills",
            &token,
            json!({
                "customerName": "Ayesha",
                "paymentMethod": "credit",
                "items": [{"name": "Cola 330ml", "sku": "COLA-330", "quantity": 2, "unitPriceCents": 250}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bill"]["totalCents"], 500);
    let credit = &body["data"]["customerCredit"];
    assert_eq!(credit["originalAmountCents"], 500);
    assert_eq!(credit["status"], "pending");
    let credit_id = credit["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&format!("/api/items/{}", item_id), &token).await;
    assert_eq!(body["data"]["stock"], 8);

    let payments = format!("/api/customer-credits/{}/payments", credit_id);
    let (status, body) = app.post(&payments, &token, json!({"amountCents": 200})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balanceAmountCents"], 300);
    assert_eq!(body["data"]["status"], "partially_paid");

    let (status, _) = app.post(&payments, &token, json!({"amountCents": 1000})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post(&payments, &token, json!({"amountCents": i64::MAX})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("exceeds remaining balance"));

    let (_, body) = app.get("/api/customer-credits/totals", &token).await;
    assert_eq!(body["data"]["balanceAmountCents"], 300);
}

#[tokio::test]
async fn test_bill_with_insufficient_stock_is_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;
    let item_id = app.stocked_item(&token, "COLA-330", 1).await;

    let (status, _) = app
        .post(
            "/api/bills",
            &token,
            json!({"items": [{"name": "Cola 330ml", "sku": "COLA-330", "quantity": 3, "unitPriceCents": 250}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/items/{}", item_id), &token).await;
    assert_eq!(body["data"]["stock"], 1);
    let (_, body) = app.get("/api/bills", &token).await;
    assert_eq!(body["data"]["pagination"]["totalItems"], 0);
}

#[tokio::test]
async fn test_cashier_reads_but_cannot_edit_catalog() {
    let app = TestApp::new().await;
    let (token, store_id) = app.admin_in_store().await;

    let (status, _) = app
        .post(
            "/api/users",
            &token,
            json!({
                "name": "Till One",
                "email": "till@shop.io",
                "password": "secret123",
                "role": "cashier",
                "stores": [store_id]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Single membership is selected at login
    let (_, body) = app.login("till@shop.io", "secret123").await;
    assert_eq!(body["data"]["selectedStoreId"], store_id.as_str());
    let cashier = body["data"]["token"].as_str().unwrap();

    let (status, _) = app.get("/api/categories", cashier).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/categories", cashier, json!({"name": "Snacks"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/users", cashier).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_item_update_stores_inline_images() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;
    let item_id = app.stocked_item(&token, "COLA-330", 10).await;

    let (status, body) = app
        .put(
            &format!("/api/items/{}", item_id),
            &token,
            json!({
                "priceCents": 275,
                "images": [{"url": "data:image/png;base64,iVBORw0KGgo=", "isPrimary": true}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["priceCents"], 275);

    let url = body["data"]["images"][0]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    let filename = url.trim_start_matches("/uploads/");
    assert!(app.uploads_dir.join(filename).exists());

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn test_rejected_item_writes_leave_no_uploads() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;
    let item_id = app.stocked_item(&token, "COLA-330", 10).await;
    let image = json!([{"url": "data:image/png;base64,iVBORw0KGgo=", "isPrimary": true}]);

    let (_, body) = app.get(&format!("/api/items/{}", item_id), &token).await;
    let category_id = body["data"]["categoryId"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            &format!("/api/categories/{}/items", category_id),
            &token,
            json!({"name": "Cola Copy", "sku": "cola-330", "priceCents": 250, "images": image}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put("/api/items/no-such-item", &token, json!({"images": image}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .put(
            &format!("/api/items/{}", item_id),
            &token,
            json!({"priceCents": -1, "images": image}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(std::fs::read_dir(&app.uploads_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_uploads_reject_traversal() {
    let app = TestApp::new().await;
    let (status, _) = app.send(Method::GET, "/uploads/a..b", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::GET, "/uploads/missing.png", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_catalogue() {
    let app = TestApp::new().await;
    let (token, _) = app.admin_in_store().await;

    let (status, body) = app.get("/api/roles", &token).await;
    assert_eq!(status, StatusCode::OK);
    let roles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["admin", "manager", "employee", "cashier"]);
}
