use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_api::app::{build_app, services::AppServices};
use stockroom_api::config::Config;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = build_app(Arc::new(AppServices::in_memory()), &Config::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn json_body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, code: &str, name: &str) -> String {
    let res = client
        .post(srv.api("/product"))
        .json(&json!({ "code": code, "name": name, "price": 2.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    json_body(res).await["_id"].as_str().unwrap().to_string()
}

async fn create_stock(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client.post(srv.api("/stock")).json(&body).send().await.unwrap();
    let status = res.status();
    let body = json_body(res).await;
    assert_eq!(status, StatusCode::CREATED, "create stock failed: {body}");
    body
}

async fn adjust(client: &reqwest::Client, srv: &TestServer, body: Value) -> reqwest::Response {
    client.post(srv.api("/stock/adjust")).json(&body).send().await.unwrap()
}

fn customer(member_number: i64) -> Value {
    json!({
        "name": "Somchai",
        "dateOfBirth": "1990-06-01",
        "memberNumber": member_number,
        "interests": "hiking"
    })
}

#[tokio::test]
async fn health_is_served_outside_the_prefix() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn customer_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.api("/customer")).json(&customer(7)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = json_body(res).await;
    let id = created["_id"].as_str().unwrap().to_string();
    assert_eq!(created["memberNumber"], 7);
    assert_eq!(created["__v"], 1);
    assert!(created["createdAt"].is_string());

    let res = client
        .put(srv.api(&format!("/customer/{id}")))
        .json(&json!({ "interests": "cycling" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = json_body(res).await;
    assert_eq!(updated["interests"], "cycling");
    assert_eq!(updated["name"], "Somchai");

    let res = client.get(srv.api(&format!("/customer/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["interests"], "cycling");

    let res = client.delete(srv.api(&format!("/customer/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["message"], "Customer deleted successfully");

    let res = client.get(srv.api(&format!("/customer/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_validation_and_duplicate_member_number() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.api("/customer"))
        .json(&json!({ "name": "No Details" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "validation_error");

    let res = client.post(srv.api("/customer")).json(&customer(42)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client.post(srv.api("/customer")).json(&customer(42)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["message"], "memberNumber already exists");

    let res = client
        .post(srv.api("/customer"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_are_listed_by_member_number() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for n in [300, 100, 200] {
        let res = client.post(srv.api("/customer")).json(&customer(n)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client.get(srv.api("/customer")).send().await.unwrap();
    let listed = json_body(res).await;
    let numbers: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["memberNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![100, 200, 300]);
}

#[tokio::test]
async fn customer_alternate_forms_carry_id_in_body() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.api("/customer")).json(&customer(9)).send().await.unwrap();
    let id = json_body(res).await["_id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.api("/customer"))
        .json(&json!({ "name": "Missing Id" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.api("/customer"))
        .json(&json!({ "_id": id, "name": "Renamed", "dateOfBirth": "1990-06-01T00:00:00.000Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["name"], "Renamed");

    let res = client
        .delete(srv.api("/customer"))
        .json(&json!({ "_id": id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(srv.api("/customer"))
        .json(&json!({ "_id": id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_revision_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.api("/customer")).json(&customer(11)).send().await.unwrap();
    let id = json_body(res).await["_id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.api(&format!("/customer/{id}")))
        .json(&json!({ "interests": "chess", "__v": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.api(&format!("/customer/{id}")))
        .json(&json!({ "interests": "go", "__v": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(res).await["error"], "stale_revision");
}

#[tokio::test]
async fn stock_create_join_and_duplicate() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let product = create_product(&client, &srv, "P-1", "Oat Milk").await;

    let stock = create_stock(&client, &srv, json!({ "product": product, "quantity": 3, "minQuantity": 5 })).await;
    assert_eq!(stock["product"]["name"], "Oat Milk");
    assert_eq!(stock["status"], "low-stock");
    assert_eq!(stock["maxQuantity"], 100);
    assert_eq!(stock["location"], "Main Warehouse");

    let res = client
        .post(srv.api("/stock"))
        .json(&json!({ "product": product }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["message"], "stock already exists for this product");

    let res = client
        .post(srv.api("/stock"))
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stock_adjustments() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let product = create_product(&client, &srv, "P-1", "Oat Milk").await;
    let stock = create_stock(&client, &srv, json!({ "product": product, "quantity": 10 })).await;
    let id = stock["_id"].as_str().unwrap().to_string();

    let res = adjust(
        &client,
        &srv,
        json!({ "stockId": id, "adjustment": 5, "type": "add", "reason": "delivery" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let adjusted = json_body(res).await;
    assert_eq!(adjusted["quantity"], 15);
    assert_eq!(adjusted["status"], "in-stock");
    assert!(adjusted["notes"].as_str().unwrap().ends_with(": delivery"));
    assert_eq!(adjusted["product"]["code"], "P-1");

    let res = adjust(&client, &srv, json!({ "stockId": id, "adjustment": 20, "type": "subtract" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.api(&format!("/stock/{id}"))).send().await.unwrap();
    assert_eq!(json_body(res).await["quantity"], 15);

    let res = adjust(&client, &srv, json!({ "stockId": id, "adjustment": 0, "type": "set" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["status"], "out-of-stock");

    let res = adjust(&client, &srv, json!({ "stockId": id, "adjustment": 1, "type": "double" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = adjust(&client, &srv, json!({ "stockId": id, "type": "add" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = adjust(
        &client,
        &srv,
        json!({ "stockId": "0191d2a4-0000-7000-8000-000000000000", "adjustment": 1, "type": "add" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stock_status_override() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let product = create_product(&client, &srv, "P-1", "Oat Milk").await;
    let stock = create_stock(&client, &srv, json!({ "product": product, "quantity": 10 })).await;
    let id = stock["_id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.api(&format!("/stock/{id}")))
        .json(&json!({ "status": "low-stock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.api(&format!("/stock/{id}")))
        .json(&json!({ "status": "discontinued" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["status"], "discontinued");

    let res = adjust(&client, &srv, json!({ "stockId": id, "adjustment": 1, "type": "add" })).await;
    assert_eq!(json_body(res).await["status"], "discontinued");

    let res = client
        .put(srv.api("/stock"))
        .json(&json!({ "_id": id, "status": "in-stock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cleared = json_body(res).await;
    assert_eq!(cleared["status"], "in-stock");
    assert_eq!(cleared["statusMode"], "derived");
}

#[tokio::test]
async fn stock_list_filters_and_pages() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for n in 0..12 {
        let product = create_product(&client, &srv, &format!("M-{n:02}"), &format!("Oat Milk {n}")).await;
        create_stock(&client, &srv, json!({ "product": product, "quantity": 50 })).await;
    }
    let tea = create_product(&client, &srv, "T-01", "Green Tea").await;
    create_stock(&client, &srv, json!({ "product": tea })).await;

    // Without pno every record comes back, most recently updated first.
    let res = client.get(srv.api("/stock")).send().await.unwrap();
    let all = json_body(res).await;
    assert_eq!(all.as_array().unwrap().len(), 13);
    assert_eq!(all[0]["product"]["name"], "Green Tea");

    let res = client.get(srv.api("/stock?pno=1")).send().await.unwrap();
    let first = json_body(res).await;
    assert_eq!(first.as_array().unwrap().len(), 10);
    assert_eq!(first[0]["product"]["name"], "Green Tea");

    let res = client.get(srv.api("/stock?pno=2")).send().await.unwrap();
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 3);

    let res = client.get(srv.api("/stock?s=MILK")).send().await.unwrap();
    let milk = json_body(res).await;
    assert_eq!(milk.as_array().unwrap().len(), 12);
    assert!(milk.as_array().unwrap().iter().all(|s| s["product"]["name"].as_str().unwrap().contains("Milk")));

    let res = client.get(srv.api("/stock?status=out-of-stock")).send().await.unwrap();
    let out = json_body(res).await;
    assert_eq!(out.as_array().unwrap().len(), 1);
    assert_eq!(out[0]["product"]["code"], "T-01");

    let res = client.get(srv.api("/stock?pno=0")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stock_delete_and_missing_records() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let product = create_product(&client, &srv, "P-1", "Oat Milk").await;
    let stock = create_stock(&client, &srv, json!({ "product": product })).await;
    let id = stock["_id"].as_str().unwrap().to_string();

    let res = client.delete(srv.api(&format!("/stock/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["message"], "Stock deleted successfully");

    for path in [format!("/stock/{id}"), "/stock/not-an-id".to_string()] {
        let res = client.get(srv.api(&path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["error"], "not_found");
    }
}

#[tokio::test]
async fn catalog_referential_guards() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.api("/category"))
        .json(&json!({ "name": "Dairy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let category = json_body(res).await["_id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.api("/category"))
        .json(&json!({ "name": "dairy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.api("/product"))
        .json(&json!({ "code": "P-1", "name": "Oat Milk", "category": category }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let product = json_body(res).await;
    assert_eq!(product["category"]["name"], "Dairy");
    let product_id = product["_id"].as_str().unwrap().to_string();

    let stock = create_stock(&client, &srv, json!({ "product": product_id })).await;

    let res = client.delete(srv.api(&format!("/category/{category}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = client.delete(srv.api(&format!("/product/{product_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let stock_id = stock["_id"].as_str().unwrap();
    client.delete(srv.api(&format!("/stock/{stock_id}"))).send().await.unwrap();
    let res = client.delete(srv.api(&format!("/product/{product_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client.delete(srv.api(&format!("/category/{category}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_form_fields_are_lenient() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.api("/category"))
        .json(&json!({ "name": "Tea" }))
        .send()
        .await
        .unwrap();
    let category = json_body(res).await["_id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.api("/product"))
        .json(&json!({ "code": "T-1", "name": "Green Tea", "price": "9.99", "category": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let product = json_body(res).await;
    assert_eq!(product["price"], 9.99);
    assert!(product["category"].is_null());
    let id = product["_id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.api(&format!("/product/{id}")))
        .json(&json!({ "category": category, "price": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let product = json_body(res).await;
    assert_eq!(product["category"]["name"], "Tea");
    assert_eq!(product["price"], 9.99);

    let res = client
        .put(srv.api(&format!("/product/{id}")))
        .json(&json!({ "category": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(json_body(res).await["category"].is_null());

    let res = client
        .post(srv.api("/product"))
        .json(&json!({ "code": "T-2", "name": "Black Tea", "price": "cheap" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn versioned_prefix_serves_the_same_api() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/customer", srv.base_url))
        .json(&customer(5))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client.get(srv.api("/customer")).send().await.unwrap();
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);
}
