mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{amount_of, id_of, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use shop_accounting_service::models::NewAccountEntry;

struct QuarterlyShop {
    app: TestApp,
    token: String,
    shop_id: i64,
    sales_id: i64,
    rent_id: i64,
}

async fn quarterly_shop() -> QuarterlyShop {
    let app = TestApp::spawn();
    let token = app.authenticated("owner").await;
    let shop_id = id_of(&app.create_shop(&token, "Umeda", "QUARTERLY").await);
    let sales_id = id_of(
        &app.create_title(&token, shop_id, "REVENUE", "SALES", "売上", 1)
            .await,
    );
    let rent_id = id_of(
        &app.create_title(
            &token,
            shop_id,
            "EXPENSE",
            "SELLING_GENERAL_ADMINISTRATIVE_EXPENSE",
            "家賃",
            1,
        )
        .await,
    );

    QuarterlyShop {
        app,
        token,
        shop_id,
        sales_id,
        rent_id,
    }
}

impl QuarterlyShop {
    fn uri(&self) -> String {
        format!("/shop/{}/account_entry", self.shop_id)
    }

    async fn matrix(&self, year: i32) -> Value {
        let response = self
            .app
            .get(&format!("{}?year={}", self.uri(), year), &self.token)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body
    }

    async fn replace(&self, body: Value) -> common::TestResponse {
        self.app.put(&self.uri(), &self.token, body).await
    }
}

fn set_amount(matrix: &mut Value, collection: &str, row: usize, col: usize, amount: &str) {
    matrix[collection][row][col]["amount"] = json!(amount);
}

fn submission(matrix: &Value, year: i32) -> Value {
    json!({
        "year": year,
        "revenues": matrix["revenues"],
        "expenses": matrix["expenses"],
    })
}

#[tokio::test]
async fn empty_quarterly_matrix_has_placeholder_cells() {
    let shop = quarterly_shop().await;

    let matrix = shop.matrix(2024).await;

    assert_eq!(
        matrix["headers"],
        json!(["2024年3月", "2024年6月", "2024年9月", "2024年12月"])
    );
    let row = matrix["revenues"][0].as_array().unwrap();
    let months: Vec<i64> = row.iter().map(|c| c["month"].as_i64().unwrap()).collect();
    assert_eq!(months, vec![3, 6, 9, 12]);
    for cell in row {
        assert!(cell["id"].is_null());
        assert!(cell["amount"].is_null());
        assert_eq!(cell["shop_account_title_id"], shop.sales_id);
        assert_eq!(cell["year"], 2024);
    }
    assert!(matrix.get("anomalies").is_none());
}

#[tokio::test]
async fn submitted_amount_is_read_back() {
    let shop = quarterly_shop().await;
    let mut matrix = shop.matrix(2024).await;
    set_amount(&mut matrix, "revenues", 0, 1, "1000.00");

    let response = shop.replace(submission(&matrix, 2024)).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let june = &response.body["revenues"][0][1];
    assert_eq!(june["month"], 6);
    assert_eq!(amount_of(june), Some(dec!(1000.00)));
    assert!(june["id"].as_i64().is_some());

    let reread = shop.matrix(2024).await;
    assert_eq!(amount_of(&reread["revenues"][0][1]), Some(dec!(1000.00)));
    assert_eq!(amount_of(&reread["revenues"][0][0]), None);
    assert_eq!(amount_of(&reread["expenses"][0][1]), None);
}

#[tokio::test]
async fn resubmitting_the_same_matrix_is_stable() {
    let shop = quarterly_shop().await;
    let mut matrix = shop.matrix(2024).await;
    set_amount(&mut matrix, "revenues", 0, 0, "10.00");
    set_amount(&mut matrix, "expenses", 0, 3, "4.50");

    let first = shop.replace(submission(&matrix, 2024)).await.body;
    let second = shop.replace(submission(&first, 2024)).await.body;

    for (collection, col) in [("revenues", 0), ("expenses", 3)] {
        assert_eq!(
            amount_of(&first[collection][0][col]),
            amount_of(&second[collection][0][col])
        );
    }
    assert_eq!(amount_of(&second["expenses"][0][3]), Some(dec!(4.50)));
}

#[tokio::test]
async fn omitted_cells_are_cleared() {
    let shop = quarterly_shop().await;
    let mut matrix = shop.matrix(2024).await;
    set_amount(&mut matrix, "revenues", 0, 0, "10.00");
    shop.replace(submission(&matrix, 2024)).await;

    let response = shop
        .replace(json!({ "year": 2024, "revenues": [], "expenses": [] }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(amount_of(&response.body["revenues"][0][0]), None);
}

#[tokio::test]
async fn other_years_are_untouched() {
    let shop = quarterly_shop().await;
    let mut last_year = shop.matrix(2023).await;
    set_amount(&mut last_year, "revenues", 0, 3, "99.00");
    shop.replace(submission(&last_year, 2023)).await;

    shop.replace(json!({ "year": 2024, "revenues": [], "expenses": [] }))
        .await;

    let reread = shop.matrix(2023).await;
    assert_eq!(amount_of(&reread["revenues"][0][3]), Some(dec!(99.00)));
}

#[tokio::test]
async fn invalid_submission_leaves_data_intact() {
    let shop = quarterly_shop().await;
    let mut matrix = shop.matrix(2024).await;
    set_amount(&mut matrix, "revenues", 0, 1, "1000.00");
    shop.replace(submission(&matrix, 2024)).await;

    let response = shop
        .replace(json!({
            "year": 2024,
            "revenues": [[{
                "shop_account_title_id": shop.sales_id,
                "year": 2024,
                "month": 4,
                "amount": "5.00"
            }]],
            "expenses": []
        }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let reread = shop.matrix(2024).await;
    assert_eq!(amount_of(&reread["revenues"][0][1]), Some(dec!(1000.00)));
}

#[tokio::test]
async fn title_in_wrong_collection_is_rejected() {
    let shop = quarterly_shop().await;

    let response = shop
        .replace(json!({
            "year": 2024,
            "revenues": [[{
                "shop_account_title_id": shop.rent_id,
                "year": 2024,
                "month": 3,
                "amount": "5.00"
            }]]
        }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let shop = quarterly_shop().await;

    let response = shop.replace(json!({ "revenues": "nope" })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn year_out_of_range_is_bad_request() {
    let shop = quarterly_shop().await;

    let response = shop
        .app
        .get(&format!("{}?year=99999", shop.uri()), &shop.token)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_year_is_json_bad_request() {
    let shop = quarterly_shop().await;

    let response = shop
        .app
        .get(&format!("{}?year=abc", shop.uri()), &shop.token)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string(), "{}", response.body);
}

#[tokio::test]
async fn year_defaults_to_current_year() {
    let shop = quarterly_shop().await;

    let response = shop.app.get(&shop.uri(), &shop.token).await;

    assert_eq!(response.status, StatusCode::OK);
    let year = Utc::now().year();
    assert_eq!(response.body["headers"][0], format!("{}年3月", year));
}

#[tokio::test]
async fn shop_without_titles_is_not_found() {
    let app = TestApp::spawn();
    let token = app.authenticated("owner").await;
    let shop_id = id_of(&app.create_shop(&token, "Empty", "MONTHLY").await);

    let response = app
        .get(&format!("/shop/{}/account_entry?year=2024", shop_id), &token)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_shop_is_not_found() {
    let app = TestApp::spawn();
    let token = app.authenticated("owner").await;

    let get = app.get("/shop/77/account_entry?year=2024", &token).await;
    let put = app
        .put("/shop/77/account_entry", &token, json!({ "year": 2024 }))
        .await;

    assert_eq!(get.status, StatusCode::NOT_FOUND);
    assert_eq!(put.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn off_cadence_entries_are_reported_not_merged() {
    let shop = quarterly_shop().await;
    let stray = shop
        .app
        .store
        .seed_entry(NewAccountEntry {
            shop_id: shop.shop_id,
            shop_account_title_id: shop.sales_id,
            year: 2024,
            month: 4,
            amount: dec!(12.00),
        })
        .await;

    let matrix = shop.matrix(2024).await;

    let anomalies = matrix["anomalies"].as_array().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0]["entry_id"], stray.id);
    assert_eq!(anomalies[0]["reason"], "month_outside_cadence");
    for cell in matrix["revenues"][0].as_array().unwrap() {
        assert!(cell["amount"].is_null());
    }
}

#[tokio::test]
async fn cadence_change_reshapes_matrix() {
    let shop = quarterly_shop().await;
    let mut matrix = shop.matrix(2024).await;
    set_amount(&mut matrix, "revenues", 0, 0, "250.00");
    set_amount(&mut matrix, "revenues", 0, 1, "1000.00");
    shop.replace(submission(&matrix, 2024)).await;

    shop.app
        .put(
            &format!("/shops/{}", shop.shop_id),
            &shop.token,
            json!({ "period_type": "YEARLY" }),
        )
        .await;

    let yearly = shop.matrix(2024).await;
    assert_eq!(yearly["headers"], json!(["2024年3月"]));
    assert_eq!(amount_of(&yearly["revenues"][0][0]), Some(dec!(250.00)));
    assert_eq!(yearly["anomalies"].as_array().unwrap().len(), 1);
}
