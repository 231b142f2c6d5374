use crate::schemas::{ApiResponse, ErrorResponse};
use crate::test_utils::{init_test_tracing, setup_test_app};
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};

async fn test_server() -> TestServer {
    let app = setup_test_app().await;
    TestServer::new(app).unwrap()
}

async fn create_fund(server: &TestServer, opening_balance: &str) -> i64 {
    let response = server
        .post("/api/v1/funds")
        .json(&json!({
            "name": "Tour fund",
            "currency_code": "EUR",
            "opening_balance": opening_balance,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data["id"].as_i64().unwrap()
}

async fn create_cost_type(server: &TestServer, name: &str) -> i64 {
    let response = server.post("/api/v1/cost-types").json(&json!({ "name": name })).await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data["id"].as_i64().unwrap()
}

async fn create_member(server: &TestServer, fund_id: i64, name: &str) -> i64 {
    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/members"))
        .json(&json!({ "name": name }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data["id"].as_i64().unwrap()
}

async fn create_income(server: &TestServer, fund_id: i64, amount: &str, date: &str, distributions: Value) -> Value {
    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/incomes"))
        .json(&json!({
            "amount": amount,
            "currency_code": "EUR",
            "received_date": date,
            "description": "Club gig",
            "distributions": distributions,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data
}

async fn create_cost(server: &TestServer, fund_id: i64, cost_type_id: i64, amount: &str, date: &str) -> Value {
    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/costs"))
        .json(&json!({
            "cost_type_id": cost_type_id,
            "cost_date": date,
            "amount": amount,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    body.data
}

async fn report(server: &TestServer, fund_id: i64) -> Value {
    let response = server.get(&format!("/api/v1/funds/{fund_id}/report")).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    body.data
}

#[tokio::test]
async fn test_health_check() {
    let server = test_server().await;

    let response = server.get("/health").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_fifo_scenario_and_cost_deletion() {
    let _guard = init_test_tracing();
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let cost_type_id = create_cost_type(&server, "Rehearsal room").await;

    create_income(
        &server,
        fund_id,
        "200.00",
        "2025-03-01",
        json!([{ "recipient_type": "mutual_fund", "recipient_id": null, "amount": "200.00", "note": null }]),
    )
    .await;
    let first = create_cost(&server, fund_id, cost_type_id, "80.00", "2025-03-02").await;
    let second = create_cost(&server, fund_id, cost_type_id, "150.00", "2025-03-03").await;
    assert_eq!(second["paid_amount"], "120.00");
    assert_eq!(second["is_paid"], false);

    let data = report(&server, fund_id).await;
    assert_eq!(data["from_cache"], true);
    assert_eq!(data["allocations"][0]["cost_id"], first["id"]);
    assert_eq!(data["allocations"][0]["paid_amount"], "80.00");
    assert_eq!(data["allocations"][0]["is_paid"], true);
    assert_eq!(data["allocations"][1]["paid_amount"], "120.00");
    assert_eq!(data["allocations"][1]["is_paid"], false);
    assert_eq!(data["stats"]["total_unpaid"], "30.00");
    assert_eq!(data["stats"]["balance"], "0.00");
    assert_eq!(data["stats"]["surplus"], "0.00");
    assert_eq!(data["stats"]["deficit"], "0.00");

    let response = server.delete(&format!("/api/v1/costs/{}", first["id"])).await;
    response.assert_status(StatusCode::OK);

    let data = report(&server, fund_id).await;
    assert_eq!(data["allocations"].as_array().unwrap().len(), 1);
    assert_eq!(data["allocations"][0]["paid_amount"], "150.00");
    assert_eq!(data["allocations"][0]["is_paid"], true);
    assert_eq!(data["stats"]["balance"], "50.00");
    assert_eq!(data["stats"]["surplus"], "50.00");
}

#[tokio::test]
async fn test_over_allocation_is_rejected_with_field() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let member_id = create_member(&server, fund_id, "Alice").await;
    let income = create_income(
        &server,
        fund_id,
        "100.00",
        "2025-03-01",
        json!([{ "recipient_type": "individual", "recipient_id": member_id, "amount": "100.00", "note": "Vocals" }]),
    )
    .await;

    let response = server
        .put(&format!("/api/v1/incomes/{}/distributions", income["id"]))
        .json(&json!({
            "distributions": [
                { "recipient_type": "individual", "recipient_id": member_id, "amount": "60.00", "note": null },
                { "recipient_type": "mutual_fund", "recipient_id": null, "amount": "40.01", "note": null },
            ]
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "OVER_ALLOCATION");
    assert_eq!(body.field.as_deref(), Some("distributions"));
    assert!(!body.success);

    let response = server.get(&format!("/api/v1/incomes/{}", income["id"])).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["distributions"].as_array().unwrap().len(), 1);
    assert_eq!(body.data["undistributed"], "0.00");
}

#[tokio::test]
async fn test_invalid_recipient_and_amount_report_field_paths() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;

    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/incomes"))
        .json(&json!({
            "amount": "50.00",
            "currency_code": "EUR",
            "received_date": "2025-03-01",
            "distributions": [
                { "recipient_type": "mutual_fund", "recipient_id": null, "amount": "10.00", "note": null },
                { "recipient_type": "individual", "recipient_id": null, "amount": "10.00", "note": null },
            ],
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_RECIPIENT");
    assert_eq!(body.field.as_deref(), Some("distributions[1].recipient_id"));

    let cost_type_id = create_cost_type(&server, "Fuel").await;
    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/costs"))
        .json(&json!({ "cost_type_id": cost_type_id, "cost_date": "2025-03-02", "amount": "10.005" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_AMOUNT");
    assert_eq!(body.field.as_deref(), Some("amount"));
}

#[tokio::test]
async fn test_income_currency_must_match_fund() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;

    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/incomes"))
        .json(&json!({ "amount": "10.00", "currency_code": "USD", "received_date": "2025-03-01" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.field.as_deref(), Some("currency_code"));
}

#[tokio::test]
async fn test_inactive_member_cannot_receive_new_distributions() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let member_id = create_member(&server, fund_id, "Bob").await;

    let response = server
        .put(&format!("/api/v1/members/{member_id}"))
        .json(&json!({ "is_active": false }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["is_active"], false);

    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/incomes"))
        .json(&json!({
            "amount": "10.00",
            "currency_code": "EUR",
            "received_date": "2025-03-01",
            "distributions": [{ "recipient_type": "individual", "recipient_id": member_id, "amount": "10.00", "note": null }],
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_RECIPIENT");
}

#[tokio::test]
async fn test_equal_split_assigns_remainder_to_fund() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    create_member(&server, fund_id, "Alice").await;
    create_member(&server, fund_id, "Bob").await;
    let income = create_income(&server, fund_id, "100.00", "2025-03-01", json!([])).await;
    assert_eq!(income["undistributed"], "100.00");

    let response = server
        .post(&format!("/api/v1/incomes/{}/distributions/equal-split", income["id"]))
        .json(&json!({ "include_fund": true }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    let lines = body.data["distributions"].as_array().unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["amount"], "33.33");
    assert_eq!(lines[1]["amount"], "33.33");
    assert_eq!(lines[2]["recipient_type"], "mutual_fund");
    assert_eq!(lines[2]["amount"], "33.34");
    assert_eq!(body.data["undistributed"], "0.00");
    assert_eq!(body.data["fund_stats"]["total_inflows"], "33.34");
}

#[tokio::test]
async fn test_forced_overrides() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "20.00").await;
    let cost_type_id = create_cost_type(&server, "Van rental").await;
    let forced = create_cost(&server, fund_id, cost_type_id, "50.00", "2025-03-01").await;
    let skipped = create_cost(&server, fund_id, cost_type_id, "10.00", "2025-03-02").await;

    let response = server
        .put(&format!("/api/v1/costs/{}", skipped["id"]))
        .json(&json!({ "manual_override": "forced_unpaid" }))
        .await;
    response.assert_status(StatusCode::OK);

    let response = server
        .put(&format!("/api/v1/costs/{}", forced["id"]))
        .json(&json!({ "manual_override": "forced_paid" }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["is_paid"], true);
    assert_eq!(body.data["paid_amount"], "50.00");

    let data = report(&server, fund_id).await;
    assert_eq!(data["allocations"][1]["manual_override"], "forced_unpaid");
    assert_eq!(data["allocations"][1]["paid_amount"], "0.00");
    assert_eq!(data["allocations"][1]["is_paid"], false);
    assert_eq!(data["stats"]["balance"], "-30.00");
    assert_eq!(data["stats"]["deficit"], "30.00");
    assert_eq!(data["stats"]["surplus"], "0.00");
}

#[tokio::test]
async fn test_opening_balance_edit_replays() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let cost_type_id = create_cost_type(&server, "Strings").await;
    let cost = create_cost(&server, fund_id, cost_type_id, "25.00", "2025-03-01").await;
    assert_eq!(cost["is_paid"], false);

    let response = server
        .put(&format!("/api/v1/funds/{fund_id}"))
        .json(&json!({ "opening_balance": "25.00" }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["stats"]["total_paid"], "25.00");

    let response = server.get(&format!("/api/v1/costs/{}", cost["id"])).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["is_paid"], true);
}

#[tokio::test]
async fn test_income_edit_and_delete() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let income = create_income(
        &server,
        fund_id,
        "80.00",
        "2025-03-01",
        json!([{ "recipient_type": "mutual_fund", "recipient_id": null, "amount": "80.00", "note": null }]),
    )
    .await;

    let response = server
        .put(&format!("/api/v1/incomes/{}", income["id"]))
        .json(&json!({ "amount": "70.00" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "OVER_ALLOCATION");

    let response = server.delete(&format!("/api/v1/incomes/{}", income["id"])).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["fund_stats"]["total_inflows"], "0.00");

    let response = server.get(&format!("/api/v1/incomes/{}", income["id"])).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verify_and_recompute() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "10.00").await;
    let cost_type_id = create_cost_type(&server, "Merch").await;
    create_cost(&server, fund_id, cost_type_id, "4.00", "2025-03-01").await;

    let response = server.get(&format!("/api/v1/funds/{fund_id}/verify")).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["consistent"], true);
    assert_eq!(body.data["drift"].as_array().unwrap().len(), 0);

    let response = server.post(&format!("/api/v1/funds/{fund_id}/recompute")).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["stats"]["balance"], "6.00");
    assert_eq!(body.data["allocations"][0]["is_paid"], true);
}

#[tokio::test]
async fn test_listings_and_pagination() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let cost_type_id = create_cost_type(&server, "Posters").await;
    for day in ["2025-03-03", "2025-03-01", "2025-03-02"] {
        create_cost(&server, fund_id, cost_type_id, "1.00", day).await;
    }

    let response = server.get(&format!("/api/v1/funds/{fund_id}/costs?page=1&limit=2")).await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 2);
    assert_eq!(body.data[0]["cost_date"], "2025-03-01");
    assert_eq!(body.data[1]["cost_date"], "2025-03-02");

    let response = server.get(&format!("/api/v1/funds/{fund_id}/costs?limit=0")).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/api/v1/cost-types").await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);

    let response = server.post("/api/v1/cost-types").json(&json!({ "name": "Posters" })).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let server = test_server().await;

    let response = server.get("/api/v1/funds/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "NOT_FOUND");

    let response = server.delete("/api/v1/costs/999").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/api/v1/funds/999/members")
        .json(&json!({ "name": "Nobody" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_currency_is_rejected() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/funds")
        .json(&json!({ "name": "Bad", "currency_code": "ZZZ" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_AMOUNT");
    assert_eq!(body.field.as_deref(), Some("currency_code"));
}

#[tokio::test]
async fn test_amounts_beyond_money_range_are_rejected() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let income = create_income(
        &server,
        fund_id,
        "100.00",
        "2025-03-01",
        json!([{ "recipient_type": "mutual_fund", "recipient_id": null, "amount": "100.00", "note": null }]),
    )
    .await;

    // Close to i64::MAX cents; must not wrap around into an accepted set
    let response = server
        .put(&format!("/api/v1/incomes/{}/distributions", income["id"]))
        .json(&json!({
            "distributions": [
                { "recipient_type": "mutual_fund", "recipient_id": null, "amount": "92233720368547758.06", "note": null },
                { "recipient_type": "mutual_fund", "recipient_id": null, "amount": "3.00", "note": null },
            ]
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_AMOUNT");
    assert_eq!(body.field.as_deref(), Some("distributions[0].amount"));

    // Within range on its own, but far more than the income
    let response = server
        .put(&format!("/api/v1/incomes/{}/distributions", income["id"]))
        .json(&json!({
            "distributions": [
                { "recipient_type": "mutual_fund", "recipient_id": null, "amount": "10000000000000.00", "note": null },
                { "recipient_type": "mutual_fund", "recipient_id": null, "amount": "3.00", "note": null },
            ]
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "OVER_ALLOCATION");

    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/incomes"))
        .json(&json!({
            "amount": "10000000000000.01",
            "currency_code": "EUR",
            "received_date": "2025-03-02",
            "distributions": [],
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_AMOUNT");
    assert_eq!(body.field.as_deref(), Some("amount"));

    let cost_type_id = create_cost_type(&server, "Tour bus").await;
    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/costs"))
        .json(&json!({ "cost_type_id": cost_type_id, "cost_date": "2025-03-03", "amount": "92233720368547758.07" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "INVALID_AMOUNT");

    let response = server
        .put(&format!("/api/v1/funds/{fund_id}"))
        .json(&json!({ "opening_balance": "-10000000000000.01" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.field.as_deref(), Some("opening_balance"));

    // The largest accepted amount still settles
    let cost = create_cost(&server, fund_id, cost_type_id, "10000000000000.00", "2025-03-04").await;
    assert_eq!(cost["paid_amount"], "100.00");
    assert_eq!(cost["is_paid"], false);

    let data = report(&server, fund_id).await;
    assert_eq!(data["stats"]["total_inflows"], "100.00");
    assert_eq!(data["stats"]["deficit"], "0.00");
    assert_eq!(data["stats"]["total_unpaid"], "9999999999900.00");
}

#[tokio::test]
async fn test_explicit_null_clears_notes_and_description() {
    let server = test_server().await;
    let fund_id = create_fund(&server, "0").await;
    let cost_type_id = create_cost_type(&server, "Merch").await;

    let response = server
        .post(&format!("/api/v1/funds/{fund_id}/costs"))
        .json(&json!({
            "cost_type_id": cost_type_id,
            "cost_date": "2025-03-01",
            "amount": "12.00",
            "notes": "T-shirts",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    let cost_id = body.data["id"].as_i64().unwrap();

    // Absent notes are left alone
    let response = server
        .put(&format!("/api/v1/costs/{cost_id}"))
        .json(&json!({ "amount": "15.00" }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["notes"], "T-shirts");
    assert_eq!(body.data["amount"], "15.00");

    let response = server
        .put(&format!("/api/v1/costs/{cost_id}"))
        .json(&json!({ "notes": null }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["notes"], Value::Null);
    assert_eq!(body.data["amount"], "15.00");

    let income = create_income(&server, fund_id, "40.00", "2025-03-02", json!([])).await;
    assert_eq!(income["description"], "Club gig");

    let response = server
        .put(&format!("/api/v1/incomes/{}", income["id"]))
        .json(&json!({ "received_date": "2025-03-03" }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["description"], "Club gig");

    let response = server
        .put(&format!("/api/v1/incomes/{}", income["id"]))
        .json(&json!({ "description": null }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["description"], Value::Null);
    assert_eq!(body.data["received_date"], "2025-03-03");
}
