mod helpers;

use axum::http::StatusCode;
use base64::Engine;
use serde_json::json;
use tnse_core::Invoice;

use helpers::{ACCOUNT, ENTRY_ID, app};

#[tokio::test]
async fn accounts_returns_snapshot() {
    let app = app(true).await;

    let response = app.client.get(&format!("/entries/{}/accounts", ENTRY_ID)).await;

    response.assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(body["entry_id"], ENTRY_ID);
    assert_eq!(body["state"], "ready");
    assert_eq!(body["last_update_success"], true);
    assert_eq!(body["accounts"][0]["number"], ACCOUNT);
}

#[tokio::test]
async fn accounts_before_first_refresh_is_empty() {
    let app = app(false).await;

    let response = app.client.get(&format!("/entries/{}/accounts", ENTRY_ID)).await;

    response.assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(body["state"], "uninitialized");
    assert_eq!(body["accounts"], json!([]));
}

#[tokio::test]
async fn unknown_entry_is_404() {
    let app = app(true).await;

    let response = app.client.get("/entries/unknown/sensors").await;

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_code("entry_not_found");
}

#[tokio::test]
async fn sensors_use_stable_ids() {
    let app = app(true).await;

    let response = app.client.get(&format!("/entries/{}/sensors", ENTRY_ID)).await;

    response.assert_status(StatusCode::OK);
    let sensors = response.json();
    let ids: Vec<&str> = sensors
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["unique_id"].as_str())
        .collect();

    assert!(ids.contains(&format!("{}_cost", ACCOUNT).as_str()));
    assert!(ids.iter().any(|id| id.starts_with("10000001_")));
}

#[tokio::test]
async fn diagnostics_redact_credentials() {
    let app = app(true).await;

    let response = app
        .client
        .get(&format!("/entries/{}/diagnostics", ENTRY_ID))
        .await;

    response.assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(body["config_entry"]["password"], "**REDACTED**");
    assert_eq!(body["config_entry"]["region"], "rostov");
    assert!(!response.text().contains("user@example.com"));
}

#[tokio::test]
async fn refresh_runs_cycle() {
    let app = app(false).await;

    let response = app.client.post(&format!("/entries/{}/refresh", ENTRY_ID)).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json()["accounts"], 1);
    assert!(app.coordinator.data().is_some());
}

#[tokio::test]
async fn refresh_with_revoked_token_is_401() {
    let app = app(true).await;
    *app.api.reject_auth.lock() = true;

    let response = app.client.post(&format!("/entries/{}/refresh", ENTRY_ID)).await;

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_code("reauth_required");
}

#[tokio::test]
async fn readings_are_submitted() {
    let app = app(true).await;

    let response = app
        .client
        .post_json(
            &format!("/accounts/{}/readings", ACCOUNT),
            json!({ "values": [3601.9, 1502] }),
        )
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json()["readings"], json!(["3601", "1502"]));
    assert_eq!(app.api.sent.lock().len(), 1);
}

#[tokio::test]
async fn readings_missing_tariff_is_400() {
    let app = app(true).await;

    let response = app
        .client
        .post_json(
            &format!("/accounts/{}/readings", ACCOUNT),
            json!({ "values": [3601] }),
        )
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_code("tariff_missing");
    assert!(app.api.sent.lock().is_empty());
}

#[tokio::test]
async fn readings_without_values_report_first_missing_tariff() {
    let app = app(true).await;

    for body in [json!({ "values": [] }), json!({ "counter": "10000001" })] {
        let response = app
            .client
            .post_json(&format!("/accounts/{}/readings", ACCOUNT), body)
            .await;

        response
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_error_code("tariff_missing");
        assert!(response.json()["message"].as_str().unwrap().contains("T1"));
    }
    assert!(app.api.sent.lock().is_empty());
}

#[tokio::test]
async fn readings_for_unknown_account_is_404() {
    let app = app(true).await;

    let response = app
        .client
        .post_json("/accounts/999/readings", json!({ "values": [1, 2] }))
        .await;

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_code("account_not_found");
}

#[tokio::test]
async fn bill_is_saved() {
    let app = app(true).await;
    *app.api.invoice.lock() = Invoice {
        file: Some(base64::engine::general_purpose::STANDARD.encode(b"%PDF")),
    };

    let response = app
        .client
        .post_json(
            &format!("/accounts/{}/bill", ACCOUNT),
            json!({ "date": "2026-03-10" }),
        )
        .await;

    response.assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(
        body["url"],
        format!("/local/tns_energo/{}_2026-03.pdf", ACCOUNT)
    );

    let saved = app.bill_dir.path().join(format!("{}_2026-03.pdf", ACCOUNT));
    assert_eq!(std::fs::read(saved).unwrap(), b"%PDF");
}

#[tokio::test]
async fn bill_without_file_is_502() {
    let app = app(true).await;

    let response = app
        .client
        .post_json(&format!("/accounts/{}/bill", ACCOUNT), json!({}))
        .await;

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_error_code("no_file_in_response");
}
