mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(format!("{}/health", server.base_url)).await?;
    let status = res.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        status
    );

    let body: Value = res.json().await?;
    if status == StatusCode::SERVICE_UNAVAILABLE {
        // The database error itself is never exposed
        assert_eq!(body["error"], "database unavailable");
        assert_eq!(body["data"]["status"], "degraded");
    } else {
        assert_eq!(body["data"]["database"], "ok");
    }
    Ok(())
}

#[tokio::test]
async fn root_lists_endpoints() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(format!("{}/", server.base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "OBE API");
    assert!(body["data"]["endpoints"]["mapping"].as_str().unwrap().contains("cpl-mk"));
    Ok(())
}

#[tokio::test]
async fn login_requires_both_fields() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .post(format!("{}/auth/login", server.base_url))
        .json(&serde_json::json!({ "email": "kaprodi@example.ac.id" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["field_errors"]["password"].is_string(), "body: {}", body);
    Ok(())
}
