//! Token Introspection

mod utils;

use chrono::Utc;
use credibil_oidc::{Endpoint, HttpRequest, Outcome};
use http::StatusCode;
use utils::{CLIENT_ID, CLIENT_SECRET, NORMAL_USER, ProviderImpl};

// Issue tokens via the password grant and return the response body.
async fn issue_tokens(endpoint: &Endpoint<ProviderImpl>, scope: &str) -> serde_json::Value {
    let body = format!(
        "grant_type=password&username={NORMAL_USER}&password={}&scope={}\
         &client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}",
        utils::USER_PASSWORD,
        scope.replace(' ', "%20")
    );
    let Outcome::Response(response) =
        endpoint.handle(&utils::token_post(&body)).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::OK);
    utils::json_body(&response)
}

fn introspect_post(body: &str) -> HttpRequest {
    HttpRequest::form_post("/connect/token_validation", body.as_bytes().to_vec())
}

// A valid access token reports its audiences, expiry instant, and claims.
#[tokio::test]
async fn access_token_introspection() {
    let endpoint = utils::endpoint();
    let issued = issue_tokens(&endpoint, "openid").await;
    let access_token = issued["access_token"].as_str().expect("should have access_token");

    let Outcome::Response(response) = endpoint
        .handle(&introspect_post(&format!("access_token={access_token}")))
        .await
        .expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::OK);

    let json = utils::json_body(&response);
    assert_eq!(json["audiences"], serde_json::json!([CLIENT_ID]));

    // the expiry is reported as a UTC instant, not a remaining duration
    let expires_in = json["expires_in"].as_i64().expect("should be set");
    let expected = (Utc::now() + chrono::Duration::hours(1)).timestamp();
    assert!((expires_in - expected).abs() < 30, "expires_in was {expires_in}");

    let claims = json["claims"].as_array().expect("should have claims");
    assert!(
        claims
            .iter()
            .any(|c| c["type"] == "sub" && c["value"] == NORMAL_USER),
        "claims were {claims:?}"
    );
}

// A caller restricting the audience must hold one the token was issued
// for.
#[tokio::test]
async fn audience_restriction() {
    let endpoint = utils::endpoint();
    let issued = issue_tokens(&endpoint, "openid").await;
    let access_token = issued["access_token"].as_str().expect("should have access_token");

    // matching audience succeeds
    let Outcome::Response(response) = endpoint
        .handle(&introspect_post(&format!("access_token={access_token}&audience={CLIENT_ID}")))
        .await
        .expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::OK);

    // a foreign audience is refused
    let Outcome::Response(response) = endpoint
        .handle(&introspect_post(&format!("access_token={access_token}&audience=other")))
        .await
        .expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(utils::json_body(&response)["error"], "invalid_grant");
}

// Exactly one token parameter may be supplied.
#[tokio::test]
async fn exactly_one_token() {
    let endpoint = utils::endpoint();
    let issued = issue_tokens(&endpoint, "openid").await;
    let access_token = issued["access_token"].as_str().expect("should have access_token");
    let id_token = issued["id_token"].as_str().expect("should have id_token");

    let Outcome::Response(response) = endpoint
        .handle(&introspect_post(&format!(
            "access_token={access_token}&id_token={id_token}"
        )))
        .await
        .expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(utils::json_body(&response)["error"], "invalid_request");

    let Outcome::Response(response) =
        endpoint.handle(&introspect_post("")).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(utils::json_body(&response)["error"], "invalid_request");
}

// Garbage tokens are invalid grants, not server faults.
#[tokio::test]
async fn invalid_token() {
    let endpoint = utils::endpoint();

    let Outcome::Response(response) = endpoint
        .handle(&introspect_post("access_token=not.a.token"))
        .await
        .expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(utils::json_body(&response)["error"], "invalid_grant");
}

// Refresh tokens and identity tokens can be introspected too, and GET is
// accepted.
#[tokio::test]
async fn other_token_kinds() {
    let endpoint = utils::endpoint();
    let issued = issue_tokens(&endpoint, "openid offline_access").await;

    let refresh_token = issued["refresh_token"].as_str().expect("should have refresh_token");
    let Outcome::Response(response) = endpoint
        .handle(&introspect_post(&format!(
            "refresh_token={}",
            urlencoding::encode(refresh_token)
        )))
        .await
        .expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(utils::json_body(&response)["audiences"], serde_json::json!([CLIENT_ID]));

    let id_token = issued["id_token"].as_str().expect("should have id_token");
    let request = HttpRequest::get(
        "/connect/token_validation",
        Some(format!("id_token={id_token}")),
    );
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::OK);

    let json = utils::json_body(&response);
    let claims = json["claims"].as_array().expect("should have claims");
    assert!(claims.iter().any(|c| c["type"] == "sub" && c["value"] == NORMAL_USER));
}
