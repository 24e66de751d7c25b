//! Authorization Code Flow

mod utils;

use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_oidc::Outcome;
use http::StatusCode;
use sha2::{Digest, Sha256};
use utils::{CLIENT_ID, CLIENT_SECRET, ISSUER, NORMAL_USER};

// Run through the entire authorization code flow: authorization request,
// user sign-in, code redemption, and replay rejection.
#[tokio::test]
async fn code_flow() {
    utils::init_tracer();
    let endpoint = utils::endpoint();

    // --------------------------------------------------
    // The client starts an authorization request
    // --------------------------------------------------
    let request = utils::authorize_post(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid&state=xyz&nonce=n1",
    );
    let outcome = endpoint.handle(&request).await.expect("should dispatch");
    let Outcome::Authenticate(auth_request) = outcome else {
        panic!("should yield to the host for authentication");
    };
    assert_eq!(auth_request.message.client_id(), Some(CLIENT_ID));

    // --------------------------------------------------
    // The host signs the user in; the code is delivered by query redirect
    // --------------------------------------------------
    let response =
        endpoint.sign_in(&auth_request, utils::ticket()).await.expect("should assemble response");
    assert_eq!(response.status, StatusCode::FOUND);

    let location = utils::location(&response);
    assert!(location.starts_with("https://client.example.com/cb?"));

    let params = utils::query_params(&location);
    assert_eq!(params["state"], "xyz");
    assert!(!params.contains_key("redirect_uri"));
    let code = params["code"].clone();
    assert_eq!(code.len(), 43);

    // --------------------------------------------------
    // The client exchanges the code at the token endpoint
    // --------------------------------------------------
    let body = format!(
        "grant_type=authorization_code&code={code}\
         &redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}"
    );
    let outcome = endpoint.handle(&utils::token_post(&body)).await.expect("should dispatch");
    let Outcome::Response(response) = outcome else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers.get(http::header::CACHE_CONTROL).map(|v| v.to_str().unwrap()),
        Some("no-cache")
    );
    assert_eq!(
        response.headers.get(http::header::PRAGMA).map(|v| v.to_str().unwrap()),
        Some("no-cache")
    );

    let json = utils::json_body(&response);
    assert_eq!(json["token_type"], "Bearer");
    let expires_in = json["expires_in"].as_i64().expect("should have expires_in");
    assert!((3590..=3600).contains(&expires_in), "expires_in was {expires_in}");

    let access_token = json["access_token"].as_str().expect("should have access_token");
    let id_token = json["id_token"].as_str().expect("should have id_token");
    // no offline_access scope, no refresh token
    assert!(json.get("refresh_token").is_none());

    // --------------------------------------------------
    // The identity token binds the nonce, code, and access token
    // --------------------------------------------------
    let claims = utils::decode_jwt(endpoint.options(), id_token);
    assert_eq!(claims["iss"], ISSUER);
    assert_eq!(claims["aud"], CLIENT_ID);
    assert_eq!(claims["sub"], NORMAL_USER);
    assert_eq!(claims["nonce"], "n1");
    assert_eq!(claims["c_hash"], left_half_hash(&code));
    assert_eq!(claims["at_hash"], left_half_hash(access_token));

    let access_claims = utils::decode_jwt(endpoint.options(), access_token);
    assert_eq!(access_claims["sub"], NORMAL_USER);
    // identity-token-only claims stay out of the access token
    assert!(access_claims.get("name").is_none());

    // --------------------------------------------------
    // The code is single-use: a second exchange is refused
    // --------------------------------------------------
    let outcome = endpoint.handle(&utils::token_post(&body)).await.expect("should dispatch");
    let Outcome::Response(replay) = outcome else {
        panic!("should return a response");
    };
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(utils::json_body(&replay)["error"], "invalid_grant");
}

// A code bound to one redirection URI cannot be redeemed with another.
#[tokio::test]
async fn redirect_uri_binding() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid&nonce=n1",
    );
    let Outcome::Authenticate(auth_request) =
        endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should yield for authentication");
    };
    let response = endpoint.sign_in(&auth_request, utils::ticket()).await.expect("should respond");
    let code = utils::query_params(&utils::location(&response))["code"].clone();

    let body = format!(
        "grant_type=authorization_code&code={code}\
         &redirect_uri=https%3A%2F%2Fattacker.example.com%2Fcb\
         &client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}"
    );
    let Outcome::Response(response) =
        endpoint.handle(&utils::token_post(&body)).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(utils::json_body(&response)["error"], "invalid_grant");
}

// A code issued to one client cannot be redeemed by another.
#[tokio::test]
async fn client_binding() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid&nonce=n1",
    );
    let Outcome::Authenticate(auth_request) =
        endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should yield for authentication");
    };
    let response = endpoint.sign_in(&auth_request, utils::ticket()).await.expect("should respond");
    let code = utils::query_params(&utils::location(&response))["code"].clone();

    let body = format!(
        "grant_type=authorization_code&code={code}\
         &redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb&client_id=app2"
    );
    let Outcome::Response(response) =
        endpoint.handle(&utils::token_post(&body)).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(utils::json_body(&response)["error"], "invalid_grant");
}

fn left_half_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    Base64UrlUnpadded::encode_string(&digest[..16])
}
