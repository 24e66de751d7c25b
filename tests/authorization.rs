//! Authorization Endpoint Validation

mod utils;

use credibil_oidc::{HttpRequest, Options, Outcome};
use http::StatusCode;
use utils::ProviderImpl;

// Implicit/hybrid requests with the openid scope must carry a nonce; the
// failure is returned in the fragment, not the query.
#[tokio::test]
async fn implicit_missing_nonce() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=id_token%20token&scope=openid&state=s",
    );
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::FOUND);

    let location = utils::location(&response);
    assert!(location.starts_with("https://client.example.com/cb#"));

    let params = utils::fragment_params(&location);
    assert_eq!(params["error"], "invalid_request");
    assert_eq!(params["error_description"], "nonce parameter missing");
    assert_eq!(params["state"], "s");
}

// Tokens must never be returned through the query string.
#[tokio::test]
async fn unsafe_response_mode() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=token&response_mode=query&state=s",
    );
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::FOUND);

    let params = utils::query_params(&utils::location(&response));
    assert_eq!(params["error"], "invalid_request");
    assert_eq!(params["state"], "s");
}

// A missing client_id cannot be redirected: it renders as a native page.
#[tokio::test]
async fn missing_client_id() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb&response_type=code&scope=openid",
    );
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let body = String::from_utf8(response.body).expect("should be text");
    assert!(body.contains("invalid_request"));
    assert!(body.contains("client_id"));
}

// When the application opts in, pre-redirect failures surface to the host
// instead of rendering a page.
#[tokio::test]
async fn application_displays_errors() {
    let mut options = utils::options();
    options.application_can_display_errors = true;
    let endpoint =
        credibil_oidc::Endpoint::new(options, ProviderImpl::new()).expect("should create");

    let request = utils::authorize_get("response_type=code");
    let Outcome::Error(error) = endpoint.handle(&request).await.expect("should dispatch") else {
        panic!("should surface the error to the host");
    };
    assert_eq!(error.code(), "invalid_request");
}

// An unknown client is rejected before any redirect can happen.
#[tokio::test]
async fn unknown_client() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=mallory&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid",
    );
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(response.body).expect("should be text").contains("invalid_client"));
}

// redirect_uri hygiene: fragments and relative URIs are refused outright.
#[tokio::test]
async fn malformed_redirect_uri() {
    let endpoint = utils::endpoint();

    for redirect_uri in
        ["https%3A%2F%2Fclient.example.com%2Fcb%23frag", "client.example.com%2Fcb"]
    {
        let request = utils::authorize_get(&format!(
            "client_id=app1&redirect_uri={redirect_uri}&response_type=code&scope=openid"
        ));
        let Outcome::Response(response) =
            endpoint.handle(&request).await.expect("should dispatch")
        else {
            panic!("should return a response");
        };
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}

// POST bodies must be form-encoded; a charset parameter is accepted.
#[tokio::test]
async fn content_type_checks() {
    let endpoint = utils::endpoint();

    // no content type at all
    let mut request = utils::authorize_post("client_id=app1");
    request.headers.remove(http::header::CONTENT_TYPE);
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // charset parameter accepted
    let mut request = utils::authorize_post(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid&nonce=n1",
    );
    request.headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
    );
    let outcome = endpoint.handle(&request).await.expect("should dispatch");
    assert!(matches!(outcome, Outcome::Authenticate(_)));
}

// Only GET and POST reach the handler.
#[tokio::test]
async fn method_not_supported() {
    let endpoint = utils::endpoint();

    let mut request = utils::authorize_get("client_id=app1");
    request.method = http::Method::PUT;
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// Plaintext requests are refused unless explicitly allowed.
#[tokio::test]
async fn insecure_transport() {
    let endpoint = utils::endpoint();

    let mut request = utils::authorize_get("client_id=app1");
    request.secure = false;
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let mut options = Options::new("http://localhost:8080");
    options.allow_insecure_http = true;
    options.signing_credentials.push(utils::credential());
    let endpoint =
        credibil_oidc::Endpoint::new(options, ProviderImpl::new()).expect("should create");

    let mut request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid&nonce=n1",
    );
    request.secure = false;
    let outcome = endpoint.handle(&request).await.expect("should dispatch");
    assert!(matches!(outcome, Outcome::Authenticate(_)));
}

// Requests not matching a configured endpoint fall through to the host.
#[tokio::test]
async fn unmatched_path_is_skipped() {
    let endpoint = utils::endpoint();
    let request = HttpRequest::get("/static/logo.png", None);
    let outcome = endpoint.handle(&request).await.expect("should dispatch");
    assert!(matches!(outcome, Outcome::Skipped));
}

// A request can be parked under its unique_id and rehydrated later, with
// fresh parameters winning over cached ones.
#[tokio::test]
async fn cached_request_rehydration() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&scope=openid&state=first&nonce=n1",
    );
    let Outcome::Authenticate(first) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should yield for authentication");
    };
    let unique_id = first.message.unique_id().expect("should have unique_id").to_string();

    // resume with only the unique_id: everything else is restored
    let resumed = utils::authorize_post(&format!("unique_id={unique_id}&state=second"));
    let Outcome::Authenticate(second) = endpoint.handle(&resumed).await.expect("should dispatch")
    else {
        panic!("should yield for authentication");
    };
    assert_eq!(second.message.client_id(), Some("app1"));
    assert_eq!(second.message.response_type(), Some("code"));
    // the fresh parameter wins
    assert_eq!(second.message.state(), Some("second"));
}

// An unknown unique_id means the parked request expired.
#[tokio::test]
async fn expired_unique_id() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_post("unique_id=gone");
    let Outcome::Response(response) = endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should return a response");
    };
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(
        String::from_utf8(response.body).expect("should be text").contains("timeout expired")
    );
}

// form_post delivery: the response is an auto-submitting form with every
// value entity-encoded.
#[tokio::test]
async fn form_post_response() {
    let endpoint = utils::endpoint();

    let request = utils::authorize_get(
        "client_id=app1&redirect_uri=https%3A%2F%2Fclient.example.com%2Fcb\
         &response_type=code&response_mode=form_post&scope=openid\
         &state=a%20%22quoted%22%20state&nonce=n1",
    );
    let Outcome::Authenticate(auth_request) =
        endpoint.handle(&request).await.expect("should dispatch")
    else {
        panic!("should yield for authentication");
    };
    let response = endpoint.sign_in(&auth_request, utils::ticket()).await.expect("should respond");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers.get(http::header::CONTENT_TYPE).map(|v| v.to_str().unwrap()),
        Some("text/html;charset=UTF-8")
    );

    let body = String::from_utf8(response.body).expect("should be text");
    assert!(body.contains(r#"action="https://client.example.com/cb""#));
    assert!(body.contains(r#"name="code""#));
    assert!(body.contains("a &quot;quoted&quot; state"));
    assert!(!body.contains(r#"a "quoted" state"#));
    assert!(!body.contains("redirect_uri"));
}
