//! # Configuration Endpoint
//!
//! Assembles the OpenID Provider configuration document. Grant types,
//! response types, and response modes are advertised only when the
//! endpoints (and signing credentials) that back them are available.

use http::StatusCode;

use crate::oauth::GrantType;
use crate::oidc::endpoint::HttpResponse;
use crate::oidc::events::{EndpointContext, Events};
use crate::oidc::options::Options;
use crate::oidc::provider::Provider;
use crate::oidc::types::ServerMetadata;

/// Configuration (discovery) endpoint handler.
pub(crate) async fn metadata(options: &Options, provider: &impl Provider) -> HttpResponse {
    tracing::debug!("metadata");

    let mut endpoint_ctx = EndpointContext::new(None);
    provider.configuration_endpoint(&mut endpoint_ctx).await;
    if let Some(handled) = endpoint_ctx.response {
        return handled;
    }

    let authorization_enabled = !options.authorization_endpoint_path.is_empty();
    let token_enabled = !options.token_endpoint_path.is_empty();
    let signing = options.signing_credential().is_some();

    let mut grant_types = vec![];
    if authorization_enabled && token_enabled {
        grant_types.push(GrantType::AuthorizationCode);
    }
    if authorization_enabled {
        grant_types.push(GrantType::Implicit);
    }
    if token_enabled {
        grant_types.push(GrantType::RefreshToken);
        grant_types.push(GrantType::Password);
        grant_types.push(GrantType::ClientCredentials);
    }

    let mut response_modes = vec![];
    if authorization_enabled {
        response_modes.push("form_post".to_string());
        response_modes.push("fragment".to_string());
        response_modes.push("query".to_string());
    }

    let mut response_types = vec![];
    if authorization_enabled {
        response_types.push("token".to_string());
        if signing {
            response_types.push("id_token".to_string());
            response_types.push("id_token token".to_string());
        }
        if token_enabled {
            response_types.push("code".to_string());
            response_types.push("code token".to_string());
            if signing {
                response_types.push("code id_token".to_string());
                response_types.push("code id_token token".to_string());
            }
        }
    }

    let mut scopes = vec!["openid".to_string()];
    if token_enabled {
        scopes.push("offline_access".to_string());
    }

    let document = ServerMetadata {
        issuer: options.issuer.clone(),
        authorization_endpoint: authorization_enabled
            .then(|| options.endpoint_url(&options.authorization_endpoint_path)),
        token_endpoint: token_enabled.then(|| options.endpoint_url(&options.token_endpoint_path)),
        end_session_endpoint: (!options.logout_endpoint_path.is_empty())
            .then(|| options.endpoint_url(&options.logout_endpoint_path)),
        jwks_uri: (!options.jwks_endpoint_path.is_empty())
            .then(|| options.endpoint_url(&options.jwks_endpoint_path)),
        grant_types_supported: grant_types,
        response_modes_supported: response_modes,
        response_types_supported: response_types,
        subject_types_supported: vec!["public".to_string()],
        scopes_supported: scopes,
        id_token_signing_alg_values_supported: vec!["RS256".to_string()],
    };

    let body = serde_json::to_value(&document).unwrap_or_default();
    HttpResponse::json(StatusCode::OK, &body)
}
