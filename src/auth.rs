//! OAuth access-token refresh
//!
//! Twitch access tokens are short-lived; the long-lived refresh token is
//! exchanged for a fresh access token on every start. See
//! <https://dev.twitch.tv/docs/authentication/#refreshing-access-tokens>.

use serde::Deserialize;
use tracing::info;

use crate::error::AppError;

/// Twitch oauth2 token endpoint
pub const TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";

/// The one field we need from the token endpoint's response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange a refresh token for a fresh access token
///
/// Performs a single POST with the parameters in the query string and an
/// empty body, as the endpoint expects. A non-success status or a missing
/// `access_token` field is an error; the caller treats it as fatal to the
/// run attempt.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<String, AppError> {
    info!("fetching access token");

    let response = http
        .post(TOKEN_ENDPOINT)
        .query(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::TokenRefresh(format!("{}: {}", status, body)));
    }

    let token: TokenResponse = response.json().await?;
    info!("access token refreshed");

    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_decoding() {
        let json = r#"{"access_token":"tok123","refresh_token":"other","expires_in":14400,"scope":["chat:read"],"token_type":"bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "tok123");
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let json = r#"{"token_type":"bearer"}"#;
        assert!(serde_json::from_str::<TokenResponse>(json).is_err());
    }
}
