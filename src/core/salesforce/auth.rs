use anyhow::{Context, Result, anyhow};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

use crate::config::SalesforceConfig;

const ASSERTION_LIFETIME: Duration = Duration::from_secs(30 * 60);
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    sub: String,
    aud: String,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Sign a jwt-bearer assertion for the configured integration user. The
/// audience is the login host for the configured environment, not the
/// instance itself.
pub fn build_assertion(config: &SalesforceConfig, private_key_pem: &[u8]) -> Result<String> {
    let exp = (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        + ASSERTION_LIFETIME)
        .as_secs();

    let claims = Claims {
        iss: config.client_id.clone(),
        sub: config.username.clone(),
        aud: format!("https://{}.salesforce.com", config.environment),
        exp,
    };

    let key = EncodingKey::from_rsa_pem(private_key_pem).context("parse rsa private key")?;
    encode(&Header::new(Algorithm::RS256), &claims, &key).context("sign jwt assertion")
}

/// Exchange a signed assertion for an access token at the instance's token
/// endpoint.
pub async fn fetch_access_token(config: &SalesforceConfig) -> Result<String> {
    let pem = fs::read(&config.key_path)
        .await
        .with_context(|| format!("read private key {}", config.key_path.display()))?;
    let assertion = build_assertion(config, &pem)?;

    let token_url = format!(
        "{}/services/oauth2/token",
        config.instance_url.trim_end_matches('/')
    );
    let params = [
        ("grant_type", JWT_BEARER_GRANT),
        ("assertion", assertion.as_str()),
    ];

    let client = reqwest::Client::new();
    let response = client
        .post(&token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| anyhow!("token request failed: {}", e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| anyhow!("failed to read token response body: {}", e))?;

    if !status.is_success() {
        return Err(anyhow!("token exchange failed (HTTP {}): {}", status, body));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| anyhow!("failed to parse token response: {}", e))?;

    if let Some(error) = token.error {
        let desc = token.error_description.unwrap_or_default();
        return Err(anyhow!("token error: {} - {}", error, desc));
    }

    token
        .access_token
        .ok_or_else(|| anyhow!("no access_token in response. Response was: {}", body))
}
