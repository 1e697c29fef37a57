//! OAuth2 Token Exchange for 5G SBA
//!
//! Client credentials grant (RFC 6749 Section 4.4) against the NRF, as used by
//! an NF service consumer before calling a producer (3GPP TS 29.510). The UDM
//! acts as a consumer when it posts notifications to AMF/SMF/NEF callbacks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::client::SbiClient;
use crate::error::{SbiError, SbiResult};
use crate::message::SbiRequest;
use crate::types::{NfType, SbiServiceType};

/// Path of the NRF token endpoint
const ACCESS_TOKEN_PATH: &str = "/oauth2/token";
/// Refresh margin before the advertised expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// OAuth2 access token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    /// The access token (JWT in 5G SBA)
    pub access_token: String,
    /// Token type, always "Bearer"
    pub token_type: String,
    /// Lifetime of the token in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Scope granted (space-delimited NF service names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// OAuth2 access token request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenRequest {
    /// Grant type: must be "client_credentials"
    pub grant_type: String,
    /// NF Instance ID of the NF service consumer
    #[serde(rename = "nfInstanceId")]
    pub nf_instance_id: String,
    /// NF type of the NF service consumer
    #[serde(rename = "nfType")]
    pub nf_type: NfType,
    /// NF type of the target NF service producer
    #[serde(rename = "targetNfType")]
    pub target_nf_type: NfType,
    /// Requested scope (space-delimited NF service names)
    pub scope: String,
}

impl AccessTokenRequest {
    pub fn new(
        nf_instance_id: impl Into<String>,
        nf_type: NfType,
        target_nf_type: NfType,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: "client_credentials".to_string(),
            nf_instance_id: nf_instance_id.into(),
            nf_type,
            target_nf_type,
            scope: scope.into(),
        }
    }

    /// Encode the request as `application/x-www-form-urlencoded` body.
    pub fn to_form_body(&self) -> String {
        [
            ("grant_type", self.grant_type.as_str()),
            ("nfInstanceId", self.nf_instance_id.as_str()),
            ("nfType", self.nf_type.to_str()),
            ("targetNfType", self.target_nf_type.to_str()),
            ("scope", self.scope.as_str()),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", url_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    response: AccessTokenResponse,
    obtained_at: Instant,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        let expires_in = self.response.expires_in.unwrap_or(3600);
        let lifetime = Duration::from_secs(expires_in).saturating_sub(EXPIRY_MARGIN);
        self.obtained_at.elapsed() >= lifetime
    }
}

/// OAuth2 token cache keyed by `(target NF type, scope)`.
pub struct TokenCache {
    tokens: RwLock<HashMap<(NfType, String), CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Retrieve a non-expired cached token for the given key.
    pub async fn get(&self, target_nf_type: NfType, scope: &str) -> Option<AccessTokenResponse> {
        let tokens = self.tokens.read().await;
        tokens
            .get(&(target_nf_type, scope.to_string()))
            .filter(|cached| !cached.is_expired())
            .map(|cached| cached.response.clone())
    }

    /// Store a token in the cache.
    pub async fn put(&self, target_nf_type: NfType, scope: &str, response: AccessTokenResponse) {
        let cached = CachedToken {
            response,
            obtained_at: Instant::now(),
        };
        self.tokens
            .write()
            .await
            .insert((target_nf_type, scope.to_string()), cached);
    }

    /// Clear all cached tokens.
    pub async fn clear(&self) {
        self.tokens.write().await.clear();
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate that an access token response looks well-formed.
pub fn validate_token_response(response: &AccessTokenResponse) -> SbiResult<()> {
    if response.access_token.is_empty() {
        return Err(SbiError::AuthorizationFailed(
            "Empty access token in response".into(),
        ));
    }
    if !response.token_type.eq_ignore_ascii_case("bearer") {
        return Err(SbiError::AuthorizationFailed(format!(
            "Unsupported token type: {}",
            response.token_type
        )));
    }
    Ok(())
}

/// OAuth2 client requesting tokens from the NRF.
pub struct OAuth2Client {
    nrf: SbiClient,
    nf_instance_id: String,
    nf_type: NfType,
    cache: TokenCache,
}

impl OAuth2Client {
    /// Create a new OAuth2 client for the NRF at `nrf_uri` (e.g. "http://127.0.0.10:7777").
    pub fn new(nrf_uri: &str, nf_instance_id: impl Into<String>, nf_type: NfType) -> SbiResult<Self> {
        Ok(Self {
            nrf: SbiClient::from_uri(nrf_uri)?,
            nf_instance_id: nf_instance_id.into(),
            nf_type,
            cache: TokenCache::new(),
        })
    }

    /// Get a valid access token for the given target NF type and service,
    /// from cache when possible.
    pub async fn get_token(&self, target_nf_type: NfType, service: SbiServiceType) -> SbiResult<String> {
        let scope = service.to_name();
        if let Some(cached) = self.cache.get(target_nf_type, scope).await {
            return Ok(cached.access_token);
        }

        let response = self.request_token(target_nf_type, scope).await?;
        let token = response.access_token.clone();
        self.cache.put(target_nf_type, scope, response).await;

        Ok(token)
    }

    /// Request a new access token from the NRF.
    pub async fn request_token(&self, target_nf_type: NfType, scope: &str) -> SbiResult<AccessTokenResponse> {
        let form = AccessTokenRequest::new(&self.nf_instance_id, self.nf_type, target_nf_type, scope)
            .to_form_body();
        let request = SbiRequest::post(ACCESS_TOKEN_PATH)
            .with_body(form, "application/x-www-form-urlencoded");

        let response = self.nrf.send_request(request).await?;
        if response.status != 200 {
            return Err(SbiError::AuthorizationFailed(format!(
                "NRF token request failed (HTTP {}): {}",
                response.status,
                response.http.content.as_deref().unwrap_or_default()
            )));
        }

        let token_response: AccessTokenResponse = response
            .json_body()
            .map_err(|e| SbiError::AuthorizationFailed(format!("Invalid token response: {e}")))?;

        validate_token_response(&token_response)?;
        Ok(token_response)
    }

    /// Build an Authorization header value for the given target.
    pub async fn authorization_header(
        &self,
        target_nf_type: NfType,
        service: SbiServiceType,
    ) -> SbiResult<String> {
        let token = self.get_token(target_nf_type, service).await?;
        Ok(format!("Bearer {token}"))
    }

    /// Invalidate all cached tokens.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

/// Minimal percent-encoding for form values.
fn url_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(c),
            ' ' => result.push('+'),
            _ => {
                let mut buf = [0u8; 4];
                for &b in c.encode_utf8(&mut buf).as_bytes() {
                    result.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }
    result
}
