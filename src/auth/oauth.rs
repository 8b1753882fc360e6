use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::AuthError;
use crate::config::OAuthConfig;
use crate::database::models::UserProfile;

/// Where a user lands after sign-in when no usable callback was supplied.
pub const DEFAULT_CALLBACK: &str = "/dashboard";

/// External OAuth 2 authorization-code provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider URL the browser is redirected to, carrying our signed `state`.
    fn authorize_url(&self, state: &str) -> Result<Url, AuthError>;

    /// Trade the callback `code` for the signed-in user's profile.
    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "avatar_url", alias = "picture")]
    image: Option<String>,
}

/// One entry of a provider's email list (GitHub `/user/emails`).
#[derive(Debug, Deserialize)]
struct ProviderEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// Primary verified address, else any verified one.
fn pick_email(emails: &[ProviderEmail]) -> Option<String> {
    emails
        .iter()
        .filter(|e| e.verified)
        .max_by_key(|e| e.primary)
        .map(|e| e.email.clone())
}

pub struct OAuthProvider {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthProvider {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn access_token(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        match (token.access_token, token.error) {
            (Some(access_token), None) => Ok(access_token),
            (_, Some(error)) => Err(AuthError::Provider(format!(
                "{}: {}",
                error,
                token.error_description.unwrap_or_default()
            ))),
            (None, None) => Err(AuthError::Provider("token response had no access_token".into())),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AuthError> {
        self.http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("workout-tracker/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    /// Private addresses are missing from the profile and only listed here.
    async fn fallback_email(&self, access_token: &str) -> Result<Option<String>, AuthError> {
        let Some(url) = &self.config.emails_url else {
            return Ok(None);
        };
        let emails: Vec<ProviderEmail> = self.get_json(url, access_token).await?;
        debug!("Provider listed {} email addresses", emails.len());
        Ok(pick_email(&emails))
    }
}

#[async_trait]
impl IdentityProvider for OAuthProvider {
    fn authorize_url(&self, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AuthError> {
        let access_token = self.access_token(code).await?;
        debug!("Exchanged authorization code for access token");

        let info: UserInfo = self
            .get_json(&self.config.userinfo_url, &access_token)
            .await?;

        let email = match info.email.filter(|e| !e.trim().is_empty()) {
            Some(email) => Some(email),
            None => self.fallback_email(&access_token).await?,
        }
        .ok_or_else(|| AuthError::Provider("provider did not return an email".into()))?;

        info!("Signed in {} through identity provider", email);
        Ok(UserProfile {
            email,
            name: info.name,
            image: info.image,
        })
    }
}

/// A freshly signed `state` value and the nonce bound to the browser cookie.
#[derive(Debug, Clone)]
pub struct SignedState {
    pub nonce: String,
    pub state: String,
}

/// Signs and verifies the OAuth `state` parameter:
/// `nonce.hex(sha256(secret || nonce || callback)).hex(callback)`.
#[derive(Clone)]
pub struct StateSigner {
    secret: Vec<u8>,
}

impl StateSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn digest(&self, nonce: &str, callback: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(nonce.as_bytes());
        hasher.update(callback.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn sign(&self, callback: &str) -> SignedState {
        let callback = safe_callback(Some(callback));
        let nonce = Uuid::new_v4().simple().to_string();
        let state = format!(
            "{}.{}.{}",
            nonce,
            self.digest(&nonce, &callback),
            hex::encode(callback.as_bytes())
        );
        SignedState { nonce, state }
    }

    /// Check the state against the nonce cookie and return the callback path.
    pub fn verify(&self, state: &str, cookie_nonce: Option<&str>) -> Result<String, AuthError> {
        let mut parts = state.splitn(3, '.');
        let (Some(nonce), Some(digest), Some(encoded)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidState);
        };

        if cookie_nonce != Some(nonce) {
            return Err(AuthError::InvalidState);
        }

        let callback = hex::decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(AuthError::InvalidState)?;

        if self.digest(nonce, &callback) != digest {
            return Err(AuthError::InvalidState);
        }

        Ok(safe_callback(Some(&callback)))
    }
}

/// Only same-site absolute paths are accepted as post-login destinations.
pub fn safe_callback(callback: Option<&str>) -> String {
    match callback {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.starts_with("/login") =>
        {
            path.to_string()
        }
        _ => DEFAULT_CALLBACK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_with_matching_cookie() {
        let signer = StateSigner::new("0123456789abcdef");
        let signed = signer.sign("/workouts/plans");
        let callback = signer.verify(&signed.state, Some(signed.nonce.as_str())).unwrap();
        assert_eq!(callback, "/workouts/plans");
    }

    #[test]
    fn state_requires_the_browser_nonce() {
        let signer = StateSigner::new("0123456789abcdef");
        let signed = signer.sign("/exercises");
        assert!(signer.verify(&signed.state, None).is_err());
        assert!(signer.verify(&signed.state, Some("other")).is_err());
    }

    #[test]
    fn tampered_callback_is_rejected() {
        let signer = StateSigner::new("0123456789abcdef");
        let signed = signer.sign("/exercises");
        let mut parts: Vec<&str> = signed.state.split('.').collect();
        let evil = hex::encode(b"/workouts");
        parts[2] = evil.as_str();
        assert!(signer.verify(&parts.join("."), Some(signed.nonce.as_str())).is_err());
    }

    #[test]
    fn malformed_callback_encoding_is_rejected() {
        let signer = StateSigner::new("0123456789abcdef");
        let signed = signer.sign("/exercises");
        let mut parts: Vec<&str> = signed.state.split('.').collect();
        for bad in ["abc", "zz"] {
            parts[2] = bad;
            assert!(signer.verify(&parts.join("."), Some(signed.nonce.as_str())).is_err());
        }
    }

    #[test]
    fn private_email_falls_back_to_primary_verified() {
        let emails: Vec<ProviderEmail> = serde_json::from_str(
            r#"[
                {"email": "old@example.com", "primary": false, "verified": true},
                {"email": "main@example.com", "primary": true, "verified": true},
                {"email": "typo@example.com", "primary": false, "verified": false}
            ]"#,
        )
        .unwrap();
        assert_eq!(pick_email(&emails).as_deref(), Some("main@example.com"));

        let unverified: Vec<ProviderEmail> =
            serde_json::from_str(r#"[{"email": "x@example.com", "primary": true, "verified": false}]"#)
                .unwrap();
        assert_eq!(pick_email(&unverified), None);
    }

    #[test]
    fn open_redirects_fall_back_to_dashboard() {
        assert_eq!(safe_callback(Some("https://evil.example")), DEFAULT_CALLBACK);
        assert_eq!(safe_callback(Some("//evil.example")), DEFAULT_CALLBACK);
        assert_eq!(safe_callback(None), DEFAULT_CALLBACK);
        assert_eq!(safe_callback(Some("/workouts")), "/workouts");
    }

    #[test]
    fn authorize_url_carries_client_and_state() {
        let provider = OAuthProvider::new(OAuthConfig {
            client_id: "client".into(),
            client_secret: "secret".into(),
            authorize_url: "https://auth.example.com/authorize".into(),
            token_url: "https://auth.example.com/token".into(),
            userinfo_url: "https://auth.example.com/userinfo".into(),
            emails_url: None,
            redirect_url: "http://localhost:3000/auth/callback".into(),
            scopes: vec!["openid".into(), "email".into()],
        });
        let url = provider.authorize_url("abc").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "client".into())));
        assert!(pairs.contains(&("state".into(), "abc".into())));
        assert!(pairs.contains(&("scope".into(), "openid email".into())));
    }
}
