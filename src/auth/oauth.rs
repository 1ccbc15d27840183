// src/auth/oauth.rs
// OAuth 2.0 federation (Google, Facebook)
//
// One generalized handler covers both providers: endpoints and userinfo
// parsing differ per provider, the authorization-code + PKCE flow does not.
// CSRF state and the PKCE verifier live in the oauth_states table with a
// ten-minute expiry and are consumed atomically on callback.

use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::{OAuthProviderSettings, OAuthSettings};
use crate::users::Provider;
use super::error::{AuthError, AuthResult};

/// How long an in-flight OAuth login may take before its CSRF state expires.
const STATE_TTL_SECS: i64 = 600;

/// Profile returned by a federated identity provider, normalized across
/// providers.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub provider: Provider,
    pub provider_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google user info from the userinfo API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Facebook user info from the Graph API.
#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: FacebookPictureData,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

/// A configured federated provider.
pub struct OAuthProvider {
    provider: Provider,
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    scopes: &'static [&'static str],
    userinfo_url: &'static str,
    db: SqlitePool,
}

impl OAuthProvider {
    pub fn google(db: SqlitePool, settings: &OAuthProviderSettings) -> AuthResult<Self> {
        Self::build(
            db,
            Provider::Google,
            settings,
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            &["openid", "email", "profile"],
            "https://www.googleapis.com/oauth2/v2/userinfo",
        )
    }

    pub fn facebook(db: SqlitePool, settings: &OAuthProviderSettings) -> AuthResult<Self> {
        Self::build(
            db,
            Provider::Facebook,
            settings,
            "https://www.facebook.com/v19.0/dialog/oauth",
            "https://graph.facebook.com/v19.0/oauth/access_token",
            &["email", "public_profile"],
            "https://graph.facebook.com/me?fields=id,name,email,picture",
        )
    }

    fn build(
        db: SqlitePool,
        provider: Provider,
        settings: &OAuthProviderSettings,
        auth_url: &str,
        token_url: &str,
        scopes: &'static [&'static str],
        userinfo_url: &'static str,
    ) -> AuthResult<Self> {
        Ok(Self {
            provider,
            client_id: ClientId::new(settings.client_id.clone()),
            client_secret: ClientSecret::new(settings.client_secret.clone()),
            auth_url: AuthUrl::new(auth_url.to_string())
                .map_err(|e| AuthError::internal(format!("invalid auth url: {}", e)))?,
            token_url: TokenUrl::new(token_url.to_string())
                .map_err(|e| AuthError::internal(format!("invalid token url: {}", e)))?,
            redirect_url: RedirectUrl::new(settings.redirect_url.clone())
                .map_err(|e| AuthError::internal(format!("invalid redirect url: {}", e)))?,
            scopes,
            userinfo_url,
            db,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    fn client(&self) -> ConfiguredClient {
        BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
    }

    /// Build the authorization URL, persisting CSRF state + PKCE verifier.
    pub async fn authorize_url(&self) -> AuthResult<String> {
        let client = self.client();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in self.scopes {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        let (auth_url, csrf_state) = request.set_pkce_challenge(pkce_challenge).url();

        sqlx::query(
            "INSERT INTO oauth_states (state, provider, pkce_verifier, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(csrf_state.secret())
        .bind(self.provider)
        .bind(pkce_verifier.secret())
        .bind(Utc::now().timestamp() + STATE_TTL_SECS)
        .execute(&self.db)
        .await?;

        Ok(auth_url.to_string())
    }

    /// Callback half of the flow: validate the CSRF state, exchange the code
    /// for a token, and fetch the user's profile. Any provider-side failure
    /// maps to [`AuthError::ExternalProvider`] — the end user sees a generic
    /// auth failure, the detail lands in server logs.
    pub async fn exchange_code(&self, code: &str, state: &str) -> AuthResult<ExternalProfile> {
        // Validate + consume the state in one statement.
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM oauth_states
            WHERE state = ? AND provider = ? AND expires_at > ?
            RETURNING pkce_verifier
            "#,
        )
        .bind(state)
        .bind(self.provider)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.db)
        .await?;

        let Some((pkce_verifier,)) = row else {
            warn!("{} callback with invalid or expired state", self.provider.as_str());
            return Err(AuthError::external("invalid or expired oauth state"));
        };

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::internal(format!("http client: {}", e)))?;

        let token = self
            .client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&http_client)
            .await
            .map_err(|e| AuthError::external(format!("token exchange failed: {}", e)))?;

        let response = http_client
            .get(self.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| AuthError::external(format!("userinfo fetch failed: {}", e)))?;

        let profile = self.parse_userinfo(response).await?;
        info!(
            "{} callback resolved external identity {}",
            self.provider.as_str(),
            profile.provider_id
        );
        Ok(profile)
    }

    async fn parse_userinfo(&self, response: reqwest::Response) -> AuthResult<ExternalProfile> {
        match self.provider {
            Provider::Google => {
                let user: GoogleUser = response
                    .json()
                    .await
                    .map_err(|e| AuthError::external(format!("malformed userinfo: {}", e)))?;
                Ok(ExternalProfile {
                    provider: Provider::Google,
                    provider_id: user.id,
                    display_name: user.name,
                    email: user.email,
                    avatar_url: user.picture,
                })
            }
            Provider::Facebook => {
                let user: FacebookUser = response
                    .json()
                    .await
                    .map_err(|e| AuthError::external(format!("malformed userinfo: {}", e)))?;
                Ok(ExternalProfile {
                    provider: Provider::Facebook,
                    provider_id: user.id,
                    display_name: user.name,
                    email: user.email,
                    avatar_url: user.picture.and_then(|p| p.data.url),
                })
            }
            other => Err(AuthError::internal(format!(
                "{} is not a federated provider",
                other.as_str()
            ))),
        }
    }
}

/// The federated providers this deployment has credentials for.
pub struct OAuthRegistry {
    google: Option<OAuthProvider>,
    facebook: Option<OAuthProvider>,
}

impl OAuthRegistry {
    pub fn from_settings(db: SqlitePool, settings: &OAuthSettings) -> Self {
        let google = settings.google.as_ref().and_then(|s| {
            match OAuthProvider::google(db.clone(), s) {
                Ok(p) => {
                    info!("Google OAuth enabled");
                    Some(p)
                }
                Err(e) => {
                    warn!("Google OAuth misconfigured: {}", e);
                    None
                }
            }
        });
        let facebook = settings.facebook.as_ref().and_then(|s| {
            match OAuthProvider::facebook(db.clone(), s) {
                Ok(p) => {
                    info!("Facebook OAuth enabled");
                    Some(p)
                }
                Err(e) => {
                    warn!("Facebook OAuth misconfigured: {}", e);
                    None
                }
            }
        });
        Self { google, facebook }
    }

    /// Registry with no providers configured.
    pub fn disabled() -> Self {
        Self {
            google: None,
            facebook: None,
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&OAuthProvider> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Facebook => self.facebook.as_ref(),
            _ => None,
        }
    }
}
