// src/auth/service.rs
// Authentication strategies: local credentials, OAuth federation, dev bypass

use lazy_static::lazy_static;
use tracing::info;

use crate::activity::{ActivityLog, NewActivity, actions};
use crate::users::{NewUser, Provider, Role, User, UserStore};
use super::error::{AuthError, AuthResult};
use super::oauth::ExternalProfile;
use super::password;

lazy_static! {
    // Verified against when a username lookup misses, so the miss path costs
    // the same as a real password check.
    static ref DUMMY_HASH: String = password::hash_password("timing-equalizer").unwrap_or_default();
}

/// Credentials for one of the three verification strategies.
#[derive(Debug, Clone)]
pub enum Credentials {
    Local { username: String, password: String },
    Federated(ExternalProfile),
    Dev { email: String, name: Option<String>, admin: bool },
}

/// A successfully verified identity, plus whether the account was created
/// by this very call (drives register-vs-login activity records).
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub newly_provisioned: bool,
}

/// Fields for local registration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterParams {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

pub struct AuthService {
    users: UserStore,
    activity: ActivityLog,
}

impl AuthService {
    pub fn new(users: UserStore, activity: ActivityLog) -> Self {
        Self { users, activity }
    }

    /// Verify credentials via the matching strategy. Every success emits
    /// exactly one activity record: `register` if the account was just
    /// provisioned, `login` otherwise.
    pub async fn authenticate(&self, credentials: Credentials) -> AuthResult<Authenticated> {
        let auth = match credentials {
            Credentials::Local { username, password } => {
                self.verify_local(&username, &password).await?
            }
            Credentials::Federated(profile) => self.verify_federated(profile).await?,
            Credentials::Dev { email, name, admin } => {
                self.verify_dev(&email, name.as_deref(), admin).await?
            }
        };

        let action = if auth.newly_provisioned {
            actions::REGISTER
        } else {
            actions::LOGIN
        };
        self.activity
            .record_best_effort(
                NewActivity::new(
                    action,
                    format!(
                        "{} signed in via {}",
                        auth.user.username,
                        auth.user.provider.as_str()
                    ),
                )
                .user(auth.user.id),
            )
            .await;

        Ok(auth)
    }

    /// Register a new local account. Conflicts on username/email surface as
    /// [`AuthError::Conflict`] so the endpoint can report "already exists".
    pub async fn register_local(&self, params: RegisterParams) -> AuthResult<User> {
        let username = params.username.trim().to_string();
        if username.is_empty() {
            return Err(AuthError::validation("username is required"));
        }
        if !params.email.contains('@') {
            return Err(AuthError::validation("a valid email is required"));
        }
        validate_password(&params.password)?;

        let password_hash = hash_blocking(params.password).await?;
        let user = self
            .users
            .create(NewUser {
                username,
                email: params.email,
                password_hash: Some(password_hash),
                name: params.name,
                ..NewUser::default()
            })
            .await?;

        info!("Registered local account '{}'", user.username);
        self.activity
            .record_best_effort(
                NewActivity::new(
                    actions::REGISTER,
                    format!("{} registered a local account", user.username),
                )
                .user(user.id),
            )
            .await;

        Ok(user)
    }

    /// Local strategy: username + password. An unknown username and a wrong
    /// password fail identically so accounts cannot be enumerated.
    async fn verify_local(&self, username: &str, password: &str) -> AuthResult<Authenticated> {
        let Some(user) = self.users.by_username(username).await? else {
            // Burn a verification anyway so the miss takes as long as a hit.
            let _ = verify_blocking(password.to_string(), DUMMY_HASH.clone()).await;
            return Err(AuthError::InvalidCredentials);
        };

        let Some(hash) = user.password_hash.clone() else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_blocking(password.to_string(), hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Authenticated {
            user,
            newly_provisioned: false,
        })
    }

    /// Federated strategy: look up by (provider, provider_id), provisioning
    /// on first sight. The upsert in the store keeps concurrent first-time
    /// callbacks down to a single row.
    async fn verify_federated(&self, profile: ExternalProfile) -> AuthResult<Authenticated> {
        let existing = self
            .users
            .by_provider_identity(profile.provider, &profile.provider_id)
            .await?;
        let newly_provisioned = existing.is_none();

        let email_fallback = profile.email.as_deref().map(email_local_part);
        let username = derive_username(
            profile
                .display_name
                .as_deref()
                .or(email_fallback.as_deref())
                .unwrap_or("user"),
        );
        let email = profile.email.clone().unwrap_or_else(|| {
            format!(
                "{}@{}.local",
                profile.provider_id,
                profile.provider.as_str()
            )
        });

        let user = self
            .users
            .provision_federated(
                profile.provider,
                &profile.provider_id,
                &username,
                &email,
                profile.display_name.as_deref(),
                profile.avatar_url.as_deref(),
            )
            .await?;

        if newly_provisioned {
            info!(
                "Provisioned {} account '{}' for external identity {}",
                user.provider.as_str(),
                user.username,
                profile.provider_id
            );
        }

        Ok(Authenticated {
            user,
            newly_provisioned,
        })
    }

    /// Dev bypass: provision or reuse a `dev` provider account with no
    /// credential check. The HTTP layer refuses to expose this in
    /// production; this method itself never runs there.
    async fn verify_dev(
        &self,
        email: &str,
        name: Option<&str>,
        admin: bool,
    ) -> AuthResult<Authenticated> {
        if !email.contains('@') {
            return Err(AuthError::validation("a valid email is required"));
        }

        if let Some(mut user) = self.users.by_provider_identity(Provider::Dev, email).await? {
            if admin && user.role != Role::Admin {
                self.users.set_role(user.id, Role::Admin).await?;
                user.role = Role::Admin;
            }
            return Ok(Authenticated {
                user,
                newly_provisioned: false,
            });
        }

        let username = derive_username(name.unwrap_or(email_local_part(email).as_str()));
        let user = self
            .users
            .create(NewUser {
                username,
                email: email.to_string(),
                name: name.map(str::to_string),
                role: Some(if admin { Role::Admin } else { Role::User }),
                provider: Some(Provider::Dev),
                provider_id: Some(email.to_string()),
                ..NewUser::default()
            })
            .await?;

        Ok(Authenticated {
            user,
            newly_provisioned: true,
        })
    }

    /// Change the password of a local account. Accounts created by other
    /// strategies get a distinct, user-actionable error.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        if user.provider != Provider::Local {
            return Err(AuthError::ProviderMismatch);
        }
        let Some(hash) = user.password_hash.clone() else {
            return Err(AuthError::ProviderMismatch);
        };

        if !verify_blocking(current_password.to_string(), hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password)?;

        let new_hash = hash_blocking(new_password.to_string()).await?;
        self.users.set_password_hash(user.id, &new_hash).await?;

        self.activity
            .record_best_effort(
                NewActivity::new(
                    actions::PASSWORD_CHANGE,
                    format!("{} changed their password", user.username),
                )
                .user(user.id),
            )
            .await;

        Ok(())
    }

    /// Promote a user to admin. The route is already admin-gated; the check
    /// here keeps the invariant even if a new caller forgets the gate.
    pub async fn promote_to_admin(&self, actor: &User, target_id: i64) -> AuthResult<User> {
        if !actor.is_admin() {
            return Err(AuthError::Forbidden);
        }

        let Some(target) = self.users.by_id(target_id).await? else {
            return Err(AuthError::not_found(format!("user {} not found", target_id)));
        };

        self.users.set_role(target.id, Role::Admin).await?;
        info!("{} promoted {} to admin", actor.username, target.username);

        self.activity
            .record_best_effort(
                NewActivity::new(
                    actions::PROMOTE_ROLE,
                    format!(
                        "{} (id {}) promoted {} (id {}) to admin",
                        actor.username, actor.id, target.username, target.id
                    ),
                )
                .user(actor.id),
            )
            .await;

        self.users
            .by_id(target.id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("user {} not found", target_id)))
    }
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < 6 {
        return Err(AuthError::validation(
            "password must be at least 6 characters",
        ));
    }
    Ok(())
}

/// Derive a username from a display name: lowercased, whitespace runs
/// collapsed to a single separator, anything exotic dropped.
pub fn derive_username(display_name: &str) -> String {
    let derived: String = display_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        .collect();
    if derived.is_empty() {
        "user".to_string()
    } else {
        derived
    }
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Password hashing is CPU-bound; keep it off the async request path.
async fn hash_blocking(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password)).await?
}

async fn verify_blocking(password: String, stored: String) -> AuthResult<bool> {
    Ok(tokio::task::spawn_blocking(move || password::verify_password(&password, &stored)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_username_lowercases_and_separates() {
        assert_eq!(derive_username("Jane Doe"), "jane-doe");
        assert_eq!(derive_username("  Ada   Lovelace "), "ada-lovelace");
        assert_eq!(derive_username("O'Brien, Pat"), "obrien-pat");
    }

    #[test]
    fn derive_username_falls_back_when_empty() {
        assert_eq!(derive_username(""), "user");
        assert_eq!(derive_username("@#$%"), "user");
    }

    #[test]
    fn email_local_part_strips_domain() {
        assert_eq!(email_local_part("alice@example.com"), "alice");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }
}
