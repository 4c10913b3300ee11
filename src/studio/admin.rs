//! Admin accounts and cookie sessions.
//!
//! A successful [`AdminDesk::login`] issues a token that the front end stores
//! in the `admin_token` cookie. The token is `user.expiry.nonce.signature`,
//! signed with HMAC-SHA256 under a per-desk secret, so its expiry cannot be
//! altered. Every protected operation elsewhere in the desk takes an
//! [`AdminSession`], which only [`AdminDesk::verify`] can produce.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{self, Write};

use bevy::log::{info, warn};
use chrono::{DateTime, Duration, Utc};
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use sha2::Sha256;

use super::error::{AuthFailure, StudioError};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "admin_token";
/// Session lifetime.
pub const SESSION_TTL_HOURS: i64 = 24;
/// Login page; never guarded.
pub const LOGIN_PATH: &str = "/admin/login";

const GUARDED_PREFIX: &str = "/admin";
const BOOTSTRAP_USERNAME: &str = "admin";
const NONCE_BYTES: usize = 16;

type TokenMac = Hmac<Sha256>;

/// Signed session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Token text as stored in the cookie.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Account privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    /// Created by the first-login bootstrap; may add staff.
    SuperAdmin,
    /// Regular desk account.
    Staff,
}

#[derive(Debug, Clone)]
struct AdminAccount {
    password: String,
    role: AdminRole,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    username: String,
    role: AdminRole,
    expires_at: DateTime<Utc>,
}

/// Proof that a request carries a live admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    username: String,
    role: AdminRole,
    expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Logged-in account name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Logged-in account role.
    pub fn role(&self) -> AdminRole {
        self.role
    }

    /// When the session stops being accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// Sent on top-level navigation from other sites.
    Lax,
    /// Never sent cross-site.
    Strict,
}

/// `Set-Cookie` attributes for the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: &'static str,
    /// Token, or empty when clearing.
    pub value: String,
    /// Hidden from page scripts.
    pub http_only: bool,
    /// Only sent over HTTPS.
    pub secure: bool,
    /// Cookie path.
    pub path: &'static str,
    /// Cross-site policy.
    pub same_site: SameSite,
    /// Lifetime; zero clears the cookie.
    pub max_age: Duration,
}

impl SessionCookie {
    /// Cookie storing a freshly issued token.
    pub fn issue(token: &SessionToken, secure: bool) -> Self {
        Self {
            name: SESSION_COOKIE,
            value: token.as_str().to_owned(),
            http_only: true,
            secure,
            path: "/",
            same_site: SameSite::Lax,
            max_age: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    /// Cookie that makes the browser drop the session.
    pub fn cleared() -> Self {
        Self {
            name: SESSION_COOKIE,
            value: String::new(),
            http_only: true,
            secure: false,
            path: "/",
            same_site: SameSite::Lax,
            max_age: Duration::zero(),
        }
    }

    /// `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut header = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name,
            self.value,
            self.path,
            self.max_age.num_seconds()
        );
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header.push_str(match self.same_site {
            SameSite::Lax => "; SameSite=Lax",
            SameSite::Strict => "; SameSite=Strict",
        });
        header
    }
}

/// Outcome of guarding an admin route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Serve the page.
    Allow,
    /// Send the browser to [`LOGIN_PATH`].
    RedirectToLogin {
        /// Also send [`SessionCookie::cleared`].
        clear_cookie: bool,
    },
}

/// Admin accounts and live sessions.
pub struct AdminDesk {
    accounts: HashMap<String, AdminAccount>,
    sessions: HashMap<SessionToken, SessionRecord>,
    secret: Key<TokenMac>,
    rng: StdRng,
}

impl Default for AdminDesk {
    fn default() -> Self {
        let mut rng = StdRng::from_entropy();
        let mut secret = Key::<TokenMac>::default();
        rng.fill_bytes(&mut secret);
        Self {
            accounts: HashMap::new(),
            sessions: HashMap::new(),
            secret,
            rng,
        }
    }
}

impl fmt::Debug for AdminDesk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminDesk")
            .field("accounts", &self.accounts.len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl AdminDesk {
    /// Empty desk; the first `admin` login creates the super admin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a staff account. Only a super admin may do this.
    pub fn add_staff(
        &mut self,
        by: &AdminSession,
        username: &str,
        password: &str,
    ) -> Result<(), StudioError> {
        if by.role != AdminRole::SuperAdmin {
            return Err(StudioError::Forbidden("only the super admin can add accounts"));
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(StudioError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(StudioError::MissingField("password"));
        }
        match self.accounts.entry(username.to_owned()) {
            Entry::Occupied(_) => {
                return Err(StudioError::Conflict(format!(
                    "account {username} already exists"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(AdminAccount {
                    password: password.to_owned(),
                    role: AdminRole::Staff,
                });
            }
        }
        info!("studio: {} added staff account {username}", by.username);
        Ok(())
    }

    /// Exchanges credentials for a session token valid for
    /// [`SESSION_TTL_HOURS`].
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, StudioError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthFailure::MissingCredentials.into());
        }

        if self.accounts.is_empty() && username == BOOTSTRAP_USERNAME {
            self.accounts.insert(
                username.to_owned(),
                AdminAccount {
                    password: password.to_owned(),
                    role: AdminRole::SuperAdmin,
                },
            );
            info!("studio: created initial admin account");
        }

        let Some(account) = self.accounts.get(username) else {
            warn!("studio: login rejected for unknown account");
            return Err(AuthFailure::InvalidCredentials.into());
        };
        if account.password != password {
            warn!("studio: login rejected for {username}");
            return Err(AuthFailure::InvalidCredentials.into());
        }
        let role = account.role;

        self.prune_expired(now);
        let expires_at = now + Duration::hours(SESSION_TTL_HOURS);
        let token = self.issue_token(username, expires_at);
        self.sessions.insert(
            token.clone(),
            SessionRecord {
                username: username.to_owned(),
                role,
                expires_at,
            },
        );
        Ok(token)
    }

    fn mac_for(&self, payload: &str) -> TokenMac {
        let mut mac = <TokenMac as KeyInit>::new(&self.secret);
        mac.update(payload.as_bytes());
        mac
    }

    fn issue_token(&mut self, username: &str, expires_at: DateTime<Utc>) -> SessionToken {
        let mut nonce = [0u8; NONCE_BYTES];
        self.rng.fill_bytes(&mut nonce);
        let payload = format!("{username}.{}.{}", expires_at.timestamp(), to_hex(&nonce));
        let signature = to_hex(&self.mac_for(&payload).finalize().into_bytes());
        SessionToken(format!("{payload}.{signature}"))
    }

    /// Checks the signature and returns the expiry the token carries.
    fn signed_expiry(&self, token: &str) -> Result<DateTime<Utc>, AuthFailure> {
        let (payload, signature) = token.rsplit_once('.').ok_or(AuthFailure::InvalidSession)?;
        let signature = from_hex(signature).ok_or(AuthFailure::InvalidSession)?;
        self.mac_for(payload)
            .verify_slice(&signature)
            .map_err(|_| AuthFailure::InvalidSession)?;

        let (claims, _nonce) = payload.rsplit_once('.').ok_or(AuthFailure::InvalidSession)?;
        let (_username, expiry) = claims.rsplit_once('.').ok_or(AuthFailure::InvalidSession)?;
        expiry
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(AuthFailure::InvalidSession)
    }

    /// Checks a token from the cookie: signature first, then the expiry it
    /// carries, then that it was not logged out. Expired sessions are dropped.
    pub fn verify(
        &mut self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AdminSession, StudioError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthFailure::MissingCredentials.into()),
        };
        let expires_at = self.signed_expiry(token)?;
        let token = SessionToken(token.to_owned());
        if now >= expires_at {
            self.sessions.remove(&token);
            return Err(AuthFailure::SessionExpired.into());
        }
        let Some(record) = self.sessions.get(&token) else {
            return Err(AuthFailure::InvalidSession.into());
        };
        Ok(AdminSession {
            username: record.username.clone(),
            role: record.role,
            expires_at: record.expires_at,
        })
    }

    /// Ends a session. Returns whether it was live.
    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions
            .remove(&SessionToken(token.to_owned()))
            .is_some()
    }

    /// Decides whether `path` may be served for the cookie `token`.
    ///
    /// Everything under `/admin` except the login page needs a live session.
    /// A missing cookie only redirects; a bad or expired one is also cleared.
    pub fn guard(&mut self, path: &str, token: Option<&str>, now: DateTime<Utc>) -> RouteDecision {
        if !path.starts_with(GUARDED_PREFIX) || path.starts_with(LOGIN_PATH) {
            return RouteDecision::Allow;
        }
        match self.verify(token, now) {
            Ok(_) => RouteDecision::Allow,
            Err(StudioError::Auth(AuthFailure::MissingCredentials)) => {
                RouteDecision::RedirectToLogin {
                    clear_cookie: false,
                }
            }
            Err(_) => RouteDecision::RedirectToLogin { clear_cookie: true },
        }
    }

    /// Drops every session past its expiry. Returns how many went.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| now < record.expires_at);
        before - self.sessions.len()
    }

    /// Live session count.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

fn from_hex(text: &str) -> Option<Vec<u8>> {
    if !text.is_ascii() || !text.len().is_multiple_of(2) {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}
