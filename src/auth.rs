//! Local account registration and password login with bcrypt.
//!
//! Accounts live in the store's `users` collection. The login session is a
//! small set of persisted flags (category "session") so a restart keeps
//! the operator signed in until the session ages out. Failed attempts are
//! tracked in category "auth" and lock login after `MAX_FAILED_ATTEMPTS`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{PosError, PosResult};
use crate::store::PosStore;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_FAILED_ATTEMPTS: u32 = 5;
const LOCKOUT_MINUTES: i64 = 15;
const SESSION_MAX_DURATION_HOURS: i64 = 12;
const MIN_PASSWORD_LEN: usize = 6;

const AUTH_CATEGORY: &str = "auth";
const SESSION_CATEGORY: &str = "session";
const LOCKOUT_ATTEMPTS_KEY: &str = "lockout_attempts";
const LOCKOUT_LAST_ATTEMPT_KEY: &str = "lockout_last_attempt";
const SESSION_LOGGED_IN_KEY: &str = "is_logged_in";
const SESSION_USERNAME_KEY: &str = "username";
const SESSION_ROLE_KEY: &str = "role";
const SESSION_LOGIN_TIME_KEY: &str = "login_time";

/// Built-in account accepted until someone registers "admin".
const DEFAULT_ADMIN: &str = "admin";

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

const ADMIN_PERMISSIONS: &[&str] = &[
    "take_orders",
    "hold_orders",
    "manage_advances",
    "manage_menu",
    "view_reports",
    "refund_orders",
];

const STAFF_PERMISSIONS: &[&str] = &["take_orders", "hold_orders", "manage_advances"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Staff => STAFF_PERMISSIONS,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            other => Err(PosError::validation(format!("Unknown role: {other}"))),
        }
    }
}

/// A registered account as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The signed-in operator, as returned to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub login_time: DateTime<Utc>,
}

impl Session {
    fn new(username: &str, role: Role, login_time: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            role,
            permissions: role.permissions().iter().map(|p| p.to_string()).collect(),
            login_time,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.login_time >= Duration::hours(SESSION_MAX_DURATION_HOURS)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

struct LockoutEntry {
    attempts: u32,
    last_attempt: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Lockout helpers
// ---------------------------------------------------------------------------

fn load_lockout(store: &dyn PosStore) -> PosResult<LockoutEntry> {
    let attempts = store
        .get_setting(AUTH_CATEGORY, LOCKOUT_ATTEMPTS_KEY)?
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let last_attempt = store
        .get_setting(AUTH_CATEGORY, LOCKOUT_LAST_ATTEMPT_KEY)?
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Ok(LockoutEntry {
        attempts,
        last_attempt,
    })
}

fn persist_lockout(store: &dyn PosStore, lockout: &LockoutEntry) -> PosResult<()> {
    store.set_setting(
        AUTH_CATEGORY,
        LOCKOUT_ATTEMPTS_KEY,
        &lockout.attempts.to_string(),
    )?;
    store.set_setting(
        AUTH_CATEGORY,
        LOCKOUT_LAST_ATTEMPT_KEY,
        &lockout.last_attempt.to_rfc3339(),
    )
}

fn check_lockout(lockout: &LockoutEntry, now: DateTime<Utc>) -> PosResult<()> {
    if lockout.attempts >= MAX_FAILED_ATTEMPTS {
        let elapsed = now - lockout.last_attempt;
        if elapsed < Duration::minutes(LOCKOUT_MINUTES) {
            return Err(PosError::LockedOut {
                minutes_left: (LOCKOUT_MINUTES - elapsed.num_minutes()).max(1),
            });
        }
    }
    Ok(())
}

fn record_failure(store: &dyn PosStore, mut lockout: LockoutEntry, reason: &str) -> PosError {
    lockout.attempts += 1;
    lockout.last_attempt = Utc::now();
    warn!(attempts = lockout.attempts, "failed login attempt");
    if let Err(e) = persist_lockout(store, &lockout) {
        warn!("could not persist lockout state: {e}");
    }
    PosError::Auth(reason.to_string())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Create a local account.
pub fn register(store: &dyn PosStore, form: Registration) -> PosResult<UserAccount> {
    let username = form.username.trim().to_string();
    let full_name = form.full_name.trim().to_string();
    if username.is_empty() || full_name.is_empty() || form.role.trim().is_empty() {
        return Err(PosError::validation(
            "Please fill in all required fields",
        ));
    }
    let role: Role = form.role.parse()?;
    if form.password != form.confirm_password {
        return Err(PosError::validation("Passwords do not match"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PosError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let password_hash = bcrypt::hash(&form.password, HASH_COST)
        .map_err(|e| PosError::Auth(format!("hash password: {e}")))?;
    let account = UserAccount {
        username,
        full_name,
        role,
        email: form.email.filter(|v| !v.trim().is_empty()),
        phone: form.phone.filter(|v| !v.trim().is_empty()),
        password_hash,
        registered_at: Utc::now(),
    };
    store.insert_user(&account)?;
    info!(username = %account.username, role = %account.role, "Account registered");
    Ok(account)
}

/// Verify credentials and persist the session flags.
pub fn login(
    store: &dyn PosStore,
    username: &str,
    password: &str,
    role: &str,
) -> PosResult<Session> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() || role.trim().is_empty() {
        return Err(PosError::validation("Please fill in all fields"));
    }
    let role: Role = role.parse()?;

    let now = Utc::now();
    let lockout = load_lockout(store)?;
    check_lockout(&lockout, now)?;

    match store.get_user(username)? {
        Some(account) => {
            if !bcrypt::verify(password, &account.password_hash).unwrap_or(false) {
                return Err(record_failure(store, lockout, "invalid password"));
            }
            if account.role != role {
                return Err(record_failure(
                    store,
                    lockout,
                    "selected role doesn't match this account",
                ));
            }
        }
        None if username == DEFAULT_ADMIN && password == DEFAULT_ADMIN && role == Role::Admin => {
            info!("Login with built-in admin account");
        }
        None => return Err(record_failure(store, lockout, "user not found")),
    }

    persist_lockout(
        store,
        &LockoutEntry {
            attempts: 0,
            last_attempt: now,
        },
    )?;

    let session = Session::new(username, role, now);
    store.set_setting(SESSION_CATEGORY, SESSION_LOGGED_IN_KEY, "true")?;
    store.set_setting(SESSION_CATEGORY, SESSION_USERNAME_KEY, username)?;
    store.set_setting(SESSION_CATEGORY, SESSION_ROLE_KEY, role.as_str())?;
    store.set_setting(
        SESSION_CATEGORY,
        SESSION_LOGIN_TIME_KEY,
        &now.to_rfc3339(),
    )?;
    info!(username = %username, role = %role, "Logged in");
    Ok(session)
}

/// Clear the persisted session flags.
pub fn logout(store: &dyn PosStore) -> PosResult<()> {
    for key in [
        SESSION_LOGGED_IN_KEY,
        SESSION_USERNAME_KEY,
        SESSION_ROLE_KEY,
        SESSION_LOGIN_TIME_KEY,
    ] {
        store.delete_setting(SESSION_CATEGORY, key)?;
    }
    info!("Logged out");
    Ok(())
}

/// The persisted session, if any and not expired. Expired sessions are
/// cleared as a side effect.
pub fn current_session(store: &dyn PosStore) -> PosResult<Option<Session>> {
    let logged_in = store
        .get_setting(SESSION_CATEGORY, SESSION_LOGGED_IN_KEY)?
        .map(|v| v == "true")
        .unwrap_or(false);
    if !logged_in {
        return Ok(None);
    }
    let username = store.get_setting(SESSION_CATEGORY, SESSION_USERNAME_KEY)?;
    let role = store
        .get_setting(SESSION_CATEGORY, SESSION_ROLE_KEY)?
        .and_then(|r| r.parse::<Role>().ok());
    let login_time = store
        .get_setting(SESSION_CATEGORY, SESSION_LOGIN_TIME_KEY)?
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let (Some(username), Some(role), Some(login_time)) = (username, role, login_time) else {
        warn!("Incomplete session flags, clearing");
        logout(store)?;
        return Ok(None);
    };

    let session = Session::new(&username, role, login_time);
    if session.is_expired(Utc::now()) {
        info!(username = %username, "Session expired");
        logout(store)?;
        return Ok(None);
    }
    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_store::JsonStore;

    fn form(username: &str, password: &str) -> Registration {
        Registration {
            username: username.into(),
            full_name: "Meera Shah".into(),
            role: "staff".into(),
            password: password.into(),
            confirm_password: password.into(),
            email: None,
            phone: Some("".into()),
        }
    }

    #[test]
    fn register_then_login() {
        let store = JsonStore::in_memory();
        let account = register(&store, form("meera", "sundae1")).expect("register");
        assert_eq!(account.role, Role::Staff);
        assert_eq!(account.phone, None);
        assert_ne!(account.password_hash, "sundae1");

        let session = login(&store, "meera", "sundae1", "staff").expect("login");
        assert_eq!(session.username, "meera");
        assert!(session.has_permission("take_orders"));
        assert!(!session.has_permission("view_reports"));

        let current = current_session(&store).unwrap().expect("session persisted");
        assert_eq!(current.username, "meera");

        logout(&store).unwrap();
        assert!(current_session(&store).unwrap().is_none());
    }

    #[test]
    fn registration_validation() {
        let store = JsonStore::in_memory();
        let mut short = form("ravi", "abc");
        assert!(matches!(
            register(&store, short.clone()),
            Err(PosError::Validation(_))
        ));
        short.password = "abcdef".into();
        assert!(register(&store, short).is_err(), "confirmation mismatch");

        register(&store, form("ravi", "abcdef")).unwrap();
        assert!(
            register(&store, form("ravi", "ghijkl")).is_err(),
            "duplicate username"
        );
    }

    #[test]
    fn wrong_role_is_rejected() {
        let store = JsonStore::in_memory();
        register(&store, form("meera", "sundae1")).unwrap();
        assert!(matches!(
            login(&store, "meera", "sundae1", "admin"),
            Err(PosError::Auth(_))
        ));
    }

    #[test]
    fn built_in_admin_works_until_registered() {
        let store = JsonStore::in_memory();
        let session = login(&store, "admin", "admin", "admin").expect("default admin");
        assert!(session.has_permission("manage_menu"));

        let mut admin = form("admin", "s3cret!");
        admin.role = "admin".into();
        register(&store, admin).unwrap();
        assert!(login(&store, "admin", "admin", "admin").is_err());
        assert!(login(&store, "admin", "s3cret!", "admin").is_ok());
    }

    #[test]
    fn lockout_after_repeated_failures() {
        let store = JsonStore::in_memory();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert!(matches!(
                login(&store, "ghost", "nope", "staff"),
                Err(PosError::Auth(_))
            ));
        }
        assert!(matches!(
            login(&store, "admin", "admin", "admin"),
            Err(PosError::LockedOut { .. })
        ));
    }

    #[test]
    fn expired_session_is_cleared() {
        let store = JsonStore::in_memory();
        login(&store, "admin", "admin", "admin").unwrap();
        let stale = Utc::now() - Duration::hours(SESSION_MAX_DURATION_HOURS + 1);
        store
            .set_setting(SESSION_CATEGORY, SESSION_LOGIN_TIME_KEY, &stale.to_rfc3339())
            .unwrap();
        assert!(current_session(&store).unwrap().is_none());
        assert_eq!(
            store
                .get_setting(SESSION_CATEGORY, SESSION_LOGGED_IN_KEY)
                .unwrap(),
            None
        );
    }
}
