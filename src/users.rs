//! Phone login, role selection, and the persisted session.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, io::ErrorKind, path::PathBuf};
use tokio::fs;

use crate::error::{BookingError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Shipper,
    Driver,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserRole::Shipper => "shipper",
            UserRole::Driver => "driver",
            UserRole::Admin => "admin",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Normalised, e.g. `+923001234567`.
    pub phone: String,
    /// `None` until a new user picks one.
    pub role: Option<UserRole>,
    pub status: UserStatus,
    pub registered_at: DateTime<Utc>,
}

/// Normalise a Pakistani mobile number to `+923XXXXXXXXX`.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let local = compact
        .strip_prefix("+92")
        .or_else(|| compact.strip_prefix('0'))
        .unwrap_or("");
    let valid = local.len() == 10
        && local.starts_with('3')
        && local.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(BookingError::InvalidPhone(raw.trim().to_string()));
    }
    Ok(format!("+92{local}"))
}

/// Lookup and persistence of user records.
pub trait UserStore: Send + Sync {
    fn find_by_phone(&self, phone: &str) -> Option<User>;
    fn upsert(&mut self, user: User);
    /// Every user, oldest registration first.
    fn list(&self) -> Vec<User>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryUserStore {
    users: HashMap<String, User>,
}

impl InMemoryUserStore {
    /// Store preloaded with the demo accounts, one of them suspended.
    pub fn seeded() -> Self {
        let at = |y, m, d, h, min| {
            Utc.with_ymd_and_hms(y, m, d, h, min, 0)
                .single()
                .unwrap_or_default()
        };
        let mut store = Self::default();
        use UserRole::*;
        use UserStatus::*;
        for (id, phone, role, status, registered_at) in [
            ("user_admin", "+923001111111", Admin, Active, at(2023, 9, 28, 8, 0)),
            ("user_shipper_1", "+923001234567", Shipper, Active, at(2023, 10, 1, 10, 0)),
            ("user_driver_1", "+923339876543", Driver, Active, at(2023, 10, 2, 11, 30)),
            ("user_shipper_2", "+923215554433", Shipper, Suspended, at(2023, 10, 3, 14, 15)),
            ("user_driver_2", "+923118887766", Driver, Active, at(2023, 10, 4, 9, 5)),
            ("user_driver_3", "+923451122334", Driver, Active, at(2023, 10, 5, 16, 45)),
        ] {
            store.upsert(User {
                id: id.into(),
                phone: phone.into(),
                role: Some(role),
                status,
                registered_at,
            });
        }
        store
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_phone(&self, phone: &str) -> Option<User> {
        self.users.get(phone).cloned()
    }

    fn upsert(&mut self, user: User) {
        self.users.insert(user.phone.clone(), user);
    }

    fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        users
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Existing,
    /// Unknown number; the user must pick a role before being stored.
    NewUser,
}

/// Currently logged-in user on top of a store.
pub struct Session<S: UserStore> {
    store: S,
    current: Option<User>,
}

impl<S: UserStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn login_with_phone(&mut self, phone: &str, now: DateTime<Utc>) -> Result<LoginOutcome> {
        let phone = normalize_phone(phone)?;
        if let Some(user) = self.store.find_by_phone(&phone) {
            // Suspended accounts stay logged out.
            if user.status == UserStatus::Suspended {
                tracing::warn!("login refused for suspended {}", user.id);
                return Err(BookingError::AccountSuspended(phone));
            }
            tracing::info!("login {} as {:?}", user.id, user.role);
            self.current = Some(user);
            return Ok(LoginOutcome::Existing);
        }
        tracing::info!("new user {phone}, awaiting role selection");
        self.current = Some(User {
            id: format!("user_{}", now.timestamp_millis()),
            phone,
            role: None,
            status: UserStatus::Active,
            registered_at: now,
        });
        Ok(LoginOutcome::NewUser)
    }

    /// Assign a role to a user who has none yet, and store them.
    pub fn select_role(&mut self, role: UserRole) -> Result<&User> {
        let user = self.current.as_mut().ok_or(BookingError::NotLoggedIn)?;
        if user.role.is_some() {
            return Err(BookingError::RoleAlreadySet);
        }
        user.role = Some(role);
        self.store.upsert(user.clone());
        tracing::info!("user {} registered as {role}", user.id);
        Ok(user)
    }

    /// Adopt a user restored from disk if the store still knows the phone
    /// and the account is active. The stored record wins over the saved one.
    pub fn restore(&mut self, user: User) -> bool {
        match self.store.find_by_phone(&user.phone) {
            Some(stored) if stored.status == UserStatus::Active => {
                self.current = Some(stored);
                true
            }
            Some(stored) => {
                tracing::warn!("ignoring saved session for suspended {}", stored.id);
                false
            }
            None => {
                tracing::warn!("ignoring saved session for unknown phone {}", user.phone);
                false
            }
        }
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            tracing::info!("logout {}", user.id);
        }
    }

    pub fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// Every known user, for the admin console.
    pub fn users(&self) -> Vec<User> {
        self.store.list()
    }

    /// Suspend an active user or reactivate a suspended one. Admin only;
    /// admins cannot suspend themselves.
    pub fn toggle_user_status(&mut self, user_id: &str) -> Result<User> {
        let admin = match &self.current {
            Some(user) if user.role == Some(UserRole::Admin) => user.id.clone(),
            Some(_) => return Err(BookingError::NotPermitted("only admins manage users")),
            None => return Err(BookingError::NotLoggedIn),
        };
        if admin == user_id {
            return Err(BookingError::NotPermitted("admins cannot suspend themselves"));
        }
        let mut user = self
            .store
            .list()
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or(BookingError::NotPermitted("no such user"))?;

        user.status = match user.status {
            UserStatus::Active => UserStatus::Suspended,
            UserStatus::Suspended => UserStatus::Active,
        };
        self.store.upsert(user.clone());
        tracing::info!("{admin} set {} to {}", user.id, user.status);
        Ok(user)
    }

    /// Id to book loads under. Requires a logged-in shipper.
    pub fn shipper_id(&self) -> Result<&str> {
        match &self.current {
            Some(user) if user.role == Some(UserRole::Shipper) => Ok(&user.id),
            _ => Err(BookingError::NotLoggedIn),
        }
    }
}

/// The logged-in user saved as JSON (session.json).
#[derive(Clone, Debug)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the saved user. A corrupt file is deleted and treated as absent.
    pub async fn load(&self) -> anyhow::Result<Option<User>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&data) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!("discarding corrupt {}: {e}", self.path.display());
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Only users with a role are worth persisting.
    pub async fn save(&self, user: &User) -> anyhow::Result<()> {
        if user.role.is_none() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(user)?).await?;
        Ok(())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("0300-1234567").unwrap(), "+923001234567");
        assert_eq!(normalize_phone("+92 300 123 4567").unwrap(), "+923001234567");
        for bad in ["", "12345", "+924001234567", "0300123456", "03001234567x"] {
            assert!(
                matches!(normalize_phone(bad), Err(BookingError::InvalidPhone(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_existing_user_logs_in() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        let outcome = session.login_with_phone("03001234567", Utc::now()).unwrap();
        assert_eq!(outcome, LoginOutcome::Existing);
        assert_eq!(session.shipper_id().unwrap(), "user_shipper_1");
        assert_eq!(
            session.select_role(UserRole::Driver).unwrap_err(),
            BookingError::RoleAlreadySet
        );
    }

    #[test]
    fn test_new_user_picks_role_once() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        let outcome = session.login_with_phone("+923215550000", Utc::now()).unwrap();
        assert_eq!(outcome, LoginOutcome::NewUser);
        assert!(session.shipper_id().is_err());

        session.select_role(UserRole::Shipper).unwrap();
        assert!(session.shipper_id().unwrap().starts_with("user_"));

        session.logout();
        assert!(session.current().is_none());
        assert_eq!(
            session.login_with_phone("03215550000", Utc::now()).unwrap(),
            LoginOutcome::Existing
        );
    }

    #[test]
    fn test_select_role_requires_login() {
        let mut session = Session::new(InMemoryUserStore::default());
        assert_eq!(
            session.select_role(UserRole::Admin).unwrap_err(),
            BookingError::NotLoggedIn
        );
    }

    #[test]
    fn test_restore_ignores_unknown_phone() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        let stranger = User {
            id: "user_1".into(),
            phone: "+923009999999".into(),
            role: Some(UserRole::Shipper),
            status: UserStatus::Active,
            registered_at: Utc::now(),
        };
        assert!(!session.restore(stranger));
        assert!(session.current().is_none());

        let known = InMemoryUserStore::seeded()
            .find_by_phone("+923339876543")
            .unwrap();
        assert!(session.restore(known));
        assert_eq!(session.current().unwrap().role, Some(UserRole::Driver));
    }

    #[test]
    fn test_suspended_user_cannot_log_in() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        assert_eq!(
            session.login_with_phone("0321-5554433", Utc::now()).unwrap_err(),
            BookingError::AccountSuspended("+923215554433".into())
        );
        assert!(session.current().is_none());
    }

    #[test]
    fn test_admin_toggles_user_status() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        session.login_with_phone("03001111111", Utc::now()).unwrap();

        let user = session.toggle_user_status("user_driver_1").unwrap();
        assert_eq!(user.status, UserStatus::Suspended);
        let user = session.toggle_user_status("user_shipper_2").unwrap();
        assert_eq!(user.status, UserStatus::Active);

        assert!(matches!(
            session.toggle_user_status("user_admin"),
            Err(BookingError::NotPermitted(_))
        ));
        assert!(session.toggle_user_status("user_nobody").is_err());

        session.logout();
        assert!(session.login_with_phone("03339876543", Utc::now()).is_err());
        assert_eq!(
            session.login_with_phone("03215554433", Utc::now()).unwrap(),
            LoginOutcome::Existing
        );
    }

    #[test]
    fn test_only_admin_toggles_status() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        assert_eq!(
            session.toggle_user_status("user_driver_1").unwrap_err(),
            BookingError::NotLoggedIn
        );
        session.login_with_phone("03001234567", Utc::now()).unwrap();
        assert!(matches!(
            session.toggle_user_status("user_driver_1"),
            Err(BookingError::NotPermitted(_))
        ));
    }

    #[test]
    fn test_users_listed_by_registration() {
        let session = Session::new(InMemoryUserStore::seeded());
        let ids: Vec<String> = session.users().into_iter().map(|u| u.id).collect();
        assert_eq!(
            ids,
            [
                "user_admin",
                "user_shipper_1",
                "user_driver_1",
                "user_shipper_2",
                "user_driver_2",
                "user_driver_3"
            ]
        );
    }

    #[test]
    fn test_restore_refuses_suspended_account() {
        let mut session = Session::new(InMemoryUserStore::seeded());
        let suspended = InMemoryUserStore::seeded()
            .find_by_phone("+923215554433")
            .unwrap();
        let mut saved = suspended.clone();
        saved.status = UserStatus::Active;
        assert!(!session.restore(saved));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_session_file_roundtrip_and_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("nested/session.json"));
        assert!(file.load().await.unwrap().is_none());

        let user = InMemoryUserStore::seeded()
            .find_by_phone("+923001234567")
            .unwrap();
        file.save(&user).await.unwrap();
        assert_eq!(file.load().await.unwrap(), Some(user));

        std::fs::write(dir.path().join("nested/session.json"), b"{not json").unwrap();
        assert!(file.load().await.unwrap().is_none());
        assert!(!dir.path().join("nested/session.json").exists());
    }

    #[tokio::test]
    async fn test_session_file_skips_roleless_user() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let mut session = Session::new(InMemoryUserStore::default());
        session.login_with_phone("03001112222", Utc::now()).unwrap();
        file.save(session.current().unwrap()).await.unwrap();
        assert!(file.load().await.unwrap().is_none());
    }
}
