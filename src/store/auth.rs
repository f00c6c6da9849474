//! Proctor and admin accounts
//!
//! Passwords are stored as bcrypt hashes. A successful login hands out an
//! opaque bearer token that stays valid until logout or until the account
//! is deleted.

use std::collections::HashMap;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Error;

/// Minimum password length for admin accounts
const ADMIN_MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt work factor for new hashes
const HASH_COST: u32 = 10;

/// What an account may do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Runs competitions for a college
    #[default]
    Proctor,
    /// Manages question stages
    Admin,
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Login name, unique across accounts
    #[garde(length(min = 1))]
    pub username: String,
    /// Plain-text password, only its digest is kept
    #[garde(length(min = 1))]
    pub password: String,
    /// College the account belongs to
    #[garde(length(min = 1))]
    pub college_name: String,
    /// Account role
    #[garde(skip)]
    #[serde(default)]
    pub role: Role,
}

/// A logged-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Bearer token
    pub token: String,
    /// Login name
    pub username: String,
    /// College the account belongs to
    pub college_name: String,
    /// Account role
    pub role: Role,
}

/// Public view of an account, without its password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Login name
    pub username: String,
    /// College the account belongs to
    pub college_name: String,
    /// Account role
    pub role: Role,
}

/// Changes to an existing account; empty fields are left as they are
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    /// New login name
    #[garde(length(min = 1))]
    pub username: Option<String>,
    /// New college
    #[garde(length(min = 1))]
    pub college_name: Option<String>,
}

#[derive(Debug, Clone)]
struct Account {
    college_name: String,
    role: Role,
    hash: String,
}

/// Account registry and active sessions
#[derive(Debug)]
pub struct Accounts {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, AuthSession>,
    cost: u32,
}

impl Default for Accounts {
    fn default() -> Self {
        Self::with_cost(HASH_COST)
    }
}

impl Accounts {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry hashing with the given bcrypt cost
    ///
    /// Costs outside bcrypt's `4..=31` make [`Accounts::register`] fail.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            accounts: HashMap::new(),
            sessions: HashMap::new(),
            cost,
        }
    }

    /// Registers a new account
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if a field is empty, or an admin password is
    ///   shorter than eight characters
    /// * [`Error::Conflict`] if the username is taken
    /// * [`Error::Hashing`] if the password could not be hashed
    pub fn register(&mut self, registration: &Registration) -> Result<(), Error> {
        registration.validate()?;

        if registration.role == Role::Admin
            && registration.password.chars().count() < ADMIN_MIN_PASSWORD_LENGTH
        {
            return Err(Error::Validation(format!(
                "admin passwords need at least {ADMIN_MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let username = registration.username.trim();
        if self.accounts.contains_key(username) {
            return Err(Error::Conflict(format!("user {username}")));
        }

        let hash = bcrypt::hash(&registration.password, self.cost)
            .map_err(|e| Error::Hashing(e.to_string()))?;
        self.accounts.insert(
            username.to_owned(),
            Account {
                college_name: registration.college_name.trim().to_owned(),
                role: registration.role,
                hash,
            },
        );

        log::info!("registered {:?} account {username}", registration.role);
        Ok(())
    }

    /// Checks credentials and opens a session
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] for an unknown user or a wrong
    /// password.
    pub fn login(&mut self, username: &str, password: &str) -> Result<AuthSession, Error> {
        let account = self
            .accounts
            .get(username.trim())
            .ok_or(Error::InvalidCredentials)?;

        if !bcrypt::verify(password, &account.hash).unwrap_or(false) {
            log::warn!("failed login for {username}");
            return Err(Error::InvalidCredentials);
        }

        let session = AuthSession {
            token: Uuid::new_v4().to_string(),
            username: username.trim().to_owned(),
            college_name: account.college_name.clone(),
            role: account.role,
        };
        self.sessions.insert(session.token.clone(), session.clone());

        Ok(session)
    }

    /// Looks up the session behind a token
    pub fn verify(&self, token: &str) -> Option<&AuthSession> {
        self.sessions.get(token)
    }

    /// Ends a session
    ///
    /// # Returns
    ///
    /// `true` if the token belonged to an open session
    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// All accounts, ordered by username
    pub fn list(&self) -> Vec<UserSummary> {
        self.accounts
            .iter()
            .map(|(username, account)| UserSummary {
                username: username.clone(),
                college_name: account.college_name.clone(),
                role: account.role,
            })
            .sorted_by(|a, b| a.username.cmp(&b.username))
            .collect_vec()
    }

    /// Renames an account or moves it to another college
    ///
    /// Open sessions of the account follow the change.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if a given field is empty
    /// * [`Error::NotFound`] for an unknown user
    /// * [`Error::Conflict`] if the new username is taken
    pub fn update(&mut self, username: &str, update: &UserUpdate) -> Result<UserSummary, Error> {
        update.validate()?;

        let username = username.trim();
        if !self.accounts.contains_key(username) {
            return Err(Error::NotFound(format!("user {username}")));
        }

        let new_username = update
            .username
            .as_deref()
            .map_or(username, str::trim)
            .to_owned();
        if new_username != username && self.accounts.contains_key(&new_username) {
            return Err(Error::Conflict(format!("user {new_username}")));
        }

        let Some(mut account) = self.accounts.remove(username) else {
            return Err(Error::NotFound(format!("user {username}")));
        };
        if let Some(college_name) = &update.college_name {
            college_name.trim().clone_into(&mut account.college_name);
        }

        for session in self
            .sessions
            .values_mut()
            .filter(|session| session.username == username)
        {
            session.username.clone_from(&new_username);
            session.college_name.clone_from(&account.college_name);
        }

        let summary = UserSummary {
            username: new_username.clone(),
            college_name: account.college_name.clone(),
            role: account.role,
        };
        self.accounts.insert(new_username, account);

        log::info!("updated account {username}");
        Ok(summary)
    }

    /// Deletes an account and ends its open sessions
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown user.
    pub fn delete(&mut self, username: &str) -> Result<(), Error> {
        let username = username.trim();
        if self.accounts.remove(username).is_none() {
            return Err(Error::NotFound(format!("user {username}")));
        }
        self.sessions.retain(|_, session| session.username != username);

        log::info!("deleted account {username}");
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    fn accounts() -> Accounts {
        Accounts::with_cost(TEST_COST)
    }

    fn registration(username: &str, password: &str, role: Role) -> Registration {
        Registration {
            username: username.to_owned(),
            password: password.to_owned(),
            college_name: "X".to_owned(),
            role,
        }
    }

    #[test]
    fn test_register_and_login() {
        let mut accounts = accounts();
        accounts
            .register(&registration("proctor", "pw", Role::Proctor))
            .unwrap();

        let session = accounts.login("proctor", "pw").unwrap();
        assert_eq!(session.username, "proctor");
        assert_eq!(session.college_name, "X");
        assert_eq!(accounts.verify(&session.token), Some(&session));

        assert!(accounts.logout(&session.token));
        assert_eq!(accounts.verify(&session.token), None);
        assert!(!accounts.logout(&session.token));
    }

    #[test]
    fn test_wrong_credentials() {
        let mut accounts = accounts();
        accounts
            .register(&registration("proctor", "pw", Role::Proctor))
            .unwrap();
        assert_eq!(
            accounts.login("proctor", "nope"),
            Err(Error::InvalidCredentials)
        );
        assert_eq!(
            accounts.login("nobody", "pw"),
            Err(Error::InvalidCredentials)
        );
    }

    #[test]
    fn test_registration_validation() {
        let mut accounts = accounts();
        assert!(matches!(
            accounts.register(&registration("", "pw", Role::Proctor)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            accounts.register(&registration("admin", "short", Role::Admin)),
            Err(Error::Validation(_))
        ));
        accounts
            .register(&registration("admin", "long enough", Role::Admin))
            .unwrap();
        assert!(matches!(
            accounts.register(&registration("admin", "long enough", Role::Admin)),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_passwords_are_hashed_with_bcrypt() {
        let mut accounts = accounts();
        accounts
            .register(&registration("a", "pw", Role::Proctor))
            .unwrap();
        accounts
            .register(&registration("b", "pw", Role::Proctor))
            .unwrap();

        let a = &accounts.accounts["a"].hash;
        let b = &accounts.accounts["b"].hash;
        assert!(a.starts_with("$2"));
        assert_ne!(a, b);
        assert!(!a.contains("pw"));
    }

    #[test]
    fn test_invalid_cost_is_reported() {
        let mut accounts = Accounts::with_cost(99);
        assert!(matches!(
            accounts.register(&registration("p", "pw", Role::Proctor)),
            Err(Error::Hashing(_))
        ));
        assert!(accounts.list().is_empty());
    }

    #[test]
    fn test_list_users() {
        let mut accounts = accounts();
        accounts
            .register(&registration("zed", "pw", Role::Proctor))
            .unwrap();
        accounts
            .register(&registration("admin", "long enough", Role::Admin))
            .unwrap();

        let users = accounts.list();
        assert_eq!(
            users.iter().map(|u| u.username.as_str()).collect_vec(),
            ["admin", "zed"]
        );
        assert_eq!(users[0].role, Role::Admin);
        assert_eq!(users[1].college_name, "X");
    }

    #[test]
    fn test_update_user() {
        let mut accounts = accounts();
        accounts
            .register(&registration("proctor", "pw", Role::Proctor))
            .unwrap();
        accounts
            .register(&registration("other", "pw", Role::Proctor))
            .unwrap();
        let session = accounts.login("proctor", "pw").unwrap();

        let summary = accounts
            .update(
                "proctor",
                &UserUpdate {
                    username: Some("renamed".to_owned()),
                    college_name: Some("Y".to_owned()),
                },
            )
            .unwrap();
        assert_eq!(summary.username, "renamed");
        assert_eq!(summary.college_name, "Y");

        let open = accounts.verify(&session.token).unwrap();
        assert_eq!(open.username, "renamed");
        assert_eq!(open.college_name, "Y");

        assert_eq!(
            accounts.login("proctor", "pw"),
            Err(Error::InvalidCredentials)
        );
        assert_eq!(accounts.login("renamed", "pw").unwrap().college_name, "Y");

        assert!(matches!(
            accounts.update("ghost", &UserUpdate::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            accounts.update(
                "renamed",
                &UserUpdate {
                    username: Some("other".to_owned()),
                    college_name: None,
                }
            ),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            accounts.update(
                "renamed",
                &UserUpdate {
                    username: None,
                    college_name: Some(String::new()),
                }
            ),
            Err(Error::Validation(_))
        ));
        assert_eq!(accounts.list().len(), 2);
    }

    #[test]
    fn test_delete_user_ends_sessions() {
        let mut accounts = accounts();
        accounts
            .register(&registration("proctor", "pw", Role::Proctor))
            .unwrap();
        accounts
            .register(&registration("other", "pw", Role::Proctor))
            .unwrap();
        let first = accounts.login("proctor", "pw").unwrap();
        let second = accounts.login("proctor", "pw").unwrap();
        let kept = accounts.login("other", "pw").unwrap();

        accounts.delete("proctor").unwrap();
        assert_eq!(accounts.verify(&first.token), None);
        assert_eq!(accounts.verify(&second.token), None);
        assert_eq!(accounts.verify(&kept.token), Some(&kept));
        assert_eq!(
            accounts.login("proctor", "pw"),
            Err(Error::InvalidCredentials)
        );

        assert!(matches!(
            accounts.delete("proctor"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_registration_wire_format() {
        let registration: Registration = serde_json::from_str(
            r#"{"username":"p","password":"pw","collegeName":"X"}"#,
        )
        .unwrap();
        assert_eq!(registration.role, Role::Proctor);
        assert_eq!(registration.college_name, "X");
    }
}
