//! Accounts and the current-user identity.
//!
//! Users live in the save file next to their boards. Signing in records the
//! user as the last authenticated one; that record is what board sessions
//! ask for when they need a storage key.

use crate::persist::{SaveFile, SaveFileError};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub type UserId = Uuid;

/// Who is signed in right now. "Nobody" is a valid answer; failing to
/// find out is an error, not nobody.
pub trait Identity {
    fn current_user_id(&self) -> Result<Option<UserId>, SaveFileError>;
}

impl Identity for Option<UserId> {
    fn current_user_id(&self) -> Result<Option<UserId>, SaveFileError> {
        Ok(*self)
    }
}

impl<T: Identity + ?Sized> Identity for &T {
    fn current_user_id(&self) -> Result<Option<UserId>, SaveFileError> {
        (**self).current_user_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub office_id: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub office_id: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("email already exists")]
    EmailTaken,
    #[error("office id already exists")]
    OfficeIdTaken,
    #[error("invalid office id / email or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] SaveFileError),
}

fn required(field: &'static str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField { field });
    }
    Ok(value.to_string())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// ── Accounts ───────────────────────────────────────────────────

/// The user directory and sign-in state, backed by the save file.
#[derive(Clone)]
pub struct Accounts {
    save_file: SaveFile,
}

impl Accounts {
    pub fn new(save_file: SaveFile) -> Self {
        Accounts { save_file }
    }

    /// Register a new user. Email and office id must both be unused.
    /// Does not sign the user in.
    pub fn sign_up(&self, request: SignUp) -> Result<User, AuthError> {
        let name = required("name", &request.name)?;
        let email = required("email", &request.email)?;
        let office_id = required("office id", &request.office_id)?;
        if request.password.is_empty() {
            return Err(AuthError::MissingField { field: "password" });
        }

        let users = self.save_file.list_users()?;
        if users.iter().any(|u| u.email == email) {
            warn!(%email, "sign-up rejected: email exists");
            return Err(AuthError::EmailTaken);
        }
        if users.iter().any(|u| u.office_id == office_id) {
            warn!(%office_id, "sign-up rejected: office id exists");
            return Err(AuthError::OfficeIdTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            office_id,
            password_hash: hash_password(&request.password)?,
        };
        self.save_file.save_user(&user)?;
        info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    /// Sign in by email or office id. On success the user becomes the
    /// current user until `sign_out`.
    pub fn sign_in(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let identifier = identifier.trim();
        let user = self
            .save_file
            .list_users()?
            .into_iter()
            .find(|u| {
                (u.email == identifier || u.office_id == identifier)
                    && verify_password(password, &u.password_hash)
            })
            .ok_or_else(|| {
                warn!("sign-in rejected: invalid credentials");
                AuthError::InvalidCredentials
            })?;

        self.save_file.set_current_user(Some(user.id))?;
        info!(user_id = %user.id, "user signed in");
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.save_file.set_current_user(None)?;
        info!("user signed out");
        Ok(())
    }

    pub fn is_signed_in(&self) -> Result<bool, AuthError> {
        Ok(self.save_file.current_user_id()?.is_some())
    }

    /// The signed-in user's record. A current-user id whose record has
    /// vanished reads as nobody.
    pub fn current_user(&self) -> Result<Option<User>, AuthError> {
        match self.save_file.current_user_id()? {
            Some(id) => Ok(self.save_file.get_user(id)?),
            None => Ok(None),
        }
    }
}

impl Identity for Accounts {
    fn current_user_id(&self) -> Result<Option<UserId>, SaveFileError> {
        self.save_file.current_user_id()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_accounts(name: &str) -> (Accounts, PathBuf) {
        let path = std::env::temp_dir().join(format!("kanban_auth_{name}_{}.redb", std::process::id()));
        let _ = fs::remove_file(&path);
        let sf = SaveFile::open(&path).unwrap();
        (Accounts::new(sf), path)
    }

    fn ada() -> SignUp {
        SignUp {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "hunter2".into(),
            office_id: "OF-100".into(),
        }
    }

    #[test]
    fn sign_up_then_sign_in_by_email_or_office_id() {
        let (accounts, path) = temp_accounts("signin");
        let user = accounts.sign_up(ada()).unwrap();
        assert_ne!(user.password_hash, "hunter2");
        assert!(!accounts.is_signed_in().unwrap());

        let by_email = accounts.sign_in("  ada@example.com ", "hunter2").unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(accounts.current_user_id().unwrap(), Some(user.id));

        let by_office = accounts.sign_in("OF-100", "hunter2").unwrap();
        assert_eq!(by_office.id, user.id);
        assert_eq!(accounts.current_user().unwrap(), Some(user));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (accounts, path) = temp_accounts("wrong");
        accounts.sign_up(ada()).unwrap();
        assert!(matches!(
            accounts.sign_in("ada@example.com", "nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.sign_in("someone@else", "hunter2"),
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(accounts.current_user_id().unwrap(), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn duplicate_email_or_office_id_rejected() {
        let (accounts, path) = temp_accounts("dupes");
        accounts.sign_up(ada()).unwrap();

        let same_email = SignUp { office_id: "OF-200".into(), ..ada() };
        assert!(matches!(accounts.sign_up(same_email), Err(AuthError::EmailTaken)));

        let same_office = SignUp { email: "other@example.com".into(), ..ada() };
        assert!(matches!(accounts.sign_up(same_office), Err(AuthError::OfficeIdTaken)));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn blank_fields_rejected() {
        let (accounts, path) = temp_accounts("blank");
        let no_name = SignUp { name: "  ".into(), ..ada() };
        assert!(matches!(
            accounts.sign_up(no_name),
            Err(AuthError::MissingField { field: "name" })
        ));
        let no_password = SignUp { password: String::new(), ..ada() };
        assert!(matches!(
            accounts.sign_up(no_password),
            Err(AuthError::MissingField { field: "password" })
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn sign_out_forgets_current_user() {
        let (accounts, path) = temp_accounts("signout");
        accounts.sign_up(ada()).unwrap();
        accounts.sign_in("OF-100", "hunter2").unwrap();
        accounts.sign_out().unwrap();
        assert_eq!(accounts.current_user_id().unwrap(), None);
        assert_eq!(accounts.current_user().unwrap(), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn fixed_identities() {
        let id = Uuid::new_v4();
        assert_eq!(Some(id).current_user_id().unwrap(), Some(id));
        assert_eq!(None::<UserId>.current_user_id().unwrap(), None);
    }
}
