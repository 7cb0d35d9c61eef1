use log::info;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::storage::{ StorageError, UserStorage };

pub const LOGIN_SUCCESS: &str = "Login successful. Welcome back to Medico Assistant.";
pub const SIGNUP_SUCCESS: &str = "Your email has been successfully registered. Accessing Medico...";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("This email is not registered. Please Sign Up to continue.")]
    NotRegistered,
    #[error("This email is already registered. Please Login.")]
    AlreadyRegistered,
    #[error("{0}")]
    Storage(#[from] StorageError),
}

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").ok());

/// True when the input contains `local@domain.tld` somewhere.
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Client-side sign in: an email is "authenticated" when it is in the
/// registered list. There are no passwords.
#[derive(Clone)]
pub struct Auth {
    storage: UserStorage,
}

impl Auth {
    pub fn new(storage: UserStorage) -> Self {
        Self { storage }
    }

    pub fn login(&self, email: &str) -> Result<String, AuthError> {
        let email = email.trim();
        if !validate_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if !self.storage.verify_user(email) {
            return Err(AuthError::NotRegistered);
        }
        self.storage.set_current_user(Some(email))?;
        info!("User logged in: {}", email);
        Ok(email.to_string())
    }

    pub fn sign_up(&self, email: &str) -> Result<String, AuthError> {
        let email = email.trim();
        if !validate_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if !self.storage.register_user(email)? {
            return Err(AuthError::AlreadyRegistered);
        }
        self.storage.set_current_user(Some(email))?;
        info!("Registered new user: {}", email);
        Ok(email.to_string())
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.storage.set_current_user(None)?;
        Ok(())
    }

    pub fn current_user(&self) -> Option<String> {
        self.storage.current_user()
    }
}
