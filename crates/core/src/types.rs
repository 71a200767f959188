//! Validated value types for finetune requests.
//!
//! Every constructor checks its input once; holders of these types can rely
//! on the invariants without re-validating.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static RE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_-]+$").ok());

fn is_plain_name(v: &str) -> bool {
    RE_NAME.as_ref().is_some_and(|re| re.is_match(v))
}

/// Name of the model used when a request does not specify one.
pub const DEFAULT_MODEL: &str = "wukong";

/// Owning account of a finetune.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Account(String);

impl Account {
    /// Validate and wrap an account name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAccount` for empty names, `root`, or names with
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(v: impl Into<String>) -> Result<Self> {
        let v = v.into();
        if v.is_empty() || v.eq_ignore_ascii_case("root") || !is_plain_name(&v) {
            return Err(Error::invalid_account(v));
        }
        Ok(Self(v))
    }

    /// The account name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Account {
    type Error = Error;

    fn try_from(v: String) -> Result<Self> {
        Self::new(v)
    }
}

impl From<Account> for String {
    fn from(a: Account) -> Self {
        a.0
    }
}

/// Display name of a finetune job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinetuneName(String);

impl FinetuneName {
    const MIN: usize = 3;
    const MAX: usize = 30;

    /// Validate a finetune name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NameLength` when the name is not 3..=30 bytes long and
    /// `Error::InvalidName` for characters outside `[a-zA-Z0-9_-]`.
    pub fn new(v: impl Into<String>) -> Result<Self> {
        let v = v.into();
        if !(Self::MIN..=Self::MAX).contains(&v.len()) {
            return Err(Error::NameLength {
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        if !is_plain_name(&v) {
            return Err(Error::invalid_name(v));
        }
        Ok(Self(v))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Free-form description, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinetuneDesc(String);

impl FinetuneDesc {
    const MAX: usize = 100;

    /// Validate a description; the limit counts characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::DescTooLong` above 100 characters.
    pub fn new(v: impl Into<String>) -> Result<Self> {
        let v = v.into();
        if v.chars().count() > Self::MAX {
            return Err(Error::DescTooLong { max: Self::MAX });
        }
        Ok(Self(v))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of the model a job trains or serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelName(String);

impl ModelName {
    /// Parse an optional model name. An empty string means "unspecified".
    #[must_use]
    pub fn parse(v: &str) -> Option<Self> {
        if v.is_empty() {
            None
        } else {
            Some(Self(v.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelName {
    fn default() -> Self {
        Self(DEFAULT_MODEL.to_string())
    }
}

/// Key of a hyperparameter or environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomizedKey(String);

impl CustomizedKey {
    /// # Errors
    ///
    /// Returns `Error::EmptyKey` for an empty key.
    pub fn new(v: impl Into<String>) -> Result<Self> {
        let v = v.into();
        if v.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Self(v))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A key with an optional value; empty values are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: CustomizedKey,
    pub value: Option<String>,
}

impl KeyValue {
    /// # Errors
    ///
    /// Returns `Error::EmptyKey` for an empty key.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        Ok(Self {
            key: CustomizedKey::new(key)?,
            value: (!value.is_empty()).then_some(value),
        })
    }

    /// The value, or an empty string when absent.
    #[must_use]
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}
