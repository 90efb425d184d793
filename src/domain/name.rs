//! Validated names for tasks and artifacts
//!
//! Both share one lexical rule: an ASCII letter followed by ASCII
//! alphanumerics, `_` or `-` (e.g. `boot_jar`, `generated-snippets`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NameError {
    #[error("Name must not be empty")]
    Empty,

    #[error("Invalid name '{0}': must start with an ASCII letter")]
    InvalidStart(String),

    #[error("Invalid name '{0}': only ASCII letters, digits, '_' and '-' are allowed")]
    InvalidCharacter(String),
}

pub(super) fn validate(s: &str) -> Result<(), NameError> {
    let mut chars = s.chars();
    match chars.next() {
        None => return Err(NameError::Empty),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(NameError::InvalidStart(s.to_string()))
        }
        Some(_) => {}
    }

    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(NameError::InvalidCharacter(s.to_string()))
    }
}

/// Upper-cases a name and maps `-` to `_` so it can be used in an
/// environment variable (`generated-snippets` -> `GENERATED_SNIPPETS`).
pub(super) fn env_key(s: &str) -> String {
    s.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

macro_rules! validated_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a name, validating its format
            pub fn new(s: impl Into<String>) -> Result<Self, NameError> {
                let s = s.into();
                validate(&s)?;
                Ok(Self(s))
            }

            /// Returns the name as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the name in environment-variable form
            pub fn env_key(&self) -> String {
                env_key(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.trim())
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

validated_name!(
    /// Name of a build task (`compile`, `test`, `asciidoctor`, `boot_jar`)
    TaskName
);

validated_name!(
    /// Name of an artifact exchanged between tasks (`classes`, `snippets`)
    ArtifactName
);
