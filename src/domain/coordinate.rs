//! Library coordinates
//!
//! Format: `group:name[:version[:classifier]]`, for example
//! `org.postgresql:postgresql` or `com.querydsl:querydsl-jpa:5.1.0:jakarta`.
//! The version may be left out when a platform manages it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Invalid coordinate '{0}': expected 'group:name[:version[:classifier]]'")]
    InvalidFormat(String),

    #[error("Invalid coordinate '{0}': segment {1} is empty")]
    EmptySegment(String, usize),

    #[error("Invalid coordinate '{0}': segment '{1}' contains whitespace")]
    Whitespace(String, String),
}

/// A library coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    group: String,
    name: String,
    version: Option<String>,
    classifier: Option<String>,
}

impl Coordinate {
    /// Creates a coordinate without version or classifier
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: None,
            classifier: None,
        }
    }

    /// Sets the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the classifier (only rendered when a version is present)
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Returns `group:name`, the identity used to compare across versions
    pub fn module(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
            if let Some(classifier) = &self.classifier {
                write!(f, ":{}", classifier)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split(':').collect();

        if parts.len() < 2 || parts.len() > 4 {
            return Err(CoordinateError::InvalidFormat(s.to_string()));
        }

        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(CoordinateError::EmptySegment(s.to_string(), i + 1));
            }
            if part.chars().any(char::is_whitespace) {
                return Err(CoordinateError::Whitespace(s.to_string(), part.to_string()));
            }
        }

        Ok(Self {
            group: parts[0].to_string(),
            name: parts[1].to_string(),
            version: parts.get(2).map(|v| v.to_string()),
            classifier: parts.get(3).map(|c| c.to_string()),
        })
    }
}

impl TryFrom<String> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coordinate> for String {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_string()
    }
}
