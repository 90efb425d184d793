//! Resolution scopes and the classpaths derived from them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::name::{env_key, validate, NameError};

#[derive(Debug, Error, PartialEq)]
pub enum ScopeError {
    #[error("Invalid scope name: {0}")]
    InvalidName(#[from] NameError),
}

/// The lifecycle phase in which a dependency applies
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
    Implementation,
    CompileOnly,
    RuntimeOnly,
    AnnotationProcessor,
    TestImplementation,
    TestCompileOnly,
    TestRuntimeOnly,
    TestAnnotationProcessor,
    /// A user-defined configuration, e.g. `asciidoctor_ext`
    Custom(String),
}

impl Scope {
    /// All built-in scopes, in declaration-table order
    pub const BUILT_IN: [Scope; 8] = [
        Scope::Implementation,
        Scope::CompileOnly,
        Scope::RuntimeOnly,
        Scope::AnnotationProcessor,
        Scope::TestImplementation,
        Scope::TestCompileOnly,
        Scope::TestRuntimeOnly,
        Scope::TestAnnotationProcessor,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Scope::Implementation => "implementation",
            Scope::CompileOnly => "compile_only",
            Scope::RuntimeOnly => "runtime_only",
            Scope::AnnotationProcessor => "annotation_processor",
            Scope::TestImplementation => "test_implementation",
            Scope::TestCompileOnly => "test_compile_only",
            Scope::TestRuntimeOnly => "test_runtime_only",
            Scope::TestAnnotationProcessor => "test_annotation_processor",
            Scope::Custom(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(scope) = Scope::BUILT_IN.iter().find(|scope| scope.as_str() == s) {
            return Ok(scope.clone());
        }

        validate(s)?;
        Ok(Scope::Custom(s.to_string()))
    }
}

impl TryFrom<String> for Scope {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_str().to_string()
    }
}

/// A resolved view over one or more scopes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Classpath {
    Compile,
    Runtime,
    AnnotationProcessor,
    TestCompile,
    TestRuntime,
    TestAnnotationProcessor,
    /// Exactly the (effective) members of one scope
    Scope(Scope),
}

impl Classpath {
    /// The scopes whose effective declarations make up this classpath
    pub fn members(&self) -> Vec<Scope> {
        match self {
            Classpath::Compile => vec![Scope::Implementation, Scope::CompileOnly],
            Classpath::Runtime => vec![Scope::Implementation, Scope::RuntimeOnly],
            Classpath::AnnotationProcessor => vec![Scope::AnnotationProcessor],
            Classpath::TestCompile => vec![
                Scope::Implementation,
                Scope::TestImplementation,
                Scope::TestCompileOnly,
            ],
            Classpath::TestRuntime => vec![
                Scope::Implementation,
                Scope::RuntimeOnly,
                Scope::TestImplementation,
                Scope::TestRuntimeOnly,
            ],
            Classpath::TestAnnotationProcessor => vec![Scope::TestAnnotationProcessor],
            Classpath::Scope(scope) => vec![scope.clone()],
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Classpath::Compile => "compile",
            Classpath::Runtime => "runtime",
            Classpath::AnnotationProcessor => "annotation_processor",
            Classpath::TestCompile => "test_compile",
            Classpath::TestRuntime => "test_runtime",
            Classpath::TestAnnotationProcessor => "test_annotation_processor",
            Classpath::Scope(scope) => scope.as_str(),
        }
    }

    /// Returns the name in environment-variable form
    pub fn env_key(&self) -> String {
        env_key(self.as_str())
    }
}

impl fmt::Display for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classpath {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "compile" => Ok(Classpath::Compile),
            "runtime" => Ok(Classpath::Runtime),
            "annotation_processor" => Ok(Classpath::AnnotationProcessor),
            "test_compile" => Ok(Classpath::TestCompile),
            "test_runtime" => Ok(Classpath::TestRuntime),
            "test_annotation_processor" => Ok(Classpath::TestAnnotationProcessor),
            other => Ok(Classpath::Scope(other.parse()?)),
        }
    }
}

impl TryFrom<String> for Classpath {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Classpath> for String {
    fn from(classpath: Classpath) -> Self {
        classpath.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_names_parse() {
        for scope in Scope::BUILT_IN {
            let parsed: Scope = scope.as_str().parse().unwrap();
            assert_eq!(parsed, scope);
        }
    }

    #[test]
    fn unknown_name_is_custom() {
        let scope: Scope = "asciidoctor_ext".parse().unwrap();
        assert_eq!(scope, Scope::Custom("asciidoctor_ext".to_string()));
    }

    #[test]
    fn custom_name_is_validated() {
        assert!("docs ext".parse::<Scope>().is_err());
    }

    #[test]
    fn runtime_classpath_excludes_compile_only() {
        let members = Classpath::Runtime.members();
        assert!(members.contains(&Scope::RuntimeOnly));
        assert!(!members.contains(&Scope::CompileOnly));
    }

    #[test]
    fn scope_name_is_a_classpath() {
        let cp: Classpath = "compile_only".parse().unwrap();
        assert_eq!(cp, Classpath::Scope(Scope::CompileOnly));
        assert_eq!(cp.members(), vec![Scope::CompileOnly]);
    }
}
