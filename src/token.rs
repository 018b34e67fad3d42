//! Schema tokens
//!
//! A token is the globally unique string key identifying a type, resource,
//! or function in the output package. Object types use the form
//! `pkg:module/Name:Name`; resources and functions use `pkg:module:Name`.
//! Token strings are part of the compatibility surface downstream emitters
//! depend on, so their formatting must be stable across regenerations.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CompileError;

/// What a token names
///
/// The grammar only distinguishes object types from package members;
/// whether a member token is a resource or a function is determined by
/// which `PackageSpec` map it is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    /// Object type: `pkg:module/Name:Name`
    Type,
    /// Resource or function: `pkg:module:Name`
    Member,
}

/// A globally unique schema token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    package: String,
    module: String,
    name: String,
    kind: TokenKind,
}

impl Token {
    /// Token for an object type
    pub fn ty(package: impl Into<String>, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            module: module.into(),
            name: name.into(),
            kind: TokenKind::Type,
        }
    }

    /// Token for a resource
    pub fn resource(package: impl Into<String>, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            module: module.into(),
            name: name.into(),
            kind: TokenKind::Member,
        }
    }

    /// Token for a function
    pub fn function(package: impl Into<String>, module: impl Into<String>, name: impl Into<String>) -> Self {
        // Same member grammar as resources.
        Self::resource(package, module, name)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The `$ref` form used to reference an object type from a property
    pub fn reference(&self) -> String {
        format!("#/types/{}", self)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Type => write!(f, "{}:{}/{}:{}", self.package, self.module, self.name, self.name),
            TokenKind::Member => write!(f, "{}:{}:{}", self.package, self.module, self.name),
        }
    }
}

impl FromStr for Token {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |detail: &str| CompileError::InvalidToken {
            token: s.to_string(),
            detail: detail.to_string(),
        };

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid("expected three colon-separated segments"));
        }
        let (package, middle, name) = (parts[0], parts[1], parts[2]);
        if package.is_empty() || middle.is_empty() || name.is_empty() {
            return Err(invalid("empty segment"));
        }

        match middle.split_once('/') {
            Some((module, type_name)) => {
                if module.is_empty() {
                    return Err(invalid("empty module segment"));
                }
                if type_name != name {
                    return Err(invalid("type tokens must repeat the name after the module"));
                }
                Ok(Token::ty(package, module, name))
            }
            None => Ok(Token::resource(package, middle, name)),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_token_format() {
        let token = Token::ty("example", "index", "WidgetSheet");
        assert_eq!(token.to_string(), "example:index/WidgetSheet:WidgetSheet");
        assert_eq!(token.reference(), "#/types/example:index/WidgetSheet:WidgetSheet");
    }

    #[test]
    fn test_member_token_format() {
        let token = Token::resource("example", "index", "Widget");
        assert_eq!(token.to_string(), "example:index:Widget");
    }

    #[test]
    fn test_parse_round_trip() {
        for raw in ["example:index/Visual:Visual", "example:storage:Bucket"] {
            let token: Token = raw.parse().unwrap();
            assert_eq!(token.to_string(), raw);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("example".parse::<Token>().is_err());
        assert!("example:index".parse::<Token>().is_err());
        assert!("example::Widget".parse::<Token>().is_err());
        assert!("example:index/Visual:Other".parse::<Token>().is_err());
    }
}
