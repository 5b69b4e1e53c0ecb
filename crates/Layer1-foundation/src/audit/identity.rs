//! Identities - the actors behind audited events

use crate::storage::Literal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user profile resolvable by several attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(id: i64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Value of one lookup attribute
    pub fn attribute(&self, attribute: IdentityAttribute) -> Literal {
        match attribute {
            IdentityAttribute::Id => Literal::Integer(self.id),
            IdentityAttribute::Login => Literal::text(&self.login),
            IdentityAttribute::FirstName => Literal::text(&self.first_name),
            IdentityAttribute::LastName => Literal::text(&self.last_name),
            IdentityAttribute::Email => Literal::text(&self.email),
        }
    }
}

/// Attribute an identity can be looked up by (or projected from)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityAttribute {
    Id,
    Login,
    FirstName,
    LastName,
    Email,
}

impl IdentityAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Login => "login",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for IdentityAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
