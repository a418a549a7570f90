//! The key/value pair every reply is made of.

use serde::{Deserialize, Serialize};

/// One `name: value` line of a server reply.
///
/// Tags are ordered and not unique: a song with two artists carries two
/// `Artist` tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    /// Creates a new tag.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns true if the tag name equals `name`, ignoring ASCII case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Tag {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}
