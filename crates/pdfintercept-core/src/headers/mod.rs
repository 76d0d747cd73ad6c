//! Header Inspector: header sets and the PDF / download classifiers.
//!
//! Every header read in the crate goes through [`find_header`], so lookups are
//! case-insensitive everywhere and always return the first match.

mod classify;
mod disposition;

pub use classify::{has_pdf_extension, is_download_requested, is_pdf_resource};
pub use disposition::ensure_attachment_disposition;

use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_DISPOSITION: &str = "content-disposition";
pub const REFERER: &str = "referer";

/// One `(name, value)` pair as delivered by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered header list. Duplicate names are allowed (browser semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet(Vec<Header>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| Header::new(name, value))
                .collect(),
        )
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(Header::new(name, value));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        find_header(self, name).map(|header| header.value.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|header| header.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn find_mut(&mut self, name: &str) -> Option<&mut Header> {
        let index = self.position(name)?;
        self.0.get_mut(index)
    }

    /// Overwrites the first header called `name`, or appends one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        match self.find_mut(name) {
            Some(header) => header.value = value.into(),
            None => self.push(name, value),
        }
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Case-insensitive header lookup returning the first match in insertion order.
pub fn find_header<'a>(headers: &'a HeaderSet, name: &str) -> Option<&'a Header> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
}
