use std::borrow::Cow;

use regex::{NoExpand, Regex, RegexBuilder};

use crate::{Error, Result, SchemaName};

/// Database name the bundled SQL files are written against.
pub const SOURCE_SCHEMA: &str = "floreriadb";

lazy_static::lazy_static! {
    static ref USE_STATEMENT: Regex = Regex::new(r"(?i)^\s*USE\b").unwrap();
    static ref CREATE_DATABASE_STATEMENT: Regex = Regex::new(r"(?i)^\s*CREATE\s+DATABASE\b").unwrap();
    static ref CREATE_DATABASE_CLAUSE: Regex = Regex::new(
        r"(?i)CREATE\s+DATABASE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:`(?:[^`]|``)*`|[^\s;]+)"
    )
    .unwrap();
    static ref DEFAULT_SOURCES: Regex = source_pattern(&[SOURCE_SCHEMA]).unwrap();
}

/// Turns a statement from a SQL file into the statement that is actually
/// sent to the server.
pub trait Normalize {
    fn normalize<'a>(&self, statement: &'a str) -> Cow<'a, str>;
}

/// Retargets statements written against one or more hard-coded source names
/// onto the configured schema.
#[derive(Clone, Debug)]
pub struct SchemaRewriter {
    target: String,
    sources: Regex,
}

impl SchemaRewriter {
    pub fn new(schema: &SchemaName) -> Self {
        Self {
            target: schema.quoted(),
            sources: DEFAULT_SOURCES.clone(),
        }
    }

    /// Replaces the substitution table. Names match case-insensitively, with
    /// or without backticks, and only when not part of a longer identifier
    /// (letters, digits, `_` and `$`).
    pub fn with_source_names<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| name.as_ref().to_owned())
            .collect::<Vec<String>>();
        if names.is_empty() {
            return Err(Error::NoSourceNames);
        }
        if let Some(blank) = names.iter().find(|name| name.trim().is_empty()) {
            return Err(Error::InvalidSchemaName(blank.clone()));
        }
        self.sources = source_pattern(&names)?;
        Ok(self)
    }
}

impl Normalize for SchemaRewriter {
    fn normalize<'a>(&self, statement: &'a str) -> Cow<'a, str> {
        if USE_STATEMENT.is_match(statement) {
            return Cow::Owned(format!("USE {}", self.target));
        }

        if CREATE_DATABASE_STATEMENT.is_match(statement) {
            let replacement = format!("CREATE DATABASE IF NOT EXISTS {}", self.target);
            return CREATE_DATABASE_CLAUSE.replacen(statement, 1, NoExpand(&replacement));
        }

        let mut retargeted = String::new();
        let mut copied = 0;
        for found in self.sources.find_iter(statement) {
            if !stands_alone(statement, found.start(), found.end()) {
                continue;
            }
            retargeted.push_str(&statement[copied..found.start()]);
            retargeted.push_str(&self.target);
            copied = found.end();
        }

        if copied == 0 {
            return Cow::Borrowed(statement);
        }
        retargeted.push_str(&statement[copied..]);
        Cow::Owned(retargeted)
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// a backtick is its own boundary, otherwise the neighbouring characters must
// not continue the identifier
fn stands_alone(statement: &str, start: usize, end: usize) -> bool {
    let found = &statement[start..end];
    let before = found.starts_with('`')
        || !statement[..start]
            .chars()
            .next_back()
            .is_some_and(is_identifier_char);
    let after = found.ends_with('`')
        || !statement[end..].chars().next().is_some_and(is_identifier_char);
    before && after
}

fn source_pattern<S: AsRef<str>>(names: &[S]) -> Result<Regex> {
    // longest first so `shop` does not shadow `shop$2`
    let mut names = names.iter().map(|name| name.as_ref()).collect::<Vec<&str>>();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let alternatives = names
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");

    let pattern = format!(r"`?(?:{alternatives})`?");
    Ok(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
}

/// Statement normalizer that leaves everything untouched.
#[derive(Copy, Clone, Debug, Default)]
pub struct Verbatim;

impl Normalize for Verbatim {
    fn normalize<'a>(&self, statement: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(statement)
    }
}
