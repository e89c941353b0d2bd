//! Deferred attribute values.
//!
//! An [`Output`] is a string whose final value may depend on attributes the
//! engine only learns after provisioning, such as a generated host name. It
//! is kept as a list of literal and attribute segments so that templating
//! never loses a dependency: the engine sees every reference, and
//! [`Output::resolve`] only produces a string once every referenced
//! attribute is available.
//!
//! ```
//! use azstack::ir::{Attribute, AttrRef, Output, Resolution};
//! use std::collections::BTreeMap;
//!
//! let host = Output::parse("${db.name}.postgres.database.azure.com").expect("parse");
//! assert_eq!(host.dependencies(), vec!["db"]);
//!
//! let mut known = BTreeMap::new();
//! assert!(matches!(host.resolve(&known), Resolution::Pending(_)));
//! known.insert(AttrRef::new("db", Attribute::Name), "pg1".to_owned());
//! assert_eq!(
//!     host.resolve(&known),
//!     Resolution::Known("pg1.postgres.database.azure.com".into())
//! );
//! ```

use super::kind::Attribute;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Reference to one attribute of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AttrRef {
    /// Logical id of the producing resource.
    pub resource: String,
    /// Attribute read from it.
    pub attribute: Attribute,
}

impl AttrRef {
    /// Build a reference to `resource.attribute`.
    #[must_use]
    pub fn new(resource: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            resource: resource.into(),
            attribute,
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// One piece of an [`Output`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Literal text.
    Text(String),
    /// Value of a resource attribute.
    Attribute(AttrRef),
}

/// A string assembled from literals and deferred attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Output {
    segments: Vec<Segment>,
}

/// Errors raised while parsing `${resource.attribute}` templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// A `${` was never closed.
    #[error("unterminated interpolation in '{template}'")]
    Unterminated {
        /// Offending template.
        template: String,
    },
    /// The interpolation lacks a `.attribute` suffix.
    #[error("interpolation '${{{body}}}' in '{template}' must have the form resource.attribute")]
    Malformed {
        /// Offending template.
        template: String,
        /// Text between the braces.
        body: String,
    },
    /// The attribute is not one the engine reports.
    #[error("unknown attribute '{attribute}' in '{template}'")]
    UnknownAttribute {
        /// Offending template.
        template: String,
        /// Attribute as written.
        attribute: String,
    },
}

/// Outcome of resolving an [`Output`] against known attribute values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every referenced attribute was available.
    Known(String),
    /// These attributes are still unknown.
    Pending(Vec<AttrRef>),
}

impl Resolution {
    /// The resolved string, if any.
    #[must_use]
    pub fn known(self) -> Option<String> {
        match self {
            Self::Known(value) => Some(value),
            Self::Pending(_) => None,
        }
    }
}

/// Supplier of attribute values, typically the engine's state after apply.
pub trait AttributeSource {
    /// Value of `reference`, or `None` while it is unknown.
    fn attribute(&self, reference: &AttrRef) -> Option<String>;
}

impl AttributeSource for BTreeMap<AttrRef, String> {
    fn attribute(&self, reference: &AttrRef) -> Option<String> {
        self.get(reference).cloned()
    }
}

impl Output {
    /// A fully known value.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        let mut out = Self::default();
        out.push(Segment::Text(text.into()));
        out
    }

    /// The value of `resource.attribute`.
    #[must_use]
    pub fn attribute(resource: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            segments: vec![Segment::Attribute(AttrRef::new(resource, attribute))],
        }
    }

    /// Join several outputs end to end.
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        parts.into_iter().fold(Self::default(), Self::then)
    }

    /// Append another output.
    #[must_use]
    pub fn then(mut self, other: Self) -> Self {
        for segment in other.segments {
            self.push(segment);
        }
        self
    }

    /// Append literal text.
    #[must_use]
    pub fn then_text(mut self, text: impl Into<String>) -> Self {
        self.push(Segment::Text(text.into()));
        self
    }

    /// Parse a template containing `${resource.attribute}` interpolations.
    ///
    /// `$$` stands for a literal dollar sign and a `$` not followed by `{`
    /// is kept as is.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError`] for unterminated or malformed
    /// interpolations and unknown attribute names.
    pub fn parse(template: &str) -> Result<Self, InterpolationError> {
        let mut out = Self::default();
        let mut text = String::new();
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '$' {
                text.push(ch);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    text.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut body = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(InterpolationError::Unterminated {
                            template: template.to_owned(),
                        });
                    }
                    let reference = parse_reference(template, body.trim())?;
                    out.push(Segment::Text(std::mem::take(&mut text)));
                    out.push(Segment::Attribute(reference));
                }
                _ => text.push('$'),
            }
        }
        out.push(Segment::Text(text));
        Ok(out)
    }

    /// Segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every attribute reference, in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &AttrRef> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Attribute(reference) => Some(reference),
            Segment::Text(_) => None,
        })
    }

    /// Resources this value waits on, deduplicated in order of appearance.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for reference in self.references() {
            if !deps.contains(&reference.resource.as_str()) {
                deps.push(reference.resource.as_str());
            }
        }
        deps
    }

    /// Whether the value holds no attribute reference.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.references().next().is_none()
    }

    /// The literal text when the value holds no reference.
    #[must_use]
    pub fn as_literal(&self) -> Option<String> {
        self.is_literal().then(|| {
            self.segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Text(text) => Some(text.as_str()),
                    Segment::Attribute(_) => None,
                })
                .collect()
        })
    }

    /// Resolve the value against `source`.
    ///
    /// The string is only assembled once every referenced attribute is
    /// known; otherwise the missing references are reported.
    pub fn resolve<S: AttributeSource + ?Sized>(&self, source: &S) -> Resolution {
        let mut value = String::new();
        let mut pending = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => value.push_str(text),
                Segment::Attribute(reference) => match source.attribute(reference) {
                    Some(resolved) => value.push_str(&resolved),
                    None => pending.push(reference.clone()),
                },
            }
        }
        if pending.is_empty() {
            Resolution::Known(value)
        } else {
            Resolution::Pending(pending)
        }
    }

    /// Render in engine template syntax, escaping literal dollars.
    #[must_use]
    pub fn to_template(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(&text.replace('$', "$$")),
                Segment::Attribute(reference) => {
                    out.push_str("${");
                    out.push_str(&reference.to_string());
                    out.push('}');
                }
            }
        }
        out
    }

    fn push(&mut self, segment: Segment) {
        match segment {
            Segment::Text(text) if text.is_empty() => {}
            Segment::Text(text) => {
                if let Some(Segment::Text(last)) = self.segments.last_mut() {
                    last.push_str(&text);
                } else {
                    self.segments.push(Segment::Text(text));
                }
            }
            attr @ Segment::Attribute(_) => self.segments.push(attr),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_template())
    }
}

fn parse_reference(template: &str, body: &str) -> Result<AttrRef, InterpolationError> {
    let malformed = || InterpolationError::Malformed {
        template: template.to_owned(),
        body: body.to_owned(),
    };
    let (resource, attribute) = body.split_once('.').ok_or_else(malformed)?;
    if resource.is_empty() || attribute.is_empty() {
        return Err(malformed());
    }
    let attribute = attribute
        .parse::<Attribute>()
        .map_err(|_| InterpolationError::UnknownAttribute {
            template: template.to_owned(),
            attribute: attribute.to_owned(),
        })?;
    Ok(AttrRef::new(resource, attribute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn known(entries: &[(&str, Attribute, &str)]) -> BTreeMap<AttrRef, String> {
        entries
            .iter()
            .map(|(res, attr, value)| (AttrRef::new(*res, *attr), (*value).to_owned()))
            .collect()
    }

    #[rstest]
    fn parse_splits_text_and_references() {
        let out = Output::parse("redis://${cache.hostName}:6379").expect("parse");
        assert_eq!(
            out.segments(),
            &[
                Segment::Text("redis://".into()),
                Segment::Attribute(AttrRef::new("cache", Attribute::HostName)),
                Segment::Text(":6379".into()),
            ]
        );
    }

    #[rstest]
    #[case("$$HOME", "$HOME")]
    #[case("cost: 5$", "cost: 5$")]
    #[case("", "")]
    fn parse_keeps_literal_dollars(#[case] template: &str, #[case] expected: &str) {
        let out = Output::parse(template).expect("parse");
        assert_eq!(out.as_literal().as_deref(), Some(expected));
    }

    #[rstest]
    #[case("${cache.hostName", "unterminated")]
    #[case("${cache}", "resource.attribute")]
    #[case("${.name}", "resource.attribute")]
    #[case("${cache.hostname}", "unknown attribute 'hostname'")]
    fn parse_rejects_bad_interpolations(#[case] template: &str, #[case] needle: &str) {
        let err = Output::parse(template).expect_err("should fail");
        assert!(err.to_string().contains(needle), "got: {err}");
    }

    #[rstest]
    fn postgres_host_resolves_from_server_name() {
        let host = Output::attribute("postgres", Attribute::Name)
            .then_text(".postgres.database.azure.com");
        let source = known(&[(
            "postgres",
            Attribute::Name,
            "cookiecutter-pulumi-django-server",
        )]);
        assert_eq!(
            host.resolve(&source),
            Resolution::Known(
                "cookiecutter-pulumi-django-server.postgres.database.azure.com".into()
            )
        );
    }

    #[rstest]
    fn resolution_stays_pending_until_every_producer_is_known() {
        let url = Output::concat([
            Output::literal("redis://"),
            Output::attribute("cache", Attribute::HostName),
            Output::literal(":"),
            Output::attribute("cache", Attribute::Port),
        ]);
        let partial = known(&[("cache", Attribute::HostName, "c.redis.cache.windows.net")]);
        assert_eq!(
            url.resolve(&partial),
            Resolution::Pending(vec![AttrRef::new("cache", Attribute::Port)])
        );
        let full = known(&[
            ("cache", Attribute::HostName, "c.redis.cache.windows.net"),
            ("cache", Attribute::Port, "6379"),
        ]);
        assert_eq!(
            url.resolve(&full).known().as_deref(),
            Some("redis://c.redis.cache.windows.net:6379")
        );
    }

    #[rstest]
    fn concat_merges_adjacent_text() {
        let out = Output::concat([Output::literal("a"), Output::literal("b")]).then_text("c");
        assert_eq!(out.segments(), &[Segment::Text("abc".into())]);
    }

    #[rstest]
    fn dependencies_are_unique_and_ordered() {
        let out = Output::parse("${b.name}-${a.id}-${b.id}").expect("parse");
        assert_eq!(out.dependencies(), vec!["b", "a"]);
    }

    #[rstest]
    fn template_escapes_literal_dollars() {
        let out = Output::literal("p$").then(Output::attribute("x", Attribute::Id));
        assert_eq!(out.to_template(), "p$$${x.id}");
    }
}
