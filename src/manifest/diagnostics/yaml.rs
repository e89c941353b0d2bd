//! YAML parse diagnostics.
//!
//! `serde_saphyr` reports positions as one-based line and column numbers;
//! [`map_yaml_error`] turns them into a byte span over the Stackfile so
//! `miette` can underline the offending character, and attaches a hint for
//! the usual YAML slips.

#![allow(clippy::allow_attributes, clippy::allow_attributes_without_reason)]

use super::{ManifestName, ManifestSource};
use crate::manifest::hints::YAML_HINTS;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

const TAB_HINT: &str = "Indent Stackfile entries with spaces; tabs are invalid in YAML.";

#[allow(unused_assignments)]
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(azstack::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn zero_based(n: u64) -> usize {
    usize::try_from(n.saturating_sub(1)).unwrap_or(usize::MAX)
}

/// Byte offset of a one-based `line`/`column` position in `src`.
///
/// Columns count characters, so multi-byte text is handled; positions past
/// the end of a line clamp to the line end, ignoring any `\r\n` terminator.
fn offset_of(src: &str, line: u64, column: u64) -> usize {
    let (line, column) = (zero_based(line), zero_based(column));
    let mut start = 0usize;
    for (idx, raw) in src.split_inclusive('\n').enumerate() {
        if idx == line {
            let text = raw.trim_end_matches(['\n', '\r']);
            return start
                + text
                    .char_indices()
                    .nth(column)
                    .map_or(text.len(), |(at, _)| at);
        }
        start += raw.len();
    }
    src.len()
}

/// One-character span at `loc`, stepping back when `loc` sits on a line end.
fn span_at(src: &str, loc: Location) -> SourceSpan {
    let at = offset_of(src, loc.line(), loc.column());
    let bytes = src.as_bytes();
    let printable = |idx: usize| bytes.get(idx).is_some_and(|b| *b != b'\n' && *b != b'\r');
    let (start, end) = if printable(at) {
        (at, at + 1)
    } else if at > 0 && printable(at - 1) {
        (at - 1, at)
    } else {
        (at, at)
    };
    SourceSpan::from(start..end)
}

fn line_is_tab_indented(src: &str, loc: Location) -> bool {
    src.lines().nth(zero_based(loc.line())).is_some_and(|line| {
        line.chars()
            .take_while(|c| c.is_whitespace())
            .any(|c| c == '\t')
    })
}

fn hint_for(message: &str, src: &str, loc: Option<Location>) -> Option<String> {
    if loc.is_some_and(|l| line_is_tab_indented(src, l)) {
        return Some(TAB_HINT.to_owned());
    }
    let lower = message.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, hint)| (*hint).to_owned())
}

/// Map a `serde_saphyr` parse error into a [`miette`] diagnostic.
///
/// Errors without a location are reported at line 1, column 1 with no span.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &ManifestSource,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let text = src.as_str();
    let loc = err.location();
    let (line, column) = loc.map_or((1, 1), |l| (l.line(), l.column()));
    let detail = err.to_string();
    let help = hint_for(&detail, text, loc);
    let mut message = format!("{name}: YAML parse error at line {line}, column {column}: {detail}");
    if let Some(hint) = &help {
        message.push_str("\nhelp: ");
        message.push_str(hint);
    }
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name.as_str(), text.to_owned()),
        span: loc.map(|l| span_at(text, l)),
        help,
        source: err,
        message,
    })
}
