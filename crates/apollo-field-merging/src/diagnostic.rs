//! Reports of field merging conflicts, pretty-printed with labeled lines of GraphQL source
//! or converted to the GraphQL response error shape.
//!
//! ```rust
//! use apollo_compiler::ast::Document;
//! use apollo_compiler::Schema;
//! use apollo_field_merging::validation::validate_field_merging;
//!
//! let schema = Schema::parse("type Query { a: Int b: Int }", "schema.graphql").unwrap();
//! let document = Document::parse("{ x: a x: b }", "query.graphql").unwrap();
//! let conflicts = validate_field_merging(&schema, &document).unwrap();
//! for diagnostic in conflicts.iter() {
//!     // Debug-formatting uses colors.
//!     eprintln!("{diagnostic:?}");
//! }
//! ```

use crate::validation::FieldConflict;
use apollo_compiler::parser::SourceMap;
use apollo_compiler::parser::SourceSpan;
use apollo_compiler::response::GraphQLError;
use apollo_compiler::parser::LineColumn as GraphQLLocation;
use apollo_compiler::Node;
use ariadne::ColorGenerator;
use ariadne::ReportKind;
use std::fmt;
use std::io;
use std::ops::Range;

/// Field conflicts found in one document, with the sources they point into.
///
/// Conflicts keep the order in which they were found.
#[derive(Clone)]
pub struct DiagnosticList {
    sources: SourceMap,
    conflicts: Vec<FieldConflict>,
}

/// One entry of a [`DiagnosticList`], printable on its own
pub struct Diagnostic<'a> {
    sources: &'a SourceMap,
    pub conflict: &'a FieldConflict,
}

/// When to use ANSI colors in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Never,
    /// Leaves the choice to ariadne, which checks whether stderr is a terminal
    StderrIsTerminal,
}

/// File path and char range, as ariadne expects them
type Span = (String, Range<usize>);

/// Stands for the source of a report without a location
const NO_SOURCE_FILE: &str = "(no source file)";

/// Converts byte offsets into char offsets
fn to_span(sources: &SourceMap, location: Option<SourceSpan>) -> Option<Span> {
    let location = location?;
    let source = sources.get(&location.file_id())?;
    let text = source.source_text();
    let chars_before = |offset: usize| text.get(..offset).map(|before| before.chars().count());
    let start = chars_before(location.offset())?;
    let end = chars_before(location.end_offset())?;
    Some((source.path().display().to_string(), start..end))
}

fn to_graphql_location<T>(sources: &SourceMap, node: &Node<T>) -> Option<GraphQLLocation> {
    let range = node.line_column_range(sources)?;
    Some(GraphQLLocation {
        line: range.start.line,
        column: range.start.column,
    })
}

impl<'a> Diagnostic<'a> {
    /// Line and column of the main location: the field that comes second in the document
    pub fn line_column(&self) -> Option<GraphQLLocation> {
        to_graphql_location(self.sources, &self.conflict.second.node)
    }

    /// Returns the [JSON error shape](https://spec.graphql.org/October2021/#sec-Errors),
    /// with the locations of both fields
    /// and the `responseKey` and `reason` extensions.
    pub fn to_json(&self) -> GraphQLError {
        let conflict = self.conflict;
        let mut error = GraphQLError::new(conflict.to_string(), None, self.sources);
        error.locations = [&conflict.first, &conflict.second]
            .into_iter()
            .filter_map(|field| to_graphql_location(self.sources, &field.node))
            .collect();
        error
            .extensions
            .insert("responseKey", conflict.response_key.as_str().into());
        error
            .extensions
            .insert("reason", conflict.reason.tag().into());
        error
    }

    fn report(&self, color: Color) -> ariadne::Report<'static, Span> {
        let conflict = self.conflict;
        let (path, range) = to_span(self.sources, conflict.location())
            .unwrap_or_else(|| (NO_SOURCE_FILE.to_owned(), 0..0));
        let config = ariadne::Config::default().with_color(color == Color::StderrIsTerminal);
        let mut report = ariadne::Report::build(ReportKind::Error, path, range.start)
            .with_config(config)
            .with_message(conflict)
            .with_help(conflict.help());
        let mut colors = ColorGenerator::new();
        for field in [&conflict.first, &conflict.second] {
            if let Some(span) = to_span(self.sources, field.node.location()) {
                report.add_label(
                    ariadne::Label::new(span)
                        .with_message(field.label(conflict.reason))
                        .with_color(colors.next()),
                )
            }
        }
        report.finish()
    }

    /// Pretty-prints the report to `w`
    pub fn write(&self, color: Color, w: impl io::Write) -> io::Result<()> {
        let files = self
            .sources
            .values()
            .map(|source| {
                (
                    source.path().display().to_string(),
                    source.source_text().to_owned(),
                )
            })
            .chain(std::iter::once((NO_SOURCE_FILE.to_owned(), String::new())));
        self.report(color).write(ariadne::sources(files), w)
    }

    fn fmt_with(&self, color: Color, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = Vec::new();
        self.write(color, &mut buffer).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buffer))
    }
}

/// With colors if stderr is a terminal. Use `Display` for plain text.
impl fmt::Debug for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(Color::StderrIsTerminal, f)
    }
}

/// Without colors
impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(Color::Never, f)
    }
}

impl DiagnosticList {
    /// Creates an empty list for conflicts found in `sources`
    pub fn new(sources: SourceMap) -> Self {
        Self {
            sources,
            conflicts: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, conflict: FieldConflict) {
        self.conflicts.push(conflict)
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Diagnostic<'_>> {
        self.conflicts.iter().map(|conflict| Diagnostic {
            sources: &self.sources,
            conflict,
        })
    }

    pub fn field_conflicts(&self) -> impl ExactSizeIterator<Item = &'_ FieldConflict> {
        self.conflicts.iter()
    }

    /// Returns every conflict in the [JSON error shape](https://spec.graphql.org/October2021/#sec-Errors)
    pub fn to_json(&self) -> Vec<GraphQLError> {
        self.iter().map(|diagnostic| diagnostic.to_json()).collect()
    }

    /// Returns `Ok(())` if there are no conflicts, or `Err(self)`
    pub fn into_result(self) -> Result<(), Self> {
        if self.conflicts.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::error::Error for DiagnosticList {}

/// With colors, one report after the other
impl fmt::Debug for DiagnosticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|diagnostic| fmt::Debug::fmt(&diagnostic, f))
    }
}

/// Without colors, one report after the other
impl fmt::Display for DiagnosticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|diagnostic| fmt::Display::fmt(&diagnostic, f))
    }
}
