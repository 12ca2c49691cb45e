//! Parser for the movie metadata CSV.
//!
//! Format: a header row followed by comma-separated records. Fields may be
//! double-quoted, in which case they can contain commas and `""` escapes:
//!
//! ```text
//! duration,budget,title_year,content_rating,genres,movie_title,imdb_score
//! 178,237000000,2009,PG-13,Action|Adventure|Fantasy|Sci-Fi,"Avatar",7.9
//! ```
//!
//! Quoted fields may also span line breaks; a record ends at the first
//! newline outside quotes.
//!
//! Columns are located by header name, never by position, so extra or
//! reordered columns in the source file are harmless.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use rayon::prelude::*;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Content-rating spellings folded onto their canonical form
const CONTENT_RATING_REPLACEMENTS: [(&str, &str); 3] = [("TV MA", "TV-MA"), ("GP", "PG"), ("M", "PG")];

/// Read a whole file as text.
///
/// The public movie metadata dumps are mostly UTF-8 but occasionally
/// contain Latin-1 bytes; those files are decoded byte-per-code-point
/// instead of failing.
pub fn read_text(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Ok(err.into_bytes().iter().map(|&b| b as char).collect()),
    }
}

/// Split one CSV line into fields, honoring double quotes.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Split CSV text into records, keeping newlines inside quoted fields.
///
/// Each record comes with the 1-based line it starts on. Blank lines between
/// records are skipped and a trailing `\r` is stripped.
pub fn split_records<'a>(text: &'a str, file: &str) -> Result<Vec<(usize, &'a str)>> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    let mut start_line = 1;
    let mut line = 1;

    // '"' and '\n' are ASCII, so byte offsets always fall on char boundaries
    for (pos, byte) in text.bytes().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' => {
                line += 1;
                if !in_quotes {
                    push_record(&mut records, start_line, &text[start..pos]);
                    start = pos + 1;
                    start_line = line;
                }
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(DataLoadError::ParseError {
            file: file.to_string(),
            line: start_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    push_record(&mut records, start_line, &text[start..]);
    Ok(records)
}

fn push_record<'a>(records: &mut Vec<(usize, &'a str)>, line: usize, raw: &'a str) {
    let record = raw.strip_suffix('\r').unwrap_or(raw);
    if !record.trim().is_empty() {
        records.push((line, record));
    }
}

/// Positions of the columns we need, resolved from the header row
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    duration: usize,
    budget: usize,
    title_year: usize,
    content_rating: usize,
    genres: usize,
    target: usize,
    width: usize,
}

impl ColumnIndex {
    fn from_header(header: &[String], file: &str) -> Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DataLoadError::MissingColumn {
                    file: file.to_string(),
                    column: name.to_string(),
                })
        };

        let duration = find(NumericField::Duration.name())?;
        let budget = find(NumericField::Budget.name())?;
        let title_year = find(NumericField::TitleYear.name())?;
        let content_rating = find(CONTENT_RATING_COLUMN)?;
        let genres = find(GENRES_COLUMN)?;
        let target = find(TARGET_COLUMN)?;
        let width = [duration, budget, title_year, content_rating, genres, target]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self {
            duration,
            budget,
            title_year,
            content_rating,
            genres,
            target,
            width,
        })
    }
}

/// Outcome of parsing a CSV body
#[derive(Debug, Default)]
pub struct ParsedTable {
    pub dataset: Dataset,
    /// Rows dropped because the target was empty or not numeric
    pub dropped_rows: usize,
}

/// Parse the full text of a movie metadata CSV.
///
/// Rows without a numeric target are dropped and counted; everything else
/// is kept, with unparseable numeric fields mapped to `None`.
pub fn parse_movies(text: &str, file: &str) -> Result<ParsedTable> {
    let mut records = split_records(text, file)?.into_iter();

    let header = match records.next() {
        Some((_, line)) => split_record(line.trim_start_matches('\u{feff}')),
        None => {
            return Err(DataLoadError::EmptyDataset {
                file: file.to_string(),
            });
        }
    };
    let columns = ColumnIndex::from_header(&header, file)?;

    let body: Vec<(usize, &str)> = records.collect();

    // Rows are independent, so parse them in parallel and keep input order
    let rows = body
        .par_iter()
        .map(|&(line_no, record)| parse_row(record, line_no, &columns))
        .collect::<Result<Vec<Option<(MovieRecord, f64)>>>>()?;

    let mut table = ParsedTable::default();
    for row in rows {
        match row {
            Some((record, target)) => table.dataset.push(record, target),
            None => table.dropped_rows += 1,
        }
    }
    Ok(table)
}

/// Parse one data row. Returns `Ok(None)` when the target is unusable.
fn parse_row(line: &str, line_no: usize, columns: &ColumnIndex) -> Result<Option<(MovieRecord, f64)>> {
    let fields = split_record(line);
    if fields.len() < columns.width {
        return Err(DataLoadError::FieldCountMismatch {
            expected: columns.width,
            found: fields.len(),
            line: line_no,
        });
    }

    let Some(target) = parse_optional_number(&fields[columns.target]) else {
        return Ok(None);
    };

    let record = MovieRecord {
        duration: parse_optional_number(&fields[columns.duration]),
        budget: parse_optional_number(&fields[columns.budget]),
        title_year: parse_optional_number(&fields[columns.title_year]),
        content_rating: Some(clean_content_rating(&fields[columns.content_rating])),
        genres: non_empty(&fields[columns.genres]),
    };
    Ok(Some((record, target)))
}

/// Parse a numeric cell; empty, malformed and non-finite values are missing.
pub fn parse_optional_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize a content-rating cell.
///
/// Example: "" -> "Unrated", " TV MA " -> "TV-MA", "GP" -> "PG"
pub fn clean_content_rating(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNRATED.to_string();
    }
    CONTENT_RATING_REPLACEMENTS
        .iter()
        .find(|(from, _)| *from == trimmed)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
