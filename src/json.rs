//! Line-delimited JSON files as a record source.
//!
//! Every line holds one JSON object, despite the `.json` extension. Lines are
//! tolerated when they carry array or list punctuation, see [`trim_line`].
use std::cell::OnceCell;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{InputError, Result};
use crate::files::PathSource;
use crate::input::{memoized, Records, SequenceInput, Walk};
use crate::record::SequenceRecord;

/// JSON Lines input over one file, a list of files, or a directory of `.json` files.
pub struct JsonInput {
    source: PathSource,
    cache: OnceCell<Vec<SequenceRecord>>,
}

impl JsonInput {
    /// Extension used to filter directory listings.
    pub const DIRECTORY_EXTENSION: &'static str = "json";

    pub fn new(source: impl Into<PathSource>) -> Self {
        JsonInput { source: source.into(), cache: OnceCell::new() }
    }

    pub fn source(&self) -> &PathSource {
        &self.source
    }

    /// The ordered file list this input reads, resolved now.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        self.source.resolve(Self::DIRECTORY_EXTENSION)
    }
}

impl SequenceInput for JsonInput {
    fn data_type(&self) -> &'static str {
        "json"
    }

    fn as_list(&self) -> Result<&[SequenceRecord]> {
        memoized(&self.cache, self.data_type(), self.as_generator())
    }

    fn as_generator(&self) -> Records<'_> {
        Box::new(Walk::new(move || self.files(), |path: PathBuf| open_json_lines(&path)))
    }
}

/// Strip the punctuation a line may carry when it was cut out of a JSON array.
///
/// Surrounding whitespace goes first, then any leading and trailing `]`, then
/// any trailing `,`. An empty result means the line holds no record.
///
/// # Examples
/// ```
/// use seqsource::json::trim_line;
/// assert_eq!(trim_line("  {\"id\":\"x\"},\n"), "{\"id\":\"x\"}");
/// assert_eq!(trim_line("]"), "");
/// ```
pub fn trim_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(']')
        .trim_end_matches(']')
        .trim_end_matches(',')
}

/// Open one JSON Lines file and stream one record per non-empty line.
pub fn open_json_lines(path: &Path) -> Result<Records<'static>> {
    let file = File::open(path).map_err(|e| InputError::not_found(path, e))?;
    debug!(path = %path.display(), "opened JSON file");
    Ok(Box::new(JsonRecords { path: path.to_path_buf(), lines: BufReader::new(file).lines(), line_no: 0 }))
}

struct JsonRecords {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl Iterator for JsonRecords {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    let location = format!("{}:{}", self.path.display(), self.line_no + 1);
                    return Some(Err(InputError::malformed(location, e)));
                }
                Err(e) => return Some(Err(InputError::not_found(&self.path, e))),
            };
            self.line_no += 1;

            let body = trim_line(&line);
            if body.is_empty() {
                continue;
            }
            trace!(path = %self.path.display(), line = self.line_no, "parsing JSON record");
            return Some(self.parse(body));
        }
    }
}

impl JsonRecords {
    fn parse(&self, body: &str) -> Result<SequenceRecord> {
        let location = || format!("{}:{}", self.path.display(), self.line_no);
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(SequenceRecord::from_fields(fields)),
            Ok(other) => Err(InputError::malformed(
                location(),
                format!("expected a JSON object, found {}", kind_of(&other)),
            )),
            Err(e) => Err(InputError::malformed(location(), e)),
        }
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    fn json_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[rstest]
    #[case("", "")]
    #[case("]", "")]
    #[case("   \n", "")]
    #[case("{\"id\":\"x\"},", "{\"id\":\"x\"}")]
    #[case("]{\"id\":\"x\"}]", "{\"id\":\"x\"}")]
    #[case("{\"id\":\"x\"}],", "{\"id\":\"x\"}]")]
    fn trimming(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(trim_line(line), expected);
    }

    #[test]
    fn comma_terminated_line_yields_one_record() {
        let f = json_file("{\"id\":\"x\"},\n");
        let records = JsonInput::new(PathSource::Single(f.path().to_path_buf()))
            .as_generator()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("x"));
    }

    #[test]
    fn blank_and_bracket_lines_are_skipped() {
        let f = json_file("\n{\"seq_id\":\"a\",\"vdj_nt\":\"ACGT\"},\n]\n\n{\"seq_id\":\"b\"}\n");
        let input = JsonInput::new(PathSource::Single(f.path().to_path_buf()));
        let ids: Vec<_> = input.as_list().unwrap().iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(input.as_list().unwrap()[0].sequence(), Some("ACGT"));
    }

    #[test]
    fn bad_line_reports_its_location() {
        let f = json_file("{\"id\":\"a\"}\n{not json}\n{\"id\":\"c\"}\n");
        let mut records = open_json_lines(f.path()).unwrap();
        assert!(records.next().unwrap().is_ok());
        match records.next() {
            Some(Err(InputError::MalformedRecord { location, .. })) => assert!(location.ends_with(":2")),
            other => panic!("expected a malformed record, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_line_is_malformed() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        f.write_all(b"{\"id\":\"a\"}\n{\"id\":\"\xff\xfe\"}\n").unwrap();

        let mut records = open_json_lines(f.path()).unwrap();
        assert!(records.next().unwrap().is_ok());
        match records.next() {
            Some(Err(InputError::MalformedRecord { location, .. })) => assert!(location.ends_with(":2")),
            other => panic!("expected a malformed record, got {other:?}"),
        }
    }

    #[test]
    fn non_object_values_are_malformed() {
        let f = json_file("[1, 2, 3\n");
        let err = open_json_lines(f.path()).unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, InputError::MalformedRecord { .. }));

        let f = json_file("\"just a string\"\n");
        let err = open_json_lines(f.path()).unwrap().next().unwrap().unwrap_err();
        assert!(err.to_string().contains("found a string"));
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = open_json_lines(Path::new("/no/such/file.json")).err().unwrap();
        assert!(matches!(err, InputError::SourceNotFound { .. }));
    }
}
