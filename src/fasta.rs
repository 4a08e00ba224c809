//! FASTA files as a record source.
//!
//! Parsing is done with `needletail`, so gzip/bzip2/xz-compressed FASTA is read
//! transparently. Each parsed entry becomes `SequenceRecord::new(residues, id)`,
//! where `id` is the first whitespace-delimited token of the header and the rest
//! of the header, if any, is kept as the `description` field.
//!
//! ### Directory inputs
//! A directory expands to the files whose extension matches
//! [`FastaInput::DIRECTORY_EXTENSION`], which is `"json"`. That value is
//! almost certainly wrong for FASTA, but it is the long-standing behaviour, so
//! it stays and a warning is logged whenever a directory is expanded with it.
//! Use [`FastaInput::with_extension`] to pick the extension explicitly.
use std::cell::OnceCell;
use std::fs::File;
use std::path::{Path, PathBuf};

use needletail::errors::ParseErrorKind;
use needletail::parser::{Format, FastxReader};
use needletail::parse_fastx_reader;
use tracing::{debug, trace, warn};

use crate::error::{InputError, Result};
use crate::files::PathSource;
use crate::input::{memoized, Records, SequenceInput, Walk};
use crate::record::SequenceRecord;

/// FASTA input over one file, a list of files, or a directory.
pub struct FastaInput {
    source: PathSource,
    extension: String,
    cache: OnceCell<Vec<SequenceRecord>>,
}

impl FastaInput {
    /// Extension used to filter directory listings unless overridden.
    pub const DIRECTORY_EXTENSION: &'static str = "json";

    pub fn new(source: impl Into<PathSource>) -> Self {
        FastaInput {
            source: source.into(),
            extension: Self::DIRECTORY_EXTENSION.to_string(),
            cache: OnceCell::new(),
        }
    }

    /// Filter directory listings by `extension` instead of the default.
    ///
    /// # Examples
    /// ```no_run
    /// use seqsource::{FastaInput, SequenceInput};
    /// let input = FastaInput::new("reads/").with_extension("fasta");
    /// for record in input.as_generator() {
    ///     let record = record.unwrap();
    ///     println!("{:?}\t{}", record.id(), record.len());
    /// }
    /// ```
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn source(&self) -> &PathSource {
        &self.source
    }

    /// The ordered file list this input reads, resolved now.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if let Some(dir) = self.source.directory() {
            if self.extension == Self::DIRECTORY_EXTENSION {
                warn!(
                    directory = %dir.display(),
                    "expanding a FASTA directory with the '{}' extension filter; \
                     use FastaInput::with_extension to select FASTA files",
                    Self::DIRECTORY_EXTENSION
                );
            }
        }
        self.source.resolve(&self.extension)
    }
}

impl SequenceInput for FastaInput {
    fn data_type(&self) -> &'static str {
        "fasta"
    }

    fn as_list(&self) -> Result<&[SequenceRecord]> {
        memoized(&self.cache, self.data_type(), self.as_generator())
    }

    fn as_generator(&self) -> Records<'_> {
        Box::new(Walk::new(move || self.files(), |path: PathBuf| open_fasta(&path)))
    }
}

/// Open one FASTA file and stream its records in parse order.
pub fn open_fasta(path: &Path) -> Result<Records<'static>> {
    let file = File::open(path).map_err(|e| InputError::not_found(path, e))?;
    debug!(path = %path.display(), "opened FASTA file");

    match parse_fastx_reader(file) {
        Ok(reader) => Ok(Box::new(FastaRecords { path: path.to_path_buf(), reader })),
        Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => Ok(Box::new(std::iter::empty::<Result<SequenceRecord>>())),
        Err(e) => Err(InputError::malformed(path.display().to_string(), e)),
    }
}

struct FastaRecords {
    path: PathBuf,
    reader: Box<dyn FastxReader>,
}

impl Iterator for FastaRecords {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let parsed = match self.reader.next()? {
            Ok(rec) => rec,
            Err(e) => return Some(Err(InputError::malformed(self.path.display().to_string(), e))),
        };
        if matches!(parsed.format(), Format::Fastq) {
            return Some(Err(InputError::malformed(
                self.path.display().to_string(),
                "expected FASTA records, found FASTQ",
            )));
        }

        let location = || self.path.display().to_string();
        let header = match std::str::from_utf8(parsed.id()) {
            Ok(h) => h,
            Err(e) => return Some(Err(InputError::malformed(location(), format!("header: {e}")))),
        };
        let residues = match String::from_utf8(parsed.seq().into_owned()) {
            Ok(r) => r,
            Err(e) => return Some(Err(InputError::malformed(location(), format!("sequence: {e}")))),
        };
        let (id, description) = split_header(header);
        trace!(id, len = residues.len(), "parsed FASTA record");

        let record = SequenceRecord::new(residues, id);
        Some(Ok(match description {
            Some(d) => record.with_description(d),
            None => record,
        }))
    }
}

/// Split a FASTA header into its identifier and optional description.
fn split_header(header: &str) -> (&str, Option<&str>) {
    let header = header.trim();
    match header.split_once(char::is_whitespace) {
        Some((id, rest)) => {
            let rest = rest.trim();
            (id, if rest.is_empty() { None } else { Some(rest) })
        }
        None => (header, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    fn fasta_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[rstest]
    #[case("seq1", ("seq1", None))]
    #[case("seq1 IGHV1-2*02 productive", ("seq1", Some("IGHV1-2*02 productive")))]
    #[case("seq1\tsample=A ", ("seq1", Some("sample=A")))]
    fn headers_split_on_first_whitespace(#[case] header: &str, #[case] expected: (&str, Option<&str>)) {
        assert_eq!(split_header(header), expected);
    }

    #[test]
    fn two_record_file_in_order() {
        let f = fasta_file(">seq1\nACGT\n>seq2\nTTTT\n");
        let input = FastaInput::new(PathSource::Single(f.path().to_path_buf()));
        let records = input.as_list().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), Some("seq1"));
        assert_eq!(records[0].sequence(), Some("ACGT"));
        assert_eq!(records[1].id(), Some("seq2"));
        assert_eq!(records[1].sequence(), Some("TTTT"));
    }

    #[test]
    fn wrapped_sequence_lines_are_joined() {
        let f = fasta_file(">long desc here\nACGT\nACGT\nAC\n");
        let records: Vec<_> = open_fasta(f.path()).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records[0].sequence(), Some("ACGTACGTAC"));
        assert_eq!(records[0].get("description").and_then(|v| v.as_str()), Some("desc here"));
    }

    #[test]
    fn empty_file_has_no_records() {
        let f = fasta_file("");
        assert_eq!(open_fasta(f.path()).unwrap().count(), 0);
    }

    #[test]
    fn non_fasta_content_is_malformed() {
        let f = fasta_file("this is not a fasta file\n");
        let err = FastaInput::new(PathSource::Single(f.path().to_path_buf()))
            .as_list()
            .unwrap_err();
        assert!(matches!(err, InputError::MalformedRecord { .. }));
    }

    #[test]
    fn fastq_content_is_malformed() {
        let f = fasta_file("@read1\nACGT\n+\nIIII\n");
        let mut records = open_fasta(f.path()).unwrap();
        assert!(matches!(records.next(), Some(Err(InputError::MalformedRecord { .. }))));
    }

    #[test]
    fn invalid_utf8_is_malformed_not_replaced() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b">s\xff1\nACGT\n").unwrap();
        let mut records = open_fasta(f.path()).unwrap();
        assert!(matches!(records.next(), Some(Err(InputError::MalformedRecord { .. }))));

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b">s1\nAC\xffGT\n").unwrap();
        let mut records = open_fasta(f.path()).unwrap();
        assert!(matches!(records.next(), Some(Err(InputError::MalformedRecord { .. }))));
    }

    #[test]
    fn gzipped_fasta_is_read_transparently() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let f = tempfile::Builder::new().suffix(".fasta.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(f.reopen().unwrap(), Compression::default());
        encoder.write_all(b">seq1\nACGT\n").unwrap();
        encoder.finish().unwrap();

        let records: Vec<_> = open_fasta(f.path()).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("seq1"));
        assert_eq!(records[0].sequence(), Some("ACGT"));
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let input = FastaInput::new(PathSource::Single("/no/such/reads.fasta".into()));
        let mut records = input.as_generator();
        assert!(matches!(records.next(), Some(Err(InputError::SourceNotFound { .. }))));
        assert!(records.next().is_none());
    }

    #[test]
    fn directory_uses_the_configured_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.fasta"), ">a\nAAAA\n").unwrap();
        std::fs::write(dir.path().join("b.json"), ">b\nCCCC\n").unwrap();

        let default = FastaInput::new(PathSource::Directory(dir.path().to_path_buf()));
        let ids: Vec<_> = default.as_list().unwrap().iter().map(|r| r.id().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["b"]);

        let explicit = FastaInput::new(PathSource::Directory(dir.path().to_path_buf())).with_extension("fasta");
        let ids: Vec<_> = explicit.as_list().unwrap().iter().map(|r| r.id().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
