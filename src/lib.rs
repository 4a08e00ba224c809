#![forbid(unsafe_code)]
//! # seqsource
//!
//! Uniform read access to **sequence records** stored as FASTA files,
//! line-delimited JSON files, or MongoDB collections.
//!
//! Every source implements [`SequenceInput`]: a data type tag, a memoized
//! [`as_list`](SequenceInput::as_list), and a lazy, restartable
//! [`as_generator`](SequenceInput::as_generator). Both views yield the same
//! records in the same order.
//!
//! ## Highlights
//! - 📂 **Files, lists, directories**: one path, many paths, or every matching file in a directory.
//! - 🐢 **Lazy**: nothing is opened or queried until the first record is pulled.
//! - 🧬 **Compressed FASTA**: gzip/bzip2/xz handled by `needletail`.
//!
//! ## Examples
//! ```no_run
//! use seqsource::{read_input, InputParams, SequenceInput};
//!
//! let params = InputParams::new("fasta", vec!["reads.fasta".into()]);
//! let input = read_input(params).unwrap();
//! for record in input.as_generator() {
//!     let record = record.unwrap();
//!     println!("{}\t{}", record.id().unwrap_or("-"), record.len());
//! }
//! ```
//!
//! ## Version
//! This build is "0.1.0".

pub mod config;
pub mod error;
pub mod fasta;
pub mod files;
pub mod input;
pub mod json;
pub mod logging;
pub mod mongo;
pub mod record;

pub use config::{DataType, InputParams};
pub use error::{InputError, Result};
pub use fasta::FastaInput;
pub use files::PathSource;
pub use input::{Records, SequenceInput};
pub use json::JsonInput;
pub use mongo::{Collections, DocumentStore, MongoConnection, MongoInput, MongoStore};
pub use record::SequenceRecord;

use tracing::debug;

/// Any of the three concrete sources, as built by [`read_input`].
pub enum InputSource {
    Fasta(FastaInput),
    Json(JsonInput),
    MongoDb(MongoInput),
}

impl SequenceInput for InputSource {
    fn data_type(&self) -> &'static str {
        match self {
            InputSource::Fasta(i) => i.data_type(),
            InputSource::Json(i) => i.data_type(),
            InputSource::MongoDb(i) => i.data_type(),
        }
    }

    fn as_list(&self) -> Result<&[SequenceRecord]> {
        match self {
            InputSource::Fasta(i) => i.as_list(),
            InputSource::Json(i) => i.as_list(),
            InputSource::MongoDb(i) => i.as_list(),
        }
    }

    fn as_generator(&self) -> Records<'_> {
        match self {
            InputSource::Fasta(i) => i.as_generator(),
            InputSource::Json(i) => i.as_generator(),
            InputSource::MongoDb(i) => i.as_generator(),
        }
    }
}

/// Build the source described by `params`.
///
/// `data_type` is matched case-insensitively against `fasta`, `json` and
/// `mongodb`. Nothing is opened or connected here.
///
/// # Examples
/// ```
/// use seqsource::{read_input, InputError, InputParams};
/// let err = read_input(InputParams::new("fastq", vec!["x".into()])).err().unwrap();
/// assert!(matches!(err, InputError::UnsupportedDataType(_)));
/// ```
pub fn read_input(params: InputParams) -> Result<InputSource> {
    let data_type = params.data_type()?;
    debug!(%data_type, "building input");

    Ok(match data_type {
        DataType::Fasta => {
            let input = FastaInput::new(params.path_source()?);
            InputSource::Fasta(match params.extension.clone() {
                Some(extension) => input.with_extension(extension),
                None => input,
            })
        }
        DataType::Json => InputSource::Json(JsonInput::new(params.path_source()?)),
        DataType::MongoDb => {
            let input = MongoInput::new(params.database()?, params.collections(), params.connection())
                .with_query(params.query.clone())
                .with_projection(params.projection.clone())
                .with_collection_filter(params.collection_prefix.clone(), params.collection_suffix.clone());
            InputSource::MongoDb(input)
        }
    })
}

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod factory_tests {
    use super::*;

    #[test]
    fn each_data_type_builds_its_variant() {
        let fasta = read_input(InputParams::new("FASTA", vec!["a.fasta".into()])).unwrap();
        assert_eq!(fasta.data_type(), "fasta");
        let json = read_input(InputParams::new("json", vec!["a.json".into()])).unwrap();
        assert_eq!(json.data_type(), "json");
        let mongo = read_input(InputParams::new("mongodb", vec!["db".into()])).unwrap();
        assert_eq!(mongo.data_type(), "mongodb");
    }

    #[test]
    fn mongo_params_are_carried_over() {
        let mut params = InputParams::new("mongo", vec!["antibodies".into()]);
        params.mongo_port = 27018;
        let InputSource::MongoDb(input) = read_input(params).unwrap() else {
            panic!("expected a MongoDB input");
        };
        assert_eq!(input.database(), "antibodies");
        assert_eq!(input.store().connection().port, 27018);
    }

    #[test]
    fn mongodb_needs_a_single_database() {
        let params = InputParams::new("mongodb", vec!["a".into(), "b".into()]);
        assert!(matches!(read_input(params), Err(InputError::Config(_))));
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = read_input(InputParams::new("csv", vec!["a.csv".into()])).err().unwrap();
        assert!(matches!(err, InputError::UnsupportedDataType(ref s) if s == "csv"));
    }
}
