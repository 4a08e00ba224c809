//! Factory parameters: the data type discriminator and everything needed to
//! build a source, loadable from TOML.
//!
//! ```toml
//! data_type = "mongodb"
//! input = "antibodies"
//! collections = ["donor_1", "donor_2"]
//! mongo_ip = "10.0.0.5"
//!
//! [query]
//! isotype = "IgG"
//! ```
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{InputError, Result};
use crate::files::PathSource;
use crate::mongo::{Collections, Document, MongoConnection};

/// The three supported source kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Fasta,
    Json,
    MongoDb,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Fasta => "fasta",
            DataType::Json => "json",
            DataType::MongoDb => "mongodb",
        }
    }
}

impl FromStr for DataType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fasta" => Ok(DataType::Fasta),
            "json" => Ok(DataType::Json),
            "mongodb" | "mongo" => Ok(DataType::MongoDb),
            _ => Err(InputError::UnsupportedDataType(s.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value given either once or as a list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn default_mongo_ip() -> String {
    MongoConnection::default().host
}

fn default_mongo_port() -> u16 {
    MongoConnection::default().port
}

/// Everything [`crate::read_input`] needs to build a source.
///
/// `input` holds file or directory paths for `fasta`/`json`, and the database
/// name for `mongodb`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InputParams {
    pub data_type: String,
    pub input: OneOrMany,
    #[serde(default)]
    pub collections: Option<OneOrMany>,
    #[serde(default = "default_mongo_ip")]
    pub mongo_ip: String,
    #[serde(default = "default_mongo_port")]
    pub mongo_port: u16,
    #[serde(default)]
    pub mongo_user: Option<String>,
    #[serde(default)]
    pub mongo_password: Option<String>,
    #[serde(default)]
    pub query: Option<Document>,
    #[serde(default)]
    pub projection: Option<Document>,
    #[serde(default)]
    pub collection_prefix: Option<String>,
    #[serde(default)]
    pub collection_suffix: Option<String>,
    /// Directory listing filter for `fasta`; the long-standing `json` default otherwise.
    #[serde(default)]
    pub extension: Option<String>,
}

impl InputParams {
    /// Parameters for `data_type` over `input`, everything else defaulted.
    pub fn new(data_type: impl Into<String>, input: Vec<String>) -> Self {
        InputParams {
            data_type: data_type.into(),
            input: OneOrMany::Many(input),
            collections: None,
            mongo_ip: default_mongo_ip(),
            mongo_port: default_mongo_port(),
            mongo_user: None,
            mongo_password: None,
            query: None,
            projection: None,
            collection_prefix: None,
            collection_suffix: None,
            extension: None,
        }
    }

    /// Load parameters from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| InputError::not_found(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| InputError::Config(e.to_string()))
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.data_type.parse()
    }

    /// Paths for the file-based types: one entry is classified on disk each
    /// time it is read, several entries are read as a list.
    pub fn path_source(&self) -> Result<PathSource> {
        let mut paths: Vec<PathBuf> = self.input.clone().into_vec().into_iter().map(PathBuf::from).collect();
        match paths.len() {
            0 => Err(InputError::Config("no input path given".into())),
            1 => Ok(PathSource::from_path(paths.remove(0))),
            _ => Ok(PathSource::List(paths)),
        }
    }

    /// The database name for `mongodb`; exactly one is required.
    pub fn database(&self) -> Result<String> {
        match self.input.clone().into_vec().as_slice() {
            [name] if !name.is_empty() => Ok(name.clone()),
            other => Err(InputError::Config(format!(
                "mongodb input needs exactly one database name, got {}",
                other.len()
            ))),
        }
    }

    pub fn collections(&self) -> Collections {
        match self.collections.clone() {
            None => Collections::All,
            Some(OneOrMany::One(name)) => Collections::Single(name),
            Some(OneOrMany::Many(names)) => Collections::List(names),
        }
    }

    pub fn connection(&self) -> MongoConnection {
        MongoConnection {
            host: self.mongo_ip.clone(),
            port: self.mongo_port,
            user: self.mongo_user.clone(),
            password: self.mongo_password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("fasta", DataType::Fasta)]
    #[case("JSON", DataType::Json)]
    #[case("mongodb", DataType::MongoDb)]
    #[case(" mongo ", DataType::MongoDb)]
    fn data_types_parse(#[case] s: &str, #[case] expected: DataType) {
        assert_eq!(s.parse::<DataType>().unwrap(), expected);
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let err = "fastq".parse::<DataType>().unwrap_err();
        assert!(matches!(err, InputError::UnsupportedDataType(s) if s == "fastq"));
    }

    #[test]
    fn toml_with_defaults() {
        let params = InputParams::from_toml_str("data_type = \"fasta\"\ninput = \"reads.fasta\"\n").unwrap();
        assert_eq!(params.input, OneOrMany::One("reads.fasta".into()));
        assert_eq!(params.connection(), MongoConnection::default());
        assert_eq!(params.collections(), Collections::All);
        assert_eq!(params.path_source().unwrap(), PathSource::Auto("reads.fasta".into()));
    }

    #[test]
    fn toml_mongo_params() {
        let text = r#"
            data_type = "mongodb"
            input = "antibodies"
            collections = ["donor_1", "donor_2"]
            mongo_ip = "10.0.0.5"
            mongo_port = 27018
            mongo_user = "reader"
            mongo_password = "s3cret"

            [query]
            isotype = "IgG"

            [projection]
            seq_id = 1
        "#;
        let params = InputParams::from_toml_str(text).unwrap();
        assert_eq!(params.data_type().unwrap(), DataType::MongoDb);
        assert_eq!(params.database().unwrap(), "antibodies");
        assert_eq!(params.collections(), Collections::List(vec!["donor_1".into(), "donor_2".into()]));
        assert_eq!(params.connection().port, 27018);
        assert_eq!(params.connection().user.as_deref(), Some("reader"));
        assert_eq!(params.query.unwrap().get("isotype"), Some(&serde_json::json!("IgG")));
        assert_eq!(params.projection.unwrap().get("seq_id"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn several_paths_become_a_list() {
        let params = InputParams::new("json", vec!["a.json".into(), "b.json".into()]);
        assert_eq!(
            params.path_source().unwrap(),
            PathSource::List(vec!["a.json".into(), "b.json".into()])
        );
        assert!(params.database().is_err());
    }

    #[test]
    fn empty_input_is_a_config_error() {
        let params = InputParams::new("fasta", vec![]);
        assert!(matches!(params.path_source(), Err(InputError::Config(_))));
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(InputParams::from_toml_str("data_type = "), Err(InputError::Config(_))));
    }
}
