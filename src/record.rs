//! The record type produced by every input variant.
//!
//! A [`SequenceRecord`] is a bag of named fields with two well-known accessors,
//! [`SequenceRecord::id`] and [`SequenceRecord::sequence`]. FASTA input builds it
//! from `(residues, id)`; JSON and database input build it from whatever fields
//! the source document carries. No schema is shared between the two paths.
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Keys searched, in order, for a mapping record's identifier.
pub const ID_KEYS: &[&str] = &["seq_id", "id", "_id"];

/// Keys searched, in order, for a mapping record's residues.
pub const SEQUENCE_KEYS: &[&str] = &["sequence", "vdj_nt", "seq"];

/// One sequence entry with an identifier and associated fields.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceRecord {
    id: Option<String>,
    sequence: Option<String>,
    fields: Map<String, Value>,
}

impl SequenceRecord {
    /// Build a record from residues and an identifier (the FASTA path).
    ///
    /// # Examples
    /// ```
    /// let r = seqsource::SequenceRecord::new("ACGT", "seq1");
    /// assert_eq!(r.id(), Some("seq1"));
    /// assert_eq!(r.sequence(), Some("ACGT"));
    /// ```
    pub fn new(residues: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        let residues = residues.into();
        let mut fields = Map::new();
        fields.insert("id".into(), Value::String(id.clone()));
        fields.insert("sequence".into(), Value::String(residues.clone()));
        SequenceRecord { id: Some(id), sequence: Some(residues), fields }
    }

    /// Attach a FASTA header description (the text after the identifier).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.fields.insert("description".into(), Value::String(description.into()));
        self
    }

    /// Build a record from a field mapping (the JSON and database paths).
    ///
    /// The identifier is taken from the first key of [`ID_KEYS`] present, the
    /// residues from the first key of [`SEQUENCE_KEYS`] present.
    ///
    /// # Examples
    /// ```
    /// let fields = serde_json::json!({"id": "x", "vdj_nt": "ACGT", "isotype": "IgG"});
    /// let r = seqsource::SequenceRecord::from_fields(fields.as_object().unwrap().clone());
    /// assert_eq!(r.id(), Some("x"));
    /// assert_eq!(r.sequence(), Some("ACGT"));
    /// assert_eq!(r.get("isotype").and_then(|v| v.as_str()), Some("IgG"));
    /// ```
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let id = first_rendered(&fields, ID_KEYS);
        let sequence = first_rendered(&fields, SEQUENCE_KEYS);
        SequenceRecord { id, sequence, fields }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    /// Number of residues; zero when the record carries no sequence.
    pub fn len(&self) -> usize {
        self.sequence.as_ref().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl Serialize for SequenceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Render the first present, non-null value among `keys` as text.
///
/// Strings are used verbatim, extended-JSON object ids (`{"$oid": ".."}`) are
/// unwrapped, and any other value falls back to its JSON text.
fn first_rendered(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = keys.iter().filter_map(|k| fields.get(*k)).find(|v| !v.is_null())?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => match o.get("$oid") {
            Some(Value::String(oid)) if o.len() == 1 => Some(oid.clone()),
            _ => Some(value.to_string()),
        },
        other => Some(other.to_string()),
    }
}
