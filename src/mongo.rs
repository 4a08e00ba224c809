//! MongoDB collections as a record source.
//!
//! [`MongoInput`] resolves its collection selection, then runs one
//! find-style query per collection with the configured filter and projection.
//! Every matching document becomes `SequenceRecord::from_fields(document)`.
//!
//! The database itself sits behind [`DocumentStore`]. [`MongoStore`] is the
//! driver-backed implementation; it connects on first use and reuses that
//! client for every query made through the same input.
use std::cell::OnceCell;

use mongodb::bson::{self, Bson, Document as BsonDocument};
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::options::{ClientOptions, Credential, FindOptions, ServerAddress};
use mongodb::sync::{Client, Database};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{InputError, Result};
use crate::input::{memoized, Records, SequenceInput, Walk};
use crate::record::SequenceRecord;

/// A database document in its JSON form.
pub type Document = Map<String, Value>;

/// A stream of documents from one collection.
pub type Documents<'a> = Box<dyn Iterator<Item = Result<Document>> + 'a>;

/// Which collections to read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Collections {
    /// One named collection.
    Single(String),
    /// Named collections, read in the given order.
    List(Vec<String>),
    /// Every non-system collection in the database, sorted by name.
    #[default]
    All,
}

impl From<&str> for Collections {
    fn from(name: &str) -> Self {
        Collections::Single(name.to_string())
    }
}

impl From<String> for Collections {
    fn from(name: String) -> Self {
        Collections::Single(name)
    }
}

impl From<Vec<String>> for Collections {
    fn from(names: Vec<String>) -> Self {
        Collections::List(names)
    }
}

impl<T: Into<Collections>> From<Option<T>> for Collections {
    fn from(selection: Option<T>) -> Self {
        selection.map_or(Collections::All, Into::into)
    }
}

/// Server address and credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConnection {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for MongoConnection {
    fn default() -> Self {
        MongoConnection { host: "localhost".to_string(), port: 27017, user: None, password: None }
    }
}

/// Database access needed by [`MongoInput`].
pub trait DocumentStore {
    /// Names of all collections, in any order.
    fn list_collections(&self) -> Result<Vec<String>>;

    /// Documents of `collection` matching `filter`, restricted to `projection`.
    ///
    /// `None` means "match everything" and "return every field" respectively.
    /// Documents come back in the store's native order.
    fn find(
        &self,
        collection: &str,
        filter: Option<&Document>,
        projection: Option<&Document>,
    ) -> Result<Documents<'_>>;
}

/// [`DocumentStore`] backed by a MongoDB server.
pub struct MongoStore {
    database: String,
    connection: MongoConnection,
    db: OnceCell<Database>,
}

impl MongoStore {
    pub fn new(database: impl Into<String>, connection: MongoConnection) -> Self {
        MongoStore { database: database.into(), connection, db: OnceCell::new() }
    }

    pub fn connection(&self) -> &MongoConnection {
        &self.connection
    }

    /// The database handle, connecting on first use.
    fn db(&self) -> Result<&Database> {
        if let Some(db) = self.db.get() {
            return Ok(db);
        }
        let client = connect(&self.connection)?;
        debug!(host = %self.connection.host, port = self.connection.port, database = %self.database, "connected to MongoDB");
        Ok(self.db.get_or_init(|| client.database(&self.database)))
    }
}

fn connect(conn: &MongoConnection) -> Result<Client> {
    let address = ServerAddress::parse(format!("{}:{}", conn.host, conn.port))
        .map_err(|e| InputError::Connection(e.to_string()))?;

    let mut options = ClientOptions::default();
    options.hosts = vec![address];
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    // Credentials only apply as a pair.
    if let (Some(user), Some(password)) = (&conn.user, &conn.password) {
        let mut credential = Credential::default();
        credential.username = Some(user.clone());
        credential.password = Some(password.clone());
        options.credential = Some(credential);
    }

    Client::with_options(options).map_err(|e| InputError::Connection(e.to_string()))
}

/// Sort driver failures into connection problems and rejected queries.
fn classify(e: DriverError, collection: &str) -> InputError {
    match e.kind.as_ref() {
        ErrorKind::Authentication { .. }
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Io(_) => InputError::Connection(e.to_string()),
        _ => InputError::Query { collection: collection.to_string(), reason: e.to_string() },
    }
}

fn to_bson(doc: &Document, collection: &str) -> Result<BsonDocument> {
    bson::to_document(doc)
        .map_err(|e| InputError::Query { collection: collection.to_string(), reason: e.to_string() })
}

/// Relaxed extended JSON keeps plain numbers and strings as-is and wraps the
/// BSON-only types, e.g. `{"$oid": ".."}`.
fn to_json(doc: BsonDocument) -> Document {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

impl DocumentStore for MongoStore {
    fn list_collections(&self) -> Result<Vec<String>> {
        self.db()?
            .list_collection_names()
            .run()
            .map_err(|e| classify(e, "<list collections>"))
    }

    fn find(
        &self,
        collection: &str,
        filter: Option<&Document>,
        projection: Option<&Document>,
    ) -> Result<Documents<'_>> {
        let filter = filter.map(|f| to_bson(f, collection)).transpose()?.unwrap_or_default();
        let mut options = FindOptions::default();
        options.projection = projection.map(|p| to_bson(p, collection)).transpose()?;

        let cursor = self
            .db()?
            .collection::<BsonDocument>(collection)
            .find(filter)
            .with_options(options)
            .run()
            .map_err(|e| classify(e, collection))?;

        let name = collection.to_string();
        Ok(Box::new(cursor.map(move |doc| doc.map(to_json).map_err(|e| classify(e, &name)))))
    }
}

/// Database-backed input over one, several, or all collections of a database.
pub struct MongoInput<S = MongoStore> {
    database: String,
    collections: Collections,
    query: Option<Document>,
    projection: Option<Document>,
    prefix: Option<String>,
    suffix: Option<String>,
    store: S,
    cache: OnceCell<Vec<SequenceRecord>>,
}

impl MongoInput<MongoStore> {
    /// Input over `database` on the server described by `connection`.
    ///
    /// No connection is made until records are first requested.
    ///
    /// # Examples
    /// ```no_run
    /// use seqsource::{MongoConnection, MongoInput, SequenceInput};
    /// let input = MongoInput::new("antibodies", "donor_1", MongoConnection::default());
    /// println!("{} records", input.as_list().unwrap().len());
    /// ```
    pub fn new(database: impl Into<String>, collections: impl Into<Collections>, connection: MongoConnection) -> Self {
        let database = database.into();
        let store = MongoStore::new(database.clone(), connection);
        MongoInput::with_store(database, collections, store)
    }
}

impl<S: DocumentStore> MongoInput<S> {
    /// Input reading from any [`DocumentStore`].
    pub fn with_store(database: impl Into<String>, collections: impl Into<Collections>, store: S) -> Self {
        MongoInput {
            database: database.into(),
            collections: collections.into(),
            query: None,
            projection: None,
            prefix: None,
            suffix: None,
            store,
            cache: OnceCell::new(),
        }
    }

    /// Restrict every query with `filter`; `None` matches all documents.
    pub fn with_query(mut self, filter: Option<Document>) -> Self {
        self.query = filter;
        self
    }

    /// Select fields with `projection`; `None` returns all fields.
    pub fn with_projection(mut self, projection: Option<Document>) -> Self {
        self.projection = projection;
        self
    }

    /// Narrow the automatic collection listing by name prefix and/or suffix.
    ///
    /// Has no effect when collections are named explicitly.
    pub fn with_collection_filter(mut self, prefix: Option<String>, suffix: Option<String>) -> Self {
        self.prefix = prefix;
        self.suffix = suffix;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The ordered collection list this input reads, resolved now.
    pub fn collections(&self) -> Result<Vec<String>> {
        match &self.collections {
            Collections::Single(name) => Ok(vec![name.clone()]),
            Collections::List(names) => Ok(names.clone()),
            Collections::All => {
                let mut names: Vec<String> = self
                    .store
                    .list_collections()?
                    .into_iter()
                    .filter(|n| !n.starts_with("system."))
                    .filter(|n| self.prefix.as_deref().is_none_or(|p| n.starts_with(p)))
                    .filter(|n| self.suffix.as_deref().is_none_or(|s| n.ends_with(s)))
                    .collect();
                names.sort();
                debug!(database = %self.database, n_collections = names.len(), "listed collections");
                Ok(names)
            }
        }
    }

    fn query_collection(&self, collection: String) -> Result<Records<'_>> {
        debug!(database = %self.database, collection = %collection, "querying collection");
        let docs = self.store.find(&collection, self.query.as_ref(), self.projection.as_ref())?;
        Ok(Box::new(docs.map(move |doc| {
            doc.map(|fields| {
                trace!(collection = %collection, "read document");
                SequenceRecord::from_fields(fields)
            })
        })))
    }
}

impl<S: DocumentStore> SequenceInput for MongoInput<S> {
    fn data_type(&self) -> &'static str {
        "mongodb"
    }

    fn as_list(&self) -> Result<&[SequenceRecord]> {
        memoized(&self.cache, self.data_type(), self.as_generator())
    }

    fn as_generator(&self) -> Records<'_> {
        Box::new(Walk::new(move || self.collections(), move |c| self.query_collection(c)))
    }
}
