use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Length of generated book identifiers
pub const BOOK_ID_LENGTH: usize = 8;

/// A book record.
///
/// Only `id` is fixed by the system. Everything else the client sends
/// (`title`, `author`, or any other JSON property) is kept verbatim in the
/// flattened `fields` map: the record is an open map, not a closed schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Book {
    /// Builds a record from client-supplied fields.
    ///
    /// A caller-supplied `id` key is discarded: the identifier is never
    /// client-controlled, and a leftover `id` entry in the flattened map
    /// would shadow the real one on serialization.
    pub fn from_fields(id: String, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self { id, fields }
    }

    /// Shallow merge: existing keys are overwritten, new keys are added,
    /// untouched keys are left as they are. `id` is never overwritten.
    pub fn merge(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            if key == "id" {
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}

/// Generates a short random alphanumeric identifier (A-Z, a-z, 0-9).
///
/// Uniqueness against the existing collection is the caller's concern.
pub fn generate_book_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOOK_ID_LENGTH)
        .map(char::from)
        .collect()
}
