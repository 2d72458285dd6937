use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::domain::entities::book::{generate_book_id, Book};
use crate::helper::error_chain_fmt;

/// On-disk layout of the backing file: one top-level object with a `books` key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BooksDocument {
    books: Vec<Book>,
}

/// File-backed repository owning the authoritative book collection.
///
/// The full collection lives in memory, in insertion order, and is rewritten
/// to the backing file on every mutation. Mutating operations hold the write
/// lock across the whole read-modify-persist sequence, so concurrent requests
/// cannot interleave their file rewrites.
#[derive(Debug)]
pub struct BookFileRepository {
    path: PathBuf,
    books: RwLock<Vec<Book>>,
}

impl BookFileRepository {
    /// Opens the repository at `path`, creating the file with an empty
    /// collection if it does not exist yet.
    #[tracing::instrument(name = "Loading book repository from file")]
    pub fn load(path: impl Into<PathBuf> + std::fmt::Debug) -> Result<Self, BookFileRepositoryError> {
        let path = path.into();

        let books = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<BooksDocument>(&bytes)
                .with_context(|| {
                    format!(
                        "Backing file {} does not hold a valid book collection",
                        path.display()
                    )
                })?
                .books,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                write_document(&path, &BooksDocument::default())?;
                Vec::new()
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            path,
            books: RwLock::new(books),
        })
    }

    /// Returns the full collection, in insertion order.
    pub fn list(&self) -> Vec<Book> {
        self.books.read().clone()
    }

    /// Linear scan by identifier.
    pub fn find_by_id(&self, id: &str) -> Option<Book> {
        self.books.read().iter().find(|book| book.id == id).cloned()
    }

    /// Appends a new book built from `fields` under a freshly generated
    /// unique id, rewrites the backing file, and returns the stored record.
    #[tracing::instrument(name = "Creating book in repository", skip(self, fields))]
    pub fn create(&self, fields: Map<String, Value>) -> Result<Book, BookFileRepositoryError> {
        let mut books = self.books.write();

        // Re-rolls on the off chance a generated id is already taken.
        let id = loop {
            let candidate = generate_book_id();
            if !books.iter().any(|book| book.id == candidate) {
                break candidate;
            }
        };

        let book = Book::from_fields(id, fields);
        books.push(book.clone());
        self.persist(&books)?;

        Ok(book)
    }

    /// Shallow-merges `fields` into the book with the given id and rewrites
    /// the backing file. Returns `None` without touching the collection when
    /// the id does not exist; this is not an error.
    #[tracing::instrument(name = "Updating book in repository", skip(self, fields))]
    pub fn update(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Book>, BookFileRepositoryError> {
        let mut books = self.books.write();

        let Some(book) = books.iter_mut().find(|book| book.id == id) else {
            return Ok(None);
        };

        book.merge(fields);
        let updated = book.clone();
        self.persist(&books)?;

        Ok(Some(updated))
    }

    /// Deletes the book with the given id if present, then rewrites the
    /// backing file regardless of whether anything was removed.
    #[tracing::instrument(name = "Removing book from repository", skip(self))]
    pub fn remove(&self, id: &str) -> Result<(), BookFileRepositoryError> {
        let mut books = self.books.write();
        books.retain(|book| book.id != id);
        self.persist(&books)
    }

    /// Path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, books: &[Book]) -> Result<(), BookFileRepositoryError> {
        let document = BooksDocument {
            books: books.to_vec(),
        };
        write_document(&self.path, &document)
    }
}

/// Serializes the document to `<path>.tmp` and renames it over `path`, so a
/// crash mid-write cannot leave a half-written collection behind.
fn write_document(path: &Path, document: &BooksDocument) -> Result<(), BookFileRepositoryError> {
    let bytes = serde_json::to_vec_pretty(document)?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let tmp = path.with_extension(format!("{}.tmp", extension));

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
}

#[derive(thiserror::Error)]
pub enum BookFileRepositoryError {
    #[error("Failed to access the backing file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to serialize or parse the book collection: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for BookFileRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
