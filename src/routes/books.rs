use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::helper::error_chain_fmt;
use crate::repositories::book_file_repository::{BookFileRepository, BookFileRepositoryError};

/// GET /books
///
/// Listing cannot fail: an empty collection is a valid result.
#[tracing::instrument(name = "List books handler", skip(repository))]
pub async fn list_books(repository: web::Data<BookFileRepository>) -> HttpResponse {
    HttpResponse::Ok().json(repository.list())
}

/// GET /books/{id}
#[tracing::instrument(name = "Get book handler", skip(repository))]
pub async fn get_book(
    repository: web::Data<BookFileRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, BooksApiError> {
    let id = path.into_inner();

    let book = repository
        .find_by_id(&id)
        .ok_or(BooksApiError::BookNotFound(id))?;

    Ok(HttpResponse::Ok().json(book))
}

/// POST /books
///
/// The body is taken as-is as the new book's fields; no shape is enforced
/// beyond being a JSON object. The id is generated server-side.
#[tracing::instrument(name = "Add book handler", skip(repository, body))]
pub async fn add_book(
    repository: web::Data<BookFileRepository>,
    body: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, BooksApiError> {
    let book = repository.create(body.into_inner())?;

    info!(book_id = %book.id, "Added a new book");
    Ok(HttpResponse::Created().json(json!({
        "message": "Book added successfully",
        "result": book,
    })))
}

/// PUT /books/{id}
///
/// Shallow-merges the body into the existing book. An unknown id is not an
/// error here: the response is 200 with a `null` body, mirroring the absent
/// lookup result.
#[tracing::instrument(name = "Update book handler", skip(repository, body))]
pub async fn update_book(
    repository: web::Data<BookFileRepository>,
    path: web::Path<String>,
    body: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, BooksApiError> {
    let id = path.into_inner();

    let updated = repository.update(&id, body.into_inner())?;
    if updated.is_some() {
        info!(book_id = %id, "Updated book");
    }

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /books/{id}
///
/// Responds 200 with an empty body whether or not the id existed.
#[tracing::instrument(name = "Delete book handler", skip(repository))]
pub async fn delete_book(
    repository: web::Data<BookFileRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, BooksApiError> {
    let id = path.into_inner();

    repository.remove(&id)?;

    Ok(HttpResponse::Ok().finish())
}

#[derive(thiserror::Error)]
pub enum BooksApiError {
    #[error("Book with id {0} not found")]
    BookNotFound(String),
    #[error(transparent)]
    RepositoryError(#[from] BookFileRepositoryError),
}

impl std::fmt::Debug for BooksApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for BooksApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            BooksApiError::BookNotFound(_) => StatusCode::NOT_FOUND,
            BooksApiError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from books handlers", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "message": self.to_string() }))
    }
}
