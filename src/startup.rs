use actix_cors::Cors;
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use std::net::TcpListener;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::Settings,
    repositories::book_file_repository::{BookFileRepository, BookFileRepositoryError},
    routes::{add_book, delete_book, get_book, health_check, list_books, update_book},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    RepositoryError(#[from] BookFileRepositoryError),
}

impl Application {
    #[tracing::instrument(name = "Building application")]
    pub fn build(settings: Settings) -> Result<Self, ApplicationBuildError> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        // The actual port: the configuration may ask for port 0 (tests)
        let port = listener.local_addr()?.port();

        let book_repository = BookFileRepository::load(settings.store.db_path.clone())?;

        let server = run(listener, book_repository)?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
pub fn run(
    listener: TcpListener,
    book_repository: BookFileRepository,
) -> Result<Server, std::io::Error> {
    // Wraps the repository in an `actix_web::Data` (`Arc`) to register it once
    // and access it from handlers. It is shared among all workers, so every
    // request sees the same collection.
    let book_repository = Data::new(book_repository);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            // The API is meant to be callable from browser clients on any
            // origin, so CORS is wide open.
            .wrap(Cors::permissive())
            .route("/health_check", web::get().to(health_check))
            .route("/books", web::get().to(list_books))
            .route("/books", web::post().to(add_book))
            .route("/books/{id}", web::get().to(get_book))
            .route("/books/{id}", web::put().to(update_book))
            .route("/books/{id}", web::delete().to(delete_book))
            .app_data(book_repository.clone())
    })
    .listen(listener)?;

    // No await
    Ok(server.run())
}
