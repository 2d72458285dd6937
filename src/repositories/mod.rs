pub mod book_file_repository;
