mod books;
mod health_check;

pub use books::{add_book, delete_book, get_book, list_books, update_book};
pub use health_check::health_check;
