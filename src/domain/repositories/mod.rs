//! Repository traits decoupling the domain from storage.

pub mod url_repository;
pub mod user_repository;

pub use url_repository::{
    BulkDeleteOutcome, ListQuery, Page, SortColumn, SortOrder, UrlRepository,
};
pub use user_repository::UserRepository;

#[cfg(test)]
pub use url_repository::MockUrlRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
