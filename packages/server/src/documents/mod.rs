//! Document storage: metadata rows in the database, bytes in the blob
//! repository, kept consistent by [`DocumentService`].

mod fetch;
mod service;
mod store;

pub use fetch::{FetchedContent, RemoteFetcher};
pub use service::{
    ContentSource, DocumentDownload, DocumentError, DocumentPage, DocumentService, MAX_NAME_LEN,
};
pub use store::{MetadataStore, SeaOrmMetadataStore};

#[cfg(test)]
pub(crate) use store::tests as store_tests;
