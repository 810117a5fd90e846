//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod bigquery_client;
mod brand_registry_file;
mod cloud_clients;
mod gcs_object_store;
mod google_access_token;
mod in_memory_object_store;
mod in_memory_transcript_warehouse;

pub use bigquery_client::{BigQueryClient, DEFAULT_BIGQUERY_BASE_URL};
pub use brand_registry_file::load_brand_registry;
pub use cloud_clients::{CloudClientSettings, connect_wipeout_service};
pub use gcs_object_store::{DEFAULT_STORAGE_BASE_URL, GcsObjectStore};
pub use google_access_token::{
    AccessTokenProvider, GoogleAccessTokenProvider, StaticAccessTokenProvider,
};
pub use in_memory_object_store::InMemoryObjectStore;
pub use in_memory_transcript_warehouse::{InMemoryTranscriptWarehouse, TranscriptTurn};
