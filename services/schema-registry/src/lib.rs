//! Client for a remote metric schema registry.
//!
//! A registry stores named, versioned, content-addressed schema definitions
//! and hands back opaque ids for later retrieval. This crate builds schema
//! definitions in memory ([`Schema`], [`Record`]), converts them to and from
//! the canonical JSON wire form ([`codec`]), and talks to the registry over
//! HTTP ([`RegistryClient`]): add, get, delete, and listing by name, id or
//! content digest.
//!
//! ```no_run
//! # async fn example() -> Result<(), schema_registry::RegistryError> {
//! use schema_registry::{RegistryClient, Schema, ValueType};
//!
//! let client = RegistryClient::new(["https://registry.example.com"], None)?;
//!
//! let mut schema = Schema::new("test");
//! schema.add_metric("one", None, ValueType::S64)?;
//!
//! let id = client.add(&schema).await?;
//! let fetched = client.get(&id).await?;
//! assert_eq!(fetched.name(), "test");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod digest;
mod error;
pub mod schema;
pub mod types;

pub use self::client::RegistryClient;
pub use self::digest::{Digest, ParseDigestError, DIGEST_LENGTH};
pub use self::error::RegistryError;
pub use self::schema::{FieldDef, Record, Schema, SchemaError};
pub use self::types::ValueType;
