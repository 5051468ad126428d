//! Configuration resolution against a git-backed repository.
//!
//! `store` maintains local branch checkouts of one remote and answers file
//! and commit queries; `resolve` turns an (app, env, label) request into an
//! ordered, flattened set of property sources.

pub mod errors;
pub mod flatten;
pub mod properties;
pub mod repo_url;
pub mod resolve;
pub mod store;
pub mod testutils;

pub use errors::{ParseError, ResolveError, StoreError};
pub use resolve::{ConfigResolver, ConfigResponse, PropertySource};
pub use store::{GitStore, RepositoryStore};
