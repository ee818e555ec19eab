//! HTTP adapter for the record editing core.
//!
//! [`ApiClient`] implements the upload, attachment and record services over a
//! small REST surface so a [`recordedit_core::SaveCoordinator`] can persist an
//! edit session against a live backend.

pub mod api;
pub mod config;

use std::sync::Arc;

use anyhow::Result;
use recordedit_core::{EditServices, EditTarget, EditorConfig, SaveCoordinator};

pub use api::ApiClient;
pub use config::ClientConfig;

/// Builds a save coordinator whose services all go through one [`ApiClient`].
pub fn coordinator_from_env(target: EditTarget) -> Result<SaveCoordinator> {
    let client = ApiClient::from_config(&ClientConfig::from_env()?)?;
    Ok(SaveCoordinator::new(
        target,
        EditServices::from_backend(Arc::new(client)),
        EditorConfig::from_env(),
    ))
}
