//! Template packaging collaborator

use crate::descriptor::{AccountSelector, TemplateRef};
use crate::error::{Error, Result};
use std::path::Path;

/// Where packaged artifacts are uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub bucket: String,
    pub region: String,
    /// Key prefix, normally the stack name
    pub prefix: String,
    pub account: AccountSelector,
}

/// Uploads local template artifacts and returns the template to submit.
pub trait TemplatePackager: Send + Sync {
    /// Package `template` and return a reference to the packaged template
    /// (an inline body or a remote URL, never a local path).
    fn package(&self, template: &Path, location: &ArtifactLocation) -> Result<TemplateRef>;
}

/// Packager for runs where packaging is not available.
pub struct NoPackager;

impl TemplatePackager for NoPackager {
    fn package(&self, template: &Path, _location: &ArtifactLocation) -> Result<TemplateRef> {
        Err(Error::Packaging {
            path: template.to_path_buf(),
            message: "no template packager configured".to_string(),
        })
    }
}
