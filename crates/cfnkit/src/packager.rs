//! [`TemplatePackager`] backed by `aws cloudformation package`.

use crate::cli::{AwsCli, stderr, stdout};
use runbook::{ArtifactLocation, Error, Result, TemplatePackager, TemplateRef};
use std::path::Path;

/// Uploads local artifacts referenced by a template to S3.
#[derive(Debug, Clone, Default)]
pub struct AwsCliPackager {
    cli: AwsCli,
}

impl AwsCliPackager {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }
}

impl TemplatePackager for AwsCliPackager {
    /// Returns the packaged template as an inline body (the CLI prints it to
    /// stdout when no output file is given).
    fn package(&self, template: &Path, location: &ArtifactLocation) -> Result<TemplateRef> {
        let packaging_error = |message: String| Error::Packaging {
            path: template.to_path_buf(),
            message,
        };
        if location.bucket.trim().is_empty() {
            return Err(packaging_error("no ArtifactStore bucket configured".to_string()));
        }
        if !template.is_file() {
            return Err(packaging_error("template file not found".to_string()));
        }

        let template_arg = template.to_string_lossy();
        let output = self
            .cli
            .run(
                &[
                    "package",
                    "--template-file",
                    &template_arg,
                    "--s3-bucket",
                    &location.bucket,
                    "--s3-prefix",
                    &location.prefix,
                ],
                &location.region,
                &location.account,
            )
            .map_err(|e| packaging_error(e.to_string()))?;

        if !output.status.success() {
            return Err(packaging_error(stderr(&output).trim().to_string()));
        }
        let body = stdout(&output);
        if body.trim().is_empty() {
            return Err(packaging_error("package produced an empty template".to_string()));
        }
        log::info!(
            "packaged {} into s3://{}/{}",
            template.display(),
            location.bucket,
            location.prefix
        );
        Ok(TemplateRef::Body(body))
    }
}
