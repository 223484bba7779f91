use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StepsmithError};

use super::renderer::GeneratedArtifactSet;

/// Writes a rendered artifact set into the SBS-style output layout:
/// `features/`, `steps/`, and `pages/` under one output root.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Write all three artifacts, creating directories as needed. Refuses to
    /// write any blank artifact, and refuses to overwrite existing files
    /// unless `force` is set. The set is checked in full before the first
    /// byte is written, so a failed run leaves no partial triple behind.
    pub fn write_set(&self, set: &GeneratedArtifactSet, force: bool) -> Result<Vec<PathBuf>> {
        let targets = [
            (
                self.output_dir.join("features").join(set.feature_file_name()),
                &set.feature_text,
            ),
            (
                self.output_dir.join("steps").join(set.steps_file_name()),
                &set.steps_text,
            ),
            (
                self.output_dir.join("pages").join(set.page_file_name()),
                &set.page_text,
            ),
        ];

        for (path, content) in &targets {
            if content.trim().is_empty() {
                return Err(StepsmithError::EmptyArtifact(path.display().to_string()));
            }
            if !force && path.exists() {
                return Err(StepsmithError::Renderer(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
        }

        let mut written = Vec::with_capacity(targets.len());
        for (path, content) in targets {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> GeneratedArtifactSet {
        GeneratedArtifactSet {
            feature_text: "Feature: Login\n".to_string(),
            steps_text: "const { assert } = require('chai');\n".to_string(),
            page_text: "class LoginPage {}\n".to_string(),
            class_name: "LoginPage".to_string(),
            file_base_name: "login".to_string(),
        }
    }

    #[test]
    fn writes_the_triple_into_the_expected_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());

        let written = writer.write_set(&sample_set(), false).unwrap();
        assert_eq!(written.len(), 3);
        assert!(tmp.path().join("features/login.feature").exists());
        assert!(tmp.path().join("steps/login-steps.js").exists());
        assert!(tmp.path().join("pages/login-page.js").exists());
    }

    #[test]
    fn blank_artifacts_are_refused_before_anything_is_written() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());

        let mut set = sample_set();
        set.page_text = "   \n".to_string();

        let result = writer.write_set(&set, false);
        assert!(matches!(result, Err(StepsmithError::EmptyArtifact(_))));
        // Nothing from the set landed on disk.
        assert!(!tmp.path().join("features/login.feature").exists());
    }

    #[test]
    fn existing_files_require_force() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let set = sample_set();

        writer.write_set(&set, false).unwrap();
        assert!(writer.write_set(&set, false).is_err());
        assert!(writer.write_set(&set, true).is_ok());
    }
}
