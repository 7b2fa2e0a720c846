//! Applying recipe patches to unpacked sources.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::hash::{checksum_file, ensure_checksum};
use crate::util::process::{find_executable, ProcessBuilder};

/// A patch file together with the hash it must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub path: PathBuf,
    pub sha256: String,
}

impl PatchFile {
    pub fn new(path: impl Into<PathBuf>, sha256: impl Into<String>) -> Self {
        PatchFile {
            path: path.into(),
            sha256: sha256.into(),
        }
    }
}

/// Something that can apply patches to a source tree.
pub trait PatchApplier {
    /// Apply `patches` in order to the tree rooted at `source_dir`.
    fn apply(&self, patches: &[PatchFile], source_dir: &Path) -> Result<()>;
}

/// Applies patches with `git apply`, which works outside of repositories.
#[derive(Debug, Clone, Default)]
pub struct GitApply;

impl GitApply {
    fn git(&self, git: &Path, source_dir: &Path) -> ProcessBuilder {
        // Keep git from treating an enclosing repository as the patch root.
        let ceiling = source_dir.parent().unwrap_or(source_dir);
        ProcessBuilder::new(git)
            .env("GIT_CEILING_DIRECTORIES", ceiling.display().to_string())
            .cwd(source_dir)
    }

    fn apply_single_patch(&self, git: &Path, patch: &Path, source_dir: &Path) -> Result<()> {
        tracing::info!("Applying patch: {}", patch.display());

        let check = self
            .git(git, source_dir)
            .args(["apply", "--check"])
            .arg(patch)
            .exec()?;

        if !check.status.success() {
            let stderr = String::from_utf8_lossy(&check.stderr);
            bail!(
                "patch '{}' will not apply cleanly:\n{}",
                patch.display(),
                stderr
            );
        }

        self.git(git, source_dir)
            .arg("apply")
            .arg(patch)
            .exec_and_check()?;

        Ok(())
    }
}

impl PatchApplier for GitApply {
    fn apply(&self, patches: &[PatchFile], source_dir: &Path) -> Result<()> {
        if patches.is_empty() {
            return Ok(());
        }

        // Verify everything up front so a bad patch leaves the tree untouched.
        for patch in patches {
            verify_patch(patch)?;
        }

        let git = find_executable("git").ok_or_else(|| {
            anyhow::anyhow!(
                "git not found\n\
                 \n\
                 git is required to apply recipe patches.\n\
                 Install git and ensure it's in your PATH."
            )
        })?;

        for patch in patches {
            self.apply_single_patch(&git, &patch.path, source_dir)?;
        }

        Ok(())
    }
}

/// Check that a patch file exists and matches its recorded hash.
pub fn verify_patch(patch: &PatchFile) -> Result<()> {
    if !patch.path.exists() {
        bail!("patch file not found: {}", patch.path.display());
    }

    let actual = checksum_file(&patch.path)?;
    ensure_checksum(
        format!("patch file '{}'", patch.path.display()),
        &patch.sha256,
        &actual,
    )
}
