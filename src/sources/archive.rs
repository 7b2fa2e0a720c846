//! Source archives - fetching and unpacking release tarballs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::recipe::VersionSource;
use crate::util::fs::ensure_dir;
use crate::util::hash::{checksum_bytes, checksum_file, ensure_checksum};

/// Something that can place the sources of a version into a directory.
pub trait ArchiveProvider {
    /// Provider name for display.
    fn name(&self) -> &str;

    /// Fetch `source` and unpack it into `dest`, stripping its top directory.
    fn fetch(&self, source: &VersionSource, dest: &Path) -> Result<()>;
}

/// Downloads gzip tarballs over HTTP(S), verifying their SHA256.
///
/// Downloads are kept in a cache directory keyed by hash, so rebuilding a
/// configuration does not hit the network again.
#[derive(Debug, Clone)]
pub struct TarballProvider {
    cache_dir: Option<PathBuf>,
    offline: bool,
}

impl TarballProvider {
    /// Create a provider without a download cache.
    pub fn new() -> Self {
        TarballProvider {
            cache_dir: None,
            offline: false,
        }
    }

    /// Keep downloaded tarballs in `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Refuse to download; only cached tarballs can be used.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn cached_path(&self, source: &VersionSource) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.tgz", source.sha256.to_ascii_lowercase())))
    }

    /// Load the tarball bytes from cache or network.
    fn load(&self, source: &VersionSource) -> Result<Vec<u8>> {
        if let Some(cached) = self.cached_path(source) {
            if cached.exists() {
                if checksum_file(&cached)?.eq_ignore_ascii_case(&source.sha256) {
                    tracing::debug!("Using cached tarball {}", cached.display());
                    return std::fs::read(&cached)
                        .with_context(|| format!("failed to read {}", cached.display()));
                }
                tracing::warn!("Cached tarball {} is corrupt, refetching", cached.display());
            }
        }

        if self.offline {
            bail!(
                "{} is not cached and network access is disabled\n\
                 help: Disable `net.offline` in the config to download it",
                source.url
            );
        }

        let bytes = download(&source.url)?;

        let actual = checksum_bytes(&bytes);
        ensure_checksum(format!("tarball {}", source.url), &source.sha256, &actual)?;
        tracing::debug!("Tarball hash verified: {}", &actual[..16]);

        if let Some(cached) = self.cached_path(source) {
            if let Some(parent) = cached.parent() {
                ensure_dir(parent)?;
            }
            std::fs::write(&cached, &bytes)
                .with_context(|| format!("failed to cache tarball at {}", cached.display()))?;
        }

        Ok(bytes)
    }
}

impl Default for TarballProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveProvider for TarballProvider {
    fn name(&self) -> &str {
        "tarball"
    }

    fn fetch(&self, source: &VersionSource, dest: &Path) -> Result<()> {
        let bytes = self.load(source)?;

        extract_tarball(&bytes, dest, source.strip_prefix.as_deref())
            .with_context(|| format!("failed to extract tarball from {}", source.url))?;

        tracing::info!(
            "Extracted {} to {} (strip_prefix: {:?})",
            source.url,
            dest.display(),
            source.strip_prefix
        );
        Ok(())
    }
}

fn download(url: &str) -> Result<Vec<u8>> {
    tracing::info!("Downloading {}", url);

    let response = reqwest::blocking::get(url)
        .with_context(|| format!("failed to download tarball from {}", url))?;

    if !response.status().is_success() {
        bail!(
            "failed to download tarball from {}: HTTP {}",
            url,
            response.status()
        );
    }

    let bytes = response
        .bytes()
        .with_context(|| "failed to read tarball response body")?;
    Ok(bytes.to_vec())
}

/// Extract a gzip-compressed tarball to a destination directory.
///
/// If `strip_prefix` is provided, that leading directory is removed from
/// every entry, so `2.4.1.3/CLHEP/CMakeLists.txt` lands at
/// `<dest>/CLHEP/CMakeLists.txt`.
pub fn extract_tarball(data: &[u8], dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    use flate2::read::GzDecoder;
    use std::io::Cursor;
    use tar::Archive;

    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    ensure_dir(dest)?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();
        let normalized = entry_path.to_string_lossy().replace('\\', "/");

        let relative = match strip_prefix {
            Some(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                match normalized.strip_prefix(&format!("{}/", prefix)) {
                    Some(rest) => rest.to_string(),
                    None if normalized.trim_end_matches('/') == prefix => continue,
                    None => normalized.clone(),
                }
            }
            None => normalized.clone(),
        };

        if relative.is_empty() {
            continue;
        }

        let relative = Path::new(&relative);
        if relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir | std::path::Component::RootDir))
        {
            bail!("tarball entry escapes destination directory: {}", normalized);
        }

        let output_path = dest.join(relative);
        if let Some(parent) = output_path.parent() {
            ensure_dir(parent)?;
        }

        match entry.header().entry_type() {
            tar::EntryType::Directory => ensure_dir(&output_path)?,
            tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::Link => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            tar::EntryType::Symlink => {
                #[cfg(unix)]
                {
                    if let Ok(Some(target)) = entry.link_name() {
                        std::os::unix::fs::symlink(target.as_ref(), &output_path).with_context(
                            || format!("failed to create symlink: {}", output_path.display()),
                        )?;
                    }
                }
                #[cfg(windows)]
                {
                    tracing::debug!("Skipping symlink on Windows: {}", normalized);
                }
            }
            other => {
                tracing::debug!("Skipping unsupported entry type {:?}: {}", other, normalized);
            }
        }
    }

    Ok(())
}
