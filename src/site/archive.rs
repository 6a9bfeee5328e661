//! Zip archive of the finished site.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::scan::relative_name;
use crate::error::SiteGenError;

pub fn archive_name(slug: &str) -> String {
    format!("{}_site.zip", slug)
}

/// Zip every file under `site_dir` into `<out_dir>/<slug>_site.zip`, with
/// entry names relative to the site root. Returns the archive path.
pub fn archive_site(site_dir: &Path, out_dir: &Path, slug: &str) -> Result<PathBuf> {
    if !site_dir.is_dir() {
        return Err(SiteGenError::setup(format!(
            "site directory not found: {}",
            site_dir.display()
        ))
        .into());
    }

    let mut files: Vec<PathBuf> = WalkBuilder::new(site_dir)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let archive_path = out_dir.join(archive_name(slug));
    let file = File::create(&archive_path)
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = relative_name(site_dir, path);
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", name))?;
        zip.write_all(&bytes)?;
    }
    zip.finish().context("Failed to finish archive")?;

    info!(
        "  ✓ Archived {} files to {}",
        files.len(),
        archive_path.display()
    );
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::write_file;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_archive_site() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("docs");
        write_file(&site.join("index.html"), "<html>home</html>").unwrap();
        write_file(&site.join("insights/a-1.html"), "<html>a</html>").unwrap();

        let path = archive_site(&site, dir.path(), "ocean-works").unwrap();
        assert_eq!(path, dir.path().join("ocean-works_site.zip"));

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("insights/a-1.html")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<html>a</html>");
    }

    #[test]
    fn test_missing_site_dir() {
        let dir = TempDir::new().unwrap();
        assert!(archive_site(&dir.path().join("docs"), dir.path(), "x").is_err());
    }
}
