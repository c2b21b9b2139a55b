use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Capability seam for bundling named byte entries into one download.
///
/// The export pipeline probes `is_available` instead of inspecting
/// concrete types; a builder that reports unavailable routes the
/// pipeline onto its documented fallback path.
pub trait ArchiveBuilder: Send {
    fn is_available(&self) -> bool;
    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Factory handed to the export pipeline; one builder per archive.
pub type ArchiveFactory = dyn Fn() -> Box<dyn ArchiveBuilder> + Send + Sync;

/// In-memory zip writer.
pub struct ZipArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }
}

impl Default for ZipArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder for ZipArchiveBuilder {
    fn is_available(&self) -> bool {
        true
    }

    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, SimpleFileOptions::default())
            .with_context(|| format!("Failed to start zip entry {}", name))?;
        self.writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write zip entry {}", name))?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let cursor = self.writer.finish().context("Failed to finalize zip")?;
        Ok(cursor.into_inner())
    }
}

/// Stand-in for a runtime without archive support. Probing it fails,
/// so the pipeline takes the fallback before adding any entry.
pub struct UnavailableArchiveBuilder;

impl ArchiveBuilder for UnavailableArchiveBuilder {
    fn is_available(&self) -> bool {
        false
    }

    fn add_entry(&mut self, _name: &str, _bytes: &[u8]) -> Result<()> {
        anyhow::bail!("Archive capability is not available")
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        anyhow::bail!("Archive capability is not available")
    }
}
