//! ``src/fs/local_adapter.rs``
//!
//! # `LocalAdapter`: Asynchronous Local Directory Listing
//!
//! Serves `file://` URLs. Entries are read with `tokio::fs` and handed out
//! in pages of `batch_size`, each page carrying a continuation that keeps
//! reading from the same directory handle.

use std::{
    fs::{FileType, Metadata},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use compact_str::CompactString;
use tokio::fs::{self, DirEntry, ReadDir};
use tracing::{debug, instrument};

use crate::{
    fs::adapter::{AdapterError, Continuation, ListPage, ListingAdapter},
    model::{
        entry::{EntryMeta, EntryRecord, EntryType},
        url::Url,
    },
};

pub const LOCAL_SCHEME: &str = "file";

const DEFAULT_BATCH_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct LocalAdapter {
    batch_size: usize,
}

impl LocalAdapter {
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }
}

impl Default for LocalAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

#[async_trait]
impl ListingAdapter for LocalAdapter {
    fn scheme(&self) -> &str {
        LOCAL_SCHEME
    }

    #[instrument(skip(self, _columns), fields(url = %url))]
    async fn list(&self, url: &Url, _columns: &[CompactString]) -> Result<ListPage, AdapterError> {
        let dir = PathBuf::from(url.path());
        let read_dir: ReadDir = fs::read_dir(&dir)
            .await
            .map_err(|e| AdapterError::io(&dir, &e))?;

        next_page(read_dir, dir, self.batch_size).await
    }
}

fn next_page(mut read_dir: ReadDir, dir: PathBuf, batch_size: usize) -> Continuation {
    Box::pin(async move {
        let mut entries: Vec<EntryRecord> = Vec::with_capacity(batch_size);

        while entries.len() < batch_size {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => {
                    if let Some(record) = record_for(&entry).await {
                        entries.push(record);
                    }
                }

                Ok(None) => return Ok(ListPage::last(entries)),

                Err(e) => return Err(AdapterError::io(&dir, &e)),
            }
        }

        debug!(
            marker = "LOCAL_ADAPTER",
            dir = %dir.display(),
            page_size = entries.len(),
            "Page full, more entries pending"
        );

        let rest = next_page(read_dir, dir, batch_size);
        Ok(ListPage::more(entries, rest))
    })
}

async fn record_for(entry: &DirEntry) -> Option<EntryRecord> {
    let path: PathBuf = entry.path();

    let meta: Metadata = match fs::symlink_metadata(&path).await {
        Ok(meta) => meta,

        Err(e) => {
            // Entry vanished or is unreadable, keep listing the rest
            debug!("Failed to stat {:?}: {}", path, e);
            return None;
        }
    };

    let name = CompactString::new(entry.file_name().to_string_lossy());
    let ftype: FileType = meta.file_type();
    let entry_type = classify(ftype);

    let mut entry_meta = EntryMeta {
        size: (!ftype.is_dir()).then(|| meta.len()),
        modified: meta.modified().ok(),
        mode: permission_bits(&meta),
        ..EntryMeta::default()
    };

    if ftype.is_symlink() {
        entry_meta.link = fs::read_link(&path)
            .await
            .ok()
            .map(|target: PathBuf| CompactString::new(target.to_string_lossy()));

        // Follows the link; dangling links keep `link_type == None`
        entry_meta.link_type = fs::metadata(&path)
            .await
            .ok()
            .map(|target: Metadata| classify(target.file_type()));
    }

    Some(EntryRecord {
        name,
        entry_type,
        meta: entry_meta,
    })
}

fn classify(ftype: FileType) -> EntryType {
    if ftype.is_dir() {
        EntryType::Directory
    } else if ftype.is_symlink() {
        EntryType::Link
    } else if is_socket(ftype) {
        EntryType::Socket
    } else {
        EntryType::File
    }
}

#[cfg(unix)]
fn is_socket(ftype: FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    ftype.is_socket()
}

#[cfg(not(unix))]
fn is_socket(_ftype: FileType) -> bool {
    false
}

#[cfg(unix)]
fn permission_bits(meta: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(_meta: &Metadata) -> Option<u32> {
    None
}

/// Build a `file://` URL for a local directory.
#[must_use]
pub fn url_for_dir(dir: &Path) -> Url {
    let mut path = CompactString::new(dir.to_string_lossy());
    if !path.ends_with('/') {
        path.push('/');
    }
    Url::new(LOCAL_SCHEME, path)
}
