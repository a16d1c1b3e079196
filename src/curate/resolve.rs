// Destination and post-key resolution
// Pure lookups: safe to call speculatively for idempotency checks.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::constants::UNKNOWN_MODEL;
use crate::db::schema;

/// Identity of an ingested post folder: channel name + timestamp folder name.
/// Derived purely from the path relative to the incoming root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostKey {
    pub channel: String,
    pub timestamp: String,
    path_form: String,
}

impl PostKey {
    /// Path form used as the post index lookup key: the post folder's full
    /// path relative to the incoming root, e.g. "CCumpot/2026-01-22_07-01-58".
    pub fn as_db_path(&self) -> &str {
        &self.path_form
    }

    /// Derive a key from a post folder's path relative to the incoming root.
    /// The first component is the channel, the folder's own name is the
    /// timestamp. A bare channel folder (single component) is not a post.
    pub fn from_relative_dir(rel: &Path) -> Option<PostKey> {
        let mut components = rel.components().filter_map(|c| c.as_os_str().to_str());
        let channel = components.next()?.to_string();
        components.next()?;
        let timestamp = rel.file_name()?.to_str()?.to_string();
        let path_form = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");
        Some(PostKey { channel, timestamp, path_form })
    }
}

/// Where a source image would land if selected, and which post it belongs to.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub post_key: Option<PostKey>,
    pub destination: PathBuf,
}

pub struct PathResolver {
    incoming_root: PathBuf,
    curated_root: PathBuf,
}

impl PathResolver {
    pub fn new(incoming_root: PathBuf, curated_root: PathBuf) -> Self {
        Self { incoming_root, curated_root }
    }

    pub fn curated_root(&self) -> &Path {
        &self.curated_root
    }

    /// Compute the destination for a source image. Never fails for a
    /// well-formed path: every lookup miss or error degrades to a fallback.
    ///
    /// Known owner:    curated/<owner>/<timestamp>/<file>
    /// Unknown owner:  curated/<source path relative to incoming root>
    /// Outside root:   curated/<bare file name>
    pub fn resolve(&self, conn: Option<&Connection>, source: &Path) -> Resolved {
        let rel = match source.strip_prefix(&self.incoming_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                // Degraded mode: not under the incoming root at all
                let name = source.file_name().map(PathBuf::from).unwrap_or_else(|| {
                    PathBuf::from(source.to_string_lossy().replace(['/', '\\'], "_"))
                });
                return Resolved {
                    post_key: None,
                    destination: self.curated_root.join(name),
                };
            }
        };

        let post_key = rel.parent().and_then(PostKey::from_relative_dir);

        let destination = self
            .owner_destination(conn, post_key.as_ref(), &rel)
            .unwrap_or_else(|| self.curated_root.join(&rel));

        Resolved { post_key, destination }
    }

    /// Owner-structured destination, or None when the index has no usable
    /// attribution for this post.
    fn owner_destination(
        &self,
        conn: Option<&Connection>,
        post_key: Option<&PostKey>,
        rel: &Path,
    ) -> Option<PathBuf> {
        let conn = conn?;
        let key = post_key?;
        let file_name = rel.file_name()?;

        let owner = match schema::get_model_by_path(conn, key.as_db_path()) {
            Ok(Some(name)) => name,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("Owner lookup failed for {}: {}", key.as_db_path(), e);
                return None;
            }
        };

        if owner == UNKNOWN_MODEL {
            return None;
        }

        Some(
            self.curated_root
                .join(owner)
                .join(&key.timestamp)
                .join(file_name),
        )
    }

    /// The folder-level destination used for the cheap already-processed
    /// skip: the directory selected images from this post would land in.
    pub fn resolve_post_dir(&self, conn: Option<&Connection>, folder: &Path) -> PathBuf {
        let rel = match folder.strip_prefix(&self.incoming_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => return self.curated_root.clone(),
        };

        if let (Some(conn), Some(key)) = (conn, PostKey::from_relative_dir(&rel)) {
            if let Ok(Some(owner)) = schema::get_model_by_path(conn, key.as_db_path()) {
                if owner != UNKNOWN_MODEL {
                    return self.curated_root.join(owner).join(&key.timestamp);
                }
            }
        }

        self.curated_root.join(rel)
    }
}
