//! Folder model over a flat prefix-listing API.
//!
//! The upstream KV engine only knows keys. A listing of a prefix returns the
//! immediate children, where a name ending in `/` is a common prefix (a
//! "folder") and anything else is a stored leaf. This module turns that into
//! something browsable: a current location, breadcrumbs back to the root, and
//! joined child paths.
//!
//! The trailing `/` on folder names is a display convention of the listing
//! API. It is never part of a navigable path value, so [`normalize_folder_path`]
//! strips it before a folder becomes the current location.

use async_trait::async_trait;

/// Anything that can list the immediate children of a prefix.
///
/// Implemented by the upstream client (direct KV metadata listing) and by the
/// console's gateway client (through `GET /api/secrets?path=`).
#[async_trait]
pub trait PrefixLister: Send + Sync {
    /// Error produced by the underlying transport.
    type Error: Send;

    /// List the raw child names under `prefix`. The empty prefix is the root.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, Self::Error>;
}

/// One entry in a listing, as returned by the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// Raw name, including the trailing `/` for folders.
    pub name: String,
}

impl ChildEntry {
    /// Wrap a raw listing name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Whether this entry is a sub-prefix rather than a stored leaf.
    pub fn is_folder(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Name without the folder marker.
    pub fn display_name(&self) -> &str {
        normalize_folder_path(&self.name)
    }

    /// Full path of this entry when listed under `current`.
    pub fn full_path(&self, current: &str) -> String {
        child_path(current, &self.name)
    }
}

/// A single breadcrumb segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// The segment text.
    pub label: String,
    /// Join of every segment up to and including this one.
    pub path: String,
    /// `false` for the last segment (the current location).
    pub navigable: bool,
}

/// Strip exactly one trailing `/` from a folder path.
///
/// Paths without a trailing slash are returned unchanged.
pub fn normalize_folder_path(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Decompose `path` into breadcrumbs. The root (empty path) has none.
pub fn breadcrumbs(path: &str) -> Vec<Breadcrumb> {
    if path.is_empty() {
        return Vec::new();
    }

    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);

    segments
        .iter()
        .enumerate()
        .map(|(i, label)| Breadcrumb {
            label: (*label).to_owned(),
            path: segments[..=i].join("/"),
            navigable: i != last,
        })
        .collect()
}

/// Join a listed name onto the location it was listed under.
pub fn child_path(current: &str, name: &str) -> String {
    if current.is_empty() {
        name.to_owned()
    } else {
        format!("{current}/{name}")
    }
}

/// List the children of `current` through any [`PrefixLister`].
///
/// Order is preserved exactly as the lister returns it.
///
/// # Errors
///
/// Propagates the lister's transport error.
pub async fn list_children<L>(lister: &L, current: &str) -> Result<Vec<ChildEntry>, L::Error>
where
    L: PrefixLister + ?Sized,
{
    let names = lister.list_prefix(current).await?;
    tracing::debug!(prefix = %current, count = names.len(), "listed children");
    Ok(names.into_iter().map(ChildEntry::new).collect())
}

/// A browsing cursor. Always holds a normalized path; the empty path is root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    current: String,
}

impl Location {
    /// Start at the root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Start at `path`, normalizing a trailing folder marker.
    pub fn at(path: &str) -> Self {
        Self {
            current: normalize_folder_path(path).to_owned(),
        }
    }

    /// The current path value.
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn is_root(&self) -> bool {
        self.current.is_empty()
    }

    /// Jump to an arbitrary path (breadcrumb click, root button).
    pub fn go_to(&mut self, path: &str) {
        normalize_folder_path(path).clone_into(&mut self.current);
    }

    /// Descend into a listed folder. Leaves are not navigable; returns `false`
    /// and leaves the location untouched for them.
    pub fn enter(&mut self, entry: &ChildEntry) -> bool {
        if !entry.is_folder() {
            return false;
        }
        let next = entry.full_path(&self.current);
        self.go_to(&next);
        true
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        breadcrumbs(&self.current)
    }

    /// Full path of a listed entry relative to this location.
    pub fn child(&self, entry: &ChildEntry) -> String {
        entry.full_path(&self.current)
    }
}
