//! Path resolution: ancestor-chain walking, shared-root relativization, and
//! destination object-key mapping.
//!
//! This is the core of the service. Given a file id, the resolver walks the
//! Drive parent-link chain to reconstruct the file's absolute folder path,
//! re-roots it under the configured shared folder, and maps the result onto a
//! destination object key.

use std::collections::HashSet;

use thiserror::Error;

use crate::drive::{DriveError, MetadataLookup};

/// Maximum ancestor hops. Backstop against pathological trees; cycles are
/// caught earlier by the visited set.
pub const MAX_DEPTH: usize = 20;

const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("cycle in parent links at {0}")]
    Cycle(String),
    #[error(transparent)]
    Drive(#[from] DriveError),
}

/// One node on the path from the Drive root to the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSegment {
    pub id: String,
    pub name: String,
}

/// Root-to-leaf ordered ancestor chain. The last segment is the file itself.
#[derive(Clone, Debug, Default)]
pub struct PathChain {
    segments: Vec<PathSegment>,
}

impl PathChain {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Absolute path as `/`-joined names.
    pub fn full_path(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A file's location below the shared root: the final file name plus the
/// `/`-joined folder names between root and file (empty when the file sits
/// directly in the root).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelativePath {
    pub file_name: String,
    pub folder_path: String,
}

/// Decides whether a resolved relative path is mirrored at all.
pub trait PathFilter: Send + Sync {
    fn accept(&self, folder_path: &str) -> bool;
}

/// Pass-through filter; mirrors everything.
#[derive(Debug, Default)]
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn accept(&self, _folder_path: &str) -> bool {
        true
    }
}

/// Export target for a native Google document type: (export MIME, extension).
/// Returns `None` for anything with a direct byte representation.
pub fn export_format(mime_type: &str) -> Option<(&'static str, &'static str)> {
    if !mime_type.starts_with(NATIVE_MIME_PREFIX) {
        return None;
    }
    Some(match mime_type {
        "application/vnd.google-apps.document" => ("application/pdf", ".pdf"),
        "application/vnd.google-apps.spreadsheet" => (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ".xlsx",
        ),
        "application/vnd.google-apps.presentation" => (
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            ".pptx",
        ),
        _ => ("application/pdf", ".pdf"),
    })
}

/// Append the export extension unless the name already carries it.
pub fn with_extension(file_name: &str, extension: &str) -> String {
    if extension.is_empty() || file_name.ends_with(extension) {
        file_name.to_string()
    } else {
        format!("{}{}", file_name, extension)
    }
}

/// Destination object key: `<prefix>/<folder_path>/<file_name>`, with the
/// folder segment omitted entirely when empty so no separator is doubled.
pub fn object_key(prefix: &str, folder_path: &str, file_name: &str) -> String {
    if folder_path.is_empty() {
        format!("{}/{}", prefix, file_name)
    } else {
        format!("{}/{}/{}", prefix, folder_path, file_name)
    }
}

pub struct Resolver<'a, M: MetadataLookup> {
    lookup: &'a M,
    shared_root_id: &'a str,
}

impl<'a, M: MetadataLookup> Resolver<'a, M> {
    pub fn new(lookup: &'a M, shared_root_id: &'a str) -> Self {
        Self {
            lookup,
            shared_root_id,
        }
    }

    /// Walk parent links from `file_id` up to the Drive root, following the
    /// first parent at each step. Fails fast on a repeated identifier; the
    /// hop ceiling truncates anything deeper than [`MAX_DEPTH`].
    pub async fn ancestor_chain(&self, file_id: &str) -> Result<PathChain, ResolveError> {
        let mut visited = HashSet::new();
        let mut segments = Vec::new();

        let meta = self.lookup.metadata(file_id).await?;
        visited.insert(meta.id.clone());
        let mut next = meta.first_parent().map(str::to_string);
        segments.push(PathSegment {
            id: meta.id,
            name: meta.name,
        });

        let mut depth = 0;
        while let Some(current) = next {
            if depth >= MAX_DEPTH {
                tracing::warn!(
                    file_id,
                    "ancestor chain exceeds {} hops, truncating",
                    MAX_DEPTH
                );
                break;
            }
            if !visited.insert(current.clone()) {
                return Err(ResolveError::Cycle(current));
            }

            let meta = self.lookup.metadata(&current).await?;
            next = meta.first_parent().map(str::to_string);
            segments.push(PathSegment {
                id: meta.id,
                name: meta.name,
            });
            depth += 1;
        }

        segments.reverse();
        Ok(PathChain { segments })
    }

    /// Re-root the chain under the shared folder, matching by identifier.
    /// Everything at or above the shared root is discarded. If the shared
    /// root is not an ancestor, the whole chain is mirrored as-is.
    ///
    /// Returns `None` when nothing remains below the truncation point, i.e.
    /// the file is the shared root itself.
    pub fn relativize(&self, chain: &PathChain) -> Option<RelativePath> {
        let segments = chain.segments();

        let below: &[PathSegment] = match segments
            .iter()
            .position(|s| s.id == self.shared_root_id)
        {
            Some(idx) => &segments[idx + 1..],
            None => {
                tracing::warn!(
                    shared_root = self.shared_root_id,
                    path = %chain.full_path(),
                    "shared root not in ancestor chain, mirroring full path"
                );
                segments
            }
        };

        let (file, folders) = below.split_last()?;
        let folder_path = folders
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("/");

        Some(RelativePath {
            file_name: file.name.clone(),
            folder_path,
        })
    }

    /// Full pipeline: walk the chain, then relativize it.
    pub async fn resolve(&self, file_id: &str) -> Result<(PathChain, Option<RelativePath>), ResolveError> {
        let chain = self.ancestor_chain(file_id).await?;
        let relative = self.relativize(&chain);
        Ok((chain, relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveFile;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeTree {
        nodes: HashMap<String, DriveFile>,
    }

    impl FakeTree {
        fn new(nodes: Vec<DriveFile>) -> Self {
            Self {
                nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            }
        }
    }

    #[async_trait]
    impl MetadataLookup for FakeTree {
        async fn metadata(&self, file_id: &str) -> Result<DriveFile, DriveError> {
            self.nodes
                .get(file_id)
                .cloned()
                .ok_or_else(|| DriveError::NotFound(file_id.to_string()))
        }
    }

    fn node(id: &str, name: &str, parent: Option<&str>) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            parents: parent.map(str::to_string).into_iter().collect(),
        }
    }

    fn finance_tree() -> FakeTree {
        // My Drive / Shared / Finance / 2025 / Q3.gsheet
        FakeTree::new(vec![
            node("drive-root", "My Drive", None),
            node("shared-id", "Shared", Some("drive-root")),
            node("finance-id", "Finance", Some("shared-id")),
            node("2025-id", "2025", Some("finance-id")),
            node("q3-id", "Q3.gsheet", Some("2025-id")),
        ])
    }

    #[tokio::test]
    async fn chain_is_ordered_root_to_leaf() {
        let tree = finance_tree();
        let resolver = Resolver::new(&tree, "shared-id");

        let chain = resolver.ancestor_chain("q3-id").await.unwrap();
        assert_eq!(chain.full_path(), "My Drive/Shared/Finance/2025/Q3.gsheet");
    }

    #[tokio::test]
    async fn relativizer_returns_folders_below_shared_root() {
        let tree = finance_tree();
        let resolver = Resolver::new(&tree, "shared-id");

        let chain = resolver.ancestor_chain("q3-id").await.unwrap();
        let rel = resolver.relativize(&chain).unwrap();
        assert_eq!(rel.file_name, "Q3.gsheet");
        assert_eq!(rel.folder_path, "Finance/2025");
    }

    #[tokio::test]
    async fn relativizer_matches_by_id_not_name() {
        // A folder named "Shared" above the real shared root must not trigger
        // truncation.
        let tree = FakeTree::new(vec![
            node("outer-id", "Shared", None),
            node("shared-id", "Shared", Some("outer-id")),
            node("file-id", "doc.txt", Some("shared-id")),
        ]);
        let resolver = Resolver::new(&tree, "shared-id");

        let chain = resolver.ancestor_chain("file-id").await.unwrap();
        let rel = resolver.relativize(&chain).unwrap();
        assert_eq!(rel.file_name, "doc.txt");
        assert_eq!(rel.folder_path, "");
    }

    #[tokio::test]
    async fn relativizer_falls_back_to_full_chain() {
        let tree = finance_tree();
        let resolver = Resolver::new(&tree, "some-other-root");

        let chain = resolver.ancestor_chain("q3-id").await.unwrap();
        let rel = resolver.relativize(&chain).unwrap();
        assert_eq!(rel.file_name, "Q3.gsheet");
        assert_eq!(rel.folder_path, "My Drive/Shared/Finance/2025");
    }

    #[tokio::test]
    async fn file_directly_in_shared_root() {
        let tree = FakeTree::new(vec![
            node("shared-id", "Shared", None),
            node("file-id", "notes.txt", Some("shared-id")),
        ]);
        let resolver = Resolver::new(&tree, "shared-id");

        let (_, rel) = resolver.resolve("file-id").await.unwrap();
        let rel = rel.unwrap();
        assert_eq!(rel.folder_path, "");
        assert_eq!(object_key("X", &rel.folder_path, &rel.file_name), "X/notes.txt");
    }

    #[tokio::test]
    async fn shared_root_itself_has_no_relative_path() {
        let tree = FakeTree::new(vec![node("shared-id", "Shared", None)]);
        let resolver = Resolver::new(&tree, "shared-id");

        let (_, rel) = resolver.resolve("shared-id").await.unwrap();
        assert!(rel.is_none());
    }

    #[tokio::test]
    async fn cycle_fails_fast() {
        let tree = FakeTree::new(vec![
            node("a", "A", Some("b")),
            node("b", "B", Some("a")),
        ]);
        let resolver = Resolver::new(&tree, "shared-id");

        let err = resolver.ancestor_chain("a").await.unwrap_err();
        assert!(matches!(err, ResolveError::Cycle(id) if id == "a"));
    }

    #[tokio::test]
    async fn walker_is_capped_at_max_depth() {
        // 40-deep linear chain; the walker must stop after MAX_DEPTH hops.
        let mut nodes = vec![node("n0", "n0", None)];
        for i in 1..40 {
            nodes.push(node(
                &format!("n{}", i),
                &format!("n{}", i),
                Some(&format!("n{}", i - 1)),
            ));
        }
        let tree = FakeTree::new(nodes);
        let resolver = Resolver::new(&tree, "unused");

        let chain = resolver.ancestor_chain("n39").await.unwrap();
        assert_eq!(chain.segments().len(), MAX_DEPTH + 1);
        assert_eq!(chain.segments().last().unwrap().name, "n39");
    }

    #[tokio::test]
    async fn missing_metadata_fails_the_walk() {
        let tree = FakeTree::new(vec![node("file-id", "doc.txt", Some("gone-id"))]);
        let resolver = Resolver::new(&tree, "shared-id");

        let err = resolver.ancestor_chain("file-id").await.unwrap_err();
        assert!(matches!(err, ResolveError::Drive(DriveError::NotFound(_))));
    }

    #[test]
    fn object_key_never_doubles_separators() {
        assert_eq!(object_key("X", "A/B", "report"), "X/A/B/report");
        assert_eq!(object_key("X", "", "report"), "X/report");
    }

    #[test]
    fn export_mapping_for_native_types() {
        assert_eq!(
            export_format("application/vnd.google-apps.document"),
            Some(("application/pdf", ".pdf"))
        );
        assert_eq!(
            export_format("application/vnd.google-apps.spreadsheet").unwrap().1,
            ".xlsx"
        );
        assert_eq!(
            export_format("application/vnd.google-apps.presentation").unwrap().1,
            ".pptx"
        );
        // Unmapped native types fall back to PDF
        assert_eq!(
            export_format("application/vnd.google-apps.drawing"),
            Some(("application/pdf", ".pdf"))
        );
        // Plain binary types are never exported
        assert_eq!(export_format("application/pdf"), None);
        assert_eq!(export_format("image/png"), None);
    }

    #[test]
    fn extension_applied_once() {
        assert_eq!(with_extension("Q3.gsheet", ".xlsx"), "Q3.gsheet.xlsx");
        assert_eq!(with_extension("Q3.gsheet.xlsx", ".xlsx"), "Q3.gsheet.xlsx");
        assert_eq!(with_extension("photo.png", ""), "photo.png");
    }

    #[tokio::test]
    async fn spreadsheet_scenario_end_to_end() {
        let tree = finance_tree();
        let resolver = Resolver::new(&tree, "shared-id");

        let (_, rel) = resolver.resolve("q3-id").await.unwrap();
        let rel = rel.unwrap();
        assert_eq!(rel.folder_path, "Finance/2025");

        let (_, ext) = export_format("application/vnd.google-apps.spreadsheet").unwrap();
        let name = with_extension(&rel.file_name, ext);
        assert_eq!(
            object_key("prefix", &rel.folder_path, &name),
            "prefix/Finance/2025/Q3.gsheet.xlsx"
        );
    }

    #[test]
    fn default_filter_accepts_everything() {
        let filter = AcceptAll;
        assert!(filter.accept(""));
        assert!(filter.accept("Finance/2025"));
        assert!(filter.accept("anything/at/all"));
    }
}
