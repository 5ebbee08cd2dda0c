//! Project source collection
//!
//! The engine operates on an in-memory `Project`: a list of (path, content)
//! pairs. `from_sources` is the library entry point; `from_dir` backs the
//! CLI and walks a directory with the `ignore` crate, so `.gitignore` rules
//! and hidden directories are respected on top of the fixed skip list.

use std::io;
use std::path::Path;

use ignore::WalkBuilder;

use crate::error::UpliftError;

/// Vendored and generated trees never contain migratable sources
const SKIP_DIRS: [&str; 4] = ["node_modules", "dist", "build", "bower_components"];

/// One JavaScript source held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as given, relative to the project root when collected from disk
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// An AngularJS project staged for migration
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub files: Vec<SourceFile>,
}

impl Project {
    /// Build a project from in-memory sources, preserving the given order
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            files: sources
                .into_iter()
                .map(|(path, content)| SourceFile::new(path, content))
                .collect(),
        }
    }

    /// Collect `.js` sources under a directory.
    ///
    /// Files are returned sorted by path so runs over the same tree are
    /// deterministic regardless of directory iteration order.
    pub fn from_dir(root: &Path) -> crate::Result<Self> {
        if !root.exists() {
            return Err(UpliftError::FileNotFound {
                path: root.display().to_string(),
            });
        }
        if !root.is_dir() {
            return Err(UpliftError::FileNotFound {
                path: format!("{} is not a directory", root.display()),
            });
        }

        let walker = WalkBuilder::new(root)
            .follow_links(false)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !SKIP_DIRS.contains(&name.as_ref())
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .map_err(|e| UpliftError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let path = entry.path();
            let is_js = path.extension().map(|e| e == "js").unwrap_or(false);
            if !is_js {
                continue;
            }
            let content = std::fs::read_to_string(path)?;
            let relative = path.strip_prefix(root).unwrap_or(path);
            files.push(SourceFile::new(relative.display().to_string(), content));
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { files })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_from_sources_preserves_order() {
        let project = Project::from_sources(vec![
            ("b.js".to_string(), "var b;".to_string()),
            ("a.js".to_string(), "var a;".to_string()),
        ]);
        assert_eq!(project.len(), 2);
        assert_eq!(project.files[0].path, "b.js");
        assert_eq!(project.files[1].path, "a.js");
    }

    #[test]
    fn test_from_dir_collects_js_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/zeta.js"), "var z;").unwrap();
        fs::write(dir.path().join("alpha.js"), "var a;").unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let project = Project::from_dir(dir.path()).unwrap();
        let paths: Vec<&str> = project.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["alpha.js", "app/zeta.js"]);
    }

    #[test]
    fn test_from_dir_skips_vendored_trees() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::create_dir(dir.path().join("dist")).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("node_modules/vendor.js"), "var v;").unwrap();
        fs::write(dir.path().join("dist/bundle.js"), "var b;").unwrap();
        fs::write(dir.path().join(".hidden/secret.js"), "var s;").unwrap();
        fs::write(dir.path().join("app.js"), "var app;").unwrap();

        let project = Project::from_dir(dir.path()).unwrap();
        let paths: Vec<&str> = project.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["app.js"]);
    }

    #[test]
    fn test_from_dir_missing_root() {
        let err = Project::from_dir(Path::new("/nonexistent/project/root")).unwrap_err();
        assert!(matches!(err, UpliftError::FileNotFound { .. }));
    }
}
