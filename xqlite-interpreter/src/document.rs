use std::path::PathBuf;

use ahash::{HashMap, HashMapExt};
use tracing::debug;
use xot::Xot;

use crate::error::{Error, Result};

/// Documents available to `doc(...)`, loaded at most once per name.
#[derive(Debug, Clone)]
pub struct Documents {
    base_dir: PathBuf,
    documents: HashMap<String, xot::Node>,
    context: Option<xot::Node>,
}

impl Documents {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            documents: HashMap::new(),
            context: None,
        }
    }

    /// The document `doc()` refers to.
    pub fn set_context(&mut self, root: xot::Node) {
        self.context = Some(root);
    }

    pub fn context(&self) -> Option<xot::Node> {
        self.context
    }

    /// Register a document under `name` from a string, so that
    /// `doc("name")` finds it without touching the file system.
    pub fn add_string(&mut self, xot: &mut Xot, name: &str, xml: &str) -> Result<xot::Node> {
        let root = xot.parse(xml).map_err(|e| Error::DocumentLoadFailure {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.documents.insert(name.to_string(), root);
        Ok(root)
    }

    pub fn get(&self, name: &str) -> Option<xot::Node> {
        self.documents.get(name).copied()
    }

    /// The root of document `name`, or of the context document.
    pub fn load(&mut self, xot: &mut Xot, name: Option<&str>) -> Result<xot::Node> {
        let Some(name) = name else {
            return self.context.ok_or_else(|| Error::DocumentLoadFailure {
                name: "doc()".to_string(),
                reason: "no context document".to_string(),
            });
        };
        if let Some(root) = self.get(name) {
            return Ok(root);
        }
        let path = self.base_dir.join(name);
        debug!(path = %path.display(), "loading document");
        let xml = std::fs::read_to_string(&path).map_err(|e| Error::DocumentLoadFailure {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.add_string(xot, name, &xml)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for Documents {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_is_cached() {
        let mut xot = Xot::new();
        let mut documents = Documents::default();
        let root = documents.add_string(&mut xot, "a.xml", "<a/>").unwrap();
        assert_eq!(documents.load(&mut xot, Some("a.xml")).unwrap(), root);
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let mut xot = Xot::new();
        let mut documents = Documents::new("/nonexistent-xqlite-dir");
        let err = documents.load(&mut xot, Some("missing.xml")).unwrap_err();
        assert!(matches!(
            err,
            Error::DocumentLoadFailure { name, .. } if name == "missing.xml"
        ));
    }

    #[test]
    fn test_no_context_document() {
        let mut xot = Xot::new();
        let mut documents = Documents::default();
        assert!(documents.load(&mut xot, None).is_err());
    }

    #[test]
    fn test_malformed_document() {
        let mut xot = Xot::new();
        let mut documents = Documents::default();
        let err = documents.add_string(&mut xot, "bad.xml", "<a>").unwrap_err();
        assert!(matches!(err, Error::DocumentLoadFailure { .. }));
    }
}
