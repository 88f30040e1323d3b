use std::path::PathBuf;
use std::sync::Arc;

use super::error::{Error, Result};

/// Ordered, immutable set of opaque identifiers consumed round-robin by workers.
///
/// Cloning is cheap; all clones share the same backing slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSet {
    items: Arc<[Arc<str>]>,
}

impl InputSet {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items: Vec<Arc<str>> = items
            .into_iter()
            .map(|s| Arc::<str>::from(s.as_ref()))
            .collect();
        Self {
            items: Arc::from(items.into_boxed_slice()),
        }
    }

    /// One identifier per line; whitespace is trimmed and blank lines are skipped.
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Arc<str>] {
        &self.items
    }

    /// Cyclic indexing. Panics on an empty set; pools refuse to start in that case.
    pub fn at(&self, index: usize) -> &Arc<str> {
        &self.items[index % self.items.len()]
    }

    /// First `limit` identifiers (`0` = all). Shares storage when nothing is cut.
    #[must_use]
    pub fn truncated(&self, limit: u64) -> Self {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        if limit == 0 || limit >= self.items.len() {
            return self.clone();
        }

        Self {
            items: Arc::from(&self.items[..limit]),
        }
    }
}

/// Where the shared input set comes from. Inline identifiers come first, followed by the
/// file contents.
#[derive(Debug, Clone, Default)]
pub struct InputSource {
    pub inline: Vec<String>,
    pub file: Option<PathBuf>,
}

impl InputSource {
    pub fn inline<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inline: items.into_iter().map(Into::into).collect(),
            file: None,
        }
    }

    pub async fn load(&self) -> Result<InputSet> {
        let mut items: Vec<String> = self
            .inline
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(path) = &self.file {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| Error::InputSetup {
                    path: path.display().to_string(),
                    source,
                })?;
            items.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(InputSet::new(items))
    }
}
