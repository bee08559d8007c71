//! Source configuration

use std::path::PathBuf;

use pw_core::{FetchMode, PagerConfig};
use serde::{Deserialize, Serialize};

/// Where the pager's items come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// A SQLite table ordered by an integer key column
    Sqlite {
        path: PathBuf,
        table: String,
        key_column: String,
    },
    /// Generated integers `0..len`
    Memory { len: u32 },
}

/// Source plus pager settings, as loaded from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: SourceKind,

    /// Offset or cursor addressing
    #[serde(default = "default_mode")]
    pub mode: FetchMode,

    #[serde(default)]
    pub pager: PagerConfig,
}

fn default_mode() -> FetchMode {
    FetchMode::Offset
}

impl SourceConfig {
    /// Create a new source configuration with default pager settings
    pub fn new(source: SourceKind, mode: FetchMode) -> Self {
        Self {
            source,
            mode,
            pager: PagerConfig::default(),
        }
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Get a display name for the source
    pub fn source_name(&self) -> String {
        match &self.source {
            SourceKind::Sqlite { path, table, .. } => format!(
                "{}:{}",
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown.db"),
                table
            ),
            SourceKind::Memory { len } => format!("memory[{}]", len),
        }
    }
}
