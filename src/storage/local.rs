//! Local filesystem checkpoint store.
//!
//! JSON documents written atomically (write to temp, then rename) so a
//! reader never observes a half-written checkpoint. A CSV mirror of the
//! record set is maintained for spreadsheet consumers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{EnrichedRecord, PerformanceMetrics, Progress, SearchContext};
use crate::storage::{CheckpointState, CheckpointStore};
use crate::utils::csv_escape;

const RECORDS_FILE: &str = "records.json";
const CSV_FILE: &str = "records.csv";
const SEARCH_STATE_FILE: &str = "search_state.json";
const PROGRESS_FILE: &str = "progress.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

/// On-disk form of the strategy state document.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SearchStateDoc {
    context: SearchContext,
    metrics: PerformanceMetrics,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Render the record map as the CSV mirror.
    fn render_csv(records: &BTreeMap<String, EnrichedRecord>) -> String {
        let mut out = String::from(
            "record_id,domain,author,source_id,created_at,follower_count,\
             verified,enriched_at,sentiment_label,sentiment_score,ownership_claim,text\n",
        );
        for record in records.values() {
            let m = &record.mention;
            let (label, score, claim) = match &record.sentiment {
                Some(v) => (
                    v.label.clone(),
                    v.score.to_string(),
                    format!("{:?}", v.ownership_claim).to_lowercase(),
                ),
                None => (String::new(), String::new(), String::new()),
            };
            let row = [
                m.record_id(),
                m.domain.clone(),
                m.author.clone(),
                m.source_id.clone(),
                m.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                record.follower_count.to_string(),
                record.verified.to_string(),
                record.enriched_at.to_rfc3339(),
                label,
                score,
                claim,
                m.text.clone(),
            ];
            let cells: Vec<String> = row.iter().map(|c| csv_escape(c)).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl CheckpointStore for LocalStore {
    async fn load(&self) -> Result<CheckpointState> {
        let records = self
            .read_json::<BTreeMap<String, EnrichedRecord>>(RECORDS_FILE)
            .await?
            .unwrap_or_default();
        let search_state = self.read_json::<SearchStateDoc>(SEARCH_STATE_FILE).await?;
        let progress = self
            .read_json::<Progress>(PROGRESS_FILE)
            .await?
            .unwrap_or_default();

        let (context, metrics) = match search_state {
            Some(doc) => (doc.context, doc.metrics),
            None => Default::default(),
        };

        Ok(CheckpointState {
            records,
            context,
            metrics,
            progress,
        })
    }

    async fn save(&self, state: &CheckpointState) -> Result<()> {
        self.write_json(RECORDS_FILE, &state.records).await?;
        self.write_json(
            SEARCH_STATE_FILE,
            &SearchStateDoc {
                context: state.context.clone(),
                metrics: state.metrics.clone(),
            },
        )
        .await?;
        self.write_json(PROGRESS_FILE, &state.progress).await?;
        self.write_bytes(CSV_FILE, Self::render_csv(&state.records).as_bytes())
            .await?;

        log::debug!(
            "Checkpoint saved: {} records, {} queries issued",
            state.records.len(),
            state.context.previous_queries.len()
        );
        Ok(())
    }
}
