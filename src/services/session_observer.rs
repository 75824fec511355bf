//! Per-session observation lifecycle.
//!
//! One observer instance handles one active session at a time: start
//! metadata lives in a single last-write-wins slot, and the pipeline at
//! session end runs sequentially — parse, summarize, rate-limit, tier,
//! squash, prune — with no fan-out.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ObservationReason, ObservationSource, ObservationTier, ObserverConfig, RetentionConfig,
    SessionEnd, SessionMetrics, SessionObservation, SessionStart, TranscriptEntry,
};
use crate::domain::ports::{RecordStore, StoreCategory};

use super::transcript_capture::parse_transcript;

/// Minimum buffered ephemeral entries before a squash is attempted.
const SQUASH_MIN_ENTRIES: usize = 3;

/// Scores a summary's signal strength for tiering.
///
/// Tool calls weigh double: they are the strongest promotion signal.
pub fn tier_score(metrics: &SessionMetrics, duration_minutes: f64) -> f64 {
    metrics.message_count as f64
        + metrics.tool_call_count as f64 * 2.0
        + metrics.file_count as f64
        + metrics.command_count as f64
        + duration_minutes * 0.5
}

/// Orchestrates session observation from start to persisted tiered
/// record.
pub struct SessionObserver {
    config: ObserverConfig,
    retention: RetentionConfig,
    store: Arc<dyn RecordStore>,
    current: Mutex<Option<SessionStart>>,
    ephemeral: Mutex<Vec<SessionObservation>>,
    accepted_at: Mutex<VecDeque<DateTime<Utc>>>,
}

impl SessionObserver {
    /// Creates an observer writing persistent observations to the given
    /// store.
    pub fn new(
        store: Arc<dyn RecordStore>,
        config: ObserverConfig,
        retention: RetentionConfig,
    ) -> Self {
        Self {
            config,
            retention,
            store,
            current: Mutex::new(None),
            ephemeral: Mutex::new(Vec::new()),
            accepted_at: Mutex::new(VecDeque::new()),
        }
    }

    /// Caches start metadata in the single current-session slot.
    /// A second start overwrites the first (last write wins).
    pub async fn on_session_start(&self, start: SessionStart) {
        debug!(session_id = %start.session_id, "session started");
        *self.current.lock().await = Some(start);
    }

    /// Runs the full observation pipeline for a finished session.
    ///
    /// Returns the observation created for this session, or `None` when
    /// the transcript was empty or the rate limit dropped it.
    pub async fn on_session_end(
        &self,
        end: SessionEnd,
    ) -> DomainResult<Option<SessionObservation>> {
        let start = self
            .current
            .lock()
            .await
            .take()
            .filter(|s| s.session_id == end.session_id)
            .unwrap_or_else(|| {
                SessionStart::defaults(end.session_id.clone(), end.transcript_path.clone())
            });

        let entries = match parse_transcript(&end.transcript_path).await {
            Ok(entries) => entries,
            Err(DomainError::EmptyTranscript(_)) => {
                debug!(session_id = %end.session_id, "empty transcript, no observation");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let observation = summarize(&start, &end, &entries, self.config.top_n);

        if !self.admit(end.ended_at).await {
            debug!(session_id = %end.session_id, "rate limit exceeded, observation dropped");
            return Ok(None);
        }

        let observation = self.assign_tier(observation);
        match observation.tier {
            ObservationTier::Persistent => {
                self.store
                    .append(StoreCategory::Sessions, serde_json::to_value(&observation)?)
                    .await
                    .map_err(|e| DomainError::StoreError(e.to_string()))?;
                info!(session_id = %observation.session_id, "persistent observation written");
            }
            ObservationTier::Ephemeral => {
                self.ephemeral.lock().await.push(observation.clone());
                debug!(session_id = %observation.session_id, "ephemeral observation buffered");
            }
        }

        check_anomalies(&observation);
        self.squash_ephemeral().await?;

        // Pruning is best-effort; the observation write above is already
        // committed and must not be rolled back.
        if let Err(e) = self.prune_sessions().await {
            warn!(error = %e, "session store pruning failed");
        }

        Ok(Some(observation))
    }

    /// Number of ephemeral observations currently buffered.
    pub async fn ephemeral_len(&self) -> usize {
        self.ephemeral.lock().await.len()
    }

    /// Sliding-window admission check; records the timestamp when
    /// admitted.
    async fn admit(&self, now: DateTime<Utc>) -> bool {
        let window = Duration::seconds(self.rate_window_secs());
        let mut accepted = self.accepted_at.lock().await;
        while let Some(oldest) = accepted.front() {
            if now - *oldest > window {
                accepted.pop_front();
            } else {
                break;
            }
        }
        if accepted.len() >= self.config.rate_limit.max_sessions {
            return false;
        }
        accepted.push_back(now);
        true
    }

    fn rate_window_secs(&self) -> i64 {
        i64::try_from(self.config.rate_limit.window_secs).unwrap_or(i64::MAX)
    }

    fn assign_tier(&self, mut observation: SessionObservation) -> SessionObservation {
        let score = tier_score(&observation.metrics, observation.duration_minutes);
        observation.tier = if score >= self.config.tier_threshold {
            ObservationTier::Persistent
        } else {
            ObservationTier::Ephemeral
        };
        observation
    }

    /// Merges all buffered ephemeral entries into one synthetic
    /// aggregate and re-runs tiering on it. Attempted only once the
    /// buffer holds enough entries to be worth merging; the buffer is
    /// cleared regardless of the outcome, so entries are never counted
    /// twice across evaluations.
    async fn squash_ephemeral(&self) -> DomainResult<()> {
        let mut buffer = self.ephemeral.lock().await;
        if buffer.len() < SQUASH_MIN_ENTRIES {
            return Ok(());
        }
        let merged = merge_observations(&buffer, self.config.top_n);
        let count = buffer.len();
        buffer.clear();
        drop(buffer);

        let score = tier_score(&merged.metrics, merged.duration_minutes);
        if score >= self.config.tier_threshold {
            let promoted = SessionObservation {
                tier: ObservationTier::Persistent,
                ..merged
            };
            self.store
                .append(StoreCategory::Sessions, serde_json::to_value(&promoted)?)
                .await
                .map_err(|e| DomainError::StoreError(e.to_string()))?;
            info!(squashed_from = count, "squashed aggregate promoted to persistent");
        } else {
            debug!(squashed_from = count, "squashed aggregate below threshold, discarded");
        }
        Ok(())
    }

    /// Rewrites the sessions store keeping entries within the retention
    /// age and cap.
    async fn prune_sessions(&self) -> DomainResult<()> {
        let records = self
            .store
            .read(StoreCategory::Sessions)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))?;
        if records.is_empty() {
            return Ok(());
        }

        let total = records.len();
        let cutoff = Utc::now() - Duration::days(i64::from(self.retention.max_age_days));
        let mut kept: Vec<_> = records
            .into_iter()
            .filter(|r| r.timestamp >= cutoff)
            .collect();
        if kept.len() > self.retention.max_entries {
            let drop_count = kept.len() - self.retention.max_entries;
            kept.drain(..drop_count);
        }
        if kept.len() == total {
            return Ok(());
        }

        self.store
            .rewrite(StoreCategory::Sessions, kept)
            .await
            .map_err(|e| DomainError::StoreError(e.to_string()))?;
        Ok(())
    }
}

/// Builds one observation from parsed entries and session bounds.
fn summarize(
    start: &SessionStart,
    end: &SessionEnd,
    entries: &[TranscriptEntry],
    top_n: usize,
) -> SessionObservation {
    use crate::domain::models::EntryKind;

    let mut metrics = SessionMetrics::default();
    let mut tools: BTreeMap<String, u64> = BTreeMap::new();
    let mut commands: BTreeMap<String, u64> = BTreeMap::new();
    let mut files: HashSet<String> = HashSet::new();

    for entry in entries {
        match entry.kind {
            EntryKind::User | EntryKind::Assistant => metrics.message_count += 1,
            EntryKind::ToolInvocation => {
                metrics.tool_call_count += 1;
                if let Some(ref tool) = entry.tool_name {
                    *tools.entry(tool.clone()).or_default() += 1;
                }
                if let Some(ref input) = entry.tool_input {
                    if let Some(command) = extract_command(input) {
                        metrics.command_count += 1;
                        *commands.entry(command).or_default() += 1;
                    }
                    if let Some(path) = extract_file_path(input) {
                        files.insert(path);
                    }
                }
            }
            EntryKind::ToolResult => {}
        }
    }
    metrics.file_count = files.len() as u64;

    let started_at = entries
        .iter()
        .map(|e| e.timestamp)
        .min()
        .unwrap_or(start.started_at);
    let ended_at = entries
        .iter()
        .map(|e| e.timestamp)
        .max()
        .unwrap_or(end.ended_at);
    let duration_minutes = (ended_at - started_at).num_seconds().max(0) as f64 / 60.0;

    SessionObservation {
        session_id: start.session_id.clone(),
        source: start.source,
        reason: ObservationReason::SessionEnd,
        metrics,
        top_tools: top_n_of(tools, top_n),
        top_commands: top_n_of(commands, top_n),
        duration_minutes,
        tier: ObservationTier::Ephemeral,
        squashed_from: None,
        timestamp: ended_at,
    }
}

/// Merges buffered ephemeral observations into one synthetic aggregate:
/// summed counts, unioned and re-ranked top lists, and the overall
/// min-start/max-end span as duration.
fn merge_observations(buffer: &[SessionObservation], top_n: usize) -> SessionObservation {
    let mut metrics = SessionMetrics::default();
    let mut tools: BTreeMap<String, u64> = BTreeMap::new();
    let mut commands: BTreeMap<String, u64> = BTreeMap::new();
    let mut span_start: Option<DateTime<Utc>> = None;
    let mut span_end: Option<DateTime<Utc>> = None;

    for obs in buffer {
        metrics.message_count += obs.metrics.message_count;
        metrics.tool_call_count += obs.metrics.tool_call_count;
        metrics.file_count += obs.metrics.file_count;
        metrics.command_count += obs.metrics.command_count;
        for (tool, count) in &obs.top_tools {
            *tools.entry(tool.clone()).or_default() += count;
        }
        for (command, count) in &obs.top_commands {
            *commands.entry(command.clone()).or_default() += count;
        }
        let obs_start =
            obs.timestamp - Duration::seconds((obs.duration_minutes * 60.0) as i64);
        span_start = Some(span_start.map_or(obs_start, |s: DateTime<Utc>| s.min(obs_start)));
        span_end = Some(span_end.map_or(obs.timestamp, |e: DateTime<Utc>| e.max(obs.timestamp)));
    }

    let now = Utc::now();
    let started_at = span_start.unwrap_or(now);
    let ended_at = span_end.unwrap_or(now);

    SessionObservation {
        session_id: format!("squash-{}", Uuid::new_v4()),
        source: ObservationSource::Unknown,
        reason: ObservationReason::Squash,
        metrics,
        top_tools: top_n_of(tools, top_n),
        top_commands: top_n_of(commands, top_n),
        duration_minutes: (ended_at - started_at).num_seconds().max(0) as f64 / 60.0,
        tier: ObservationTier::Ephemeral,
        squashed_from: Some(buffer.len()),
        timestamp: ended_at,
    }
}

fn top_n_of(counts: BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

fn extract_command(input: &serde_json::Value) -> Option<String> {
    input
        .get("command")
        .and_then(|v| v.as_str())
        .and_then(|cmd| cmd.split_whitespace().next())
        .map(String::from)
}

fn extract_file_path(input: &serde_json::Value) -> Option<String> {
    input
        .get("file_path")
        .or_else(|| input.get("path"))
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Non-fatal heuristics over a finished summary; findings are logged,
/// never returned.
fn check_anomalies(observation: &SessionObservation) {
    if observation.duration_minutes == 0.0 && observation.metrics.message_count > 20 {
        warn!(
            session_id = %observation.session_id,
            messages = observation.metrics.message_count,
            "anomaly: zero-duration session with many messages"
        );
    }
    if observation.metrics.message_count > 0
        && observation.metrics.tool_call_count > observation.metrics.message_count * 10
    {
        warn!(
            session_id = %observation.session_id,
            tools = observation.metrics.tool_call_count,
            messages = observation.metrics.message_count,
            "anomaly: tool calls far exceed messages"
        );
    }
    if observation.metrics.message_count > 10_000 {
        warn!(
            session_id = %observation.session_id,
            messages = observation.metrics.message_count,
            "anomaly: implausibly large message count"
        );
    }
}
