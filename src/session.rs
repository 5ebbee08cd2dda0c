//! Migration session model: artifacts, file reviews, decisions, timeline
//!
//! A `MigrationSession` is the pipeline's complete output: one
//! `MigrationArtifact` per detected unit, the consolidated route table with
//! its rendered routing module, per-file review records with unified diffs,
//! and the stage-by-stage timeline. Review decisions follow a strict state
//! machine: `Pending` may move to `Accepted` or `Reverted`, both of which
//! are terminal.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codegen::GeneratedUnit;
use crate::error::UpliftError;
use crate::report::diff::unified_diff;
use crate::risk::RiskAssessment;
use crate::schema::{
    Diagnostic, HazardSignal, RiskLevel, RouteEntry, Severity, Unit, SCHEMA_VERSION,
};

/// Pipeline stage tag on timeline events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingestion,
    Analysis,
    Patterns,
    Risk,
    Transformation,
    Validation,
    Reporting,
    Decision,
}

impl Stage {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Analysis => "analysis",
            Self::Patterns => "patterns",
            Self::Risk => "risk",
            Self::Transformation => "transformation",
            Self::Validation => "validation",
            Self::Reporting => "reporting",
            Self::Decision => "decision",
        }
    }
}

/// One entry of the session activity log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    pub level: Severity,
}

impl TimelineEvent {
    pub fn now(stage: Stage, message: impl Into<String>, level: Severity) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            stage,
            message: message.into(),
            detail: None,
            level,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Mutex-guarded timeline appender, the only mutable state shared across
/// pipeline workers
#[derive(Default)]
pub struct TimelineRecorder {
    events: Mutex<Vec<TimelineEvent>>,
}

impl TimelineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, stage: Stage, message: impl Into<String>) {
        self.push(TimelineEvent::now(stage, message, Severity::Info));
    }

    pub fn info_with_detail(&self, stage: Stage, message: impl Into<String>, detail: Value) {
        self.push(TimelineEvent::now(stage, message, Severity::Info).with_detail(detail));
    }

    pub fn warning(&self, stage: Stage, message: impl Into<String>) {
        self.push(TimelineEvent::now(stage, message, Severity::Warning));
    }

    pub fn error(&self, stage: Stage, message: impl Into<String>) {
        self.push(TimelineEvent::now(stage, message, Severity::Error));
    }

    fn push(&self, event: TimelineEvent) {
        self.events.lock().push(event);
    }

    /// Drain the recorded events in append order
    pub fn into_events(self) -> Vec<TimelineEvent> {
        self.events.into_inner()
    }
}

/// Review decision on an artifact or file review
///
/// `Pending` is the only state with outgoing transitions; `Accepted` and
/// `Reverted` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Pending,
    Accepted,
    Reverted,
}

impl Decision {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Reverted => "reverted",
        }
    }

    /// Validate and apply a state transition
    pub fn transition(self, to: Decision) -> crate::Result<Decision> {
        match (self, to) {
            (Decision::Pending, Decision::Accepted) | (Decision::Pending, Decision::Reverted) => {
                Ok(to)
            }
            _ => Err(UpliftError::DecisionTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

const SIGNAL_PENALTY: f32 = 0.05;
const CONFIDENCE_FLOOR: f32 = 0.05;

/// Confidence baseline per risk level, reduced per hazard signal
pub fn confidence_score(risk: RiskLevel, signal_count: usize) -> f32 {
    let base = match risk {
        RiskLevel::Safe => 0.9,
        RiskLevel::Risky => 0.6,
        RiskLevel::Manual => 0.2,
    };
    (base - SIGNAL_PENALTY * signal_count as f32).max(CONFIDENCE_FLOOR)
}

/// One migrated unit: the decorated unit, its risk verdict, and the
/// generated Angular source when the level allows one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationArtifact {
    pub unit: Unit,
    pub risk: RiskLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<HazardSignal>,
    pub class_name: String,
    pub file_name: String,
    /// Present for SAFE and RISKY units, absent for MANUAL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    pub confidence: f32,
    pub decision: Decision,
}

impl MigrationArtifact {
    /// Assemble an artifact from the classification and generation results
    pub fn new(unit: Unit, assessment: RiskAssessment, generated: GeneratedUnit) -> Self {
        let confidence = confidence_score(assessment.level, assessment.signals.len());
        let mut diagnostics = assessment.diagnostics;
        diagnostics.extend(generated.diagnostics);
        Self {
            unit,
            risk: assessment.level,
            signals: assessment.signals,
            class_name: generated.class_name,
            file_name: generated.file_name,
            generated_source: generated.source,
            diagnostics,
            confidence,
            decision: Decision::Pending,
        }
    }

    pub fn accept(&mut self) -> crate::Result<()> {
        self.decision = self.decision.transition(Decision::Accepted)?;
        Ok(())
    }

    pub fn revert(&mut self) -> crate::Result<()> {
        self.decision = self.decision.transition(Decision::Reverted)?;
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.decision == Decision::Pending
    }
}

/// Per-session unit counts by risk level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub safe: usize,
    pub risky: usize,
    pub manual: usize,
}

impl RiskSummary {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Safe => self.safe += 1,
            RiskLevel::Risky => self.risky += 1,
            RiskLevel::Manual => self.manual += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.safe + self.risky + self.manual
    }
}

/// Whether a reviewed file is newly generated or replaces existing content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    New,
    Modified,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Modified => "MODIFIED",
        }
    }
}

/// Review record for one output file: before/after content with a unified
/// diff and its own decision state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReview {
    pub path: String,
    pub status: ReviewStatus,
    pub risk: RiskLevel,
    pub before_content: String,
    pub after_content: String,
    /// Empty when before and after are identical
    pub unified_diff: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub decision: Decision,
}

impl FileReview {
    /// Review for a freshly generated file with no prior content
    pub fn new_file(path: &str, after_content: &str, risk: RiskLevel, reason: &str) -> Self {
        Self {
            path: path.to_string(),
            status: ReviewStatus::New,
            risk,
            before_content: String::new(),
            after_content: after_content.to_string(),
            unified_diff: unified_diff("", after_content, path),
            reason: reason.to_string(),
            decision: Decision::Pending,
        }
    }

    /// Review replacing existing content
    pub fn modified(
        path: &str,
        before_content: &str,
        after_content: &str,
        risk: RiskLevel,
        reason: &str,
    ) -> Self {
        Self {
            path: path.to_string(),
            status: ReviewStatus::Modified,
            risk,
            before_content: before_content.to_string(),
            after_content: after_content.to_string(),
            unified_diff: unified_diff(before_content, after_content, path),
            reason: reason.to_string(),
            decision: Decision::Pending,
        }
    }

    pub fn accept(&mut self) -> crate::Result<()> {
        self.decision = self.decision.transition(Decision::Accepted)?;
        Ok(())
    }

    pub fn revert(&mut self) -> crate::Result<()> {
        self.decision = self.decision.transition(Decision::Reverted)?;
        Ok(())
    }
}

/// Complete output of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSession {
    pub id: String,
    pub schema_version: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    pub artifacts: Vec<MigrationArtifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_table: Vec<RouteEntry>,
    /// Rendered Angular routing module, present when any route was declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_module: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_reviews: Vec<FileReview>,
    pub risk_summary: RiskSummary,
    /// Session-level diagnostics (route collisions, validation findings)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelineEvent>,
    /// RFC 3339 commit timestamp, set once the session is committed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<String>,
}

impl MigrationSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            artifacts: Vec::new(),
            route_table: Vec::new(),
            routing_module: None,
            file_reviews: Vec::new(),
            risk_summary: RiskSummary::default(),
            diagnostics: Vec::new(),
            timeline: Vec::new(),
            committed_at: None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.is_pending()).count()
    }

    /// Mean artifact confidence, 0.0 for an empty session
    pub fn mean_confidence(&self) -> f32 {
        if self.artifacts.is_empty() {
            return 0.0;
        }
        self.artifacts.iter().map(|a| a.confidence).sum::<f32>() / self.artifacts.len() as f32
    }

    /// Commit the session. Fails while any artifact is still pending unless
    /// `force` is set; a forced commit leaves pending decisions untouched.
    pub fn commit(&mut self, force: bool) -> crate::Result<()> {
        let pending = self.pending_count();
        if pending > 0 && !force {
            return Err(UpliftError::PendingDecisions { pending });
        }
        self.committed_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(())
    }

    pub fn find_artifact_mut(&mut self, class_name: &str) -> Option<&mut MigrationArtifact> {
        self.artifacts
            .iter_mut()
            .find(|a| a.class_name == class_name)
    }
}

impl Default for MigrationSession {
    fn default() -> Self {
        Self::new()
    }
}
