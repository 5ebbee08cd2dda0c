//! Session report writers
//!
//! Three renderings of a completed `MigrationSession`: `text` for the
//! terminal, `markdown` for review documents, `json` for machine
//! consumption. The CLI picks one; the library exposes all three.

pub mod diff;

use crate::schema::RiskLevel;
use crate::session::{MigrationArtifact, MigrationSession};

/// Machine JSON document for the whole session
pub fn render_json(session: &MigrationSession) -> String {
    serde_json::to_string_pretty(session).unwrap_or_default()
}

/// Terminal summary in the engine's banner style
pub fn render_text(session: &MigrationSession) -> String {
    let mut output = String::new();
    output.push_str("═══════════════════════════════════════════════════════\n");
    output.push_str("  UPLIFT MIGRATION REPORT\n");
    output.push_str("═══════════════════════════════════════════════════════\n\n");

    output.push_str(&format!("session: {}\n", session.id));
    output.push_str(&format!("created: {}\n", session.created_at));
    let summary = session.risk_summary;
    output.push_str(&format!(
        "units: {} ({} safe, {} risky, {} manual)\n",
        summary.total(),
        summary.safe,
        summary.risky,
        summary.manual
    ));
    output.push_str(&format!(
        "confidence: {:.2} mean\n",
        session.mean_confidence()
    ));
    output.push_str(&format!(
        "routes: {} entries ({} resolvers, {} guards)\n\n",
        session.route_table.len(),
        resolver_count(session),
        guard_count(session)
    ));

    if !session.artifacts.is_empty() {
        output.push_str("units:\n");
        for artifact in &session.artifacts {
            output.push_str(&format!(
                "  - {:30} => {:6}  {}\n",
                artifact.unit.name,
                artifact.risk.as_str(),
                artifact_note(artifact)
            ));
        }
        output.push('\n');
    }

    if !session.route_table.is_empty() {
        output.push_str("routes:\n");
        for entry in &session.route_table {
            let target = if let Some(redirect) = &entry.redirect_target {
                format!("redirect /{}", redirect)
            } else if let Some(controller) = &entry.controller_ref {
                controller.clone()
            } else if entry.is_abstract_parent {
                "(abstract)".to_string()
            } else {
                "(no component)".to_string()
            };
            output.push_str(&format!("  - {:26} -> {}\n", entry.pattern, target));
        }
        output.push('\n');
    }

    if !session.diagnostics.is_empty() {
        output.push_str("diagnostics:\n");
        for diag in &session.diagnostics {
            output.push_str(&format!(
                "  - [{}] {}: {}\n",
                diag.severity.as_str(),
                diag.category.as_str(),
                diag.message
            ));
        }
        output.push('\n');
    }

    if !session.file_reviews.is_empty() {
        output.push_str("files:\n");
        for review in &session.file_reviews {
            output.push_str(&format!(
                "  - [{:8}] {}  ({}, {})\n",
                review.status.as_str(),
                review.path,
                review.risk.as_str(),
                review.decision.as_str()
            ));
        }
    }

    output
}

/// Human review document
pub fn render_markdown(session: &MigrationSession) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Uplift Migration Report".to_string());
    lines.push(String::new());
    lines.push(format!(
        "Session `{}` created {}.",
        session.id, session.created_at
    ));
    lines.push(String::new());

    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push("| Risk | Units |".to_string());
    lines.push("|------|-------|".to_string());
    let summary = session.risk_summary;
    lines.push(format!("| SAFE | {} |", summary.safe));
    lines.push(format!("| RISKY | {} |", summary.risky));
    lines.push(format!("| MANUAL | {} |", summary.manual));
    lines.push(String::new());
    lines.push(format!(
        "Mean confidence: {:.2}.",
        session.mean_confidence()
    ));
    lines.push(String::new());

    lines.push("## Units Detected".to_string());
    for artifact in &session.artifacts {
        lines.push(format!(
            "- **{}** (`{}`)",
            artifact.unit.name, artifact.unit.file
        ));
    }
    lines.push(String::new());

    lines.push("## Proposed Changes".to_string());
    for artifact in &session.artifacts {
        lines.push(format!(
            "- **{}** (`{}`) -> {}  ",
            artifact.unit.name, artifact.unit.file, artifact.class_name
        ));
        if artifact.generated_source.is_some() {
            lines.push(format!("  Output: `{}`  ", artifact.file_name));
        } else {
            lines.push("  Output: none (manual migration)  ".to_string());
        }
        lines.push(format!(
            "  Risk: **{}** (confidence {:.2})",
            artifact.risk.as_str(),
            artifact.confidence
        ));
        for signal in &artifact.signals {
            lines.push(format!("  - {}", signal.describe()));
        }
    }
    lines.push(String::new());

    if !session.route_table.is_empty() {
        lines.push("## Route Table".to_string());
        lines.push(String::new());
        lines.push("| Path | Component | Resolvers | Guards |".to_string());
        lines.push("|------|-----------|-----------|--------|".to_string());
        for entry in &session.route_table {
            let component = entry
                .redirect_target
                .as_ref()
                .map(|r| format!("redirect `/{}`", r))
                .or_else(|| entry.controller_ref.clone())
                .unwrap_or_else(|| "-".to_string());
            let resolvers = if entry.resolve_bindings.is_empty() {
                "-".to_string()
            } else {
                entry
                    .resolve_bindings
                    .iter()
                    .map(|b| b.resolver_class.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let guards = if entry.guard_refs.is_empty() {
                "-".to_string()
            } else {
                entry.guard_refs.join(", ")
            };
            lines.push(format!(
                "| `{}` | {} | {} | {} |",
                entry.pattern, component, resolvers, guards
            ));
        }
        lines.push(String::new());
    }

    if !session.diagnostics.is_empty() {
        lines.push("## Diagnostics".to_string());
        for diag in &session.diagnostics {
            lines.push(format!(
                "- **{}** ({}): {}",
                diag.severity.as_str(),
                diag.category.as_str(),
                diag.message
            ));
        }
        lines.push(String::new());
    }

    if !session.timeline.is_empty() {
        lines.push("## Timeline".to_string());
        for event in &session.timeline {
            lines.push(format!("- `{}` {}", event.stage.as_str(), event.message));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn artifact_note(artifact: &MigrationArtifact) -> String {
    match artifact.risk {
        RiskLevel::Manual => "(no source generated)".to_string(),
        _ => format!(
            "{}  (confidence {:.2})",
            artifact.file_name, artifact.confidence
        ),
    }
}

fn resolver_count(session: &MigrationSession) -> usize {
    let mut classes: Vec<&str> = session
        .route_table
        .iter()
        .flat_map(|e| e.resolve_bindings.iter().map(|b| b.resolver_class.as_str()))
        .collect();
    classes.sort_unstable();
    classes.dedup();
    classes.len()
}

fn guard_count(session: &MigrationSession) -> usize {
    let mut classes: Vec<&str> = session
        .route_table
        .iter()
        .flat_map(|e| e.guard_refs.iter().map(|g| g.as_str()))
        .collect();
    classes.sort_unstable();
    classes.dedup();
    classes.len()
}
