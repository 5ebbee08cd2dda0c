//! Pipeline orchestration over an in-memory project
//!
//! Stage order: ingestion, analysis (per-file unit detection), patterns
//! (DI resolution), risk classification, transformation (route
//! consolidation plus code generation), validation, reporting, decision.
//! Per-file and per-unit work fans out with rayon and is collected in input
//! order, so output never depends on thread scheduling. The route
//! transformer runs single-threaded once every file has been analyzed. The
//! timeline recorder is the only shared mutable state.

use ahash::AHashMap;
use rayon::prelude::*;
use serde_json::json;

use crate::codegen::{self, GeneratedUnit};
use crate::config::EngineConfig;
use crate::detect;
use crate::di::{self, DiResolution};
use crate::error::UpliftError;
use crate::project::Project;
use crate::risk::{self, RiskAssessment};
use crate::schema::{
    Diagnostic, DiagnosticCategory, RiskLevel, Severity, Unit, UnitKind,
};
use crate::session::{
    FileReview, MigrationArtifact, MigrationSession, RiskSummary, Stage, TimelineRecorder,
};

pub struct Pipeline;

impl Pipeline {
    /// Run the full migration pipeline and assemble the session
    pub fn run(project: &Project, config: &EngineConfig) -> crate::Result<MigrationSession> {
        config.validate()?;
        let recorder = TimelineRecorder::new();

        if project.is_empty() {
            return Err(UpliftError::EmptyProject);
        }
        tracing::info!("[INGESTION] scanned {} JavaScript files", project.len());
        recorder.info_with_detail(
            Stage::Ingestion,
            format!("Scanned {} JavaScript files", project.len()),
            json!({ "files": project.len() }),
        );

        let (units, mut session_diagnostics) = analyze(project, &recorder);

        let resolutions: Vec<DiResolution> = units
            .par_iter()
            .map(|unit| di::resolve_tokens(&unit.di_tokens, config))
            .collect();
        let dropped = resolutions
            .iter()
            .flat_map(|r| r.tokens.iter())
            .filter(|t| t.dropped)
            .count();
        tracing::info!(
            "[PATTERNS] resolved injection tokens for {} units, {} dropped",
            units.len(),
            dropped
        );
        recorder.info_with_detail(
            Stage::Patterns,
            format!(
                "Resolved dependency injection for {} units ({} tokens dropped)",
                units.len(),
                dropped
            ),
            json!({ "units": units.len(), "droppedTokens": dropped }),
        );

        let assessments: Vec<RiskAssessment> = units
            .par_iter()
            .map(|unit| risk::classify_unit(unit, config))
            .collect();
        for (unit, assessment) in units.iter().zip(&assessments) {
            for diag in &assessment.diagnostics {
                if diag.category == DiagnosticCategory::Classification {
                    recorder.warning(
                        Stage::Risk,
                        format!("'{}': {}", unit.name, diag.message),
                    );
                }
            }
        }
        let mut preliminary = RiskSummary::default();
        for assessment in &assessments {
            preliminary.record(assessment.level);
        }
        tracing::info!(
            "[RISK] {} safe, {} risky, {} manual",
            preliminary.safe,
            preliminary.risky,
            preliminary.manual
        );
        recorder.info_with_detail(
            Stage::Risk,
            format!(
                "Risk assessment: {} safe, {} risky, {} manual",
                preliminary.safe, preliminary.risky, preliminary.manual
            ),
            json!({
                "safe": preliminary.safe,
                "risky": preliminary.risky,
                "manual": preliminary.manual
            }),
        );

        // Route consolidation is single-threaded: ordering and collision
        // rules need the complete declaration list.
        let mut transform = crate::routes::transform_routes(&units, config);
        for diag in &transform.diagnostics {
            recorder.warning(Stage::Transformation, diag.message.clone());
        }
        let routing_module = if transform.entries.is_empty() {
            None
        } else {
            tracing::info!(
                "[TRANSFORMATION] consolidated {} route entries",
                transform.entries.len()
            );
            recorder.info_with_detail(
                Stage::Transformation,
                format!(
                    "Consolidated {} route entries ({} resolvers, {} guards)",
                    transform.entries.len(),
                    transform.resolvers.len(),
                    transform.guards.len()
                ),
                json!({
                    "entries": transform.entries.len(),
                    "resolvers": transform.resolvers.len(),
                    "guards": transform.guards.len()
                }),
            );
            Some(codegen::render_routing_module(&transform, config))
        };

        let generated: Vec<GeneratedUnit> = units
            .par_iter()
            .enumerate()
            .map(|(i, unit)| {
                codegen::generate_unit(unit, &assessments[i], &resolutions[i], config)
                    .unwrap_or_else(|err| failed_generation(unit, err))
            })
            .collect();

        let mut artifacts: Vec<MigrationArtifact> = Vec::with_capacity(units.len());
        for (((mut unit, mut assessment), resolution), mut gen) in units
            .into_iter()
            .zip(assessments)
            .zip(resolutions)
            .zip(generated)
        {
            unit.di_tokens = resolution.tokens;
            let mut notes: Vec<Diagnostic> = unit
                .di_tokens
                .iter()
                .filter(|t| t.dropped)
                .map(|t| {
                    let reason = t.drop_reason.as_deref().unwrap_or("no Angular equivalent");
                    Diagnostic::info(
                        DiagnosticCategory::DiDrop,
                        format!("'{}' drops '{}': {}", unit.name, t.raw_name, reason),
                    )
                    .with_file(&unit.file)
                })
                .collect();
            // Every config unit stands for the one consolidated routing module.
            if unit.kind == UnitKind::RouteConfig {
                if let Some(module_source) = &routing_module {
                    gen.source = Some(module_source.clone());
                }
                for decl in unit
                    .body
                    .routes
                    .iter()
                    .filter(|d| d.has_on_enter || d.has_on_exit)
                {
                    let hooks = match (decl.has_on_enter, decl.has_on_exit) {
                        (true, true) => "onEnter/onExit hooks",
                        (true, false) => "an onEnter hook",
                        _ => "an onExit hook",
                    };
                    let name = decl
                        .state_name
                        .as_deref()
                        .or(decl.path.as_deref())
                        .unwrap_or("(fallback)");
                    notes.push(
                        Diagnostic::info(
                            DiagnosticCategory::Generation,
                            format!(
                                "state '{}' declares {}; port the hook to a route guard or component lifecycle",
                                name, hooks
                            ),
                        )
                        .with_file(&unit.file)
                        .with_line(decl.line),
                    );
                }
            }
            if gen.source.is_none() && assessment.level != RiskLevel::Manual {
                recorder.warning(
                    Stage::Transformation,
                    format!("'{}' degraded to MANUAL: generation failed", unit.name),
                );
                assessment.level = RiskLevel::Manual;
            }
            let mut artifact = MigrationArtifact::new(unit, assessment, gen);
            artifact.diagnostics.extend(notes);
            artifacts.push(artifact);
        }
        let generated_count = artifacts
            .iter()
            .filter(|a| a.generated_source.as_deref().map(|s| !s.is_empty()).unwrap_or(false))
            .count();
        tracing::info!("[TRANSFORMATION] generated {} sources", generated_count);
        recorder.info_with_detail(
            Stage::Transformation,
            format!("Applied {} transformations", generated_count),
            json!({ "changeCount": generated_count }),
        );

        let findings = validate(&mut artifacts, &recorder);
        let validation_message = if findings == 0 {
            format!("Validated {} generated sources", generated_count)
        } else {
            format!("Validation found {} structural problems", findings)
        };
        tracing::info!("[VALIDATION] {} findings", findings);
        recorder.info_with_detail(
            Stage::Validation,
            validation_message,
            json!({ "checked": generated_count, "findings": findings }),
        );

        let mut summary = RiskSummary::default();
        for artifact in &artifacts {
            summary.record(artifact.risk);
        }
        let reviews = build_reviews(&artifacts, &transform);
        tracing::info!("[REPORTING] generated diffs for {} files", reviews.len());
        recorder.info_with_detail(
            Stage::Reporting,
            format!("Generated diffs for {} files", reviews.len()),
            json!({ "fileCount": reviews.len() }),
        );

        let pending = artifacts.len();
        recorder.info(
            Stage::Decision,
            format!("Session ready for review: {} artifacts pending", pending),
        );

        session_diagnostics.append(&mut transform.diagnostics);

        let mut session = MigrationSession::new();
        session.artifacts = artifacts;
        session.route_table = transform.entries;
        session.routing_module = routing_module;
        session.file_reviews = reviews;
        session.risk_summary = summary;
        session.diagnostics = session_diagnostics;
        session.timeline = recorder.into_events();
        tracing::info!("[REPORTING] session {} assembled", session.id);
        Ok(session)
    }
}

/// Per-file detection, collected in project order. Parse failures become
/// file-level diagnostics; the file's units are simply absent.
fn analyze(project: &Project, recorder: &TimelineRecorder) -> (Vec<Unit>, Vec<Diagnostic>) {
    let detections: Vec<crate::Result<detect::FileDetection>> = project
        .files
        .par_iter()
        .map(|file| detect::detect_units(&file.path, &file.content))
        .collect();

    let mut units: Vec<Unit> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for (file, detection) in project.files.iter().zip(detections) {
        match detection {
            Ok(found) => {
                for diag in &found.diagnostics {
                    if diag.severity >= Severity::Warning {
                        recorder.warning(Stage::Analysis, diag.message.clone());
                    }
                }
                diagnostics.extend(found.diagnostics);
                units.extend(found.units);
            }
            Err(err) => {
                let message = err.to_string();
                recorder.warning(Stage::Analysis, message.clone());
                diagnostics
                    .push(Diagnostic::warning(DiagnosticCategory::Parse, message).with_file(&file.path));
            }
        }
    }

    let controllers = units.iter().filter(|u| u.kind == UnitKind::Controller).count();
    let services = units
        .iter()
        .filter(|u| matches!(u.kind, UnitKind::Service | UnitKind::Factory))
        .count();
    let directives = units
        .iter()
        .filter(|u| matches!(u.kind, UnitKind::Directive | UnitKind::Component))
        .count();
    let route_configs = units.iter().filter(|u| u.is_route_config()).count();
    tracing::info!(
        "[ANALYSIS] detected {} units across {} files",
        units.len(),
        project.len()
    );
    recorder.info_with_detail(
        Stage::Analysis,
        format!(
            "Found {} units ({} controllers, {} services, {} directives, {} route configs)",
            units.len(),
            controllers,
            services,
            directives,
            route_configs
        ),
        json!({
            "units": units.len(),
            "controllers": controllers,
            "services": services,
            "directives": directives,
            "routeConfigs": route_configs
        }),
    );

    (units, diagnostics)
}

fn failed_generation(unit: &Unit, err: UpliftError) -> GeneratedUnit {
    let (class_name, file_name) = codegen::target_names(unit);
    GeneratedUnit {
        class_name,
        file_name,
        source: None,
        diagnostics: vec![Diagnostic::error(DiagnosticCategory::Generation, err.to_string())
            .with_file(&unit.file)
            .with_line(unit.span.start_line)],
    }
}

/// Structural checks over generated sources. Findings are warnings on the
/// artifact, never a run failure.
fn validate(artifacts: &mut [MigrationArtifact], recorder: &TimelineRecorder) -> usize {
    let mut findings = 0;
    for artifact in artifacts.iter_mut() {
        let Some(source) = artifact.generated_source.as_deref() else {
            continue;
        };
        if source.is_empty() {
            continue;
        }
        let mut problems: Vec<&str> = Vec::new();
        if !balanced_braces(source) {
            problems.push("unbalanced braces");
        }
        if !source.contains("class ") {
            problems.push("no class declaration");
        }
        for problem in problems {
            findings += 1;
            let message = format!(
                "Generated source for '{}' failed structural check: {}",
                artifact.class_name, problem
            );
            recorder.warning(Stage::Validation, message.clone());
            artifact.diagnostics.push(
                Diagnostic::warning(DiagnosticCategory::Validation, message)
                    .with_file(&artifact.unit.file),
            );
        }
    }
    findings
}

fn balanced_braces(source: &str) -> bool {
    let mut depth: i64 = 0;
    for c in source.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// One review per distinct output file. A file claimed by several units
/// keeps the first content and the max risk over its contributors.
fn build_reviews(
    artifacts: &[MigrationArtifact],
    transform: &crate::routes::RouteTransform,
) -> Vec<FileReview> {
    let mut reviews: Vec<FileReview> = Vec::new();
    let mut seen: AHashMap<String, usize> = AHashMap::new();

    for artifact in artifacts {
        let Some(source) = artifact.generated_source.as_deref() else {
            continue;
        };
        if source.is_empty() {
            continue;
        }
        if let Some(&idx) = seen.get(&artifact.file_name) {
            reviews[idx].risk = reviews[idx].risk.combine(artifact.risk);
            continue;
        }
        let reason = artifact
            .signals
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join("; ");
        seen.insert(artifact.file_name.clone(), reviews.len());
        reviews.push(FileReview::new_file(
            &artifact.file_name,
            source,
            artifact.risk,
            &reason,
        ));
    }

    for stub in &transform.resolvers {
        let source = codegen::render_resolver_stub(stub);
        reviews.push(FileReview::new_file(
            &format!("{}.ts", stub.file_base),
            &source,
            RiskLevel::Safe,
            "generated resolver stub",
        ));
    }
    for stub in &transform.guards {
        let source = codegen::render_guard_stub(stub);
        reviews.push(FileReview::new_file(
            &format!("{}.ts", stub.file_base),
            &source,
            RiskLevel::Safe,
            "generated guard stub",
        ));
    }

    reviews
}
