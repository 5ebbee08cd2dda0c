//! Risk classification.
//!
//! A fixed set of independent hazard detectors runs over each unit's body
//! facts. Every detector contributes zero or more signals; the unit's risk
//! level is the maximum severity across all signals, SAFE when none fire.
//!
//! Classification is per-unit and pure: signals never leak between units,
//! including units registered on the same fluent chain in one file. A
//! detector failure degrades only its own unit to MANUAL and the run
//! continues.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::schema::{Diagnostic, DiagnosticCategory, HazardSignal, RiskLevel, Unit, UnitKind};

/// The hazard detectors, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    /// `$watch` / `$watchCollection` depth analysis
    Watchers,
    /// `$scope.$new()` child scope creation
    ScopeLifecycle,
    /// `$q.defer()` deferred promise construction
    DeferredPromises,
    /// Directive definition shape: compile/link hooks, transclusion
    DirectiveShape,
    /// Distinct top-level scope-field assignment volume
    MutationVolume,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 5] = [
        DetectorKind::Watchers,
        DetectorKind::ScopeLifecycle,
        DetectorKind::DeferredPromises,
        DetectorKind::DirectiveShape,
        DetectorKind::MutationVolume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Watchers => "watchers",
            DetectorKind::ScopeLifecycle => "scope-lifecycle",
            DetectorKind::DeferredPromises => "deferred-promises",
            DetectorKind::DirectiveShape => "directive-shape",
            DetectorKind::MutationVolume => "mutation-volume",
        }
    }
}

/// One unit's classification outcome
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub signals: Vec<HazardSignal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify one unit.
///
/// Never fails: a detector error is converted into a `classification`
/// diagnostic and the unit is degraded to MANUAL.
pub fn classify_unit(unit: &Unit, config: &EngineConfig) -> RiskAssessment {
    let mut signals: Vec<HazardSignal> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut degraded = false;

    for detector in DetectorKind::ALL {
        if !config.is_detector_enabled(detector) {
            continue;
        }
        match run_detector(detector, unit, config) {
            Ok(found) => signals.extend(found),
            Err(e) => {
                degraded = true;
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCategory::Classification,
                        format!("{} detector failed for '{}': {}", detector.as_str(), unit.name, e),
                    )
                    .with_file(&unit.file)
                    .with_line(unit.span.start_line),
                );
            }
        }
    }

    let mut level = signals
        .iter()
        .fold(RiskLevel::Safe, |acc, s| acc.combine(s.severity()));
    if degraded {
        level = RiskLevel::Manual;
    }

    RiskAssessment {
        level,
        signals,
        diagnostics,
    }
}

fn run_detector(
    detector: DetectorKind,
    unit: &Unit,
    config: &EngineConfig,
) -> crate::Result<Vec<HazardSignal>> {
    match detector {
        DetectorKind::Watchers => detect_watchers(unit),
        DetectorKind::ScopeLifecycle => detect_scope_lifecycle(unit),
        DetectorKind::DeferredPromises => detect_deferred_promises(unit),
        DetectorKind::DirectiveShape => detect_directive_shape(unit),
        DetectorKind::MutationVolume => detect_mutation_volume(unit, config.mutation_threshold),
    }
}

/// Deep watches have no template-binding equivalent; shallow ones do
fn detect_watchers(unit: &Unit) -> crate::Result<Vec<HazardSignal>> {
    Ok(unit
        .body
        .watches
        .iter()
        .map(|w| {
            if w.deep {
                HazardSignal::DeepWatch {
                    expression: w.expression.clone(),
                }
            } else {
                HazardSignal::ShallowWatch {
                    expression: w.expression.clone(),
                }
            }
        })
        .collect())
}

fn detect_scope_lifecycle(unit: &Unit) -> crate::Result<Vec<HazardSignal>> {
    let mut signals = Vec::new();
    if unit.body.creates_child_scope {
        signals.push(HazardSignal::NestedScopeCreation);
    }
    Ok(signals)
}

fn detect_deferred_promises(unit: &Unit) -> crate::Result<Vec<HazardSignal>> {
    let mut signals = Vec::new();
    if unit.body.uses_deferred {
        signals.push(HazardSignal::DeferredPromiseUsage);
    }
    Ok(signals)
}

/// Compile and transclusion have no mechanical rewrite. A directive with only
/// a link hook is still manual work, but a known, smaller kind of it.
fn detect_directive_shape(unit: &Unit) -> crate::Result<Vec<HazardSignal>> {
    let mut signals = Vec::new();
    if unit.kind != UnitKind::Directive {
        return Ok(signals);
    }
    let Some(facts) = &unit.body.directive else {
        return Ok(signals);
    };
    if facts.has_compile {
        signals.push(HazardSignal::CompileUsage);
    }
    if facts.transclude {
        signals.push(HazardSignal::TranscludeUsage);
    }
    if facts.has_link && !facts.has_compile && !facts.transclude {
        signals.push(HazardSignal::LinkOnly);
    }
    Ok(signals)
}

/// Counting is over distinct top-level scope fields, independent of watch
/// presence.
fn detect_mutation_volume(unit: &Unit, threshold: usize) -> crate::Result<Vec<HazardSignal>> {
    let count = unit.body.scope_writes.len();
    let mut signals = Vec::new();
    if count >= threshold {
        signals.push(HazardSignal::HeavyMutationCount { count });
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DirectiveFacts, ScopeWrite, SourceSpan, UnitBody, WatchFact};

    fn unit_with(kind: UnitKind, body: UnitBody) -> Unit {
        Unit {
            name: "TestUnit".to_string(),
            kind,
            module: "app".to_string(),
            file: "app/test.js".to_string(),
            span: SourceSpan::new(1, 10),
            di_tokens: Vec::new(),
            body,
        }
    }

    fn writes(n: usize) -> Vec<ScopeWrite> {
        (0..n)
            .map(|i| ScopeWrite {
                name: format!("field{}", i),
                is_function: false,
            })
            .collect()
    }

    fn watch(expression: &str, deep: bool) -> WatchFact {
        WatchFact {
            expression: expression.to_string(),
            deep,
            line: 3,
        }
    }

    #[test]
    fn test_no_facts_is_safe() {
        let assessment = classify_unit(
            &unit_with(UnitKind::Controller, UnitBody::default()),
            &EngineConfig::default(),
        );
        assert_eq!(assessment.level, RiskLevel::Safe);
        assert!(assessment.signals.is_empty());
    }

    #[test]
    fn test_shallow_watch_stays_safe() {
        let body = UnitBody {
            watches: vec![watch("count", false)],
            ..Default::default()
        };
        let assessment = classify_unit(
            &unit_with(UnitKind::Controller, body),
            &EngineConfig::default(),
        );
        assert_eq!(assessment.level, RiskLevel::Safe);
        assert_eq!(assessment.signals.len(), 1);
        assert!(matches!(
            assessment.signals[0],
            HazardSignal::ShallowWatch { .. }
        ));
    }

    #[test]
    fn test_deep_watch_is_manual() {
        let body = UnitBody {
            watches: vec![watch("user.profile", true)],
            ..Default::default()
        };
        let assessment = classify_unit(
            &unit_with(UnitKind::Controller, body),
            &EngineConfig::default(),
        );
        assert_eq!(assessment.level, RiskLevel::Manual);
    }

    #[test]
    fn test_deferred_and_child_scope_are_manual() {
        let body = UnitBody {
            uses_deferred: true,
            ..Default::default()
        };
        let a = classify_unit(
            &unit_with(UnitKind::Service, body),
            &EngineConfig::default(),
        );
        assert_eq!(a.level, RiskLevel::Manual);

        let body = UnitBody {
            creates_child_scope: true,
            ..Default::default()
        };
        let b = classify_unit(
            &unit_with(UnitKind::Controller, body),
            &EngineConfig::default(),
        );
        assert_eq!(b.level, RiskLevel::Manual);
        assert!(matches!(b.signals[0], HazardSignal::NestedScopeCreation));
    }

    #[test]
    fn test_mutation_threshold_boundary() {
        let config = EngineConfig::default();
        assert_eq!(config.mutation_threshold, 6);

        let five = classify_unit(
            &unit_with(
                UnitKind::Controller,
                UnitBody {
                    scope_writes: writes(5),
                    ..Default::default()
                },
            ),
            &config,
        );
        assert_eq!(five.level, RiskLevel::Safe);

        let six = classify_unit(
            &unit_with(
                UnitKind::Controller,
                UnitBody {
                    scope_writes: writes(6),
                    ..Default::default()
                },
            ),
            &config,
        );
        assert_eq!(six.level, RiskLevel::Risky);
        assert!(matches!(
            six.signals[0],
            HazardSignal::HeavyMutationCount { count: 6 }
        ));

        let lowered = EngineConfig {
            mutation_threshold: 5,
            ..Default::default()
        };
        let five_again = classify_unit(
            &unit_with(
                UnitKind::Controller,
                UnitBody {
                    scope_writes: writes(5),
                    ..Default::default()
                },
            ),
            &lowered,
        );
        assert_eq!(five_again.level, RiskLevel::Risky);
    }

    #[test]
    fn test_directive_shapes() {
        let compile = UnitBody {
            directive: Some(DirectiveFacts {
                has_compile: true,
                has_link: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let a = classify_unit(
            &unit_with(UnitKind::Directive, compile),
            &EngineConfig::default(),
        );
        assert_eq!(a.level, RiskLevel::Manual);
        assert!(a.signals.contains(&HazardSignal::CompileUsage));
        assert!(!a.signals.contains(&HazardSignal::LinkOnly));

        let link_only = UnitBody {
            directive: Some(DirectiveFacts {
                has_link: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let b = classify_unit(
            &unit_with(UnitKind::Directive, link_only),
            &EngineConfig::default(),
        );
        assert_eq!(b.level, RiskLevel::Manual);
        assert_eq!(b.signals, vec![HazardSignal::LinkOnly]);

        let template_only = UnitBody {
            directive: Some(DirectiveFacts {
                template_url: Some("panel.html".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let c = classify_unit(
            &unit_with(UnitKind::Directive, template_only),
            &EngineConfig::default(),
        );
        assert_eq!(c.level, RiskLevel::Safe);
    }

    #[test]
    fn test_directive_facts_ignored_for_components() {
        let body = UnitBody {
            directive: Some(DirectiveFacts {
                template_url: Some("card.html".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let assessment = classify_unit(
            &unit_with(UnitKind::Component, body),
            &EngineConfig::default(),
        );
        assert_eq!(assessment.level, RiskLevel::Safe);
        assert!(assessment.signals.is_empty());
    }

    #[test]
    fn test_signals_combine_to_max() {
        let body = UnitBody {
            watches: vec![watch("items", false), watch("user.name", true)],
            scope_writes: writes(8),
            ..Default::default()
        };
        let assessment = classify_unit(
            &unit_with(UnitKind::Controller, body),
            &EngineConfig::default(),
        );
        assert_eq!(assessment.level, RiskLevel::Manual);
        assert_eq!(assessment.signals.len(), 3);
    }

    #[test]
    fn test_disabled_detector_does_not_run() {
        let config = EngineConfig {
            disabled_detectors: vec![DetectorKind::MutationVolume],
            ..Default::default()
        };
        let body = UnitBody {
            scope_writes: writes(12),
            ..Default::default()
        };
        let assessment = classify_unit(&unit_with(UnitKind::Controller, body), &config);
        assert_eq!(assessment.level, RiskLevel::Safe);
        assert!(assessment.signals.is_empty());
    }

    #[test]
    fn test_units_classified_in_isolation() {
        let hazardous = UnitBody {
            uses_deferred: true,
            ..Default::default()
        };
        let clean = UnitBody::default();
        let config = EngineConfig::default();
        let a = classify_unit(&unit_with(UnitKind::Service, hazardous), &config);
        let b = classify_unit(&unit_with(UnitKind::Service, clean), &config);
        assert_eq!(a.level, RiskLevel::Manual);
        assert_eq!(b.level, RiskLevel::Safe);
    }
}
