//! Migration model data structures shared across pipeline stages

use serde::{Deserialize, Serialize};

/// Current schema version for report output stability
/// 1.0 - Initial unit/route/artifact model
/// 1.1 - Added guard refs and http verb inventory
pub const SCHEMA_VERSION: &str = "1.1";

/// Source line span of a detected construct (1-indexed, end inclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }
}

/// Kind of registered AngularJS unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Service,
    Factory,
    Controller,
    Directive,
    Component,
    Filter,
    /// A `.config` block registering routes ($routeProvider / $stateProvider)
    RouteConfig,
}

impl UnitKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Factory => "factory",
            Self::Controller => "controller",
            Self::Directive => "directive",
            Self::Component => "component",
            Self::Filter => "filter",
            Self::RouteConfig => "routeconfig",
        }
    }

    /// Map an `angular.module(...).<method>` registration method name to a kind
    pub fn from_registration(method: &str) -> Option<Self> {
        match method {
            "service" => Some(Self::Service),
            "factory" => Some(Self::Factory),
            "controller" => Some(Self::Controller),
            "directive" => Some(Self::Directive),
            "component" => Some(Self::Component),
            "filter" => Some(Self::Filter),
            "config" => Some(Self::RouteConfig),
            _ => None,
        }
    }
}

/// Migration risk level, ordered: SAFE < RISKY < MANUAL
///
/// Combination is always `max`; no pipeline stage may lower a level once
/// assigned.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Deterministic rewrite, no reactive hazards
    #[default]
    Safe,
    /// Rewrite generated, human review required
    Risky,
    /// No generated rewrite; migration plan only
    Manual,
}

impl RiskLevel {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Risky => "RISKY",
            Self::Manual => "MANUAL",
        }
    }

    /// Parse risk level from string
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MANUAL" => Self::Manual,
            "RISKY" => Self::Risky,
            _ => Self::Safe,
        }
    }

    /// Combine two levels; the result is never lower than either input
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }
}

/// A single reactive-pattern hazard found in a unit body
///
/// Every signal carries an intrinsic severity; a unit's risk level is the
/// max severity over its signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum HazardSignal {
    /// `$watch(expr, fn, true)` or a watch over a dotted object path
    DeepWatch { expression: String },
    /// Plain `$watch(expr, fn)` over a simple expression
    ShallowWatch { expression: String },
    /// `$scope.$new()` child scope creation
    NestedScopeCreation,
    /// `$q.defer()` promise construction
    DeferredPromiseUsage,
    /// Directive `compile:` hook
    CompileUsage,
    /// Directive `transclude: true`
    TranscludeUsage,
    /// Directive `link:` hook without a compile hook
    LinkOnly,
    /// Distinct top-level `$scope` field writes at or above the threshold
    HeavyMutationCount { count: usize },
}

impl HazardSignal {
    /// Intrinsic severity of this signal
    pub fn severity(&self) -> RiskLevel {
        match self {
            Self::DeepWatch { .. } => RiskLevel::Manual,
            Self::ShallowWatch { .. } => RiskLevel::Safe,
            Self::NestedScopeCreation => RiskLevel::Manual,
            Self::DeferredPromiseUsage => RiskLevel::Manual,
            Self::CompileUsage => RiskLevel::Manual,
            Self::TranscludeUsage => RiskLevel::Manual,
            Self::LinkOnly => RiskLevel::Manual,
            Self::HeavyMutationCount { .. } => RiskLevel::Risky,
        }
    }

    /// Short label used in generated `// RISK:` comments
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeepWatch { .. } => "deep_watch",
            Self::ShallowWatch { .. } => "shallow_watch",
            Self::NestedScopeCreation => "nested_scope",
            Self::DeferredPromiseUsage => "q_defer",
            Self::CompileUsage => "compile",
            Self::TranscludeUsage => "transclude",
            Self::LinkOnly => "link_only",
            Self::HeavyMutationCount { .. } => "heavy_mutation",
        }
    }

    /// Human-readable migration note for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::DeepWatch { expression } => format!(
                "Deep $watch on '{}': migrate to RxJS observables or OnPush change detection by hand",
                expression
            ),
            Self::ShallowWatch { expression } => format!(
                "Shallow $watch on '{}': maps to a property setter or ngOnChanges",
                expression
            ),
            Self::NestedScopeCreation => {
                "$scope.$new() creates a child scope with no component equivalent".to_string()
            }
            Self::DeferredPromiseUsage => {
                "$q.defer() detected: promise chain requires manual RxJS migration".to_string()
            }
            Self::CompileUsage => {
                "$compile / compile hook: dynamic template compilation has no direct equivalent"
                    .to_string()
            }
            Self::TranscludeUsage => {
                "transclude: true: migrate content projection to <ng-content> by hand".to_string()
            }
            Self::LinkOnly => {
                "link() hook without compile: move DOM logic into lifecycle hooks (lower effort than a compile hook)"
                    .to_string()
            }
            Self::HeavyMutationCount { count } => format!(
                "{} distinct $scope field writes without reactive structure: convert to class properties and review bindings",
                count
            ),
        }
    }
}

/// Angular-side replacement for a legacy DI token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetToken {
    /// Injected type name, e.g. `HttpClient`
    pub type_name: String,
    /// Constructor parameter name, e.g. `http`
    pub param_name: String,
    /// Import module path, e.g. `@angular/common/http`
    pub import_path: String,
}

impl TargetToken {
    pub fn new(type_name: &str, param_name: &str, import_path: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            param_name: param_name.to_string(),
            import_path: import_path.to_string(),
        }
    }
}

/// A declared injectable dependency of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiToken {
    /// Token name as written in source, e.g. `$http`
    pub raw_name: String,
    /// Whether the token came from an inline array annotation
    pub is_array_annotated: bool,
    /// Resolved Angular-side target, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_target: Option<TargetToken>,
    /// True when the token has no injectable counterpart (or duplicates one)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dropped: bool,
    /// Why the token was dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_reason: Option<String>,
}

impl DiToken {
    /// A freshly detected, not yet resolved token
    pub fn declared(raw_name: &str, is_array_annotated: bool) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            is_array_annotated,
            mapped_target: None,
            dropped: false,
            drop_reason: None,
        }
    }
}

/// A single top-level `$scope` field assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeWrite {
    pub name: String,
    /// True when the assigned value is a function expression
    pub is_function: bool,
}

/// A `$watch` registration found in a unit body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchFact {
    /// Watched expression text (string literal content or raw expression)
    pub expression: String,
    /// Third argument `true`, or a dotted object path expression
    pub deep: bool,
    pub line: usize,
}

/// Directive definition object facts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveFacts {
    pub has_compile: bool,
    pub has_link: bool,
    pub transclude: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    /// True when an inline `template:` string is present
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_inline_template: bool,
}

/// One entry of a component `bindings` map or an isolate directive `scope` map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingFact {
    pub name: String,
    /// Binding mode as written: `@`, `=`, `<` or `&`
    pub mode: String,
}

/// Which legacy routing subsystem declared a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterFlavor {
    /// `$routeProvider.when(...)` flat path table
    #[serde(rename = "ngRoute")]
    NgRoute,
    /// `$stateProvider.state(...)` named nested states
    #[serde(rename = "uiRouter")]
    UiRouter,
}

impl RouterFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NgRoute => "ngRoute",
            Self::UiRouter => "uiRouter",
        }
    }
}

/// One `resolve` binding in a route declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDecl {
    /// Binding name, e.g. `userData`
    pub name: String,
    /// DI tokens of the resolve function, in declared order
    pub di_tokens: Vec<String>,
}

/// A raw route declaration as written in a `.config` block
///
/// Produced by the detector; consumed by the route transformer. `NgRoute`
/// declarations carry a path, `UiRouter` declarations carry a state name and
/// usually a url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecl {
    pub flavor: RouterFlavor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// True for `$routeProvider.otherwise(...)`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_fallback: bool,
    /// True for `abstract: true` states
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolve: Vec<ResolveDecl>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_on_enter: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_on_exit: bool,
    pub line: usize,
}

impl RouteDecl {
    /// Empty declaration for a flavor, filled in by the detector
    pub fn new(flavor: RouterFlavor, line: usize) -> Self {
        Self {
            flavor,
            state_name: None,
            path: None,
            is_fallback: false,
            is_abstract: false,
            controller: None,
            template_url: None,
            template: None,
            redirect_to: None,
            resolve: Vec::new(),
            has_on_enter: false,
            has_on_exit: false,
            line,
        }
    }
}

/// Structural facts extracted from a unit's registration body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBody {
    /// Registration body source text, kept for generation reference comments
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Distinct top-level `$scope` field writes, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope_writes: Vec<ScopeWrite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watches: Vec<WatchFact>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub creates_child_scope: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub uses_deferred: bool,
    /// `$http.<verb>` calls seen in the body, deduplicated in call order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_verbs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<DirectiveFacts>,
    /// Component `bindings` / isolate `scope` entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<BindingFact>,
    /// Route declarations (RouteConfig units only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteDecl>,
}

/// A registered AngularJS unit detected in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Registered name, e.g. `UserController`
    pub name: String,
    pub kind: UnitKind,
    /// Owning `angular.module(...)` name
    pub module: String,
    /// Source file path, as supplied to the project
    pub file: String,
    pub span: SourceSpan,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub di_tokens: Vec<DiToken>,
    pub body: UnitBody,
}

impl Unit {
    pub fn is_route_config(&self) -> bool {
        self.kind == UnitKind::RouteConfig
    }
}

/// Template reference on a consolidated route entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TemplateRef {
    /// `templateUrl: '...'`
    Url(String),
    /// Inline `template: '...'`
    Inline(String),
}

/// A resolve binding carried over onto a consolidated route entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveBinding {
    /// Binding name as written in the legacy resolve block
    pub name: String,
    /// Generated resolver class the entry references
    pub resolver_class: String,
}

/// One entry of the consolidated, ordered route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    /// Normalized path pattern (no leading slash; `**` for the fallback)
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub param_names: Vec<String>,
    /// Dotted state name for uiRouter-origin entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<TemplateRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolve_bindings: Vec<ResolveBinding>,
    /// Guard classes split out of auth-like resolve bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guard_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract_parent: bool,
    /// Parent entry's state name, for nested uiRouter states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_on_enter: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_on_exit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
    pub flavor: RouterFlavor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Which recovery rule produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    Parse,
    Classification,
    RouteCollision,
    Generation,
    DiDrop,
    Hazard,
    Validation,
}

impl DiagnosticCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Classification => "classification",
            Self::RouteCollision => "route_collision",
            Self::Generation => "generation",
            Self::DiDrop => "di_drop",
            Self::Hazard => "hazard",
            Self::Validation => "validation",
        }
    }
}

/// A recoverable problem attached to a unit, file or route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn info(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    pub fn warning(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    pub fn error(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn new(severity: Severity, category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}
