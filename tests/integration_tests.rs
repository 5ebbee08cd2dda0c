//! Integration tests for uplift-engine
//!
//! These tests drive the engine end to end: a temp directory of AngularJS
//! sources goes in, a migration session or CLI output comes out.
//!
//! ## Test Tiers
//!
//! - **Tier 1: Unit** - Individual functions (in src/*.rs)
//! - **Tier 2: Component** - Pipeline over real directories (this file)
//! - **Tier 3: Integration** - Full CLI runs via the built binary (cli module)
//!
//! ## Test Fixture Strategy
//!
//! Tests use tempfile to create temporary directories with specific source
//! structures. This avoids bloating the repo with fixture files while
//! enabling realistic testing.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use uplift_engine::session::MigrationSession;
use uplift_engine::{EngineConfig, Pipeline, Project};

// ============================================================================
// TEST FIXTURE UTILITIES
// ============================================================================

/// Builder for creating AngularJS project structures
struct TestProject {
    dir: TempDir,
}

impl TestProject {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a source file with the given content
    fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    /// A small but complete app: two controllers, a service, a factory and
    /// an ngRoute config block
    fn with_standard_app(&self) -> &Self {
        self.add_file("js/controllers.js", CONTROLLERS_JS)
            .add_file("js/services.js", SERVICES_JS)
            .add_file("js/routes.js", ROUTES_JS)
    }

    /// Run the full pipeline over the directory with default config
    fn run(&self) -> MigrationSession {
        self.run_with(&EngineConfig::default())
    }

    fn run_with(&self, config: &EngineConfig) -> MigrationSession {
        let project = Project::from_dir(self.path()).expect("project collection failed");
        Pipeline::run(&project, config).expect("pipeline failed")
    }

    /// Run the built CLI binary inside the project directory
    fn run_cli(&self, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_uplift-engine"))
            .current_dir(self.path())
            .args(args)
            .output()
            .expect("failed to run uplift-engine binary")
    }
}

const CONTROLLERS_JS: &str = r#"
angular.module('app')
  .controller('HomeController', ['$scope', 'UserService', function($scope, UserService) {
    $scope.title = 'Home';
    $scope.load = function() {
      return UserService.list();
    };
  }])
  .controller('AboutController', function($scope) {
    $scope.title = 'About';
  });
"#;

const SERVICES_JS: &str = r#"
angular.module('app')
  .service('UserService', ['$http', function($http) {
    this.list = function() { return $http.get('/api/users'); };
    this.save = function(user) { return $http.post('/api/users', user); };
  }])
  .factory('SettingsCache', function() {
    var store = {};
    return {
      get: function(key) { return store[key]; },
      put: function(key, value) { store[key] = value; }
    };
  });
"#;

const ROUTES_JS: &str = r#"
angular.module('app').config(['$routeProvider', function($routeProvider) {
  $routeProvider
    .when('/home', { templateUrl: 'views/home.html', controller: 'HomeController' })
    .when('/users/:id', { templateUrl: 'views/user.html', controller: 'UserController' })
    .when('/about', { templateUrl: 'views/about.html', controller: 'AboutController' })
    .when('/users/:id/edit', { templateUrl: 'views/edit.html', controller: 'EditController' })
    .otherwise({ redirectTo: '/home' });
}]);
"#;

const STATES_JS: &str = r#"
angular.module('app').config(['$stateProvider', '$urlRouterProvider',
  function($stateProvider, $urlRouterProvider) {
    $urlRouterProvider.otherwise('/profile/me');
    $stateProvider.state('profile', {
      url: '/profile/:userId',
      controller: 'ProfileController',
      resolve: {
        userData: ['UserService', function(UserService) { return UserService.current(); }],
        settings: ['SettingsService', '$http', function(SettingsService, $http) {
          return SettingsService.all();
        }]
      }
    });
  }
]);
"#;

const DIRECTIVES_JS: &str = r#"
angular.module('app')
  .directive('legacyPanel', function($compile) {
    return {
      restrict: 'E',
      transclude: true,
      compile: function(element, attrs) {
        return function(scope, el) {};
      }
    };
  })
  .controller('PanelController', function($scope) {
    $scope.open = true;
  });
"#;

const FORM_JS: &str = r#"
angular.module('app').controller('FormController', function($scope) {
  $scope.first = '';
  $scope.last = '';
  $scope.email = '';
  $scope.phone = '';
  $scope.notes = '';
});
"#;

const WATCHER_JS: &str = r#"
angular.module('app').controller('InspectorController', ['$scope', function($scope) {
  $scope.$watch('model.values', function(next) {}, true);
  $scope.entries = [];
  $scope.refresh = function() {};
  $scope.dirty = false;
  $scope.touched = false;
  $scope.saving = false;
  $scope.errors = [];
}]);
"#;

// ============================================================================
// PIPELINE FLOW
// ============================================================================

mod pipeline_flow {
    use super::*;
    use uplift_engine::session::ReviewStatus;
    use uplift_engine::{Decision, DiagnosticCategory, RiskLevel, Severity, UnitKind};

    #[test]
    fn test_standard_app_full_run() {
        let project = TestProject::new();
        project.with_standard_app();
        let session = project.run();

        assert_eq!(session.artifacts.len(), 5);
        assert_eq!(session.risk_summary.safe, 5);
        assert_eq!(session.risk_summary.risky, 0);
        assert_eq!(session.risk_summary.manual, 0);
        assert!(session.artifacts.iter().all(|a| a.decision == Decision::Pending));

        let names: Vec<&str> = session
            .artifacts
            .iter()
            .map(|a| a.class_name.as_str())
            .collect();
        assert!(names.contains(&"HomeComponent"));
        assert!(names.contains(&"AboutComponent"));
        assert!(names.contains(&"UserService"));
        assert!(names.contains(&"AppRoutingModule"));

        let module = session.routing_module.as_deref().expect("routing module");
        assert!(module.contains("RouterModule.forRoot(routes)"));
        assert!(module.contains("export class AppRoutingModule"));
    }

    #[test]
    fn test_file_order_is_deterministic() {
        let project = TestProject::new();
        project.with_standard_app();
        let first = project.run();
        let second = project.run();

        let names = |s: &MigrationSession| {
            s.artifacts.iter().map(|a| a.class_name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
        let patterns = |s: &MigrationSession| {
            s.route_table.iter().map(|e| e.pattern.clone()).collect::<Vec<_>>()
        };
        assert_eq!(patterns(&first), patterns(&second));
    }

    #[test]
    fn test_skips_vendored_directories() {
        let project = TestProject::new();
        project
            .with_standard_app()
            .add_file(
                "node_modules/lib/index.js",
                "angular.module('vendor').controller('X', function($scope) {});",
            )
            .add_file(
                "dist/bundle.js",
                "angular.module('built').service('Y', function() {});",
            );
        let session = project.run();

        assert!(session.artifacts.iter().all(|a| a.unit.module == "app"));
        assert_eq!(session.artifacts.len(), 5);
    }

    #[test]
    fn test_parse_failure_leaves_other_files_intact() {
        let project = TestProject::new();
        project
            .add_file("js/broken.js", "function ((( {")
            .add_file("js/services.js", SERVICES_JS);
        let session = project.run();

        assert_eq!(session.artifacts.len(), 2);
        let parse_diags: Vec<_> = session
            .diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::Parse)
            .collect();
        assert_eq!(parse_diags.len(), 1);
        assert_eq!(parse_diags[0].severity, Severity::Warning);
        assert!(parse_diags[0]
            .file
            .as_deref()
            .is_some_and(|f| f.ends_with("broken.js")));
    }

    #[test]
    fn test_empty_project_is_an_error() {
        let project = TestProject::new();
        project.add_file("README.md", "no javascript here");
        let collected = Project::from_dir(project.path()).expect("collection");
        let result = Pipeline::run(&collected, &EngineConfig::default());
        assert!(matches!(
            result,
            Err(uplift_engine::UpliftError::EmptyProject)
        ));
    }

    #[test]
    fn test_file_reviews_cover_generated_files() {
        let project = TestProject::new();
        project.with_standard_app();
        let session = project.run();

        let paths: Vec<&str> = session.file_reviews.iter().map(|r| r.path.as_str()).collect();
        assert!(paths.contains(&"home.component.ts"));
        assert!(paths.contains(&"user.service.ts"));
        assert!(paths.contains(&"app-routing.module.ts"));

        for review in &session.file_reviews {
            assert_eq!(review.status, ReviewStatus::New);
            assert!(!review.after_content.is_empty());
            assert!(review.unified_diff.starts_with("--- a/"));
            assert_eq!(review.decision, Decision::Pending);
        }
    }

    #[test]
    fn test_timeline_runs_ingestion_to_decision() {
        let project = TestProject::new();
        project.with_standard_app();
        let session = project.run();

        let stages: Vec<&str> = session.timeline.iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(stages.first(), Some(&"ingestion"));
        assert_eq!(stages.last(), Some(&"decision"));
        for stage in [
            "analysis",
            "patterns",
            "risk",
            "transformation",
            "validation",
            "reporting",
        ] {
            assert!(stages.contains(&stage), "missing stage {}", stage);
        }
        assert!(session
            .timeline
            .iter()
            .any(|e| e.message.starts_with("Scanned ")));
    }

    #[test]
    fn test_manual_unit_has_no_generated_source() {
        let project = TestProject::new();
        project.add_file("js/watcher.js", WATCHER_JS);
        let session = project.run();

        let artifact = &session.artifacts[0];
        assert_eq!(artifact.unit.kind, UnitKind::Controller);
        assert_eq!(artifact.risk, RiskLevel::Manual);
        assert!(artifact.generated_source.is_none());
        assert!(artifact.confidence < 0.2);
    }
}

// ============================================================================
// RISK RULES
// ============================================================================

mod risk_rules {
    use super::*;
    use uplift_engine::risk::DetectorKind;
    use uplift_engine::{HazardSignal, RiskLevel};

    #[test]
    fn test_hazardous_directive_leaves_chain_sibling_safe() {
        let project = TestProject::new();
        project.add_file("js/directives.js", DIRECTIVES_JS);
        let session = project.run();

        assert_eq!(session.artifacts.len(), 2);
        let directive = &session.artifacts[0];
        let controller = &session.artifacts[1];

        assert_eq!(directive.class_name, "LegacyPanelComponent");
        assert_eq!(directive.risk, RiskLevel::Manual);
        assert!(directive.signals.contains(&HazardSignal::CompileUsage));
        assert!(directive.signals.contains(&HazardSignal::TranscludeUsage));

        assert_eq!(controller.class_name, "PanelComponent");
        assert_eq!(controller.risk, RiskLevel::Safe);
        assert!(controller.signals.is_empty());
    }

    #[test]
    fn test_threshold_boundary_end_to_end() {
        let project = TestProject::new();
        project.add_file("js/form.js", FORM_JS);

        let at_six = project.run_with(&EngineConfig::default());
        assert_eq!(at_six.artifacts[0].risk, RiskLevel::Safe);

        let config = EngineConfig {
            mutation_threshold: 5,
            ..Default::default()
        };
        let at_five = project.run_with(&config);
        assert_eq!(at_five.artifacts[0].risk, RiskLevel::Risky);
        assert!(at_five.artifacts[0]
            .generated_source
            .as_deref()
            .is_some_and(|s| s.contains("// RISK:")));
    }

    #[test]
    fn test_adding_signals_never_lowers_level() {
        // Same source classified with fewer detectors enabled must not come
        // out worse than with all of them.
        let project = TestProject::new();
        project.add_file("js/watcher.js", WATCHER_JS);

        let threshold = EngineConfig {
            mutation_threshold: 5,
            ..Default::default()
        };
        let all_detectors = project.run_with(&threshold);

        let fewer = EngineConfig {
            mutation_threshold: 5,
            disabled_detectors: vec![DetectorKind::Watchers],
            ..Default::default()
        };
        let without_watchers = project.run_with(&fewer);

        assert_eq!(without_watchers.artifacts[0].risk, RiskLevel::Risky);
        assert_eq!(all_detectors.artifacts[0].risk, RiskLevel::Manual);
        assert!(all_detectors.artifacts[0].risk >= without_watchers.artifacts[0].risk);
        assert!(
            all_detectors.artifacts[0].signals.len()
                > without_watchers.artifacts[0].signals.len()
        );
    }

    #[test]
    fn test_confidence_tracks_risk_and_signal_count() {
        let project = TestProject::new();
        project
            .add_file("js/controllers.js", CONTROLLERS_JS)
            .add_file("js/watcher.js", WATCHER_JS);
        let session = project.run();

        let safe = session
            .artifacts
            .iter()
            .find(|a| a.class_name == "HomeComponent")
            .expect("safe artifact");
        let manual = session
            .artifacts
            .iter()
            .find(|a| a.class_name == "InspectorComponent")
            .expect("manual artifact");
        assert!(safe.confidence > manual.confidence);
        assert!(safe.confidence <= 0.9);
        assert!(manual.confidence >= 0.05);
    }
}

// ============================================================================
// ROUTING
// ============================================================================

mod routing {
    use super::*;
    use uplift_engine::di;
    use uplift_engine::schema::DiToken;

    #[test]
    fn test_shadow_safe_route_ordering() {
        let project = TestProject::new();
        project.add_file("js/routes.js", ROUTES_JS);
        let session = project.run();

        let patterns: Vec<&str> = session
            .route_table
            .iter()
            .map(|e| e.pattern.as_str())
            .collect();
        assert_eq!(
            patterns,
            vec!["home", "about", "users/:id", "users/:id/edit", "**"]
        );

        let fallback = session.route_table.last().expect("fallback entry");
        assert_eq!(fallback.redirect_target.as_deref(), Some("home"));
        assert_eq!(session.route_table[2].param_names, vec!["id".to_string()]);
    }

    #[test]
    fn test_resolve_bindings_become_resolver_stubs() {
        let project = TestProject::new();
        project.add_file("js/states.js", STATES_JS);
        let session = project.run();

        let entry = session
            .route_table
            .iter()
            .find(|e| e.pattern == "profile/:userId")
            .expect("profile route");
        let classes: Vec<&str> = entry
            .resolve_bindings
            .iter()
            .map(|b| b.resolver_class.as_str())
            .collect();
        assert_eq!(classes, vec!["UserDataResolver", "SettingsResolver"]);

        let review_paths: Vec<&str> =
            session.file_reviews.iter().map(|r| r.path.as_str()).collect();
        assert!(review_paths.contains(&"userdata.resolver.ts"));
        assert!(review_paths.contains(&"settings.resolver.ts"));

        let resolver = session
            .file_reviews
            .iter()
            .find(|r| r.path == "settings.resolver.ts")
            .expect("settings resolver review");
        assert!(resolver.after_content.contains("class SettingsResolver"));
        assert!(resolver.after_content.contains("private http: HttpClient"));
    }

    #[test]
    fn test_auth_resolve_key_splits_into_guard() {
        let source = r#"
angular.module('app').config(function($stateProvider) {
  $stateProvider.state('admin', {
    url: '/admin',
    controller: 'AdminController',
    resolve: {
      auth: ['AuthService', function(AuthService) { return AuthService.check(); }],
      reportData: ['ReportService', function(ReportService) { return ReportService.load(); }]
    }
  });
});
"#;
        let project = TestProject::new();
        project.add_file("js/admin.js", source);
        let session = project.run();

        let entry = &session.route_table[0];
        assert_eq!(entry.guard_refs, vec!["AuthGuard".to_string()]);
        assert_eq!(entry.resolve_bindings.len(), 1);
        assert_eq!(entry.resolve_bindings[0].resolver_class, "ReportDataResolver");

        let module = session.routing_module.as_deref().expect("routing module");
        assert!(module.contains("canActivate: [AuthGuard]"));

        let guard = session
            .file_reviews
            .iter()
            .find(|r| r.path == "auth.guard.ts")
            .expect("guard review");
        assert!(guard.after_content.contains("class AuthGuard"));
    }

    #[test]
    fn test_di_resolution_is_idempotent() {
        let declared = vec![
            DiToken::declared("$scope", true),
            DiToken::declared("$state", true),
            DiToken::declared("$location", true),
            DiToken::declared("UserService", true),
        ];
        let config = EngineConfig::default();
        let first = di::resolve_tokens(&declared, &config);
        let second = di::resolve_tokens(&first.tokens, &config);

        assert_eq!(first.params, second.params);
        assert_eq!(first.imports, second.imports);
        let router_params: Vec<&String> = first
            .params
            .iter()
            .filter(|p| p.contains("Router"))
            .collect();
        assert_eq!(router_params, vec!["private router: Router"]);
    }
}

// ============================================================================
// DECISIONS
// ============================================================================

mod decisions {
    use super::*;
    use uplift_engine::{Decision, UpliftError};

    #[test]
    fn test_review_workflow() {
        let project = TestProject::new();
        project.with_standard_app();
        let mut session = project.run();

        let total = session.artifacts.len();
        assert_eq!(session.pending_count(), total);

        session.artifacts[0].accept().expect("accept pending");
        session.artifacts[1].revert().expect("revert pending");
        assert_eq!(session.pending_count(), total - 2);

        // Commit refuses while anything is still pending.
        let err = session.commit(false).expect_err("pending commit");
        assert!(matches!(err, UpliftError::PendingDecisions { pending } if pending == total - 2));
        assert!(session.committed_at.is_none());

        for artifact in &mut session.artifacts {
            if artifact.is_pending() {
                artifact.accept().expect("accept rest");
            }
        }
        session.commit(false).expect("commit");
        assert!(session.committed_at.is_some());
    }

    #[test]
    fn test_settled_decisions_are_final() {
        let project = TestProject::new();
        project.add_file("js/services.js", SERVICES_JS);
        let mut session = project.run();

        session.artifacts[0].accept().expect("accept");
        let err = session.artifacts[0].revert().expect_err("revert accepted");
        assert!(matches!(err, UpliftError::DecisionTransition { .. }));
        assert_eq!(session.artifacts[0].decision, Decision::Accepted);

        let err = session.artifacts[0].accept().expect_err("accept twice");
        assert!(matches!(err, UpliftError::DecisionTransition { .. }));
    }

    #[test]
    fn test_forced_commit_keeps_pending_decisions() {
        let project = TestProject::new();
        project.add_file("js/services.js", SERVICES_JS);
        let mut session = project.run();

        session.commit(true).expect("forced commit");
        assert!(session.committed_at.is_some());
        assert_eq!(session.pending_count(), session.artifacts.len());
    }
}

// ============================================================================
// CLI
// ============================================================================

mod cli {
    use super::*;

    #[test]
    fn test_units_command_lists_detections() {
        let project = TestProject::new();
        project.with_standard_app();
        let output = project.run_cli(&["units", "."]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("ANGULARJS UNITS"));
        assert!(stdout.contains("HomeController"));
        assert!(stdout.contains("UserService"));
        assert!(stdout.contains("service"));
    }

    #[test]
    fn test_units_kind_filter() {
        let project = TestProject::new();
        project.with_standard_app();
        let output = project.run_cli(&["units", ".", "--kind", "service"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("UserService"));
        assert!(!stdout.contains("HomeController"));
    }

    #[test]
    fn test_migrate_summary_only() {
        let project = TestProject::new();
        project.with_standard_app();
        let output = project.run_cli(&["migrate", ".", "--summary-only"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout, "units: 5 (5 safe, 0 risky, 0 manual)\n");
    }

    #[test]
    fn test_migrate_json_is_parseable() {
        let project = TestProject::new();
        project.with_standard_app();
        let output = project.run_cli(&["migrate", ".", "--format", "json"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: serde_json::Value =
            serde_json::from_str(&stdout).expect("stdout is valid JSON");
        assert!(value.get("id").is_some());
        assert_eq!(
            value["riskSummary"]["safe"].as_u64(),
            Some(5),
            "unexpected summary: {}",
            value["riskSummary"]
        );
        assert!(value["artifacts"].as_array().is_some_and(|a| a.len() == 5));
        assert!(value.get("routingModule").is_some());
    }

    #[test]
    fn test_threshold_flag_changes_verdict() {
        let project = TestProject::new();
        project.add_file("js/form.js", FORM_JS);
        let output = project.run_cli(&["migrate", ".", "--threshold", "5", "--summary-only"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout, "units: 1 (0 safe, 1 risky, 0 manual)\n");
    }

    #[test]
    fn test_config_file_discovery() {
        let project = TestProject::new();
        project
            .add_file("js/form.js", FORM_JS)
            .add_file("uplift.toml", "mutation_threshold = 5\n");
        let output = project.run_cli(&["migrate", ".", "--summary-only"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout, "units: 1 (0 safe, 1 risky, 0 manual)\n");
    }

    #[test]
    fn test_invalid_config_exits_2() {
        let project = TestProject::new();
        project
            .add_file("js/form.js", FORM_JS)
            .add_file("uplift.toml", "mutation_threshold = 0\n");
        let output = project.run_cli(&["migrate", "."]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Error:"));
        assert!(stderr.contains("mutation_threshold"));
    }

    #[test]
    fn test_missing_path_exits_4() {
        let project = TestProject::new();
        let output = project.run_cli(&["migrate", "does-not-exist"]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("File not found"));
    }

    #[test]
    fn test_empty_project_exits_3() {
        let project = TestProject::new();
        project.add_file("README.md", "nothing to migrate");
        let output = project.run_cli(&["migrate", "."]);

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("no JavaScript sources"));
    }

    #[test]
    fn test_routes_command_with_stubs() {
        let project = TestProject::new();
        project.add_file("js/states.js", STATES_JS);
        let output = project.run_cli(&["routes", ".", "--stubs"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("ROUTE TABLE"));
        assert!(stdout.contains("profile/:userId"));
        assert!(stdout.contains("UserDataResolver"));
        assert!(stdout.contains("class SettingsResolver"));
    }

    #[test]
    fn test_markdown_report_to_file() {
        let project = TestProject::new();
        project.with_standard_app();
        let output = project.run_cli(&[
            "migrate",
            ".",
            "--format",
            "markdown",
            "--out",
            "report.md",
        ]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Report written to report.md"));

        let report = fs::read_to_string(project.path().join("report.md")).expect("report file");
        assert!(report.starts_with("# Uplift Migration Report"));
        assert!(report.contains("## Route Table"));
    }
}
