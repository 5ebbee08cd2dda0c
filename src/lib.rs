//! uplift-engine: static AngularJS to Angular migration engine
//!
//! The engine parses an AngularJS codebase with tree-sitter, detects the
//! registered units (controllers, services, factories, directives,
//! components, filters and route config blocks), resolves their DI tokens
//! against an Angular target table, classifies each unit's migration risk,
//! consolidates legacy route tables into an Angular routing module and
//! emits generated sources wrapped in a reviewable migration session.
//!
//! # Pipeline stages
//!
//! ingestion, analysis, patterns, risk, transformation, validation,
//! reporting, decision. Each stage appends to the session timeline so a
//! reviewer can replay what the engine did.
//!
//! # Example
//!
//! ```ignore
//! use uplift_engine::{EngineConfig, Pipeline, Project};
//!
//! let project = Project::from_sources(vec![(
//!     "app.js".to_string(),
//!     r#"angular.module('app').controller('MainCtrl', function($scope) {
//!         $scope.title = 'hello';
//!     });"#
//!     .to_string(),
//! )]);
//!
//! let session = Pipeline::run(&project, &EngineConfig::default())?;
//! println!("{}", uplift_engine::report::render_text(&session));
//! ```

pub mod cli;
pub mod codegen;
pub mod config;
pub mod detect;
pub mod di;
pub mod error;
pub mod parsing;
pub mod pipeline;
pub mod project;
pub mod report;
pub mod risk;
pub mod routes;
pub mod schema;
pub mod session;

// Re-export commonly used types
pub use cli::{Cli, OutputFormat};
pub use config::EngineConfig;
pub use error::{Result, UpliftError};
pub use pipeline::Pipeline;
pub use project::{Project, SourceFile};
pub use schema::{
    DiToken, Diagnostic, DiagnosticCategory, HazardSignal, RiskLevel, RouteEntry, Severity, Unit,
    UnitKind,
};
pub use session::{Decision, FileReview, MigrationArtifact, MigrationSession, RiskSummary, Stage};
