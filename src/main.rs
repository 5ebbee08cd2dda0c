//! uplift-engine CLI entry point
//!
//! stdout carries the requested report so it can be piped; logs, verbose
//! notes and the progress spinner all go to stderr.

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use uplift_engine::cli::{Cli, Commands, MigrateArgs, OutputFormat, RoutesArgs, UnitsArgs};
use uplift_engine::codegen;
use uplift_engine::config::EngineConfig;
use uplift_engine::detect;
use uplift_engine::pipeline::Pipeline;
use uplift_engine::project::Project;
use uplift_engine::report;
use uplift_engine::routes::{self, RouteTransform};
use uplift_engine::schema::{Diagnostic, Unit};
use uplift_engine::session::MigrationSession;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Send tracing output to stderr. `RUST_LOG` wins when set; otherwise
/// `--verbose` raises the crate's level from warn to info.
fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "uplift_engine=info"
    } else {
        "uplift_engine=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> uplift_engine::Result<String> {
    match &cli.command {
        Commands::Migrate(args) => run_migrate(cli, args),
        Commands::Units(args) => run_units(cli, args),
        Commands::Routes(args) => run_routes(cli, args),
    }
}

// ============================================
// migrate
// ============================================

fn run_migrate(cli: &Cli, args: &MigrateArgs) -> uplift_engine::Result<String> {
    let config = load_config(args.config.as_deref(), args.threshold)?;
    let project = Project::from_dir(&args.path)?;

    if cli.verbose {
        eprintln!(
            "Collected {} source files from {}",
            project.len(),
            args.path.display()
        );
    }

    let pb = spinner(cli.progress, "running migration pipeline");
    let outcome = Pipeline::run(&project, &config);
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let session = outcome?;

    let output = if args.summary_only {
        let summary = &session.risk_summary;
        format!(
            "units: {} ({} safe, {} risky, {} manual)\n",
            summary.total(),
            summary.safe,
            summary.risky,
            summary.manual
        )
    } else {
        render_session(cli.format, &session)
    };

    match &args.out {
        Some(path) => {
            fs::write(path, &output)?;
            Ok(format!("Report written to {}\n", path.display()))
        }
        None => Ok(output),
    }
}

fn render_session(format: OutputFormat, session: &MigrationSession) -> String {
    match format {
        OutputFormat::Text => report::render_text(session),
        OutputFormat::Json => report::render_json(session),
        OutputFormat::Markdown => report::render_markdown(session),
    }
}

// ============================================
// units
// ============================================

fn run_units(cli: &Cli, args: &UnitsArgs) -> uplift_engine::Result<String> {
    let project = Project::from_dir(&args.path)?;
    let (units, diagnostics) = detect_all(&project, cli);
    let units: Vec<Unit> = units
        .into_iter()
        .filter(|u| args.matches_kind(u.kind.as_str()))
        .collect();

    match cli.format {
        OutputFormat::Text => Ok(render_units_text(&units, &diagnostics)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "units": units,
            "diagnostics": diagnostics,
        }))
        .unwrap_or_default()),
        OutputFormat::Markdown => Ok(render_units_markdown(&units)),
    }
}

fn render_units_text(units: &[Unit], diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    output.push_str("═══════════════════════════════════════\n");
    output.push_str("  ANGULARJS UNITS\n");
    output.push_str("═══════════════════════════════════════\n\n");

    if units.is_empty() {
        output.push_str("no units detected\n");
    }
    for unit in units {
        output.push_str(&format!(
            "  {:30} {:10} {}:{}",
            unit.name,
            unit.kind.as_str(),
            unit.file,
            unit.span.start_line
        ));
        if !unit.di_tokens.is_empty() {
            output.push_str(&format!("  ({} DI tokens)", unit.di_tokens.len()));
        }
        output.push('\n');
    }

    if !diagnostics.is_empty() {
        output.push('\n');
        output.push_str("diagnostics:\n");
        for diag in diagnostics {
            output.push_str(&format!(
                "  - [{}] {}: {}\n",
                diag.severity.as_str(),
                diag.category.as_str(),
                diag.message
            ));
        }
    }
    output
}

fn render_units_markdown(units: &[Unit]) -> String {
    let mut lines = vec![
        "# AngularJS Units".to_string(),
        String::new(),
        "| Name | Kind | Module | Location |".to_string(),
        "|------|------|--------|----------|".to_string(),
    ];
    for unit in units {
        lines.push(format!(
            "| `{}` | {} | {} | {}:{} |",
            unit.name,
            unit.kind.as_str(),
            unit.module,
            unit.file,
            unit.span.start_line
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

// ============================================
// routes
// ============================================

fn run_routes(cli: &Cli, args: &RoutesArgs) -> uplift_engine::Result<String> {
    let config = load_config(args.config.as_deref(), None)?;
    let project = Project::from_dir(&args.path)?;
    let (units, _) = detect_all(&project, cli);
    let transform = routes::transform_routes(&units, &config);

    match cli.format {
        OutputFormat::Text => Ok(render_routes_text(&transform, &config, args.stubs)),
        OutputFormat::Json => Ok(render_routes_json(&transform, args.stubs)),
        OutputFormat::Markdown => Ok(render_routes_markdown(&transform, &config, args.stubs)),
    }
}

fn render_routes_text(transform: &RouteTransform, config: &EngineConfig, stubs: bool) -> String {
    let mut output = String::new();
    output.push_str("═══════════════════════════════════════\n");
    output.push_str("  ROUTE TABLE\n");
    output.push_str("═══════════════════════════════════════\n\n");

    if transform.entries.is_empty() {
        output.push_str("no routes detected\n");
    }
    for entry in &transform.entries {
        let target = if entry.is_abstract_parent {
            "(abstract parent)".to_string()
        } else if let Some(redirect) = &entry.redirect_target {
            format!("redirect -> {}", redirect)
        } else {
            entry
                .controller_ref
                .clone()
                .unwrap_or_else(|| "(no component)".to_string())
        };
        output.push_str(&format!("  /{:26} {}\n", entry.pattern, target));
        for binding in &entry.resolve_bindings {
            output.push_str(&format!(
                "      resolve: {} -> {}\n",
                binding.name, binding.resolver_class
            ));
        }
        for guard in &entry.guard_refs {
            output.push_str(&format!("      guard:   {}\n", guard));
        }
    }

    if !transform.diagnostics.is_empty() {
        output.push('\n');
        output.push_str("diagnostics:\n");
        for diag in &transform.diagnostics {
            output.push_str(&format!(
                "  - [{}] {}: {}\n",
                diag.severity.as_str(),
                diag.category.as_str(),
                diag.message
            ));
        }
    }

    if stubs {
        output.push('\n');
        output.push_str(&format!("// app-routing.module.ts\n{}\n", codegen::render_routing_module(transform, config)));
        for resolver in &transform.resolvers {
            output.push_str(&format!(
                "// {}.ts\n{}\n",
                resolver.file_base,
                codegen::render_resolver_stub(resolver)
            ));
        }
        for guard in &transform.guards {
            output.push_str(&format!(
                "// {}.ts\n{}\n",
                guard.file_base,
                codegen::render_guard_stub(guard)
            ));
        }
    }
    output
}

fn render_routes_json(transform: &RouteTransform, stubs: bool) -> String {
    let mut value = serde_json::json!({
        "entries": transform.entries,
        "redirectTarget": transform.redirect_target,
        "resolvers": transform
            .resolvers
            .iter()
            .map(|r| serde_json::json!({ "key": r.key, "className": r.class_name, "fileBase": r.file_base }))
            .collect::<Vec<_>>(),
        "guards": transform
            .guards
            .iter()
            .map(|g| serde_json::json!({ "key": g.key, "className": g.class_name, "fileBase": g.file_base }))
            .collect::<Vec<_>>(),
        "diagnostics": transform.diagnostics,
    });
    if stubs {
        let sources: Vec<serde_json::Value> = transform
            .resolvers
            .iter()
            .map(|r| {
                serde_json::json!({
                    "file": format!("{}.ts", r.file_base),
                    "source": codegen::render_resolver_stub(r),
                })
            })
            .chain(transform.guards.iter().map(|g| {
                serde_json::json!({
                    "file": format!("{}.ts", g.file_base),
                    "source": codegen::render_guard_stub(g),
                })
            }))
            .collect();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("stubSources".to_string(), serde_json::Value::Array(sources));
        }
    }
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

fn render_routes_markdown(transform: &RouteTransform, config: &EngineConfig, stubs: bool) -> String {
    let mut lines = vec![
        "# Route Table".to_string(),
        String::new(),
        "| Path | Component | Resolvers | Guards |".to_string(),
        "|------|-----------|-----------|--------|".to_string(),
    ];
    for entry in &transform.entries {
        let component = if entry.is_abstract_parent {
            "(abstract parent)".to_string()
        } else if let Some(redirect) = &entry.redirect_target {
            format!("redirect: {}", redirect)
        } else {
            entry.controller_ref.clone().unwrap_or_else(|| "-".to_string())
        };
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
    if stubs {
        lines.push(String::new());
        lines.push("## Generated Files".to_string());
        lines.push(String::new());
        lines.push("### app-routing.module.ts".to_string());
        lines.push(String::new());
        lines.push("```typescript".to_string());
        lines.push(codegen::render_routing_module(transform, config));
        lines.push("```".to_string());
        for resolver in &transform.resolvers {
            lines.push(String::new());
            lines.push(format!("### {}.ts", resolver.file_base));
            lines.push(String::new());
            lines.push("```typescript".to_string());
            lines.push(codegen::render_resolver_stub(resolver));
            lines.push("```".to_string());
        }
        for guard in &transform.guards {
            lines.push(String::new());
            lines.push(format!("### {}.ts", guard.file_base));
            lines.push(String::new());
            lines.push("```typescript".to_string());
            lines.push(codegen::render_guard_stub(guard));
            lines.push("```".to_string());
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

// ============================================
// shared helpers
// ============================================

/// Load engine configuration. An explicit `--config` path must exist;
/// otherwise `./uplift.toml` is picked up when present, else defaults.
/// `--threshold` overrides whichever config won.
fn load_config(
    explicit: Option<&Path>,
    threshold: Option<usize>,
) -> uplift_engine::Result<EngineConfig> {
    let mut config = match explicit {
        Some(path) => EngineConfig::load_from(path)?,
        None => {
            let default_path = Path::new("uplift.toml");
            if default_path.exists() {
                EngineConfig::load_from(default_path)?
            } else {
                EngineConfig::default()
            }
        }
    };
    if let Some(threshold) = threshold {
        config.mutation_threshold = threshold;
        config.validate()?;
    }
    Ok(config)
}

/// Detect units across the whole project, skipping unparsable files.
/// Parse failures surface as stderr notes under `--verbose`.
fn detect_all(project: &Project, cli: &Cli) -> (Vec<Unit>, Vec<Diagnostic>) {
    let mut units = Vec::new();
    let mut diagnostics = Vec::new();
    for file in &project.files {
        match detect::detect_units(&file.path, &file.content) {
            Ok(mut detection) => {
                units.append(&mut detection.units);
                diagnostics.append(&mut detection.diagnostics);
            }
            Err(err) => {
                if cli.verbose {
                    eprintln!("Skipping {}: {}", file.path, err);
                }
                diagnostics.push(
                    Diagnostic::warning(
                        uplift_engine::schema::DiagnosticCategory::Parse,
                        err.to_string(),
                    )
                    .with_file(&file.path),
                );
            }
        }
    }
    (units, diagnostics)
}

fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}
