//! Angular TypeScript generation.
//!
//! Renders one target source per unit, modulated by risk: SAFE units get a
//! complete class, RISKY units get the same plus `// RISK:` comments naming
//! each hazard at the top of the class body, MANUAL units get no source at
//! all, only diagnostics. Dropped DI tokens surface as `// NOTE:` comments
//! above the constructor.
//!
//! The route table renders separately into one routing module per session:
//! a nested `Routes` array in table order plus resolver and guard stubs.

use crate::config::EngineConfig;
use crate::di::{kebab_case, DiResolution};
use crate::error::UpliftError;
use crate::risk::RiskAssessment;
use crate::routes::{GuardStub, ResolverStub, RouteTransform};
use crate::schema::{
    Diagnostic, DiagnosticCategory, RiskLevel, RouteEntry, Unit, UnitKind,
};

/// Rendered output for one unit
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub class_name: String,
    /// Sibling file the source belongs in, e.g. `user-detail.component.ts`
    pub file_name: String,
    /// `None` exactly when the unit is MANUAL
    pub source: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generate the target source for one unit.
///
/// Fails only when the unit cannot produce a legal TypeScript class name;
/// the caller degrades that unit to MANUAL.
pub fn generate_unit(
    unit: &Unit,
    assessment: &RiskAssessment,
    resolution: &DiResolution,
    config: &EngineConfig,
) -> crate::Result<GeneratedUnit> {
    let (class_name, file_name) = target_names(unit);
    check_class_name(unit, &class_name)?;

    if assessment.level == RiskLevel::Manual {
        let mut diagnostics: Vec<Diagnostic> = assessment
            .signals
            .iter()
            .map(|s| {
                Diagnostic::warning(DiagnosticCategory::Hazard, s.describe())
                    .with_file(&unit.file)
                    .with_line(unit.span.start_line)
            })
            .collect();
        diagnostics.push(
            Diagnostic::info(
                DiagnosticCategory::Generation,
                format!("'{}' requires manual migration; no source generated", unit.name),
            )
            .with_file(&unit.file),
        );
        return Ok(GeneratedUnit {
            class_name,
            file_name,
            source: None,
            diagnostics,
        });
    }

    let source = match unit.kind {
        UnitKind::Controller => render_component_class(unit, assessment, resolution, config, &class_name),
        UnitKind::Service | UnitKind::Factory => {
            render_injectable_class(unit, assessment, resolution, &class_name)
        }
        UnitKind::Filter => render_pipe_class(unit, assessment, &class_name),
        UnitKind::Directive | UnitKind::Component => {
            render_component_class(unit, assessment, resolution, config, &class_name)
        }
        // Covered by the session routing module; the pipeline substitutes it.
        UnitKind::RouteConfig => String::new(),
    };

    let mut diagnostics = Vec::new();
    if matches!(unit.kind, UnitKind::Service | UnitKind::Factory)
        && !unit.body.http_verbs.is_empty()
    {
        diagnostics.push(
            Diagnostic::info(
                DiagnosticCategory::Generation,
                format!(
                    "'{}' uses $http ({}); HttpClient covers the same verbs",
                    unit.name,
                    unit.body.http_verbs.join(", ")
                ),
            )
            .with_file(&unit.file),
        );
    }

    Ok(GeneratedUnit {
        class_name,
        file_name,
        source: Some(source),
        diagnostics,
    })
}

/// Class and file names for a unit's target source
pub fn target_names(unit: &Unit) -> (String, String) {
    match unit.kind {
        UnitKind::Controller => {
            let base = controller_base(&unit.name);
            (
                format!("{}Component", base),
                format!("{}.component.ts", kebab_case(&base)),
            )
        }
        UnitKind::Directive | UnitKind::Component => {
            let base = upper_first(&unit.name);
            (
                format!("{}Component", base),
                format!("{}.component.ts", kebab_case(&base)),
            )
        }
        UnitKind::Service | UnitKind::Factory => {
            let class = upper_first(&unit.name);
            let base = class.strip_suffix("Service").unwrap_or(&class);
            let base = if base.is_empty() { class.as_str() } else { base };
            (class.clone(), format!("{}.service.ts", kebab_case(base)))
        }
        UnitKind::Filter => {
            let base = upper_first(&unit.name);
            (
                format!("{}Pipe", base),
                format!("{}.pipe.ts", kebab_case(&base)),
            )
        }
        UnitKind::RouteConfig => (
            "AppRoutingModule".to_string(),
            "app-routing.module.ts".to_string(),
        ),
    }
}

/// `UserDetailController` / `UserDetailCtrl` → `UserDetail`
fn controller_base(name: &str) -> String {
    let base = name.replace("Controller", "").replace("Ctrl", "");
    if base.is_empty() {
        name.to_string()
    } else {
        base
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn check_class_name(unit: &Unit, class_name: &str) -> crate::Result<()> {
    let mut chars = class_name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false);
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Ok(());
    }
    Err(UpliftError::Generation {
        unit: unit.name.clone(),
        message: format!("'{}' is not a legal class name", class_name),
    })
}

/// One `import { A, B } from 'path';` line per path, first-occurrence order
fn render_imports(pairs: &[(String, String)]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for (_, path) in pairs {
        if !paths.contains(path) {
            paths.push(path.clone());
        }
    }
    paths
        .iter()
        .map(|path| {
            let symbols: Vec<&str> = pairs
                .iter()
                .filter(|(_, p)| p == path)
                .map(|(s, _)| s.as_str())
                .collect();
            format!("import {{ {} }} from '{}';", symbols.join(", "), path)
        })
        .collect()
}

fn risk_comment_lines(assessment: &RiskAssessment) -> Vec<String> {
    if assessment.level != RiskLevel::Risky {
        return Vec::new();
    }
    assessment
        .signals
        .iter()
        .map(|s| format!("  // RISK: {}", s.describe()))
        .collect()
}

fn note_comment_lines(resolution: &DiResolution) -> Vec<String> {
    resolution
        .notes
        .iter()
        .map(|n| format!("  // NOTE: {}", n))
        .collect()
}

fn constructor_line(resolution: &DiResolution) -> String {
    if resolution.params.is_empty() {
        "  constructor() {}".to_string()
    } else {
        format!("  constructor({}) {{}}", resolution.params.join(", "))
    }
}

/// Controllers, `.component` definitions and template-only directives all
/// land as `@Component` classes.
fn render_component_class(
    unit: &Unit,
    assessment: &RiskAssessment,
    resolution: &DiResolution,
    config: &EngineConfig,
    class_name: &str,
) -> String {
    let base = class_name.strip_suffix("Component").unwrap_or(class_name);
    let selector = format!("{}-{}", config.selector_prefix, kebab_case(base));
    let template_url = unit
        .body
        .directive
        .as_ref()
        .and_then(|f| f.template_url.clone())
        .unwrap_or_else(|| format!("./{}.component.html", kebab_case(base)));

    let mut import_pairs: Vec<(String, String)> =
        vec![("Component".to_string(), "@angular/core".to_string())];
    let has_outputs = unit.body.bindings.iter().any(|b| b.mode.starts_with('&'));
    let has_inputs = unit.body.bindings.iter().any(|b| !b.mode.starts_with('&'));
    if has_inputs {
        import_pairs.push(("Input".to_string(), "@angular/core".to_string()));
    }
    if has_outputs {
        import_pairs.push(("Output".to_string(), "@angular/core".to_string()));
        import_pairs.push(("EventEmitter".to_string(), "@angular/core".to_string()));
    }
    import_pairs.extend(resolution.imports.iter().cloned());

    let mut lines: Vec<String> = render_imports(&import_pairs);
    lines.push(String::new());
    lines.push("@Component({".to_string());
    lines.push(format!("  selector: '{}',", selector));
    lines.push(format!("  templateUrl: '{}'", template_url));
    lines.push("})".to_string());
    lines.push(format!("export class {} {{", class_name));

    lines.extend(risk_comment_lines(assessment));

    for binding in &unit.body.bindings {
        if binding.mode.starts_with('&') {
            lines.push(format!(
                "  @Output() {} = new EventEmitter<any>();",
                binding.name
            ));
        } else {
            lines.push(format!("  @Input() {}: any;", binding.name));
        }
    }

    for write in unit.body.scope_writes.iter().filter(|w| !w.is_function) {
        lines.push(format!("  {}: any;", write.name));
    }

    lines.push(String::new());
    lines.extend(note_comment_lines(resolution));
    lines.push(constructor_line(resolution));

    for write in unit.body.scope_writes.iter().filter(|w| w.is_function) {
        lines.push(String::new());
        lines.push(format!("  {}(): void {{", write.name));
        lines.push(format!("    // TODO: migrate the $scope.{} body", write.name));
        lines.push("  }".to_string());
    }

    lines.push("}".to_string());
    lines.join("\n") + "\n"
}

fn render_injectable_class(
    unit: &Unit,
    assessment: &RiskAssessment,
    resolution: &DiResolution,
    class_name: &str,
) -> String {
    let mut import_pairs: Vec<(String, String)> =
        vec![("Injectable".to_string(), "@angular/core".to_string())];
    import_pairs.extend(resolution.imports.iter().cloned());

    let mut lines: Vec<String> = render_imports(&import_pairs);
    lines.push(String::new());
    lines.push("@Injectable({ providedIn: 'root' })".to_string());
    lines.push(format!("export class {} {{", class_name));
    lines.extend(risk_comment_lines(assessment));
    if !unit.body.http_verbs.is_empty() {
        lines.push(format!(
            "  // Uses HttpClient verbs: {}",
            unit.body.http_verbs.join(", ")
        ));
    }
    lines.push(String::new());
    lines.extend(note_comment_lines(resolution));
    lines.push(constructor_line(resolution));
    lines.push(String::new());
    lines.push("  // TODO: migrate the service methods".to_string());
    lines.push("}".to_string());
    lines.join("\n") + "\n"
}

const PIPE_BODY_COMMENT_LIMIT: usize = 20;

fn render_pipe_class(unit: &Unit, assessment: &RiskAssessment, class_name: &str) -> String {
    let mut lines: Vec<String> = vec![
        "import { Pipe, PipeTransform } from '@angular/core';".to_string(),
        String::new(),
        format!("@Pipe({{ name: '{}' }})", unit.name),
        format!("export class {} implements PipeTransform {{", class_name),
    ];
    lines.extend(risk_comment_lines(assessment));
    lines.push("  transform(value: any, ...args: any[]): any {".to_string());
    lines.push(format!("    // TODO: port the '{}' filter body:", unit.name));
    let body_lines: Vec<&str> = unit.body.source.lines().collect();
    for line in body_lines.iter().take(PIPE_BODY_COMMENT_LIMIT) {
        lines.push(format!("    //   {}", line.trim_end()));
    }
    if body_lines.len() > PIPE_BODY_COMMENT_LIMIT {
        lines.push("    //   ...".to_string());
    }
    lines.push("    return value;".to_string());
    lines.push("  }".to_string());
    lines.push("}".to_string());
    lines.join("\n") + "\n"
}

/// Render the session routing module: imports, the ordered `Routes` array
/// with nesting expressed as `children` arrays, and the module wrapper.
pub fn render_routing_module(table: &RouteTransform, _config: &EngineConfig) -> String {
    let mut import_lines = vec![
        "import { NgModule } from '@angular/core';".to_string(),
        "import { RouterModule, Routes } from '@angular/router';".to_string(),
    ];

    // (class, file base) pairs, deduped, sorted by class for stable output
    let mut symbol_imports: Vec<(String, String)> = Vec::new();
    let push_symbol = |imports: &mut Vec<(String, String)>, class: String, base: String| {
        if !imports.iter().any(|(c, _)| *c == class) {
            imports.push((class, base));
        }
    };
    for entry in &table.entries {
        if let Some(class) = component_class_for(entry) {
            let base = class.strip_suffix("Component").unwrap_or(&class).to_string();
            push_symbol(
                &mut symbol_imports,
                class.clone(),
                format!("{}.component", kebab_case(&base)),
            );
        }
    }
    for resolver in &table.resolvers {
        push_symbol(
            &mut symbol_imports,
            resolver.class_name.clone(),
            resolver.file_base.clone(),
        );
    }
    for guard in &table.guards {
        push_symbol(
            &mut symbol_imports,
            guard.class_name.clone(),
            guard.file_base.clone(),
        );
    }
    symbol_imports.sort();
    for (class, base) in &symbol_imports {
        import_lines.push(format!("import {{ {} }} from './{}';", class, base));
    }

    let mut route_lines: Vec<String> = Vec::new();
    if let Some(target) = &table.redirect_target {
        route_lines.push(format!(
            "  {{ path: '', redirectTo: '/{}', pathMatch: 'full' }},",
            target.trim_start_matches('/')
        ));
    }
    for entry in table.entries.iter().filter(|e| e.parent.is_none()) {
        render_entry(entry, table, 1, &mut route_lines);
    }

    let routes_block = if route_lines.is_empty() {
        "const routes: Routes = [];".to_string()
    } else {
        format!("const routes: Routes = [\n{}\n];", route_lines.join("\n"))
    };

    format!(
        "{}\n\n{}\n\n@NgModule({{\n  imports: [RouterModule.forRoot(routes)],\n  exports: [RouterModule]\n}})\nexport class AppRoutingModule {{}}\n",
        import_lines.join("\n"),
        routes_block
    )
}

fn component_class_for(entry: &RouteEntry) -> Option<String> {
    entry
        .controller_ref
        .as_ref()
        .map(|c| format!("{}Component", controller_base(c)))
}

fn children_of<'a>(table: &'a RouteTransform, state: &str) -> Vec<&'a RouteEntry> {
    table
        .entries
        .iter()
        .filter(|e| e.parent.as_deref() == Some(state))
        .collect()
}

fn render_entry(entry: &RouteEntry, table: &RouteTransform, depth: usize, out: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    let children = match &entry.state_name {
        Some(name) => children_of(table, name),
        None => Vec::new(),
    };
    let component = component_class_for(entry);

    // Terminal wildcard and pure redirects stay single-line.
    if entry.redirect_target.is_some() && component.is_none() && children.is_empty() {
        let target = entry
            .redirect_target
            .as_deref()
            .unwrap_or_default()
            .trim_start_matches('/');
        out.push(format!(
            "{}{{ path: '{}', redirectTo: '/{}' }},",
            pad, entry.pattern, target
        ));
        return;
    }

    out.push(format!("{}{{", pad));
    out.push(format!("{}  path: '{}',", pad, entry.pattern));
    if entry.has_on_enter {
        out.push(format!(
            "{}  // TODO: migrate the onEnter hook into a canActivate guard or ngOnInit()",
            pad
        ));
    }
    if entry.has_on_exit {
        out.push(format!(
            "{}  // TODO: migrate the onExit hook into a canDeactivate guard or ngOnDestroy()",
            pad
        ));
    }
    if !entry.guard_refs.is_empty() {
        out.push(format!(
            "{}  canActivate: [{}],",
            pad,
            entry.guard_refs.join(", ")
        ));
    }
    if let Some(class) = &component {
        out.push(format!("{}  component: {},", pad, class));
    } else if children.is_empty() && !entry.is_abstract_parent {
        out.push(format!(
            "{}  // TODO: no controller; add component or redirectTo",
            pad
        ));
    }
    if !entry.resolve_bindings.is_empty() {
        out.push(format!("{}  resolve: {{", pad));
        for binding in &entry.resolve_bindings {
            out.push(format!(
                "{}    {}: {},",
                pad, binding.name, binding.resolver_class
            ));
        }
        out.push(format!("{}  }},", pad));
    }
    if !children.is_empty() {
        out.push(format!("{}  children: [", pad));
        for child in children {
            render_entry(child, table, depth + 2, out);
        }
        out.push(format!("{}  ],", pad));
    }
    out.push(format!("{}}},", pad));
}

pub fn render_resolver_stub(stub: &ResolverStub) -> String {
    let mut imports = vec![
        ("Injectable".to_string(), "@angular/core".to_string()),
        ("Resolve".to_string(), "@angular/router".to_string()),
        ("Observable".to_string(), "rxjs".to_string()),
        ("of".to_string(), "rxjs".to_string()),
    ];
    for (symbol, path) in &stub.resolution.imports {
        if !imports.iter().any(|(s, p)| s == symbol && p == path) {
            imports.push((symbol.clone(), path.clone()));
        }
    }

    let mut lines = render_imports(&imports);
    lines.push(String::new());
    lines.push("@Injectable({ providedIn: 'root' })".to_string());
    lines.push(format!(
        "export class {} implements Resolve<any> {{",
        stub.class_name
    ));
    lines.push(String::new());
    if !stub.resolution.params.is_empty() {
        lines.push(format!(
            "  constructor({}) {{}}",
            stub.resolution.params.join(", ")
        ));
        lines.push(String::new());
    }
    lines.extend(note_comment_lines(&stub.resolution));
    lines.push("  resolve(): Observable<any> {".to_string());
    lines.push(format!(
        "    // TODO: migrate the '{}' resolve block",
        stub.key
    ));
    lines.push("    return of(null);".to_string());
    lines.push("  }".to_string());
    lines.push(String::new());
    lines.push("}".to_string());
    lines.join("\n") + "\n"
}

pub fn render_guard_stub(stub: &GuardStub) -> String {
    let lines = vec![
        "import { Injectable } from '@angular/core';".to_string(),
        "import { CanActivate, Router } from '@angular/router';".to_string(),
        String::new(),
        "@Injectable({ providedIn: 'root' })".to_string(),
        format!("export class {} implements CanActivate {{", stub.class_name),
        String::new(),
        "  constructor(private router: Router) {}".to_string(),
        String::new(),
        "  canActivate(): boolean {".to_string(),
        format!("    // TODO: migrate the '{}' auth check here", stub.key),
        "    // Example: if (!this.authService.isLoggedIn()) { this.router.navigate(['/login']); return false; }"
            .to_string(),
        "    return true;".to_string(),
        "  }".to_string(),
        String::new(),
        "}".to_string(),
    ];
    lines.join("\n") + "\n"
}
