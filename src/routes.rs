//! Route consolidation.
//!
//! Folds every RouteConfig unit, whichever router flavor it used, into one
//! ordered route table. ngRoute `when` declarations stay flat; uiRouter
//! dotted state names become a forest where missing ancestors are synthesized
//! as abstract parents. Ordering at every level is shadow-safe: literal paths
//! first, parameterized paths after them, wildcards after both, the fallback
//! last, declaration order preserved within a rank.
//!
//! `resolve` blocks split in two: auth-looking keys become route guards,
//! everything else becomes a data resolver carrying its binding function's
//! DI tokens through the resolver.

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::EngineConfig;
use crate::di::{self, DiResolution};
use crate::schema::{
    Diagnostic, DiagnosticCategory, DiToken, ResolveBinding, RouteDecl, RouteEntry, RouterFlavor,
    TemplateRef, Unit, UnitKind,
};

static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("param pattern"));

/// Resolve keys that look like auth checks rather than data fetches
const AUTH_KEYS: &[&str] = &[
    "auth",
    "authenticated",
    "user",
    "currentUser",
    "session",
    "loggedIn",
    "isLoggedIn",
    "authCheck",
    "loginCheck",
];

fn is_auth_resolve(key: &str) -> bool {
    let lower = key.to_lowercase();
    AUTH_KEYS.contains(&key) || lower.starts_with("auth") || lower.starts_with("login")
}

pub fn resolver_class_name(key: &str) -> String {
    upper_first(key) + "Resolver"
}

pub fn guard_class_name(key: &str) -> String {
    upper_first(key) + "Guard"
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// A data resolver to be generated alongside the routing module
#[derive(Debug, Clone)]
pub struct ResolverStub {
    pub key: String,
    pub class_name: String,
    /// Import base, e.g. `userdata.resolver`
    pub file_base: String,
    /// DI resolution of the original binding function's tokens
    pub resolution: DiResolution,
}

/// An auth guard to be generated alongside the routing module
#[derive(Debug, Clone)]
pub struct GuardStub {
    pub key: String,
    pub class_name: String,
    pub file_base: String,
}

/// The consolidated route table
#[derive(Debug, Clone, Default)]
pub struct RouteTransform {
    /// Entries in final table order: pre-order over the forest, each sibling
    /// group shadow-safe sorted
    pub entries: Vec<RouteEntry>,
    pub resolvers: Vec<ResolverStub>,
    pub guards: Vec<GuardStub>,
    /// Fallback redirect target, leading slash stripped
    pub redirect_target: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

struct StateNode {
    decl: Option<RouteDecl>,
    children: Vec<String>,
    seq: usize,
}

/// Consolidate the route declarations of every RouteConfig unit.
///
/// Units are taken in the order given; that order breaks ties everywhere.
pub fn transform_routes(units: &[Unit], config: &EngineConfig) -> RouteTransform {
    let mut out = RouteTransform::default();
    let mut stubs = StubCollector::default();

    // Gather declarations in input order, dropping exact repeats.
    let mut decls: Vec<(RouteDecl, String)> = Vec::new();
    let mut seen: AHashSet<String> = AHashSet::new();
    for unit in units.iter().filter(|u| u.kind == UnitKind::RouteConfig) {
        for decl in &unit.body.routes {
            let sig = format!(
                "{}|{}|{}|{}|{}",
                decl.flavor.as_str(),
                decl.state_name.as_deref().unwrap_or_default(),
                decl.path.as_deref().unwrap_or_default(),
                decl.controller.as_deref().unwrap_or_default(),
                decl.is_fallback,
            );
            if seen.insert(sig) {
                decls.push((decl.clone(), unit.file.clone()));
            }
        }
    }

    // Fallbacks: the last otherwise wins, like the runtime it replaces.
    let mut fallback: Option<(RouteDecl, String)> = None;
    for (decl, file) in &decls {
        if decl.is_fallback {
            fallback = Some((decl.clone(), file.clone()));
        }
    }
    if let Some((decl, _)) = &fallback {
        out.redirect_target = decl
            .redirect_to
            .as_ref()
            .map(|t| t.trim_start_matches('/').to_string());
    }

    // Flat ngRoute entries and the uiRouter state forest, interleaved by
    // declaration sequence at the top level.
    let mut top: Vec<(usize, RouteEntry, Vec<RouteEntry>)> = Vec::new();
    let mut states: AHashMap<String, StateNode> = AHashMap::new();
    let mut state_order: Vec<String> = Vec::new();

    for (seq, (decl, file)) in decls.iter().enumerate() {
        if decl.is_fallback {
            continue;
        }
        match decl.flavor {
            RouterFlavor::NgRoute => {
                let entry = flat_entry(decl, config, &mut stubs);
                top.push((seq, entry, Vec::new()));
            }
            RouterFlavor::UiRouter => {
                let Some(name) = decl.state_name.clone() else {
                    continue;
                };
                if states.contains_key(&name) {
                    out.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCategory::RouteCollision,
                            format!(
                                "state '{}' declared more than once; the later declaration wins",
                                name
                            ),
                        )
                        .with_file(file)
                        .with_line(decl.line),
                    );
                    if let Some(node) = states.get_mut(&name) {
                        node.decl = Some(decl.clone());
                    }
                } else {
                    states.insert(
                        name.clone(),
                        StateNode {
                            decl: Some(decl.clone()),
                            children: Vec::new(),
                            seq,
                        },
                    );
                    state_order.push(name);
                }
            }
        }
    }

    // Synthesize missing ancestors, then wire children in first-seen order.
    for name in state_order.clone() {
        let parts: Vec<&str> = name.split('.').collect();
        for i in 1..parts.len() {
            let ancestor = parts[..i].join(".");
            if !states.contains_key(&ancestor) {
                let seq = states.get(&name).map(|n| n.seq).unwrap_or(usize::MAX);
                states.insert(
                    ancestor.clone(),
                    StateNode {
                        decl: None,
                        children: Vec::new(),
                        seq,
                    },
                );
                state_order.push(ancestor);
            }
        }
    }
    let mut roots: Vec<String> = Vec::new();
    for name in &state_order {
        match name.rsplit_once('.') {
            Some((parent, _)) => {
                let child = name.clone();
                if let Some(node) = states.get_mut(parent) {
                    if !node.children.contains(&child) {
                        node.children.push(child);
                    }
                }
            }
            None => roots.push(name.clone()),
        }
    }

    for root in roots {
        let seq = subtree_seq(&root, &states);
        let (entry, children) = render_state(&root, None, &states, config, &mut stubs);
        top.push((seq, entry, children));
    }

    // Shadow-safe order at the top level, declaration order within a rank.
    top.sort_by_key(|(seq, entry, _)| (rank(entry), *seq));

    for (_, entry, children) in top {
        out.entries.push(entry);
        out.entries.extend(children);
    }

    // The fallback becomes the table's terminal wildcard entry.
    if let Some((decl, _)) = fallback {
        let mut entry = flat_entry(&decl, config, &mut stubs);
        entry.pattern = "**".to_string();
        entry.param_names.clear();
        out.entries.push(entry);
    }

    detect_collisions(&mut out);

    out.resolvers = stubs.resolvers;
    out.guards = stubs.guards;
    out
}

/// Smaller ranks match earlier without shadowing later entries
fn rank(entry: &RouteEntry) -> u8 {
    if entry.pattern == "**" && entry.redirect_target.is_some() {
        return 4;
    }
    if entry.pattern.contains("**") {
        return 3;
    }
    if entry.pattern.contains(':') {
        return 2;
    }
    1
}

fn subtree_seq(name: &str, states: &AHashMap<String, StateNode>) -> usize {
    let Some(node) = states.get(name) else {
        return usize::MAX;
    };
    let mut min = node.seq;
    for child in &node.children {
        min = min.min(subtree_seq(child, states));
    }
    min
}

fn normalize_path(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

fn param_names(pattern: &str) -> Vec<String> {
    PARAM_RE
        .captures_iter(pattern)
        .map(|c| c[1].to_string())
        .collect()
}

fn template_ref(decl: &RouteDecl) -> Option<TemplateRef> {
    if let Some(url) = &decl.template_url {
        return Some(TemplateRef::Url(url.clone()));
    }
    decl.template.clone().map(TemplateRef::Inline)
}

#[derive(Default)]
struct StubCollector {
    resolvers: Vec<ResolverStub>,
    guards: Vec<GuardStub>,
}

impl StubCollector {
    /// Split one resolve block; returns (resolve bindings, guard classes)
    fn split(
        &mut self,
        decl: &RouteDecl,
        config: &EngineConfig,
    ) -> (Vec<ResolveBinding>, Vec<String>) {
        let mut bindings = Vec::new();
        let mut guard_refs = Vec::new();

        for resolve in &decl.resolve {
            if is_auth_resolve(&resolve.name) {
                let class_name = guard_class_name(&resolve.name);
                if !self.guards.iter().any(|g| g.class_name == class_name) {
                    self.guards.push(GuardStub {
                        key: resolve.name.clone(),
                        class_name: class_name.clone(),
                        file_base: format!("{}.guard", resolve.name.to_lowercase()),
                    });
                }
                guard_refs.push(class_name);
            } else {
                let class_name = resolver_class_name(&resolve.name);
                if !self.resolvers.iter().any(|r| r.class_name == class_name) {
                    let declared: Vec<DiToken> = resolve
                        .di_tokens
                        .iter()
                        .map(|t| DiToken::declared(t, false))
                        .collect();
                    self.resolvers.push(ResolverStub {
                        key: resolve.name.clone(),
                        class_name: class_name.clone(),
                        file_base: format!("{}.resolver", resolve.name.to_lowercase()),
                        resolution: di::resolve_tokens(&declared, config),
                    });
                }
                bindings.push(ResolveBinding {
                    name: resolve.name.clone(),
                    resolver_class: class_name,
                });
            }
        }

        (bindings, guard_refs)
    }
}

fn flat_entry(decl: &RouteDecl, config: &EngineConfig, stubs: &mut StubCollector) -> RouteEntry {
    let pattern = normalize_path(decl.path.as_deref().unwrap_or_default());
    let (resolve_bindings, guard_refs) = stubs.split(decl, config);
    RouteEntry {
        param_names: param_names(&pattern),
        pattern,
        state_name: None,
        controller_ref: decl.controller.clone(),
        template_ref: template_ref(decl),
        resolve_bindings,
        guard_refs,
        is_abstract_parent: false,
        parent: None,
        has_on_enter: decl.has_on_enter,
        has_on_exit: decl.has_on_exit,
        redirect_target: decl.redirect_to.clone(),
        flavor: decl.flavor,
        line: Some(decl.line),
    }
}

/// Render a state node and its subtree. Returns the node's own entry plus
/// descendant entries, children already shadow-safe sorted.
fn render_state(
    name: &str,
    parent: Option<&str>,
    states: &AHashMap<String, StateNode>,
    config: &EngineConfig,
    stubs: &mut StubCollector,
) -> (RouteEntry, Vec<RouteEntry>) {
    let node = &states[name];
    let segment = name.rsplit('.').next().unwrap_or(name);

    let entry = match &node.decl {
        Some(decl) => {
            let own = normalize_path(decl.path.as_deref().unwrap_or_default());
            let pattern = if own.is_empty() {
                segment.to_string()
            } else {
                own
            };
            let (resolve_bindings, guard_refs) = stubs.split(decl, config);
            RouteEntry {
                param_names: param_names(&pattern),
                pattern,
                state_name: Some(name.to_string()),
                controller_ref: decl.controller.clone(),
                template_ref: template_ref(decl),
                resolve_bindings,
                guard_refs,
                is_abstract_parent: decl.is_abstract,
                parent: parent.map(|p| p.to_string()),
                has_on_enter: decl.has_on_enter,
                has_on_exit: decl.has_on_exit,
                redirect_target: decl.redirect_to.clone(),
                flavor: decl.flavor,
                line: Some(decl.line),
            }
        }
        None => RouteEntry {
            pattern: segment.to_string(),
            param_names: Vec::new(),
            state_name: Some(name.to_string()),
            controller_ref: None,
            template_ref: None,
            resolve_bindings: Vec::new(),
            guard_refs: Vec::new(),
            is_abstract_parent: true,
            parent: parent.map(|p| p.to_string()),
            has_on_enter: false,
            has_on_exit: false,
            redirect_target: None,
            flavor: RouterFlavor::UiRouter,
            line: None,
        },
    };

    let mut ordered: Vec<(usize, &String)> = node
        .children
        .iter()
        .map(|c| (subtree_seq(c, states), c))
        .collect();

    let mut rendered: Vec<(u8, usize, RouteEntry, Vec<RouteEntry>)> = Vec::new();
    ordered.sort_by_key(|(seq, _)| *seq);
    for (seq, child) in ordered {
        let (child_entry, grandchildren) = render_state(child, Some(name), states, config, stubs);
        rendered.push((rank(&child_entry), seq, child_entry, grandchildren));
    }
    rendered.sort_by_key(|(r, seq, _, _)| (*r, *seq));

    let mut descendants = Vec::new();
    for (_, _, child_entry, grandchildren) in rendered {
        descendants.push(child_entry);
        descendants.extend(grandchildren);
    }

    (entry, descendants)
}

/// Flag literal patterns declared more than once within one sibling group.
/// Both entries stay in the table.
fn detect_collisions(out: &mut RouteTransform) {
    let mut seen: AHashSet<(Option<String>, String)> = AHashSet::new();
    let mut diagnostics = Vec::new();
    for entry in &out.entries {
        if entry.pattern.is_empty() || entry.pattern == "**" || entry.is_abstract_parent {
            continue;
        }
        let key = (entry.parent.clone(), entry.pattern.clone());
        if !seen.insert(key) {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCategory::RouteCollision,
                    format!("route pattern '{}' declared more than once", entry.pattern),
                )
                .with_line(entry.line.unwrap_or_default()),
            );
        }
    }
    out.diagnostics.extend(diagnostics);
}
