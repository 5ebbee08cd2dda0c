//! Unit detection over AngularJS sources.
//!
//! Walks a parsed file for `angular.module(...)` registration calls
//! (`.controller`, `.service`, `.factory`, `.directive`, `.component`,
//! `.filter`, `.config`) including fluent chains, extracts the declared DI
//! tokens in both annotation forms, and pulls the structural body facts the
//! later stages work from. `.config` bodies are additionally scanned for
//! `$routeProvider` / `$stateProvider` route declarations.
//!
//! Detection is per-file and side-effect free: one file's parse problems
//! never touch another file's units.

use ahash::AHashMap;
use tree_sitter::Node;

use crate::parsing::{
    is_function_node, node_text, node_text_normalized, parse_source, string_value, visit_all,
};
use crate::schema::{
    BindingFact, Diagnostic, DiagnosticCategory, DirectiveFacts, DiToken, ResolveDecl, RouteDecl,
    RouterFlavor, ScopeWrite, SourceSpan, Unit, UnitBody, UnitKind, WatchFact,
};

const HTTP_VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "jsonp"];

/// Everything detection produced for one source file
#[derive(Debug, Clone, Default)]
pub struct FileDetection {
    pub units: Vec<Unit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Detect all registered units in one source file.
///
/// Returns `UpliftError::Parse` when the file fails to parse; the caller
/// records that as a file-level diagnostic and moves on.
pub fn detect_units(path: &str, source: &str) -> crate::Result<FileDetection> {
    let tree = parse_source(path, source)?;
    let root = tree.root_node();
    let bindings = collect_module_bindings(&root, source);

    let mut found: Vec<(usize, Unit)> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    visit_all(&root, |node| {
        if node.kind() != "call_expression" {
            return;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "member_expression" {
            return;
        }
        let Some(prop) = callee.child_by_field_name("property") else {
            return;
        };
        let method = node_text(&prop, source);
        let Some(kind) = UnitKind::from_registration(&method) else {
            return;
        };
        let Some(receiver) = callee.child_by_field_name("object") else {
            return;
        };
        let Some((module, via_chain)) = receiver_module(&receiver, source, &bindings) else {
            return;
        };
        let Some(args_node) = node.child_by_field_name("arguments") else {
            return;
        };
        let args = named_children(&args_node);

        if kind == UnitKind::RouteConfig {
            if let Some(unit) = build_config_unit(&module, path, &args, &args_node, source) {
                found.push((prop.start_byte(), unit));
            }
            return;
        }

        // Registrations carry a literal name and an implementation argument.
        if args.len() < 2 {
            return;
        }
        let Some(name) = string_value(&args[0], source) else {
            // A real module chain with a computed name is worth flagging;
            // a bare `xs.filter(fn, ctx)` shape is not a registration.
            if via_chain {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCategory::Parse,
                        format!("{} registration with non-literal name skipped", method),
                    )
                    .with_file(path)
                    .with_line(args[0].start_position().row + 1),
                );
            }
            return;
        };

        let unit = match kind {
            UnitKind::Component => build_component_unit(&name, &module, path, &args, source),
            _ => build_function_unit(kind, &name, &module, path, &args, source),
        };
        if let Some(unit) = unit {
            found.push((prop.start_byte(), unit));
        }
    });

    // Every link of a fluent chain starts at the chain's first byte, so the
    // registration method token is the position that orders units. Pre-order
    // visits the outermost link first; this sort restores source order.
    found.sort_by_key(|(offset, _)| *offset);

    Ok(FileDetection {
        units: found.into_iter().map(|(_, unit)| unit).collect(),
        diagnostics,
    })
}

/// Collect `var app = angular.module('name', ...)` bindings for receiver
/// resolution later in the same file.
fn collect_module_bindings(root: &Node, source: &str) -> AHashMap<String, String> {
    let mut bindings = AHashMap::new();
    visit_all(root, |node| {
        if node.kind() != "variable_declarator" {
            return;
        }
        let (Some(name), Some(value)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        ) else {
            return;
        };
        if name.kind() != "identifier" {
            return;
        }
        if let Some(module) = module_of_chain(&value, source) {
            bindings.insert(node_text(&name, source), module);
        }
    });
    bindings
}

/// Resolve the module a registration receiver belongs to.
///
/// Returns the module name plus whether it was proven by an
/// `angular.module(...)` call in the receiver chain. Identifier receivers
/// fall back to the file-local binding map, then to the identifier text
/// itself (modules are commonly created in another file).
fn receiver_module(
    receiver: &Node,
    source: &str,
    bindings: &AHashMap<String, String>,
) -> Option<(String, bool)> {
    let mut node = *receiver;
    loop {
        match node.kind() {
            "call_expression" => {
                if let Some(name) = module_call_name(&node, source) {
                    return Some((name, true));
                }
                node = node.child_by_field_name("function")?;
            }
            "member_expression" => {
                node = node.child_by_field_name("object")?;
            }
            "parenthesized_expression" => {
                node = node.named_child(0)?;
            }
            "identifier" => {
                let text = node_text(&node, source);
                if text == "angular" {
                    return None;
                }
                return match bindings.get(&text) {
                    Some(module) => Some((module.clone(), true)),
                    None => Some((text, false)),
                };
            }
            _ => return None,
        }
    }
}

/// Find the `angular.module('name' ...)` call anywhere down a fluent chain
fn module_of_chain(value: &Node, source: &str) -> Option<String> {
    let mut node = *value;
    loop {
        match node.kind() {
            "call_expression" => {
                if let Some(name) = module_call_name(&node, source) {
                    return Some(name);
                }
                node = node.child_by_field_name("function")?;
            }
            "member_expression" => {
                node = node.child_by_field_name("object")?;
            }
            "parenthesized_expression" => {
                node = node.named_child(0)?;
            }
            _ => return None,
        }
    }
}

/// `angular.module('name', ...)` → `Some("name")`
fn module_call_name(call: &Node, source: &str) -> Option<String> {
    let callee = call.child_by_field_name("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let prop = callee.child_by_field_name("property")?;
    if node_text(&prop, source) != "module" {
        return None;
    }
    let object = callee.child_by_field_name("object")?;
    if object.kind() != "identifier" || node_text(&object, source) != "angular" {
        return None;
    }
    let args = call.child_by_field_name("arguments")?;
    let first = args.named_child(0)?;
    string_value(&first, source)
}

fn named_children<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Build a service/factory/controller/directive/filter unit from a
/// function-or-array implementation argument.
fn build_function_unit(
    kind: UnitKind,
    name: &str,
    module: &str,
    path: &str,
    args: &[Node],
    source: &str,
) -> Option<Unit> {
    let impl_arg = args[1];
    let (di_tokens, fn_node) = extract_di(&impl_arg, source)?;

    let mut body = match fn_node {
        Some(f) => extract_body_facts(&f, source),
        None => UnitBody::default(),
    };
    if kind == UnitKind::Directive {
        if let Some(f) = fn_node {
            body.directive = Some(extract_directive_facts(&f, source, &mut body.bindings));
        }
    }

    Some(Unit {
        name: name.to_string(),
        kind,
        module: module.to_string(),
        file: path.to_string(),
        span: span_of(&args[0], &args[args.len() - 1]),
        di_tokens,
        body,
    })
}

/// Build a `.component('name', { ... })` unit from its definition object
fn build_component_unit(
    name: &str,
    module: &str,
    path: &str,
    args: &[Node],
    source: &str,
) -> Option<Unit> {
    let def = args[1];
    if def.kind() != "object" {
        return None;
    }

    let mut di_tokens = Vec::new();
    let mut body = UnitBody::default();
    let mut facts = DirectiveFacts::default();

    for child in named_children(&def) {
        let Some((key, value)) = object_entry(&child, source) else {
            continue;
        };
        match key.as_str() {
            "controller" => {
                if let Some((tokens, fn_node)) = extract_di(&value, source) {
                    di_tokens = tokens;
                    if let Some(f) = fn_node {
                        let ctrl_body = extract_body_facts(&f, source);
                        body.scope_writes = ctrl_body.scope_writes;
                        body.watches = ctrl_body.watches;
                        body.creates_child_scope = ctrl_body.creates_child_scope;
                        body.uses_deferred = ctrl_body.uses_deferred;
                        body.http_verbs = ctrl_body.http_verbs;
                        body.source = ctrl_body.source;
                    }
                }
            }
            "bindings" => {
                if value.kind() == "object" {
                    body.bindings = extract_bindings(&value, source);
                }
            }
            "template" => {
                if string_value(&value, source).is_some() {
                    facts.has_inline_template = true;
                }
            }
            "templateUrl" => facts.template_url = string_value(&value, source),
            _ => {}
        }
    }
    body.directive = Some(facts);

    Some(Unit {
        name: name.to_string(),
        kind: UnitKind::Component,
        module: module.to_string(),
        file: path.to_string(),
        span: span_of(&args[0], &args[args.len() - 1]),
        di_tokens,
        body,
    })
}

/// Build a RouteConfig unit from a `.config(fn)` registration
fn build_config_unit(
    module: &str,
    path: &str,
    args: &[Node],
    args_node: &Node,
    source: &str,
) -> Option<Unit> {
    if args.len() != 1 {
        return None;
    }
    let (di_tokens, fn_node) = extract_di(&args[0], source)?;
    let fn_node = fn_node?;

    let mut body = UnitBody {
        source: node_text(&fn_node, source),
        ..Default::default()
    };
    body.routes = extract_routes(&fn_node, source);

    Some(Unit {
        name: format!("{}.config", module),
        kind: UnitKind::RouteConfig,
        module: module.to_string(),
        file: path.to_string(),
        span: SourceSpan::new(
            args_node.start_position().row + 1,
            args_node.end_position().row + 1,
        ),
        di_tokens,
        body,
    })
}

fn span_of(first: &Node, last: &Node) -> SourceSpan {
    SourceSpan::new(first.start_position().row + 1, last.end_position().row + 1)
}

/// Extract DI tokens from an implementation argument.
///
/// Handles both forms: inline array annotation
/// `['$scope', '$http', function($scope, $http) {...}]` and a bare function
/// whose parameter names are the tokens. An identifier argument (reference to
/// a function declared elsewhere) yields no tokens and no body.
fn extract_di<'a>(arg: &Node<'a>, source: &str) -> Option<(Vec<DiToken>, Option<Node<'a>>)> {
    if is_function_node(arg.kind()) {
        let tokens = function_params(arg, source)
            .into_iter()
            .map(|p| DiToken::declared(&p, false))
            .collect();
        return Some((tokens, Some(*arg)));
    }
    if arg.kind() == "array" {
        let mut tokens = Vec::new();
        let mut fn_node = None;
        for child in named_children(arg) {
            if let Some(token) = string_value(&child, source) {
                tokens.push(DiToken::declared(&token, true));
            } else if is_function_node(child.kind()) {
                fn_node = Some(child);
            }
        }
        return Some((tokens, fn_node));
    }
    if arg.kind() == "identifier" {
        return Some((Vec::new(), None));
    }
    None
}

/// Parameter names of a function or arrow expression
fn function_params(fn_node: &Node, source: &str) -> Vec<String> {
    let params = fn_node
        .child_by_field_name("parameters")
        .or_else(|| fn_node.child_by_field_name("parameter"));
    let Some(params) = params else {
        return Vec::new();
    };
    if params.kind() == "identifier" {
        return vec![node_text(&params, source)];
    }
    named_children(&params)
        .iter()
        .filter(|n| n.kind() == "identifier")
        .map(|n| node_text(n, source))
        .collect()
}

/// Walk one unit's implementation body for the facts classification and
/// generation need. Scoped strictly to this function's subtree.
fn extract_body_facts(fn_node: &Node, source: &str) -> UnitBody {
    let mut body = UnitBody {
        source: node_text(fn_node, source),
        ..Default::default()
    };
    let root = fn_node.child_by_field_name("body").unwrap_or(*fn_node);

    visit_all(&root, |node| match node.kind() {
        "assignment_expression" => {
            let Some(left) = node.child_by_field_name("left") else {
                return;
            };
            if left.kind() != "member_expression" {
                return;
            }
            let (Some(object), Some(prop)) = (
                left.child_by_field_name("object"),
                left.child_by_field_name("property"),
            ) else {
                return;
            };
            // Top-level writes only: `$scope.total = ...`, not `$scope.a.b`.
            if object.kind() != "identifier" || node_text(&object, source) != "$scope" {
                return;
            }
            let name = node_text(&prop, source);
            if body.scope_writes.iter().any(|w| w.name == name) {
                return;
            }
            let is_function = node
                .child_by_field_name("right")
                .map(|r| is_function_node(r.kind()))
                .unwrap_or(false);
            body.scope_writes.push(ScopeWrite { name, is_function });
        }
        "call_expression" => {
            let Some(callee) = node.child_by_field_name("function") else {
                return;
            };
            if callee.kind() != "member_expression" {
                return;
            }
            let (Some(object), Some(prop)) = (
                callee.child_by_field_name("object"),
                callee.child_by_field_name("property"),
            ) else {
                return;
            };
            let prop_name = node_text(&prop, source);
            let object_name = if object.kind() == "identifier" {
                node_text(&object, source)
            } else {
                String::new()
            };

            match prop_name.as_str() {
                "$watch" | "$watchCollection"
                    if object_name == "$scope" || object_name == "$rootScope" =>
                {
                    if let Some(watch) = extract_watch(node, source) {
                        body.watches.push(watch);
                    }
                }
                "$new" => body.creates_child_scope = true,
                "defer" if object_name == "$q" => body.uses_deferred = true,
                verb if object_name == "$http" && HTTP_VERBS.contains(&verb) => {
                    if !body.http_verbs.iter().any(|v| v == verb) {
                        body.http_verbs.push(verb.to_string());
                    }
                }
                _ => {}
            }
        }
        _ => {}
    });

    body
}

/// Pull expression and depth out of a `$watch(...)` call.
///
/// Deep when the third argument is literal `true`, or when a string watch
/// expression names a dotted object path. The dotted-path rule applies only
/// to string expressions; watcher functions are judged by the flag alone.
fn extract_watch(call: &Node, source: &str) -> Option<WatchFact> {
    let args = call.child_by_field_name("arguments")?;
    let first = args.named_child(0)?;
    let string_expr = string_value(&first, source);
    let deep_flag = args
        .named_child(2)
        .map(|n| n.kind() == "true")
        .unwrap_or(false);
    let deep = deep_flag
        || string_expr
            .as_deref()
            .map(|e| e.contains('.'))
            .unwrap_or(false);
    let expression = match string_expr {
        Some(e) => e,
        None => node_text_normalized(&first, source),
    };
    Some(WatchFact {
        expression,
        deep,
        line: call.start_position().row + 1,
    })
}

/// Read compile/link/transclude/template facts off the object a directive
/// factory returns. Isolate `scope` maps feed the shared bindings list.
fn extract_directive_facts(
    fn_node: &Node,
    source: &str,
    bindings: &mut Vec<BindingFact>,
) -> DirectiveFacts {
    let mut facts = DirectiveFacts::default();
    let root = fn_node.child_by_field_name("body").unwrap_or(*fn_node);
    let mut definition: Option<Node> = None;

    visit_all(&root, |node| {
        if definition.is_some() || node.kind() != "return_statement" {
            return;
        }
        if let Some(value) = node.named_child(0) {
            if value.kind() == "object" {
                definition = Some(value);
            }
        }
    });

    let Some(def) = definition else {
        return facts;
    };
    for child in named_children(&def) {
        let Some((key, value)) = object_entry(&child, source) else {
            continue;
        };
        match key.as_str() {
            "compile" => facts.has_compile = is_function_node(value.kind()),
            "link" => facts.has_link = is_function_node(value.kind()),
            "transclude" => facts.transclude = value.kind() != "false",
            "restrict" => facts.restrict = string_value(&value, source),
            "template" => {
                if string_value(&value, source).is_some() {
                    facts.has_inline_template = true;
                }
            }
            "templateUrl" => facts.template_url = string_value(&value, source),
            "scope" => {
                if value.kind() == "object" {
                    *bindings = extract_bindings(&value, source);
                }
            }
            _ => {}
        }
    }
    facts
}

/// `{ title: '@', items: '=' }` → binding facts
fn extract_bindings(obj: &Node, source: &str) -> Vec<BindingFact> {
    let mut out = Vec::new();
    for child in named_children(obj) {
        let Some((key, value)) = object_entry(&child, source) else {
            continue;
        };
        if let Some(mode) = string_value(&value, source) {
            out.push(BindingFact { name: key, mode });
        }
    }
    out
}

/// Key text and value node of an object literal entry.
///
/// Supports `key: value` pairs and shorthand `key() {}` methods; the method
/// node itself stands in as the (function) value.
fn object_entry<'a>(child: &Node<'a>, source: &str) -> Option<(String, Node<'a>)> {
    match child.kind() {
        "pair" => {
            let key = child.child_by_field_name("key")?;
            let value = child.child_by_field_name("value")?;
            let key_text = match key.kind() {
                "string" => string_value(&key, source)?,
                _ => node_text(&key, source),
            };
            Some((key_text, value))
        }
        "method_definition" => {
            let key = child.child_by_field_name("name")?;
            Some((node_text(&key, source), *child))
        }
        _ => None,
    }
}

/// Scan a `.config` body for route declarations on `$routeProvider`,
/// `$stateProvider` and `$urlRouterProvider`, chained or not.
fn extract_routes(config_fn: &Node, source: &str) -> Vec<RouteDecl> {
    let root = config_fn.child_by_field_name("body").unwrap_or(*config_fn);
    let mut decls: Vec<RouteDecl> = Vec::new();

    visit_all(&root, |node| {
        if node.kind() != "call_expression" {
            return;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "member_expression" {
            return;
        }
        let (Some(object), Some(prop)) = (
            callee.child_by_field_name("object"),
            callee.child_by_field_name("property"),
        ) else {
            return;
        };
        let method = node_text(&prop, source);
        let Some(provider) = chain_root_identifier(&object, source) else {
            return;
        };
        let Some(args) = node.child_by_field_name("arguments") else {
            return;
        };
        let args = named_children(&args);
        let line = node.start_position().row + 1;

        match (provider.as_str(), method.as_str()) {
            ("$routeProvider", "when") => {
                if let Some(decl) = extract_when(&args, source, line) {
                    decls.push(decl);
                }
            }
            ("$routeProvider", "otherwise") | ("$urlRouterProvider", "otherwise") => {
                let flavor = if provider == "$urlRouterProvider" {
                    RouterFlavor::UiRouter
                } else {
                    RouterFlavor::NgRoute
                };
                if let Some(decl) = extract_otherwise(&args, source, flavor, line) {
                    decls.push(decl);
                }
            }
            ("$stateProvider", "state") => {
                if let Some(decl) = extract_state(&args, source, line) {
                    decls.push(decl);
                }
            }
            _ => {}
        }
    });

    decls.sort_by_key(|d| d.line);
    decls
}

/// Root identifier of a provider call chain:
/// `$stateProvider.state(a).state(b)` → `$stateProvider`
fn chain_root_identifier(object: &Node, source: &str) -> Option<String> {
    let mut node = *object;
    loop {
        match node.kind() {
            "identifier" => return Some(node_text(&node, source)),
            "call_expression" => node = node.child_by_field_name("function")?,
            "member_expression" => node = node.child_by_field_name("object")?,
            "parenthesized_expression" => node = node.named_child(0)?,
            _ => return None,
        }
    }
}

fn extract_when(args: &[Node], source: &str, line: usize) -> Option<RouteDecl> {
    let path = string_value(args.first()?, source)?;
    let mut decl = RouteDecl::new(RouterFlavor::NgRoute, line);
    decl.path = Some(path);
    if let Some(def) = args.get(1) {
        if def.kind() == "object" {
            fill_route_definition(&mut decl, def, source);
        }
    }
    Some(decl)
}

fn extract_otherwise(
    args: &[Node],
    source: &str,
    flavor: RouterFlavor,
    line: usize,
) -> Option<RouteDecl> {
    let mut decl = RouteDecl::new(flavor, line);
    decl.is_fallback = true;
    let arg = args.first()?;
    if let Some(target) = string_value(arg, source) {
        decl.redirect_to = Some(target);
    } else if arg.kind() == "object" {
        fill_route_definition(&mut decl, arg, source);
    }
    Some(decl)
}

fn extract_state(args: &[Node], source: &str, line: usize) -> Option<RouteDecl> {
    let state_name = string_value(args.first()?, source)?;
    let mut decl = RouteDecl::new(RouterFlavor::UiRouter, line);
    decl.state_name = Some(state_name);
    if let Some(def) = args.get(1) {
        if def.kind() == "object" {
            fill_route_definition(&mut decl, def, source);
        }
    }
    Some(decl)
}

/// Shared reader for `when` / `state` / object-form `otherwise` definitions
fn fill_route_definition(decl: &mut RouteDecl, def: &Node, source: &str) {
    for child in named_children(def) {
        let Some((key, value)) = object_entry(&child, source) else {
            continue;
        };
        match key.as_str() {
            "url" => decl.path = string_value(&value, source),
            "abstract" => decl.is_abstract = value.kind() == "true",
            "controller" => {
                decl.controller = match value.kind() {
                    "identifier" => Some(node_text(&value, source)),
                    _ => string_value(&value, source),
                }
            }
            "templateUrl" => decl.template_url = string_value(&value, source),
            "template" => decl.template = string_value(&value, source),
            "redirectTo" => decl.redirect_to = string_value(&value, source),
            "resolve" => {
                if value.kind() == "object" {
                    decl.resolve = extract_resolve(&value, source);
                }
            }
            "onEnter" => decl.has_on_enter = is_function_node(value.kind()),
            "onExit" => decl.has_on_exit = is_function_node(value.kind()),
            _ => {}
        }
    }
}

/// `resolve: { auth: function(AuthService) {...}, ... }` → named bindings
/// with the DI tokens of each binding function
fn extract_resolve(obj: &Node, source: &str) -> Vec<ResolveDecl> {
    let mut out = Vec::new();
    for child in named_children(obj) {
        let Some((name, value)) = object_entry(&child, source) else {
            continue;
        };
        let di_tokens = if is_function_node(value.kind()) {
            function_params(&value, source)
        } else if value.kind() == "array" {
            named_children(&value)
                .iter()
                .filter_map(|n| string_value(n, source))
                .collect()
        } else {
            Vec::new()
        };
        out.push(ResolveDecl { name, di_tokens });
    }
    out
}
