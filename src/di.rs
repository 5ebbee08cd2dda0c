//! DI token resolution.
//!
//! Maps AngularJS injection tokens to their Angular equivalents. Builtins
//! either map to a typed constructor parameter with an import, or are dropped
//! with a migration note. Unknown `$`-prefixed tokens are dropped with a
//! generic note; everything else is treated as a custom service imported from
//! a sibling `.service` file.
//!
//! Two declared tokens can map to the same Angular type (`$state` and
//! `$location` both become `Router`); the first declaration claims the type
//! and later ones are dropped with a note naming it.

use ahash::AHashMap;
use once_cell::sync::Lazy;

use crate::config::EngineConfig;
use crate::schema::{DiToken, TargetToken};

enum Builtin {
    Mapped(TargetToken),
    Dropped(&'static str),
}

static BUILTINS: Lazy<AHashMap<&'static str, Builtin>> = Lazy::new(|| {
    let mut table = AHashMap::new();

    table.insert(
        "$http",
        Builtin::Mapped(TargetToken::new("HttpClient", "http", "@angular/common/http")),
    );
    table.insert(
        "$resource",
        Builtin::Mapped(TargetToken::new("HttpClient", "http", "@angular/common/http")),
    );
    table.insert(
        "$state",
        Builtin::Mapped(TargetToken::new("Router", "router", "@angular/router")),
    );
    table.insert(
        "$location",
        Builtin::Mapped(TargetToken::new("Router", "router", "@angular/router")),
    );
    table.insert(
        "$stateParams",
        Builtin::Mapped(TargetToken::new("ActivatedRoute", "route", "@angular/router")),
    );
    table.insert(
        "$routeParams",
        Builtin::Mapped(TargetToken::new("ActivatedRoute", "route", "@angular/router")),
    );
    table.insert(
        "$element",
        Builtin::Mapped(TargetToken::new("ElementRef", "el", "@angular/core")),
    );
    table.insert(
        "$document",
        Builtin::Mapped(TargetToken::new("Document", "document", "@angular/common")),
    );

    table.insert(
        "$scope",
        Builtin::Dropped("$scope removed; use component properties directly"),
    );
    table.insert(
        "$rootScope",
        Builtin::Dropped("$rootScope removed; consider an RxJS Subject for cross-component events"),
    );
    table.insert(
        "$q",
        Builtin::Dropped("$q removed; use RxJS Observables or native Promises"),
    );
    table.insert(
        "$timeout",
        Builtin::Dropped("$timeout removed; use setTimeout() or RxJS timer()"),
    );
    table.insert(
        "$interval",
        Builtin::Dropped("$interval removed; use RxJS interval()"),
    );
    table.insert(
        "$compile",
        Builtin::Dropped("$compile removed; use Angular component composition"),
    );
    table.insert(
        "$filter",
        Builtin::Dropped("$filter removed; use Angular pipes"),
    );
    table.insert(
        "$log",
        Builtin::Dropped("$log removed; use console.log() directly"),
    );
    table.insert(
        "$translate",
        Builtin::Dropped("$translate removed; install @ngx-translate/core and inject TranslateService"),
    );
    table.insert(
        "$uibModal",
        Builtin::Dropped("$uibModal removed; install ng-bootstrap and inject NgbModal"),
    );
    table.insert(
        "$modal",
        Builtin::Dropped("$modal removed; install ng-bootstrap and inject NgbModal"),
    );
    table.insert(
        "$routeProvider",
        Builtin::Dropped("$routeProvider removed; routing moves to the declarative route table"),
    );
    table.insert(
        "$stateProvider",
        Builtin::Dropped("$stateProvider removed; routing moves to the declarative route table"),
    );
    table.insert(
        "$urlRouterProvider",
        Builtin::Dropped("$urlRouterProvider removed; routing moves to the declarative route table"),
    );

    table
});

/// Outcome of resolving one unit's declared tokens
#[derive(Debug, Clone, Default)]
pub struct DiResolution {
    /// Declared tokens with mapping/drop results filled in, declaration order
    pub tokens: Vec<DiToken>,
    /// Constructor parameter fragments, e.g. `private http: HttpClient`
    pub params: Vec<String>,
    /// `(symbol, module path)` import pairs, first occurrence order
    pub imports: Vec<(String, String)>,
    /// Migration notes for every dropped token, declaration order
    pub notes: Vec<String>,
}

/// Resolve a unit's declared DI tokens.
///
/// Config token overrides are consulted before the builtin table.
/// Recomputes every token from its raw name, so feeding a previous
/// resolution's tokens back in reproduces the same result.
pub fn resolve_tokens(declared: &[DiToken], config: &EngineConfig) -> DiResolution {
    let mut out = DiResolution::default();
    let mut claimed_types: AHashMap<String, String> = AHashMap::new();

    for token in declared {
        let mut token = DiToken::declared(&token.raw_name, token.is_array_annotated);
        let raw = token.raw_name.clone();

        if let Some(over) = config.token_override(&raw) {
            let target = over.target();
            if let Some(earlier) = claimed_types.get(&target.type_name) {
                token.dropped = true;
                token.drop_reason = Some(format!(
                    "{} dropped; duplicate of '{}' (both map to {})",
                    raw, earlier, target.type_name
                ));
            } else {
                claimed_types.insert(target.type_name.clone(), raw.clone());
                token.mapped_target = Some(target.clone());
                push_target(&mut out, &raw, &target);
            }
            if let Some(reason) = &token.drop_reason {
                out.notes.push(reason.clone());
            }
            out.tokens.push(token);
            continue;
        }

        match BUILTINS.get(raw.as_str()) {
            Some(Builtin::Mapped(target)) => {
                if let Some(earlier) = claimed_types.get(&target.type_name) {
                    token.dropped = true;
                    token.drop_reason = Some(format!(
                        "{} dropped; duplicate of '{}' (both map to {})",
                        raw, earlier, target.type_name
                    ));
                } else {
                    claimed_types.insert(target.type_name.clone(), raw.clone());
                    token.mapped_target = Some(target.clone());
                    push_target(&mut out, &raw, target);
                }
            }
            Some(Builtin::Dropped(reason)) => {
                token.dropped = true;
                token.drop_reason = Some((*reason).to_string());
            }
            None if raw.starts_with('$') => {
                token.dropped = true;
                token.drop_reason =
                    Some(format!("{} has no Angular equivalent mapped; migrate manually", raw));
            }
            None => {
                let target = custom_target(&raw);
                if let Some(earlier) = claimed_types.get(&target.type_name) {
                    token.dropped = true;
                    token.drop_reason = Some(format!(
                        "{} dropped; duplicate of '{}' (both map to {})",
                        raw, earlier, target.type_name
                    ));
                } else {
                    claimed_types.insert(target.type_name.clone(), raw.clone());
                    token.mapped_target = Some(target.clone());
                    push_target(&mut out, &raw, &target);
                }
            }
        }

        if let Some(reason) = &token.drop_reason {
            out.notes.push(reason.clone());
        }
        out.tokens.push(token);
    }

    out
}

fn push_target(out: &mut DiResolution, raw: &str, target: &TargetToken) {
    // DOCUMENT is injected by token rather than by type
    if raw == "$document" {
        out.params.push(format!(
            "@Inject(DOCUMENT) private {}: {}",
            target.param_name, target.type_name
        ));
        push_import(out, "DOCUMENT", &target.import_path);
        push_import(out, "Inject", "@angular/core");
    } else {
        out.params
            .push(format!("private {}: {}", target.param_name, target.type_name));
        push_import(out, &target.type_name, &target.import_path);
    }
}

fn push_import(out: &mut DiResolution, symbol: &str, path: &str) {
    if !out
        .imports
        .iter()
        .any(|(s, p)| s == symbol && p == path)
    {
        out.imports.push((symbol.to_string(), path.to_string()));
    }
}

/// A token absent from the builtin table is a project-local service
fn custom_target(raw: &str) -> TargetToken {
    let type_name = upper_first(raw);
    let param_name = lower_first(raw);
    let base = type_name.strip_suffix("Service").unwrap_or(&type_name);
    let base = if base.is_empty() { type_name.as_str() } else { base };
    TargetToken::new(
        &type_name,
        &param_name,
        &format!("./{}.service", kebab_case(base)),
    )
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `UserDetail` → `user-detail`
pub fn kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenOverride;

    fn declared(names: &[&str]) -> Vec<DiToken> {
        names.iter().map(|n| DiToken::declared(n, true)).collect()
    }

    fn resolve(names: &[&str]) -> DiResolution {
        resolve_tokens(&declared(names), &EngineConfig::default())
    }

    #[test]
    fn test_http_maps_to_httpclient() {
        let res = resolve(&["$http"]);
        assert_eq!(res.params, vec!["private http: HttpClient"]);
        assert_eq!(
            res.imports,
            vec![("HttpClient".to_string(), "@angular/common/http".to_string())]
        );
        assert!(res.notes.is_empty());
    }

    #[test]
    fn test_scope_dropped_with_note() {
        let res = resolve(&["$scope", "$http"]);
        assert!(res.tokens[0].dropped);
        assert!(res.tokens[0].drop_reason.as_ref().unwrap().contains("$scope"));
        assert_eq!(res.params.len(), 1);
        assert_eq!(res.notes.len(), 1);
    }

    #[test]
    fn test_state_and_location_dedup_to_router() {
        let res = resolve(&["$state", "$location"]);
        assert_eq!(res.params, vec!["private router: Router"]);
        assert!(!res.tokens[0].dropped);
        assert!(res.tokens[1].dropped);
        let reason = res.tokens[1].drop_reason.as_ref().unwrap();
        assert!(reason.contains("$state"));
        assert!(reason.contains("Router"));
    }

    #[test]
    fn test_custom_service_passthrough() {
        let res = resolve(&["UserService"]);
        assert_eq!(res.params, vec!["private userService: UserService"]);
        assert_eq!(
            res.imports,
            vec![("UserService".to_string(), "./user.service".to_string())]
        );
    }

    #[test]
    fn test_custom_service_without_suffix() {
        let res = resolve(&["dataCache"]);
        assert_eq!(res.params, vec!["private dataCache: DataCache"]);
        assert_eq!(res.imports[0].1, "./data-cache.service");
    }

    #[test]
    fn test_unknown_builtin_dropped() {
        let res = resolve(&["$window"]);
        assert!(res.tokens[0].dropped);
        assert!(res.notes[0].contains("migrate manually"));
        assert!(res.params.is_empty());
    }

    #[test]
    fn test_document_injected_by_token() {
        let res = resolve(&["$document"]);
        assert_eq!(res.params, vec!["@Inject(DOCUMENT) private document: Document"]);
        assert!(res
            .imports
            .contains(&("DOCUMENT".to_string(), "@angular/common".to_string())));
        assert!(res
            .imports
            .contains(&("Inject".to_string(), "@angular/core".to_string())));
    }

    #[test]
    fn test_provider_tokens_dropped() {
        let res = resolve(&["$stateProvider", "$urlRouterProvider"]);
        assert!(res.tokens.iter().all(|t| t.dropped));
        assert!(res.notes[0].contains("declarative route table"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let first = resolve(&["$scope", "$state", "$location", "UserService"]);
        let second = resolve_tokens(&first.tokens, &EngineConfig::default());
        assert_eq!(first.params, second.params);
        assert_eq!(first.imports, second.imports);
        assert_eq!(first.notes, second.notes);
        for (a, b) in first.tokens.iter().zip(second.tokens.iter()) {
            assert_eq!(a.dropped, b.dropped);
            assert_eq!(a.drop_reason, b.drop_reason);
        }
    }

    #[test]
    fn test_declaration_order_preserved() {
        let res = resolve(&["AuthService", "$http", "$state"]);
        assert_eq!(
            res.params,
            vec![
                "private authService: AuthService",
                "private http: HttpClient",
                "private router: Router"
            ]
        );
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("UserDetail"), "user-detail");
        assert_eq!(kebab_case("home"), "home");
        assert_eq!(kebab_case("APIClient"), "a-p-i-client");
    }

    #[test]
    fn test_config_override_beats_builtin() {
        let config = EngineConfig {
            token_overrides: vec![TokenOverride {
                token: "$uibModal".to_string(),
                type_name: "NgbModal".to_string(),
                param_name: "modal".to_string(),
                import_path: "@ng-bootstrap/ng-bootstrap".to_string(),
            }],
            ..Default::default()
        };
        let res = resolve_tokens(&declared(&["$uibModal"]), &config);
        assert_eq!(res.params, vec!["private modal: NgbModal"]);
        assert!(res.notes.is_empty());
        assert!(!res.tokens[0].dropped);
    }
}
