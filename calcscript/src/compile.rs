//! Declaration compiler.
//!
//! Turns one extracted declaration into a [`CalcNode`]: parse the raw text,
//! then walk the AST for free identifiers to get the node's dependency set.
//! A declaration that fails to parse still becomes a node, just without an
//! AST, so the evaluator can report it and fail its dependents precisely.

use std::collections::BTreeSet;

use calcscript_core::{codes, Diagnostic};

use crate::ast::{Expr, ObjectEntry, Param};
use crate::extract::RawDecl;
use crate::parser::parse;

/// One compiled declaration.
///
/// `deps` is sorted and deduplicated, holds only free identifiers (the
/// library root never appears), and may include the node's own name when
/// the source is self-referential; the evaluator reports that as a cycle.
#[derive(Debug, Clone)]
pub struct CalcNode {
    pub name: String,
    pub source: String,
    pub line: u32,
    /// Absent when the source failed to parse or used a reserved binder.
    pub expr: Option<Expr>,
    pub deps: Vec<String>,
}

pub fn compile_decl(decl: &RawDecl) -> (CalcNode, Option<Diagnostic>) {
    let failed = |message: String, code: &str, line: u32| {
        let node = CalcNode {
            name: decl.name.clone(),
            source: decl.source.clone(),
            line: decl.line,
            expr: None,
            deps: Vec::new(),
        };
        let diag = Diagnostic::error(code, message)
            .at_line(line)
            .for_node(decl.name.clone());
        (node, Some(diag))
    };

    let expr = match parse(&decl.source) {
        Ok(expr) => expr,
        Err(err) => {
            let line = decl.line + newlines_before(&decl.source, err.offset());
            return failed(err.to_string(), codes::PARSE_ERROR, line);
        }
    };
    if binds_reserved_name(&expr) {
        return failed(
            format!("'let' may not bind the reserved name '{}'", crate::ROOT_NAME),
            codes::RESERVED_NAME_USED,
            decl.line,
        );
    }
    let deps = free_vars(&expr).into_iter().collect();
    let node = CalcNode {
        name: decl.name.clone(),
        source: decl.source.clone(),
        line: decl.line,
        expr: Some(expr),
        deps,
    };
    (node, None)
}

fn newlines_before(source: &str, offset: usize) -> u32 {
    let end = offset.min(source.len());
    source[..end].matches('\n').count() as u32
}

/// Every identifier the expression reads from its environment. Arrow
/// parameters and let binders shadow within their scope; the library root
/// is never reported.
pub fn free_vars(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut scope = Vec::new();
    collect(expr, &mut scope, &mut out);
    out
}

fn collect(expr: &Expr, scope: &mut Vec<String>, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Null => {}
        Expr::Ident(name) => {
            if name != crate::ROOT_NAME && !scope.iter().any(|bound| bound == name) {
                out.insert(name.clone());
            }
        }
        Expr::Array(items) => {
            for item in items {
                collect(item, scope, out);
            }
        }
        Expr::Object(entries) => {
            for entry in entries {
                match entry {
                    ObjectEntry::Field { value, .. } => collect(value, scope, out),
                    ObjectEntry::Spread(inner) => collect(inner, scope, out),
                }
            }
        }
        Expr::Unary { expr, .. } => collect(expr, scope, out),
        Expr::Binary { left, right, .. } => {
            collect(left, scope, out);
            collect(right, scope, out);
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            collect(cond, scope, out);
            collect(then, scope, out);
            collect(otherwise, scope, out);
        }
        // a member field is a projection, not an environment read
        Expr::Member { object, .. } => collect(object, scope, out),
        Expr::Index { object, index } => {
            collect(object, scope, out);
            collect(index, scope, out);
        }
        Expr::Call { callee, args } => {
            collect(callee, scope, out);
            for arg in args {
                collect(arg, scope, out);
            }
        }
        Expr::Lambda { params, body } => {
            let depth = scope.len();
            for param in params {
                match param {
                    Param::Name(name) => scope.push(name.clone()),
                    Param::Destructure(fields) => {
                        for field in fields {
                            scope.push(field.binding.clone());
                        }
                    }
                }
            }
            collect(body, scope, out);
            scope.truncate(depth);
        }
        Expr::Let { bindings, body } => {
            // each binding sees earlier binders, not itself
            let depth = scope.len();
            for (name, value) in bindings {
                collect(value, scope, out);
                scope.push(name.clone());
            }
            collect(body, scope, out);
            scope.truncate(depth);
        }
    }
}

/// True when any `let` binder equals the reserved root name. Arrow
/// parameters may shadow it; only `let` is rejected.
fn binds_reserved_name(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Null | Expr::Ident(_) => false,
        Expr::Array(items) => items.iter().any(binds_reserved_name),
        Expr::Object(entries) => entries.iter().any(|entry| match entry {
            ObjectEntry::Field { value, .. } => binds_reserved_name(value),
            ObjectEntry::Spread(inner) => binds_reserved_name(inner),
        }),
        Expr::Unary { expr, .. } => binds_reserved_name(expr),
        Expr::Binary { left, right, .. } => {
            binds_reserved_name(left) || binds_reserved_name(right)
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            binds_reserved_name(cond)
                || binds_reserved_name(then)
                || binds_reserved_name(otherwise)
        }
        Expr::Member { object, .. } => binds_reserved_name(object),
        Expr::Index { object, index } => {
            binds_reserved_name(object) || binds_reserved_name(index)
        }
        Expr::Call { callee, args } => {
            binds_reserved_name(callee) || args.iter().any(binds_reserved_name)
        }
        Expr::Lambda { body, .. } => binds_reserved_name(body),
        Expr::Let { bindings, body } => {
            bindings
                .iter()
                .any(|(name, value)| name == crate::ROOT_NAME || binds_reserved_name(value))
                || binds_reserved_name(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, source: &str) -> RawDecl {
        RawDecl {
            name: name.to_string(),
            source: source.to_string(),
            line: 1,
        }
    }

    fn deps_of(source: &str) -> Vec<String> {
        let (node, diag) = compile_decl(&decl("n", source));
        assert!(diag.is_none(), "unexpected diagnostic: {:?}", diag);
        node.deps
    }

    #[test]
    fn test_deps_are_sorted_and_deduped() {
        assert_eq!(deps_of("b + a + b * a"), vec!["a", "b"]);
    }

    #[test]
    fn test_library_root_is_not_a_dependency() {
        assert_eq!(deps_of("calc.math.abs(x)"), vec!["x"]);
    }

    #[test]
    fn test_lambda_params_shadow() {
        // r is bound, price is a member field; only rows and tax are free
        assert_eq!(
            deps_of("calc.array.map(rows, r => r.price * tax)"),
            vec!["rows", "tax"]
        );
    }

    #[test]
    fn test_destructure_bindings_shadow() {
        assert_eq!(
            deps_of("calc.array.map(rows, ({qty: n}) => n * price)"),
            vec!["price", "rows"]
        );
    }

    #[test]
    fn test_let_binding_sees_outer_name() {
        // the value of `a` refers to the outer `a`, the body's `a` is bound
        assert_eq!(deps_of("let { a = a + b; } in a"), vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference_stays_in_deps() {
        let (node, diag) = compile_decl(&decl("a", "a + 1"));
        assert!(diag.is_none());
        assert_eq!(node.deps, vec!["a"]);
    }

    #[test]
    fn test_parse_failure_keeps_astless_node() {
        let (node, diag) = compile_decl(&decl("broken", "1 + +"));
        assert!(node.expr.is_none());
        assert!(node.deps.is_empty());
        let diag = diag.unwrap();
        assert_eq!(diag.code, codes::PARSE_ERROR);
        assert_eq!(diag.node_name.as_deref(), Some("broken"));
        assert_eq!(diag.line, Some(1));
    }

    #[test]
    fn test_parse_failure_line_counts_newlines() {
        let raw = RawDecl {
            name: "multi".to_string(),
            source: "1 +\n*".to_string(),
            line: 10,
        };
        let (_, diag) = compile_decl(&raw);
        assert_eq!(diag.unwrap().line, Some(11));
    }

    #[test]
    fn test_reserved_let_binder_is_rejected() {
        let (node, diag) = compile_decl(&decl("shadow", "let { calc = 1; } in calc"));
        assert!(node.expr.is_none());
        assert_eq!(diag.unwrap().code, codes::RESERVED_NAME_USED);
    }

    #[test]
    fn test_arrow_param_may_shadow_root() {
        let (node, diag) = compile_decl(&decl("f", "calc.array.map(xs, calc => calc)"));
        assert!(diag.is_none());
        assert_eq!(node.deps, vec!["xs"]);
    }
}
