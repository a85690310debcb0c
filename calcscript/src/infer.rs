//! Static type inference.
//!
//! Runs the node graph abstractly over declared input and column kinds
//! instead of values, so a renderer can format `price * qty` as USD before
//! anything is evaluated. The pass only feeds formatting hints: anything it
//! cannot see through (calls, indexing, the library root) infers unknown,
//! and a dependency cycle degrades to declaration order instead of failing.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use calcscript_core::{combine_numeric, InputType, NumericOp};
use serde::Serialize;

use crate::ast::{BinOp, Expr, ObjectEntry, UnOp};
use crate::datablock::DataTable;
use crate::program::Program;

/// A named column kind inside an inferred table shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnType {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InputType,
}

/// What inference knows about one name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Inferred {
    Unknown,
    Scalar {
        kind: InputType,
    },
    Vector {
        kind: InputType,
    },
    Table {
        columns: Vec<ColumnType>,
        #[serde(rename = "primaryKey")]
        primary_key: String,
    },
    Object {
        fields: BTreeMap<String, Inferred>,
    },
}

/// Infer a type for every input, table and node of the program.
pub fn infer(program: &Program) -> BTreeMap<String, Inferred> {
    let mut env: HashMap<String, Inferred> = HashMap::new();
    for def in &program.inputs {
        env.insert(def.name.clone(), scalar(def.ty.clone()));
    }
    for table in &program.tables {
        env.insert(table.name.clone(), table_type(table));
    }

    for i in node_order(program) {
        let node = &program.nodes[i];
        let ty = match &node.expr {
            Some(expr) => infer_expr(expr, &env, &mut Vec::new()),
            None => Inferred::Unknown,
        };
        env.insert(node.name.clone(), ty);
    }

    env.into_iter().collect()
}

fn scalar(kind: InputType) -> Inferred {
    Inferred::Scalar { kind }
}

fn vector(kind: InputType) -> Inferred {
    Inferred::Vector { kind }
}

fn table_type(table: &DataTable) -> Inferred {
    Inferred::Table {
        columns: table
            .columns
            .iter()
            .map(|c| ColumnType {
                name: c.name.clone(),
                kind: c.ty.clone(),
            })
            .collect(),
        primary_key: table.primary_key.clone(),
    }
}

/// Same schedule as the evaluator, except the unorderable remainder is
/// appended in declaration order; their unresolved dependencies simply
/// read as unknown.
fn node_order(program: &Program) -> Vec<usize> {
    let nodes = &program.nodes;
    let n = nodes.len();
    let node_index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, node) in nodes.iter().enumerate() {
        for dep in &node.deps {
            if let Some(&j) = node_index.get(dep.as_str()) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    for (i, &degree) in in_degree.iter().enumerate() {
        if degree == 0 {
            ready.push(Reverse(i));
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut processed = vec![false; n];
    while let Some(Reverse(i)) = ready.pop() {
        processed[i] = true;
        order.push(i);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.push(Reverse(d));
            }
        }
    }
    order.extend((0..n).filter(|&i| !processed[i]));
    order
}

fn infer_expr(
    expr: &Expr,
    env: &HashMap<String, Inferred>,
    locals: &mut Vec<(String, Inferred)>,
) -> Inferred {
    match expr {
        Expr::Number(_) => scalar(InputType::Number),
        Expr::Text(_) => scalar(InputType::String),
        Expr::Bool(_) => scalar(InputType::Boolean),
        Expr::Null => Inferred::Unknown,
        Expr::Ident(name) => {
            if name == crate::ROOT_NAME {
                return Inferred::Unknown;
            }
            if let Some((_, ty)) = locals.iter().rev().find(|(n, _)| n == name) {
                return ty.clone();
            }
            env.get(name).cloned().unwrap_or(Inferred::Unknown)
        }
        Expr::Array(items) => {
            let mut element: Option<InputType> = None;
            for item in items {
                match infer_expr(item, env, locals) {
                    Inferred::Scalar { kind } => match &element {
                        None => element = Some(kind),
                        Some(seen) if *seen == kind => {}
                        Some(_) => return Inferred::Unknown,
                    },
                    _ => return Inferred::Unknown,
                }
            }
            match element {
                Some(kind) => vector(kind),
                None => Inferred::Unknown,
            }
        }
        Expr::Object(entries) => {
            let mut fields = BTreeMap::new();
            for entry in entries {
                match entry {
                    ObjectEntry::Field { key, value } => {
                        fields.insert(key.clone(), infer_expr(value, env, locals));
                    }
                    // A spread of anything but a known object hides the
                    // final field set.
                    ObjectEntry::Spread(inner) => match infer_expr(inner, env, locals) {
                        Inferred::Object { fields: spread } => fields.extend(spread),
                        _ => return Inferred::Unknown,
                    },
                }
            }
            Inferred::Object { fields }
        }
        Expr::Unary { op, expr } => {
            let ty = infer_expr(expr, env, locals);
            match op {
                UnOp::Not => match ty {
                    Inferred::Scalar { .. } => scalar(InputType::Boolean),
                    Inferred::Vector { .. } => vector(InputType::Boolean),
                    _ => Inferred::Unknown,
                },
                UnOp::Neg => match ty {
                    Inferred::Scalar { kind } if kind.is_numeric() => scalar(kind),
                    Inferred::Vector { kind } if kind.is_numeric() => vector(kind),
                    _ => Inferred::Unknown,
                },
            }
        }
        Expr::Binary { op, left, right } => {
            let l = infer_expr(left, env, locals);
            let r = infer_expr(right, env, locals);
            infer_binary(*op, &l, &r)
        }
        Expr::Conditional {
            then, otherwise, ..
        } => {
            let t = infer_expr(then, env, locals);
            let f = infer_expr(otherwise, env, locals);
            if identical(&t, &f) {
                t
            } else {
                Inferred::Unknown
            }
        }
        Expr::Member { object, field } => match infer_expr(object, env, locals) {
            Inferred::Object { fields } => {
                fields.get(field).cloned().unwrap_or(Inferred::Unknown)
            }
            Inferred::Table { columns, .. } => columns
                .iter()
                .find(|c| &c.name == field)
                .map(|c| vector(c.kind.clone()))
                .unwrap_or(Inferred::Unknown),
            _ => Inferred::Unknown,
        },
        Expr::Index { .. } => Inferred::Unknown,
        Expr::Call { .. } => Inferred::Unknown,
        Expr::Lambda { .. } => Inferred::Unknown,
        Expr::Let { bindings, body } => {
            let depth = locals.len();
            for (name, value) in bindings {
                let ty = infer_expr(value, env, locals);
                locals.push((name.clone(), ty));
            }
            let out = infer_expr(body, env, locals);
            locals.truncate(depth);
            out
        }
    }
}

fn infer_binary(op: BinOp, left: &Inferred, right: &Inferred) -> Inferred {
    match op {
        BinOp::Add => infer_arith(NumericOp::Add, left, right),
        BinOp::Sub => infer_arith(NumericOp::Sub, left, right),
        BinOp::Mul => infer_arith(NumericOp::Mul, left, right),
        BinOp::Div => infer_arith(NumericOp::Div, left, right),
        BinOp::Pow => shaped(left, right, InputType::Number),
        BinOp::Concat => shaped(left, right, InputType::String),
        BinOp::Eq
        | BinOp::Ne
        | BinOp::Lt
        | BinOp::Le
        | BinOp::Gt
        | BinOp::Ge
        | BinOp::And
        | BinOp::Or => shaped(left, right, InputType::Boolean),
        BinOp::Coalesce => {
            if identical(left, right) && matches!(left, Inferred::Scalar { .. }) {
                left.clone()
            } else {
                Inferred::Unknown
            }
        }
    }
}

/// Kind combination for `+ - * /`, lifted through vectors.
fn infer_arith(op: NumericOp, left: &Inferred, right: &Inferred) -> Inferred {
    let (l, r, lifted) = match (left, right) {
        (Inferred::Scalar { kind: l }, Inferred::Scalar { kind: r }) => (l, r, false),
        (Inferred::Scalar { kind: l }, Inferred::Vector { kind: r })
        | (Inferred::Vector { kind: l }, Inferred::Scalar { kind: r })
        | (Inferred::Vector { kind: l }, Inferred::Vector { kind: r }) => (l, r, true),
        _ => return Inferred::Unknown,
    };
    match combine_numeric(op, l, r) {
        Some(kind) if lifted => vector(kind),
        Some(kind) => scalar(kind),
        None => Inferred::Unknown,
    }
}

/// Operators with a fixed result kind still propagate shape: two scalars
/// stay scalar, a vector on either side lifts the result.
fn shaped(left: &Inferred, right: &Inferred, kind: InputType) -> Inferred {
    match (left, right) {
        (Inferred::Scalar { .. }, Inferred::Scalar { .. }) => scalar(kind),
        (Inferred::Scalar { .. } | Inferred::Vector { .. }, Inferred::Vector { .. })
        | (Inferred::Vector { .. }, Inferred::Scalar { .. }) => vector(kind),
        _ => Inferred::Unknown,
    }
}

/// Branch compatibility for conditionals and `??`. Tables compare as
/// column sets, everything else structurally.
fn identical(a: &Inferred, b: &Inferred) -> bool {
    match (a, b) {
        (
            Inferred::Table {
                columns: ca,
                primary_key: pa,
            },
            Inferred::Table {
                columns: cb,
                primary_key: pb,
            },
        ) => pa == pb && ca.len() == cb.len() && ca.iter().all(|c| cb.contains(c)),
        _ => a == b,
    }
}
