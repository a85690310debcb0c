//! Dependency-ordered evaluation.
//!
//! The evaluator binds the standard-library root, inputs and tables into an
//! environment, then runs calc nodes in topological order. A node that fails
//! produces one diagnostic and no value; nodes downstream of it are reported
//! as unresolved rather than re-failed, and nodes on a dependency cycle are
//! gathered into a single cycle diagnostic. Everything independent of a
//! failure still evaluates, so one bad formula never blanks a document.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use calcscript_core::number::{as_exact_int, ensure_finite};
use calcscript_core::{
    codes, date, ArgMeta, CalcError, Diagnostic, FnContext, FunctionMeta, FunctionPlugin, KeyRepr,
    Record, Value,
};
use calcscript_plugin::PluginRegistry;
use chrono::NaiveDateTime;

use crate::ast::{BinOp, Expr, ObjectEntry, Param, UnOp};
use crate::compile::free_vars;
use crate::datablock::{self, DataTable};
use crate::input::{check_constraints, coerce_value, InputDefinition};
use crate::program::Program;

/// One cell override: locate a row of `table` by its primary key and
/// replace the value in `column`.
#[derive(Debug, Clone)]
pub struct CellPatch {
    pub table: String,
    pub key: Value,
    pub column: String,
    pub value: Value,
}

/// Per-run knobs: input overrides, rows for `source:` tables, cell patches
/// and the clock handed to date functions.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    input_overrides: BTreeMap<String, Value>,
    source_rows: BTreeMap<String, Vec<serde_json::Value>>,
    cell_patches: Vec<CellPatch>,
    now: NaiveDateTime,
}

impl EvalOptions {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            input_overrides: BTreeMap::new(),
            source_rows: BTreeMap::new(),
            cell_patches: Vec::new(),
            now,
        }
    }

    /// Replace an input's default for this run. The value still goes through
    /// the input's type coercion and constraints.
    pub fn override_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.input_overrides.insert(name.into(), value);
        self
    }

    /// Supply the fetched rows for a table declared with `source:`.
    pub fn with_source_rows(
        mut self,
        table: impl Into<String>,
        rows: Vec<serde_json::Value>,
    ) -> Self {
        self.source_rows.insert(table.into(), rows);
        self
    }

    pub fn patch_cell(mut self, patch: CellPatch) -> Self {
        self.cell_patches.push(patch);
        self
    }
}

/// What a run produced: every bound name (inputs, tables, node results)
/// and the diagnostics raised while producing them.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub values: BTreeMap<String, Value>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Evaluate every node of an assembled program.
pub fn evaluate(program: &Program, registry: &PluginRegistry, options: &EvalOptions) -> Evaluation {
    let mut diags = Vec::new();
    let mut env = build_environment(program, registry, options, &mut diags);
    let ctx = FnContext::new(options.now);

    run_nodes(program, &mut env, &ctx, &mut diags);

    let values = env
        .into_iter()
        .filter(|(name, _)| name != crate::ROOT_NAME)
        .collect();
    Evaluation {
        values,
        diagnostics: diags,
    }
}

fn build_environment(
    program: &Program,
    registry: &PluginRegistry,
    options: &EvalOptions,
    diags: &mut Vec<Diagnostic>,
) -> HashMap<String, Value> {
    let mut env = HashMap::new();
    env.insert(
        crate::ROOT_NAME.to_string(),
        registry.root(crate::ROOT_NAME),
    );

    for def in &program.inputs {
        let value = match options.input_overrides.get(&def.name) {
            Some(raw) => match apply_override(def, raw) {
                Ok(v) => v,
                Err(err) => {
                    diags.push(
                        Diagnostic::warning(
                            codes::INVALID_OVERRIDE,
                            format!(
                                "override for input '{}': {}; keeping the default",
                                def.name, err.message
                            ),
                        )
                        .at_line(def.line)
                        .in_block("inputs"),
                    );
                    def.default.clone()
                }
            },
            None => def.default.clone(),
        };
        env.insert(def.name.clone(), value);
    }

    for patch in &options.cell_patches {
        if !program.tables.iter().any(|t| t.name == patch.table) {
            diags.push(Diagnostic::warning(
                codes::INVALID_PATCH,
                format!("patch targets unknown table '{}'", patch.table),
            ));
        }
    }

    for table in &program.tables {
        let mut rows = if table.source.is_some() {
            match options.source_rows.get(&table.name) {
                Some(raw) => {
                    let (rows, row_diags) = datablock::validate_external_rows(table, raw);
                    diags.extend(
                        row_diags
                            .into_iter()
                            .map(|d| d.at_line(table.line).in_block("data")),
                    );
                    rows
                }
                None => {
                    diags.push(
                        Diagnostic::warning(
                            codes::MISSING_SOURCE_DATA,
                            format!(
                                "table '{}' expects external rows and none were supplied; \
                                 binding an empty table",
                                table.name
                            ),
                        )
                        .at_line(table.line)
                        .in_block("data"),
                    );
                    Vec::new()
                }
            }
        } else {
            table.rows.clone()
        };
        apply_patches(table, &mut rows, &options.cell_patches, diags);
        env.insert(
            table.name.clone(),
            Value::List(rows.into_iter().map(Value::Record).collect()),
        );
    }

    env
}

fn apply_override(def: &InputDefinition, raw: &Value) -> Result<Value, CalcError> {
    let value = coerce_value(&def.ty, raw)?;
    check_constraints(def, &value)?;
    Ok(value)
}

fn apply_patches(
    table: &DataTable,
    rows: &mut [Record],
    patches: &[CellPatch],
    diags: &mut Vec<Diagnostic>,
) {
    for patch in patches.iter().filter(|p| p.table == table.name) {
        if let Err(message) = apply_patch(table, rows, patch) {
            diags.push(
                Diagnostic::warning(
                    codes::INVALID_PATCH,
                    format!("patch on table '{}': {}", table.name, message),
                )
                .at_line(table.line)
                .in_block("data"),
            );
        }
    }
}

fn apply_patch(table: &DataTable, rows: &mut [Record], patch: &CellPatch) -> Result<(), String> {
    if patch.column == table.primary_key {
        return Err("the primary key cannot be patched".to_string());
    }
    let column = table
        .columns
        .iter()
        .find(|c| c.name == patch.column)
        .ok_or_else(|| format!("unknown column '{}'", patch.column))?;
    let key =
        KeyRepr::from_value(&patch.key).map_err(|err| format!("bad key: {}", err.message))?;
    let row = rows
        .iter_mut()
        .find(|row| {
            row.get(&table.primary_key)
                .is_some_and(|cell| KeyRepr::from_value(cell).is_ok_and(|k| k == key))
        })
        .ok_or_else(|| format!("no row with {} = {}", table.primary_key, key))?;
    let value = if patch.value.is_null() {
        Value::Null
    } else {
        coerce_value(&column.ty, &patch.value)
            .map_err(|err| format!("column '{}': {}", patch.column, err.message))?
    };
    row.insert(patch.column.clone(), value)
        .map_err(|err| err.message)
}

/// Kahn's algorithm over node-to-node edges, with a min-heap so ties fall
/// back to declaration order. Names a node needs that are not nodes (inputs,
/// tables, the library root) resolve through the environment instead.
fn run_nodes(
    program: &Program,
    env: &mut HashMap<String, Value>,
    ctx: &FnContext,
    diags: &mut Vec<Diagnostic>,
) {
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

    let mut processed = vec![false; n];
    let mut failed = vec![false; n];

    while let Some(Reverse(i)) = ready.pop() {
        processed[i] = true;
        let node = &nodes[i];

        let blocked: Vec<&str> = node
            .deps
            .iter()
            .filter(|dep| node_index.get(dep.as_str()).is_some_and(|&j| failed[j]))
            .map(|dep| dep.as_str())
            .collect();

        if !blocked.is_empty() {
            failed[i] = true;
            diags.push(
                Diagnostic::error(
                    codes::DEPENDENCY_UNRESOLVED,
                    format!(
                        "node '{}' has unresolved dependencies: {}",
                        node.name,
                        blocked.join(", ")
                    ),
                )
                .at_line(node.line)
                .in_block("calc")
                .for_node(&node.name),
            );
        } else if let Some(expr) = &node.expr {
            let evaluator = Evaluator { env: &*env, ctx };
            match evaluator.eval(expr, &mut Vec::new()) {
                Ok(value) => {
                    env.insert(node.name.clone(), value);
                }
                Err(err) => {
                    failed[i] = true;
                    diags.push(
                        Diagnostic::from(err)
                            .at_line(node.line)
                            .in_block("calc")
                            .for_node(&node.name),
                    );
                }
            }
        } else {
            // Parse failure was already diagnosed at assembly; just poison
            // the dependents.
            failed[i] = true;
        }

        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.push(Reverse(d));
            }
        }
    }

    if processed.iter().all(|&p| p) {
        return;
    }

    // Whatever Kahn could not schedule contains at least one cycle. Nodes
    // that can reach themselves form the cyclic core and share one
    // diagnostic; the rest only depend on the core and are unresolved.
    let unordered: HashSet<usize> = (0..n).filter(|&i| !processed[i]).collect();
    let core: Vec<usize> = (0..n)
        .filter(|&i| unordered.contains(&i) && reaches_itself(i, program, &node_index, &unordered))
        .collect();

    if !core.is_empty() {
        let names: Vec<&str> = core.iter().map(|&i| nodes[i].name.as_str()).collect();
        diags.push(
            Diagnostic::error(
                codes::CYCLE,
                format!("dependency cycle among nodes: {}", names.join(", ")),
            )
            .at_line(nodes[core[0]].line)
            .in_block("calc"),
        );
    }

    let core_set: HashSet<usize> = core.into_iter().collect();
    for i in (0..n).filter(|i| unordered.contains(i) && !core_set.contains(i)) {
        let node = &nodes[i];
        let stuck: Vec<&str> = node
            .deps
            .iter()
            .filter(|dep| {
                node_index
                    .get(dep.as_str())
                    .is_some_and(|j| unordered.contains(j))
            })
            .map(|dep| dep.as_str())
            .collect();
        diags.push(
            Diagnostic::error(
                codes::DEPENDENCY_UNRESOLVED,
                format!(
                    "node '{}' has unresolved dependencies: {}",
                    node.name,
                    stuck.join(", ")
                ),
            )
            .at_line(node.line)
            .in_block("calc")
            .for_node(&node.name),
        );
    }
}

/// True when a dependency walk restricted to the unscheduled set leads back
/// to `start`.
fn reaches_itself(
    start: usize,
    program: &Program,
    node_index: &HashMap<&str, usize>,
    unordered: &HashSet<usize>,
) -> bool {
    let deps_of = |i: usize| {
        program.nodes[i]
            .deps
            .iter()
            .filter_map(|dep| node_index.get(dep.as_str()).copied())
            .filter(|j| unordered.contains(j))
            .collect::<Vec<_>>()
    };
    let mut stack = deps_of(start);
    let mut seen = HashSet::new();
    while let Some(i) = stack.pop() {
        if i == start {
            return true;
        }
        if seen.insert(i) {
            stack.extend(deps_of(i));
        }
    }
    false
}

/// Expression interpreter. Locals are a shadowing stack: arrow-function
/// parameters and `let` bindings push onto it, lookups scan it back to
/// front before falling through to the pass environment.
struct Evaluator<'a> {
    env: &'a HashMap<String, Value>,
    ctx: &'a FnContext,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr, locals: &mut Vec<(String, Value)>) -> Result<Value, CalcError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self
                .lookup(name, locals)
                .ok_or_else(|| CalcError::undefined_var(name)),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item, locals)?);
                }
                Ok(Value::List(out))
            }
            Expr::Object(entries) => self.eval_object(entries, locals),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, locals)?;
                unary_op(*op, &value)
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, locals),
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let flag = self.eval(cond, locals)?;
                match flag {
                    Value::List(flags) => {
                        let t = self.eval(then, locals)?;
                        let f = self.eval(otherwise, locals)?;
                        select_elementwise(&flags, &t, &f)
                    }
                    scalar if scalar.truthy() => self.eval(then, locals),
                    _ => self.eval(otherwise, locals),
                }
            }
            Expr::Member { object, field } => {
                let object = self.eval(object, locals)?;
                member(&object, field)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, locals)?;
                let index = self.eval(index, locals)?;
                index_into(&object, &index)
            }
            Expr::Call { callee, args } => {
                let target = self.eval(callee, locals)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, locals)?);
                }
                match target {
                    Value::Function(f) => f.call(&values, self.ctx),
                    other => Err(CalcError::type_error("function", other.type_name())),
                }
            }
            Expr::Lambda { params, body } => self.build_closure(expr, params, body, locals),
            Expr::Let { bindings, body } => {
                let depth = locals.len();
                for (name, value_expr) in bindings {
                    match self.eval(value_expr, locals) {
                        Ok(value) => locals.push((name.clone(), value)),
                        Err(err) => {
                            locals.truncate(depth);
                            return Err(err);
                        }
                    }
                }
                let out = self.eval(body, locals);
                locals.truncate(depth);
                out
            }
        }
    }

    fn lookup(&self, name: &str, locals: &[(String, Value)]) -> Option<Value> {
        if let Some((_, value)) = locals.iter().rev().find(|(n, _)| n == name) {
            return Some(value.clone());
        }
        self.env.get(name).cloned()
    }

    fn eval_object(
        &self,
        entries: &[ObjectEntry],
        locals: &mut Vec<(String, Value)>,
    ) -> Result<Value, CalcError> {
        let mut record = Record::new();
        let mut written: HashSet<&str> = HashSet::new();
        for entry in entries {
            match entry {
                ObjectEntry::Field { key, value } => {
                    if !written.insert(key.as_str()) {
                        return Err(CalcError::duplicate_record_key(key));
                    }
                    let value = self.eval(value, locals)?;
                    record.insert(key.clone(), value)?;
                }
                ObjectEntry::Spread(expr) => {
                    let value = self.eval(expr, locals)?;
                    let Value::Record(source) = value else {
                        return Err(CalcError::type_error("record", value.type_name()));
                    };
                    for (key, field) in source.iter() {
                        record.insert(key, field.clone())?;
                    }
                }
            }
        }
        Ok(Value::Record(record))
    }

    fn eval_binary(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        locals: &mut Vec<(String, Value)>,
    ) -> Result<Value, CalcError> {
        match op {
            BinOp::Coalesce => {
                let l = self.eval(left, locals)?;
                reject_list_coalesce(&l)?;
                if !l.is_null() {
                    return Ok(l);
                }
                let r = self.eval(right, locals)?;
                reject_list_coalesce(&r)?;
                Ok(r)
            }
            // Logic short-circuits only on a scalar left side; a list on
            // either side turns the operator elementwise.
            BinOp::And => {
                let l = self.eval(left, locals)?;
                if !matches!(l, Value::List(_)) && !l.truthy() {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval(right, locals)?;
                broadcast(op, &l, &r)
            }
            BinOp::Or => {
                let l = self.eval(left, locals)?;
                if !matches!(l, Value::List(_)) && l.truthy() {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval(right, locals)?;
                broadcast(op, &l, &r)
            }
            _ => {
                let l = self.eval(left, locals)?;
                let r = self.eval(right, locals)?;
                broadcast(op, &l, &r)
            }
        }
    }

    /// An arrow function captures, at construction, every free name its body
    /// uses, plus the library root so nested calls keep resolving it.
    fn build_closure(
        &self,
        lambda: &Expr,
        params: &[Param],
        body: &Expr,
        locals: &[(String, Value)],
    ) -> Result<Value, CalcError> {
        let mut captured = Vec::new();
        if let Some(root) = self.lookup(crate::ROOT_NAME, locals) {
            captured.push((crate::ROOT_NAME.to_string(), root));
        }
        for name in free_vars(lambda) {
            let value = self
                .lookup(&name, locals)
                .ok_or_else(|| CalcError::undefined_var(&name))?;
            captured.push((name, value));
        }
        Ok(Value::Function(Arc::new(Closure {
            params: params.to_vec(),
            body: body.clone(),
            captured,
        })))
    }
}

/// A user-defined arrow function. Everything its body refers to was captured
/// when the literal was evaluated, so calls run against an empty environment.
struct Closure {
    params: Vec<Param>,
    body: Expr,
    captured: Vec<(String, Value)>,
}

static CLOSURE_ARGS: [ArgMeta; 0] = [];

impl FunctionPlugin for Closure {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "<closure>",
            namespace: "",
            usage: "(args) => expr",
            description: "user-defined arrow function",
            args: &CLOSURE_ARGS,
            returns: "any",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != self.params.len() {
            return Err(CalcError::arg_count(
                "arrow function",
                &self.params.len().to_string(),
                args.len(),
            ));
        }
        let mut locals = self.captured.clone();
        for (param, arg) in self.params.iter().zip(args) {
            bind_param(param, arg, &mut locals)?;
        }
        let env = HashMap::new();
        let evaluator = Evaluator { env: &env, ctx };
        evaluator.eval(&self.body, &mut locals)
    }
}

fn bind_param(
    param: &Param,
    arg: &Value,
    locals: &mut Vec<(String, Value)>,
) -> Result<(), CalcError> {
    match param {
        Param::Name(name) => locals.push((name.clone(), arg.clone())),
        Param::Destructure(fields) => {
            let Value::Record(record) = arg else {
                return Err(CalcError::type_error("record", arg.type_name()));
            };
            for field in fields {
                let value = record.get(&field.key).cloned().unwrap_or(Value::Null);
                locals.push((field.binding.clone(), value));
            }
        }
    }
    Ok(())
}

fn reject_list_coalesce(value: &Value) -> Result<(), CalcError> {
    if matches!(value, Value::List(_)) {
        return Err(CalcError::eval(
            "'??' applies to scalars only, got a list operand",
        ));
    }
    Ok(())
}

/// Lift an operator elementwise over lists; two lists must agree on length,
/// a scalar pairs with every element.
fn broadcast(op: BinOp, left: &Value, right: &Value) -> Result<Value, CalcError> {
    match (left, right) {
        (Value::List(l), Value::List(r)) => {
            if l.len() != r.len() {
                return Err(CalcError::length_mismatch(l.len(), r.len()));
            }
            l.iter()
                .zip(r)
                .map(|(a, b)| broadcast(op, a, b))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        (Value::List(l), scalar) => l
            .iter()
            .map(|a| broadcast(op, a, scalar))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (scalar, Value::List(r)) => r
            .iter()
            .map(|b| broadcast(op, scalar, b))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        _ => scalar_binary(op, left, right),
    }
}

fn scalar_binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, CalcError> {
    match op {
        BinOp::Add => arith(op, left, right, |a, b| Ok(a + b)),
        BinOp::Sub => arith(op, left, right, |a, b| Ok(a - b)),
        BinOp::Mul => arith(op, left, right, |a, b| Ok(a * b)),
        BinOp::Div => arith(op, left, right, |a, b| {
            if b == 0.0 {
                return Err(CalcError::div_zero());
            }
            Ok(a / b)
        }),
        BinOp::Pow => arith(op, left, right, |a, b| Ok(a.powf(b))),
        BinOp::Concat => Ok(Value::Text(format!(
            "{}{}",
            scalar_text(left)?,
            scalar_text(right)?
        ))),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Ne => Ok(Value::Bool(left != right)),
        BinOp::Lt => Ok(Value::Bool(ordering(op, left, right)? == Ordering::Less)),
        BinOp::Le => Ok(Value::Bool(ordering(op, left, right)? != Ordering::Greater)),
        BinOp::Gt => Ok(Value::Bool(ordering(op, left, right)? == Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(ordering(op, left, right)? != Ordering::Less)),
        BinOp::And => Ok(Value::Bool(left.truthy() && right.truthy())),
        BinOp::Or => Ok(Value::Bool(left.truthy() || right.truthy())),
        BinOp::Coalesce => Err(CalcError::eval("'??' does not apply elementwise")),
    }
}

fn arith(
    op: BinOp,
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> Result<f64, CalcError>,
) -> Result<Value, CalcError> {
    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(CalcError::eval(format!(
            "'{}' requires numbers, got {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        )));
    };
    let out = f(a, b)?;
    ensure_finite(out, "result").map(Value::Number)
}

fn scalar_text(value: &Value) -> Result<String, CalcError> {
    match value {
        Value::Number(_)
        | Value::Text(_)
        | Value::Bool(_)
        | Value::Date(_)
        | Value::DateTime(_)
        | Value::Null => Ok(value.to_string()),
        other => Err(CalcError::eval(format!(
            "'&' cannot stringify a {}",
            other.type_name()
        ))),
    }
}

fn ordering(op: BinOp, left: &Value, right: &Value) -> Result<Ordering, CalcError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a
            .partial_cmp(&b)
            .ok_or_else(|| CalcError::not_finite("comparison operand"));
    }
    if let (Value::Text(a), Value::Text(b)) = (left, right) {
        return Ok(a.cmp(b));
    }
    if let (Some(a), Some(b)) = (date::timestamp(left), date::timestamp(right)) {
        return Ok(a.cmp(&b));
    }
    Err(CalcError::eval(format!(
        "'{}' requires two numbers, two strings or two dates, got {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    )))
}

fn unary_op(op: UnOp, value: &Value) -> Result<Value, CalcError> {
    if let Value::List(items) = value {
        return items
            .iter()
            .map(|item| unary_op(op, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }
    match op {
        UnOp::Not => Ok(Value::Bool(!value.truthy())),
        UnOp::Neg => match value.as_number() {
            Some(n) => Ok(Value::Number(-n)),
            None => Err(CalcError::eval(format!(
                "'-' requires a number, got {}",
                value.type_name()
            ))),
        },
    }
}

/// Elementwise `cond ? then : else`. Branch lists must match the condition's
/// length; branch scalars repeat.
fn select_elementwise(
    flags: &[Value],
    then: &Value,
    otherwise: &Value,
) -> Result<Value, CalcError> {
    for branch in [then, otherwise] {
        if let Value::List(items) = branch {
            if items.len() != flags.len() {
                return Err(CalcError::length_mismatch(flags.len(), items.len()));
            }
        }
    }
    let pick = |branch: &Value, i: usize| match branch {
        Value::List(items) => items[i].clone(),
        scalar => scalar.clone(),
    };
    let out = flags
        .iter()
        .enumerate()
        .map(|(i, flag)| {
            if flag.truthy() {
                pick(then, i)
            } else {
                pick(otherwise, i)
            }
        })
        .collect();
    Ok(Value::List(out))
}

fn member(object: &Value, field: &str) -> Result<Value, CalcError> {
    match object {
        Value::Record(record) => Ok(record.get(field).cloned().unwrap_or(Value::Null)),
        Value::Namespace(ns) => ns
            .get(field)
            .cloned()
            .ok_or_else(|| CalcError::undefined_field(field, &format!("namespace {}", ns.name()))),
        // Member access over a list extracts a column; rows missing the
        // field contribute null.
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Record(record) => Ok(record.get(field).cloned().unwrap_or(Value::Null)),
                Value::Null => Ok(Value::Null),
                other => Err(CalcError::undefined_field(field, other.type_name())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Null => Ok(Value::Null),
        other => Err(CalcError::undefined_field(field, other.type_name())),
    }
}

fn index_into(object: &Value, index: &Value) -> Result<Value, CalcError> {
    match (object, index) {
        (Value::List(items), Value::Number(n)) => {
            let Some(i) = as_exact_int(*n) else {
                return Err(CalcError::eval(format!(
                    "list index must be an integer, got {}",
                    n
                )));
            };
            if i < 0 || i as usize >= items.len() {
                return Err(CalcError::eval(format!(
                    "index {} out of bounds for a list of {}",
                    i,
                    items.len()
                )));
            }
            Ok(items[i as usize].clone())
        }
        (Value::Record(record), Value::Text(key)) => {
            Ok(record.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Namespace(ns), Value::Text(key)) => ns
            .get(key)
            .cloned()
            .ok_or_else(|| CalcError::undefined_field(key, &format!("namespace {}", ns.name()))),
        (Value::Null, _) => Ok(Value::Null),
        (object, index) => Err(CalcError::eval(format!(
            "cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}
