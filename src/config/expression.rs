// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Deferred configuration values.
//!
//! An [`Expression`] is evaluated inside a vertex's turn, against a
//! [`ValueLookup`] holding the values of the vertex's already-completed
//! upstream vertices. Evaluation is pure: it either yields a value or a
//! diagnostic.
//!
//! [`TemplateExpression`] is the built-in implementation used by YAML
//! workspaces: a JSON value whose strings may contain `${address.attribute}`
//! interpolations.

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use crate::diagnostics::Diagnostic;
use crate::engine::plan::{is_unknown, unknown};
use crate::graph::Address;

/// Resolved upstream values visible to an expression.
pub trait ValueLookup {
    fn lookup(&self, address: &Address) -> Option<&Value>;

    /// When true, missing attributes evaluate to the unknown value instead of
    /// an error (used by validation, where nothing has been computed).
    fn allows_unknown(&self) -> bool {
        false
    }
}

/// A configuration value resolved lazily during the walk.
pub trait Expression: Send + Sync {
    fn evaluate(&self, scope: &dyn ValueLookup) -> Result<Value, Diagnostic>;

    /// Addresses this expression reads from. Used to derive edges.
    fn references(&self) -> BTreeSet<Address> {
        BTreeSet::new()
    }
}

impl<F> Expression for F
where
    F: Fn(&dyn ValueLookup) -> Result<Value, Diagnostic> + Send + Sync,
{
    fn evaluate(&self, scope: &dyn ValueLookup) -> Result<Value, Diagnostic> {
        self(scope)
    }
}

/// The values handed to one vertex: those of its direct predecessors.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: HashMap<Address, Value>,
    allow_unknown: bool,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unknowns(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn insert(&mut self, address: Address, value: Value) {
        self.values.insert(address, value);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Address, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ValueLookup for Scope {
    fn lookup(&self, address: &Address) -> Option<&Value> {
        self.values.get(address)
    }

    fn allows_unknown(&self) -> bool {
        self.allow_unknown
    }
}

/// JSON template with `${...}` interpolation.
///
/// A string that is exactly one interpolation evaluates to the referenced
/// value with its type preserved; interpolations embedded in longer strings
/// are rendered as text.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use terrawalk::config::{Expression, Scope, TemplateExpression};
/// use terrawalk::graph::Address;
///
/// let expr = TemplateExpression::new(json!({ "network_id": "${mem_network.main.id}" }));
/// assert!(expr.references().contains(&Address::new("mem_network.main")));
///
/// let mut scope = Scope::new();
/// scope.insert(Address::new("mem_network.main"), json!({ "id": "net-1" }));
/// assert_eq!(expr.evaluate(&scope).unwrap(), json!({ "network_id": "net-1" }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateExpression {
    template: Value,
}

impl TemplateExpression {
    pub fn new(template: Value) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Value {
        &self.template
    }
}

impl Expression for TemplateExpression {
    fn evaluate(&self, scope: &dyn ValueLookup) -> Result<Value, Diagnostic> {
        render(&self.template, scope)
    }

    fn references(&self) -> BTreeSet<Address> {
        let mut paths = Vec::new();
        collect_paths(&self.template, &mut paths);
        paths.iter().map(|path| reference_target(path)).collect()
    }
}

/// Maps an interpolation path to the vertex it reads from.
///
/// `mem_x.a.id` reads `mem_x.a`; `module.net.output.id` reads that output;
/// `module.net.vpc_id` and `module.net` read the module boundary.
pub fn reference_target(path: &str) -> Address {
    let segments: Vec<&str> = path.split('.').collect();
    let mut i = 0;
    while i + 1 < segments.len() && segments[i] == "module" {
        i += 2;
    }
    let remaining = segments.len().saturating_sub(i);
    let end = if remaining <= 1 { i.min(segments.len()) } else { i + 2 };
    let end = if end == 0 { segments.len() } else { end };
    Address::new(segments[..end].join("."))
}

fn collect_paths(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if let Ok(parts) = parse_template(s) {
                for part in parts {
                    if let Part::Reference(path) = part {
                        out.push(path.to_string());
                    }
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_paths(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_paths(item, out)),
        _ => {}
    }
}

enum Part<'a> {
    Literal(&'a str),
    Reference(&'a str),
}

fn parse_template(s: &str) -> Result<Vec<Part<'_>>, Diagnostic> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            parts.push(Part::Literal(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            Diagnostic::error("Invalid template", format!("unterminated interpolation in \"{}\"", s))
        })?;
        let path = after[..end].trim();
        if path.is_empty() {
            return Err(Diagnostic::error(
                "Invalid template",
                format!("empty interpolation in \"{}\"", s),
            ));
        }
        parts.push(Part::Reference(path));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        parts.push(Part::Literal(rest));
    }
    Ok(parts)
}

fn render(value: &Value, scope: &dyn ValueLookup) -> Result<Value, Diagnostic> {
    match value {
        Value::String(s) => render_string(s, scope),
        Value::Array(items) => items
            .iter()
            .map(|item| render(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(key.clone(), render(item, scope)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn render_string(s: &str, scope: &dyn ValueLookup) -> Result<Value, Diagnostic> {
    let parts = parse_template(s)?;
    if let [Part::Reference(path)] = parts.as_slice() {
        return resolve(path, scope);
    }
    let mut out = String::new();
    for part in parts {
        match part {
            Part::Literal(text) => out.push_str(text),
            Part::Reference(path) => match resolve(path, scope)? {
                Value::String(text) => out.push_str(&text),
                other => out.push_str(&other.to_string()),
            },
        }
    }
    Ok(Value::String(out))
}

fn resolve(path: &str, scope: &dyn ValueLookup) -> Result<Value, Diagnostic> {
    let segments: Vec<&str> = path.split('.').collect();
    for cut in (1..=segments.len()).rev() {
        let address = Address::new(segments[..cut].join("."));
        let Some(root) = scope.lookup(&address) else {
            continue;
        };
        let mut current = root;
        for attribute in &segments[cut..] {
            if is_unknown(current) {
                return Ok(unknown());
            }
            let next = match attribute.parse::<usize>() {
                Ok(index) => current.get(index),
                Err(_) => current.get(*attribute),
            };
            match next {
                Some(value) => current = value,
                None if scope.allows_unknown() => return Ok(unknown()),
                None => {
                    return Err(Diagnostic::error(
                        "Unsupported attribute",
                        format!("'{}' has no attribute '{}' (in \"${{{}}}\")", address, attribute, path),
                    ))
                }
            }
        }
        return Ok(current.clone());
    }
    Err(Diagnostic::error(
        "Reference to unresolved value",
        format!("'{}' is not available to this expression", path),
    ))
}
