//! Expression engine for scripted rules.
//!
//! Each rule source is compiled once into an AST stored under a generated
//! unique name; callers keep the returned [`CompiledScript`] handle and
//! evaluate it per entry against either a record's fields or a file's
//! synthetic info. The engine belongs to a single function invocation and is
//! never shared between invocations.

pub mod bindings;
pub mod compat;

pub use bindings::FileInfo;

use crate::error::{FunctionError, Result};
use crate::record::Record;
use crate::value::Value;
use rhai::{Dynamic, Engine, Scope, AST};
use std::collections::HashMap;
use uuid::Uuid;

/// Handle to a compiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    /// Generated unique name the AST is stored under
    pub name: String,
    /// Source as written in the configuration
    pub source: String,
}

/// Engine plus the rules compiled for one invocation.
pub struct ScriptEngine {
    engine: Engine,
    compiled: HashMap<String, AST>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        compat::register_helpers(&mut engine);
        compat::register_operators(&mut engine);
        Self {
            engine,
            compiled: HashMap::new(),
        }
    }

    /// Compile `source` as a single expression.
    ///
    /// # Errors
    /// Returns `FunctionError::Script` if the source is not a valid
    /// expression (statements such as `let` are rejected).
    pub fn compile(&mut self, source: &str) -> Result<CompiledScript> {
        let normalized = compat::normalize_source(source);
        let ast = self
            .engine
            .compile_expression(&normalized)
            .map_err(|e| script_error(source, e))?;

        let name = format!("rule_{}", Uuid::new_v4().simple());
        tracing::debug!("Compiled rule {} from `{}`", name, source);
        self.compiled.insert(name.clone(), ast);

        Ok(CompiledScript {
            name,
            source: source.to_string(),
        })
    }

    /// Compile every source in order.
    pub fn compile_all<'a, I>(&mut self, sources: I) -> Result<Vec<CompiledScript>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        sources.into_iter().map(|s| self.compile(s)).collect()
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    fn eval(&self, script: &CompiledScript, scope: &mut Scope<'_>) -> Result<Dynamic> {
        let ast = self.compiled.get(&script.name).ok_or_else(|| {
            FunctionError::Unsupported(format!("rule '{}' was not compiled by this engine", script.name))
        })?;
        self.engine
            .eval_ast_with_scope::<Dynamic>(scope, ast)
            .map_err(|e| script_error(&script.source, e))
    }

    /// Evaluate with the record's fields bound.
    pub fn evaluate_record(&self, script: &CompiledScript, record: &Record) -> Result<Value> {
        let mut scope = bindings::record_scope(record);
        self.eval(script, &mut scope).map(bindings::from_dynamic)
    }

    /// Evaluate as a condition with the record's fields bound.
    pub fn test_record(&self, script: &CompiledScript, record: &Record) -> Result<bool> {
        let mut scope = bindings::record_scope(record);
        self.eval(script, &mut scope).map(|v| bindings::is_truthy(&v))
    }

    /// Evaluate with file info bound.
    pub fn evaluate_file(&self, script: &CompiledScript, info: &FileInfo) -> Result<Value> {
        let mut scope = bindings::file_scope(info);
        self.eval(script, &mut scope).map(bindings::from_dynamic)
    }

    /// Evaluate as a condition with file info bound.
    pub fn test_file(&self, script: &CompiledScript, info: &FileInfo) -> Result<bool> {
        let mut scope = bindings::file_scope(info);
        self.eval(script, &mut scope).map(|v| bindings::is_truthy(&v))
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn script_error(source: &str, err: impl std::fmt::Display) -> FunctionError {
    FunctionError::Script {
        source_text: source.to_string(),
        message: err.to_string(),
    }
}
