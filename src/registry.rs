//! Function registry: the catalog mapping keys to function constructors.
//!
//! The registry is an explicit value built by the entry point; nothing is
//! registered globally. Every lookup constructs a fresh, independent
//! [`Function`] instance, so one registry can serve concurrent invocations.

use crate::dataflow::{Function, FunctionSpec};
use crate::parsers::{ParseDelimited, ParseFixedWidth};
use crate::routers::{DeriveFields, FieldRouter, FileRouter, ScriptRouter};
use crate::sinks::{GenerateDelimited, WriteToDisk};

/// Constructor producing a new function instance per invocation.
pub type Constructor = Box<dyn Fn() -> Box<dyn Function> + Send + Sync>;

struct RegisteredFunction {
    spec: FunctionSpec,
    constructor: Constructor,
}

/// Registry of function specs and their constructors
pub struct FunctionRegistry {
    functions: Vec<RegisteredFunction>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    /// Registry holding every built-in function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FieldRouter::spec(), || Box::new(FieldRouter));
        registry.register(ScriptRouter::spec(), || Box::new(ScriptRouter));
        registry.register(FileRouter::spec(), || Box::new(FileRouter));
        registry.register(DeriveFields::spec(), || Box::new(DeriveFields));
        registry.register(ParseDelimited::spec(), || Box::new(ParseDelimited));
        registry.register(ParseFixedWidth::spec(), || Box::new(ParseFixedWidth));
        registry.register(GenerateDelimited::spec(), || Box::new(GenerateDelimited));
        registry.register(WriteToDisk::spec(), || Box::new(WriteToDisk));
        registry
    }

    /// Register a function under `spec.key`
    ///
    /// Registering a key twice keeps both entries; lookups return the one
    /// registered first.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use portflow::{FunctionRegistry, FunctionSpec};
    ///
    /// let mut registry = FunctionRegistry::new();
    /// registry.register(
    ///     FunctionSpec::sync("noop", "No-op", "Drops every entry", "Data"),
    ///     || Box::new(Noop),
    /// );
    /// ```
    pub fn register<F>(&mut self, spec: FunctionSpec, constructor: F)
    where
        F: Fn() -> Box<dyn Function> + Send + Sync + 'static,
    {
        self.functions.push(RegisteredFunction {
            spec,
            constructor: Box::new(constructor),
        });
    }

    fn find(&self, key: &str) -> Option<&RegisteredFunction> {
        self.functions.iter().find(|f| f.spec.key == key)
    }

    /// Look up a function's spec
    pub fn spec_by_key(&self, key: &str) -> Option<&FunctionSpec> {
        self.find(key).map(|f| &f.spec)
    }

    /// Construct a new instance of the function registered under `key`
    ///
    /// # Returns
    ///
    /// * `Some(function)` - A fresh instance, independent from earlier ones
    /// * `None` - No function is registered under `key`
    pub fn new_function(&self, key: &str) -> Option<Box<dyn Function>> {
        self.find(key).map(|f| (f.constructor)())
    }

    /// Every registered spec, in registration order
    pub fn specs(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.iter().map(|f| &f.spec)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
