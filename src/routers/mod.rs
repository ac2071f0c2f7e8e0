//! Rule-driven routers and the field-derivation function.
//!
//! Routers try their rules in declared order and send each entry to the
//! output port of the first rule that matches, or to the configured default
//! port when none does.

pub mod derive;
pub mod field;
pub mod file;
pub mod script;

pub use derive::DeriveFields;
pub use field::FieldRouter;
pub use file::FileRouter;
pub use script::ScriptRouter;

use crate::config::{self, ConfigMap};
use crate::error::Result;
use crate::script::{CompiledScript, ScriptEngine};

/// A scripted routing rule as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRule {
    /// Boolean expression (`jsCondition`)
    pub condition: String,
    pub output_port: String,
}

/// Configuration shared by the scripted record and file routers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRouterConfig {
    pub default_output_port: String,
    pub rules: Vec<ConditionRule>,
}

impl ConditionRouterConfig {
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let default_output_port = config::required_str(config, "defaultOutputPort")?;
        let rules = config::required_array(config, "rules")?
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let rule = config::object_at(value, "rules", i)?;
                Ok(ConditionRule {
                    condition: config::required_str(rule, "jsCondition")?,
                    output_port: config::required_str(rule, "outputPort")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            default_output_port,
            rules,
        })
    }

    /// Compile every condition on `engine`.
    pub fn compile(&self, engine: &mut ScriptEngine) -> Result<CompiledRoutes<'_>> {
        let routes = self
            .rules
            .iter()
            .map(|rule| Ok((engine.compile(&rule.condition)?, rule.output_port.as_str())))
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledRoutes {
            routes,
            default_port: &self.default_output_port,
        })
    }
}

/// Compiled conditions paired with their output ports.
#[derive(Debug)]
pub struct CompiledRoutes<'c> {
    routes: Vec<(CompiledScript, &'c str)>,
    default_port: &'c str,
}

impl<'c> CompiledRoutes<'c> {
    /// Port of the first route whose condition `test` accepts.
    pub fn select<F>(&self, mut test: F) -> Result<&'c str>
    where
        F: FnMut(&CompiledScript) -> Result<bool>,
    {
        for (script, port) in &self.routes {
            if test(script)? {
                return Ok(*port);
            }
        }
        Ok(self.default_port)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
