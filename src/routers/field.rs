//! Native field router (`splitOnField`).

use crate::compare::{self, FieldRule, Operand, Operator};
use crate::config::{self, ConfigMap};
use crate::dataflow::{drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter};
use crate::error::{FunctionError, Result};
use crate::value::Value;
use indexmap::IndexMap;

/// Validated `splitOnField` configuration.
#[derive(Debug, Clone)]
pub struct FieldRouterConfig {
    pub default_output_port: String,
    pub rules: Vec<FieldRule>,
}

impl FieldRouterConfig {
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let default_output_port = config::required_str(config, "defaultOutputPort")?;
        let rules = config::required_array(config, "rules")?
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let rule = config::object_at(value, "rules", i)?;
                parse_rule(rule).map_err(|e| match e {
                    FunctionError::Config { key, reason } => {
                        FunctionError::config(format!("rules[{}].{}", i, key), reason)
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            default_output_port,
            rules,
        })
    }
}

fn parse_rule(rule: &ConfigMap) -> Result<FieldRule> {
    let field = config::required_str(rule, "field")?;
    let op: Operator = config::required_str(rule, "op")?.parse()?;
    let value = config::required(rule, "value")?;
    let output_port = config::required_str(rule, "outputPort")?;

    let operand = match config::optional_str(rule, "valueType")?.as_deref() {
        None | Some("literal") => Operand::Literal(Value::from(value)),
        Some("field") => match value.as_str() {
            Some(name) => Operand::Field(name.to_string()),
            None => {
                return Err(FunctionError::config(
                    "value",
                    "must name a field when valueType is \"field\"",
                ))
            }
        },
        Some(other) => {
            return Err(FunctionError::config(
                "valueType",
                format!("expected \"literal\" or \"field\", got \"{}\"", other),
            ))
        }
    };

    FieldRule::new(field, op, operand, output_port).map_err(|e| match e {
        FunctionError::Pattern(err) => FunctionError::config("value", err.to_string()),
        other => other,
    })
}

/// Routes records by comparing a field against a literal or another field.
#[derive(Debug, Default)]
pub struct FieldRouter;

impl FieldRouter {
    pub const KEY: &'static str = "splitOnField";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(Self::KEY, "Split Data by Field", "Splits the input data", "Data")
    }
}

impl Function for FieldRouter {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |output| {
            let parsed = FieldRouterConfig::from_config(config)?;
            let policy = config::error_policy(config)?;

            let mut routed: IndexMap<String, usize> = IndexMap::new();
            let stats = drain_input(input, policy, |entry| {
                let record = entry.into_record()?;
                let port = compare::route(&parsed.rules, &record, &parsed.default_output_port)?;
                output.write_record(port, record)?;
                *routed.entry(port.to_string()).or_insert(0) += 1;
                Ok(())
            })?;

            tracing::info!(
                "splitOnField: routed {} records {:?} ({} skipped)",
                stats.entries - stats.skipped,
                routed,
                stats.skipped
            );
            Ok(())
        })
    }
}
