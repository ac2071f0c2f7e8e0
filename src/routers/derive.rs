//! Field derivation (`transformData`).
//!
//! Every rule is evaluated for every record, in declared order, and its
//! result stored under the rule's output field. Later rules see the fields
//! assigned by earlier ones.

use crate::config::{self, ConfigMap};
use crate::dataflow::{
    drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter,
    DEFAULT_OUTPUT_PORT,
};
use crate::error::Result;
use crate::record::Record;
use crate::script::{CompiledScript, ScriptEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeriveRule {
    /// Value expression (`jsExpression`)
    pub expression: String,
    pub output_field: String,
}

pub fn parse_rules(config: &ConfigMap) -> Result<Vec<DeriveRule>> {
    config::required_array(config, "rules")?
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let rule = config::object_at(value, "rules", i)?;
            Ok(DeriveRule {
                expression: config::required_str(rule, "jsExpression")?,
                output_field: config::required_str(rule, "outputField")?,
            })
        })
        .collect()
}

/// Apply every compiled rule to `record` in place.
pub fn derive_fields(
    engine: &ScriptEngine,
    rules: &[(CompiledScript, &str)],
    record: &mut Record,
) -> Result<()> {
    for (script, field) in rules {
        let value = engine.evaluate_record(script, record)?;
        record.set(*field, value);
    }
    Ok(())
}

/// Adds or replaces fields computed by expressions over existing fields.
#[derive(Debug, Default)]
pub struct DeriveFields;

impl DeriveFields {
    pub const KEY: &'static str = "transformData";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "Adds a field",
            "Adds a field via expression based on existing field",
            "Data",
        )
    }
}

impl Function for DeriveFields {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |output| {
            let rules = parse_rules(config)?;
            let policy = config::error_policy(config)?;

            let mut engine = ScriptEngine::new();
            let compiled = rules
                .iter()
                .map(|rule| Ok((engine.compile(&rule.expression)?, rule.output_field.as_str())))
                .collect::<Result<Vec<_>>>()?;

            let stats = drain_input(input, policy, |entry| {
                let mut record = entry.into_record()?;
                derive_fields(&engine, &compiled, &mut record)?;
                output.write_record(DEFAULT_OUTPUT_PORT, record)
            })?;

            tracing::info!(
                "transformData: derived {} fields on {} records ({} skipped)",
                compiled.len(),
                stats.entries - stats.skipped,
                stats.skipped
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::memory::{MemoryInput, MemoryOutput};
    use crate::error::FunctionError;
    use crate::value::Value;
    use serde_json::json;

    fn run(config: serde_json::Value, records: Vec<Record>) -> (Result<()>, MemoryOutput) {
        let config = config.as_object().cloned().unwrap();
        let mut input = MemoryInput::with_records(records);
        let mut output = MemoryOutput::new();
        let result = DeriveFields.execute(&mut input, &mut output, &config);
        (result, output)
    }

    #[test]
    fn test_rules_chain_in_order() {
        let (result, output) = run(
            json!({
                "rules": [
                    {"jsExpression": "first + ' ' + last", "outputField": "fullName"},
                    {"jsExpression": "fullName.toUpperCase()", "outputField": "shout"},
                    {"jsExpression": "amount * 2", "outputField": "amount"}
                ]
            }),
            vec![Record::new()
                .with("first", "Ada")
                .with("last", "Lovelace")
                .with("amount", 21i64)],
        );

        result.unwrap();
        let record = &output.records("default")[0];
        assert_eq!(record.get("fullName"), Some(&Value::from("Ada Lovelace")));
        assert_eq!(record.get("shout"), Some(&Value::from("ADA LOVELACE")));
        assert_eq!(record.get("amount"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_average_keeps_fraction() {
        let (result, output) = run(
            json!({
                "rules": [
                    {"jsExpression": "total / count", "outputField": "average"},
                    {"jsExpression": "total / 0", "outputField": "unbounded"}
                ]
            }),
            vec![Record::new().with("total", 7i64).with("count", 2i64)],
        );

        result.unwrap();
        let record = &output.records("default")[0];
        assert_eq!(record.get("average"), Some(&Value::Float(3.5)));
        assert_eq!(record.get("unbounded"), Some(&Value::Float(f64::INFINITY)));
    }

    #[test]
    fn test_title_case_and_null_result() {
        let (result, output) = run(
            json!({
                "rules": [
                    {"jsExpression": "name.toTitleCase()", "outputField": "name"},
                    {"jsExpression": "parseInt(code)", "outputField": "code"}
                ]
            }),
            vec![Record::new().with("name", "jOHN smith").with("code", "n/a")],
        );

        result.unwrap();
        let record = &output.records("default")[0];
        assert_eq!(record.get("name"), Some(&Value::from("John Smith")));
        assert_eq!(record.get("code"), Some(&Value::Null));
    }

    #[test]
    fn test_evaluation_fault_aborts() {
        let (result, output) = run(
            json!({"rules": [{"jsExpression": "missing + 1", "outputField": "x"}]}),
            vec![Record::new().with("a", 1i64)],
        );

        assert!(matches!(result, Err(FunctionError::Script { .. })));
        assert_eq!(output.total_records(), 0);
        assert_eq!(output.close_count(), 1);
    }
}
