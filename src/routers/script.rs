//! Scripted record router (`splitOnFieldJS`).

use super::ConditionRouterConfig;
use crate::config::{self, ConfigMap};
use crate::dataflow::{drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter};
use crate::error::Result;
use crate::script::ScriptEngine;

/// Routes records with boolean expressions evaluated against their fields.
#[derive(Debug, Default)]
pub struct ScriptRouter;

impl ScriptRouter {
    pub const KEY: &'static str = "splitOnFieldJS";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "Split Data by Field - JS",
            "Splits the input data using Javascript for conditions/rules",
            "Data",
        )
    }
}

impl Function for ScriptRouter {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |output| {
            let parsed = ConditionRouterConfig::from_config(config)?;
            let policy = config::error_policy(config)?;

            let mut engine = ScriptEngine::new();
            let routes = parsed.compile(&mut engine)?;

            let stats = drain_input(input, policy, |entry| {
                let record = entry.into_record()?;
                let port = routes.select(|script| engine.test_record(script, &record))?;
                output.write_record(port, record)
            })?;

            tracing::info!(
                "splitOnFieldJS: routed {} records over {} rules ({} skipped)",
                stats.entries - stats.skipped,
                routes.len(),
                stats.skipped
            );
            Ok(())
        })
    }
}
