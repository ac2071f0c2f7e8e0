//! Scripted file router (`fileRouter`).

use super::ConditionRouterConfig;
use crate::config::{self, ConfigMap};
use crate::dataflow::{
    copy_into, drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter,
};
use crate::error::Result;
use crate::script::{FileInfo, ScriptEngine};

/// Routes whole files with boolean expressions over their file info.
///
/// Each file is copied byte for byte to the chosen port under its original
/// filename.
#[derive(Debug, Default)]
pub struct FileRouter;

impl FileRouter {
    pub const KEY: &'static str = "fileRouter";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "File Router",
            "Routes input files to different outputs based on certain conditions",
            "File",
        )
    }
}

impl Function for FileRouter {
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

            let mut bytes = 0;
            let stats = drain_input(input, policy, |entry| {
                let mut file = entry.into_file()?;
                let info = FileInfo::from(&file);
                let port = routes.select(|script| engine.test_file(script, &info))?;

                let size = copy_into(output, port, &info.filename, &mut file)?;
                tracing::debug!("Copied {} ({} bytes) to port {}", info.filename, size, port);
                bytes += size;
                Ok(())
            })?;

            tracing::info!(
                "fileRouter: routed {} files, {} bytes ({} skipped)",
                stats.entries - stats.skipped,
                bytes,
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
    use crate::dataflow::Entry;
    use crate::error::FunctionError;
    use crate::record::{FileEntry, Record};
    use serde_json::json;

    fn csv_router() -> ConfigMap {
        json!({
            "defaultOutputPort": "other",
            "rules": [
                {"jsCondition": "filename.toLowerCase().endsWith(\".csv\")", "outputPort": "csv"},
                {"jsCondition": "extension === 'txt'", "outputPort": "text"}
            ]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_route_by_filename() {
        let mut input = MemoryInput::with_entries(vec![
            Entry::from(FileEntry::from_bytes("REPORT.CSV", "a,b\n1,2\n")),
            Entry::from(FileEntry::from_bytes("notes.TXT", "hello")),
            Entry::from(FileEntry::from_bytes("image.png", vec![0u8, 159, 146, 150])),
        ]);
        let mut output = MemoryOutput::new();

        FileRouter.execute(&mut input, &mut output, &csv_router()).unwrap();

        assert_eq!(output.file("csv", "REPORT.CSV"), Some(&b"a,b\n1,2\n"[..]));
        assert_eq!(output.file("text", "notes.TXT"), Some(&b"hello"[..]));
        assert_eq!(output.file("other", "image.png"), Some(&[0u8, 159, 146, 150][..]));
        assert_eq!(output.close_count(), 1);
    }

    #[test]
    fn test_record_entry_rejected() {
        let mut input = MemoryInput::with_records(vec![Record::new()]);
        let mut output = MemoryOutput::new();

        let result = FileRouter.execute(&mut input, &mut output, &csv_router());
        assert!(matches!(result, Err(FunctionError::TypeMismatch { expected: "file", .. })));
        assert_eq!(output.close_count(), 1);
    }
}
