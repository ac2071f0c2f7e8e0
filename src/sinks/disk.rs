//! Disk writer (`writeFileToDisk`).

use crate::config::{self, ConfigMap};
use crate::dataflow::{drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter};
use crate::error::{FunctionError, Result};
use crate::record::FileEntry;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Resolve `filename` inside `folder`.
///
/// Only plain relative names are accepted: absolute paths and `..`
/// components would escape the destination folder.
pub fn destination_path(folder: &Path, filename: &str) -> Result<PathBuf> {
    let relative = Path::new(filename);
    let plain = !filename.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if !plain {
        return Err(FunctionError::Unsupported(format!(
            "refusing to write '{}' outside the destination folder",
            filename
        )));
    }
    Ok(folder.join(relative))
}

/// Copy `file` to `<folder>/<filename>`, returning the bytes written.
pub fn write_file(folder: &Path, mut file: FileEntry) -> Result<u64> {
    let path = destination_path(folder, file.filename())?;
    let mut target = BufWriter::new(File::create(&path)?);
    let size = io::copy(&mut file, &mut target)?;
    target.flush()?;

    tracing::debug!("Wrote {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// Writes every input file into the destination folder.
#[derive(Debug, Default)]
pub struct WriteToDisk;

impl WriteToDisk {
    pub const KEY: &'static str = "writeFileToDisk";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "Write File to Disk",
            "Writes all input files into the destinationFolder",
            "File",
        )
    }
}

impl Function for WriteToDisk {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |_| {
            let folder = PathBuf::from(config::required_str(config, "destinationFolder")?);
            let policy = config::error_policy(config)?;

            let mut bytes = 0;
            let stats = drain_input(input, policy, |entry| {
                bytes += write_file(&folder, entry.into_file()?)?;
                Ok(())
            })?;

            tracing::info!(
                "writeFileToDisk: wrote {} files, {} bytes to {} ({} skipped)",
                stats.entries - stats.skipped,
                bytes,
                folder.display(),
                stats.skipped
            );
            Ok(())
        })
    }
}
