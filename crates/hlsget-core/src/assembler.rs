//! Ordered concatenation of fetched segment files into one artifact.
//!
//! Byte-exact: the output is opened once and each segment's bytes are
//! appended in ascending numeric index order. No header rewriting, no
//! remuxing — requesting a different container only renames the file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Container;
use crate::manifest::segment_index;
use crate::pipeline::PipelineError;

/// The assembled output file.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub container: Container,
}

/// Concatenate `paths` into `<output_dir>/<output_filename>`, correcting
/// the filename's extension to match `container`.
///
/// The input order is never trusted: segments are re-sorted by the numeric
/// index embedded in their filenames, because playback depends on index
/// order, not arrival order. An empty input set is a hard error — an
/// all-failed batch must not produce a silently empty artifact.
pub fn assemble(
    paths: &[PathBuf],
    output_dir: &Path,
    output_filename: &str,
    container: Container,
) -> Result<Artifact> {
    if paths.is_empty() {
        return Err(PipelineError::NothingToAssemble.into());
    }

    let mut indexed: Vec<(usize, &PathBuf)> = Vec::with_capacity(paths.len());
    for path in paths {
        let index = segment_index(path).with_context(|| {
            format!("segment file {} has no numeric index in its name", path.display())
        })?;
        indexed.push((index, path));
    }
    indexed.sort_by_key(|(index, _)| *index);

    let output_path = container_corrected(output_dir, output_filename, container);
    tracing::info!(
        "combining {} segments into {}",
        indexed.len(),
        output_path.display()
    );

    let mut out = File::create(&output_path)
        .with_context(|| format!("create output file {}", output_path.display()))?;
    let mut size: u64 = 0;
    for (index, path) in &indexed {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read segment {} ({})", index, path.display()))?;
        out.write_all(&bytes)
            .with_context(|| format!("append segment {} to artifact", index))?;
        size += bytes.len() as u64;
    }
    out.flush()?;

    Ok(Artifact {
        path: output_path,
        size,
        container,
    })
}

/// `<output_dir>/<output_filename>` with the extension forced to the
/// container's. Contents are not transcoded; this is a rename only.
fn container_corrected(output_dir: &Path, output_filename: &str, container: Container) -> PathBuf {
    let mut name = PathBuf::from(output_filename);
    let had = name.extension().map(|e| e.to_os_string());
    name.set_extension(container.ext());
    if had.as_deref() != Some(std::ffi::OsStr::new(container.ext())) {
        tracing::info!(
            "output extension corrected to .{} (contents are concatenated as-is, not transcoded)",
            container.ext()
        );
    }
    output_dir.join(name)
}
