use anyhow::Context;
use gbvh_core::PortableOptions;
use std::path::Path;

pub fn run(input: &Path, output: &Path, compact: bool, quiet: bool) -> anyhow::Result<()> {
    let options = PortableOptions { pretty: !compact };
    tracing::info!(input = %input.display(), output = %output.display(), "extracting container");
    let written = gbvh_core::extract(input, output, &options)
        .with_context(|| format!("failed to extract {}", input.display()))?;

    for (map_id, path) in &written {
        tracing::debug!(map_id, path = %path.display(), "wrote unit");
    }
    if !quiet {
        println!("Extracted {} map(s) to {}", written.len(), output.display());
    }
    Ok(())
}
