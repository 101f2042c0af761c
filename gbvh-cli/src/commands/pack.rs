use anyhow::Context;
use gbvh_core::VolumeInsertion;
use std::path::Path;

pub fn run(input: &Path, output: &Path, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(input = %input.display(), output = %output.display(), "packing units");
    let bytes = gbvh_core::pack(input, output, &VolumeInsertion)
        .with_context(|| format!("failed to pack {}", input.display()))?;

    if !quiet {
        println!("Wrote {bytes} bytes to {}", output.display());
    }
    Ok(())
}
