use anyhow::Context;
use gbvh_core::ContainerFile;
use std::path::Path;

pub fn run(input: &Path) -> anyhow::Result<()> {
    let container = ContainerFile::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let maps = container.decode().with_context(|| format!("failed to decode {}", input.display()))?;
    tracing::debug!(maps = maps.len(), bytes = container.bytes().len(), "decoded container");

    println!("Container: {}", container.path().display());
    println!("Size:      {} bytes", container.bytes().len());
    println!("Maps:      {}", maps.len());

    if maps.is_empty() {
        return Ok(());
    }

    println!();
    println!("{:>6}  {:>8}  {:>8}  {:>6}", "map", "records", "leaves", "depth");
    for summary in gbvh_core::summarize(&maps) {
        let depth = summary.depth.map_or_else(|| "-".to_owned(), |d| d.to_string());
        println!("{:>6}  {:>8}  {:>8}  {:>6}", summary.map_id, summary.records, summary.leaves, depth);
    }
    Ok(())
}
