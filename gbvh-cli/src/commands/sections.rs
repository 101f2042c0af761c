use anyhow::{Context, bail};
use gbvh_core::{Lvb, Registry};
use std::path::Path;

pub fn run(input: &Path, tag: Option<&str>, compact: bool) -> anyhow::Result<()> {
    let registry = Registry::builtin();
    let lvb = Lvb::open(input, &registry).with_context(|| format!("failed to read {}", input.display()))?;
    tracing::info!(version = lvb.version, sections = lvb.sections.len(), game = ?lvb.game(), "read level file");

    let json = match tag {
        None => lvb.to_json(!compact)?,
        Some(tag) => {
            let Ok(key) = <[u8; 4]>::try_from(tag.as_bytes()) else {
                bail!("section tag must be 4 bytes, got {tag:?}");
            };
            let Some(section) = lvb.section(key) else {
                bail!("no {tag} section in {}", input.display());
            };
            section.to_json(!compact)?
        }
    };

    println!("{json}");
    Ok(())
}
