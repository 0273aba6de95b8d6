use std::path::Path;

use vigil_core::VigilConfig;

pub fn init(path: &Path) -> anyhow::Result<()> {
    let output = path.join("vigil.toml");
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    std::fs::create_dir_all(path)?;
    let config = VigilConfig::scaffold(path);
    std::fs::write(&output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
