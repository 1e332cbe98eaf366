//! Settings inspection and initialization.

use anyhow::{Context, bail};
use clap::Args;
use spectap_config::{Settings, default_config_path, load_or_default};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default settings to the settings path
    #[arg(long)]
    init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    force: bool,
}

pub fn run(args: ConfigArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let path = config.map_or_else(default_config_path, Path::to_path_buf);

    if args.init {
        if path.exists() && !args.force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Settings::default()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote default settings to {}", path.display());
        return Ok(());
    }

    let settings = load_or_default(config)?;
    let source = if path.is_file() {
        path.display().to_string()
    } else {
        "built-in defaults".to_string()
    };
    println!("# {source}");
    print!("{}", settings.to_toml()?);
    Ok(())
}
