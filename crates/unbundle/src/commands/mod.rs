use std::{fs::File, io::BufReader, path::Path};

use miette::{Context, IntoDiagnostic, Result};
use unity_bundle::Bundle;

pub mod dump;
pub mod list;
pub mod textures;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// List the entries and objects of a bundle
    List(list::ListArgs),
    /// Print decoded objects as JSON
    Dump(dump::DumpArgs),
    /// Decode every texture of a bundle into PNG files
    Textures(textures::TexturesArgs),
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::List(list) => list.handle(),
            Commands::Dump(dump) => dump.handle(),
            Commands::Textures(textures) => textures.handle(),
        }
    }
}

fn open_bundle(path: &Path) -> Result<Bundle> {
    let f = File::open(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))?;

    Ok(Bundle::from_reader(BufReader::new(f))?)
}
