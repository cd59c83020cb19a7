use clap::Args;
use itertools::Itertools;
use miette::Result;
use owo_colors::{OwoColorize, Stream::Stdout};
use std::path::PathBuf;

use super::open_bundle;

#[derive(Args)]
pub struct ListArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only print the number of objects of each type
    #[arg(long, default_value_t = false)]
    summary: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = open_bundle(&self.file)?;

        println!(
            "{} format {} ({})",
            bundle
                .signature()
                .if_supports_color(Stdout, |s| s.bold()),
            bundle.format(),
            bundle.header.generator_version
        );
        for entry in &bundle.entries {
            println!("  {:<48} {:>12} {:?}", entry.name, entry.size, entry.kind);
        }
        for (name, err) in bundle.failures() {
            println!(
                "  {} {name}: {err}",
                "unreadable".if_supports_color(Stdout, |s| s.red())
            );
        }

        for file in bundle.files() {
            println!();
            println!(
                "{} version {}, {} objects",
                file.name.if_supports_color(Stdout, |s| s.bold()),
                file.version(),
                file.objects.len()
            );

            if self.summary {
                let counts = file
                    .objects
                    .values()
                    .map(|object| file.object_type(object).unwrap_or("type unknown"))
                    .counts();
                for (type_name, count) in counts.into_iter().sorted() {
                    println!("  {count:>8} {type_name}");
                }
                continue;
            }

            for object in file.objects.values() {
                let class_id = file
                    .class_id(object)
                    .map_or_else(|| "?".to_owned(), |id| id.to_string());
                let type_name = match file.object_type(object) {
                    Some(name) => name.if_supports_color(Stdout, |s| s.green()).to_string(),
                    None => "type unknown"
                        .if_supports_color(Stdout, |s| s.yellow())
                        .to_string(),
                };
                println!(
                    "  {:>20} {:>6} {:<32} {:>10}",
                    object.path_id, class_id, type_name, object.byte_size
                );
            }
        }

        Ok(())
    }
}
