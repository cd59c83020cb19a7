use clap::Args;
use miette::{miette, IntoDiagnostic, Result};
use serde_json::json;
use std::{
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::warn;
use unity_bundle::{ObjectInfo, SerializedFile};

use super::open_bundle;

#[derive(Args)]
pub struct DumpArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only dump the object with this path id
    #[arg(long, value_name = "ID", allow_hyphen_values = true)]
    path_id: Option<i64>,

    /// Leave out the declared type and byte order of every field
    #[arg(long, default_value_t = false)]
    plain: bool,
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = open_bundle(&self.file)?;
        let mut out = BufWriter::new(std::io::stdout().lock());

        let mut found = false;
        for file in bundle.files() {
            let objects: Vec<&ObjectInfo> = match self.path_id {
                Some(path_id) => file.object(path_id).into_iter().collect(),
                None => file.objects.values().collect(),
            };

            for object in objects {
                found = true;
                let value = match self.decode(file, object) {
                    Ok(value) => value,
                    Err(error) => {
                        warn!(
                            file = %file.name,
                            path_id = object.path_id,
                            "skipping object: {error}"
                        );
                        continue;
                    }
                };

                let record = json!({
                    "file": file.name,
                    "path_id": object.path_id,
                    "type": file.object_type(object),
                    "value": value,
                });
                serde_json::to_writer_pretty(&mut out, &record).into_diagnostic()?;
                writeln!(out).into_diagnostic()?;
            }
        }
        out.flush().into_diagnostic()?;

        match self.path_id {
            Some(path_id) if !found => Err(miette!("no object with path id {path_id}")),
            _ => Ok(()),
        }
    }

    fn decode(&self, file: &SerializedFile, object: &ObjectInfo) -> Result<serde_json::Value> {
        let value = if self.plain {
            serde_json::to_value(file.decode_plain(object)?)
        } else {
            serde_json::to_value(file.decode(object)?)
        };

        value.into_diagnostic()
    }
}
