use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::{info, warn};
use unity_bundle::{ObjectInfo, SerializedFile};
use unity_texture::{RgbaImage, Texture2D, TextureDecoder};

use super::open_bundle;

#[derive(Args)]
pub struct TexturesArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting existing images
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl TexturesArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = open_bundle(&self.file)?;
        let decoder = TextureDecoder::default();

        std::fs::create_dir_all(&self.directory)
            .into_diagnostic()
            .context(format!("creating {}", self.directory.display()))?;

        let mut written = 0;
        for file in bundle.files() {
            let textures = file
                .objects
                .values()
                .filter(|object| file.object_type(object) == Some("Texture2D"));

            for object in textures {
                let (texture, image) = match decode(&decoder, file, object) {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        warn!(
                            file = %file.name,
                            path_id = object.path_id,
                            "skipping texture: {error}"
                        );
                        continue;
                    }
                };

                let name = if texture.name.is_empty() {
                    object.path_id.to_string()
                } else {
                    format!("{}_{}", sanitize(&texture.name), object.path_id)
                };
                let p = self.directory.join(format!("{name}.png"));
                info!("writing {}", p.display());

                self.write_png(&p, image)?;
                written += 1;
            }
        }

        info!("wrote {written} textures");
        Ok(())
    }

    fn write_png(&self, p: &std::path::Path, image: RgbaImage) -> Result<()> {
        let out = if !self.overwrite {
            File::create_new(p)
                .into_diagnostic()
                .context(format!("creating {}", p.display()))?
        } else {
            File::create(p)
                .into_diagnostic()
                .context(format!("creating {}", p.display()))?
        };

        let (width, height) = (image.width, image.height);
        let mut png = image::RgbaImage::from_raw(width, height, image.into_pixels())
            .ok_or_else(|| miette!("{width}x{height} image has the wrong number of pixels"))?;
        // rows are stored bottom first
        image::imageops::flip_vertical_in_place(&mut png);

        let mut out = BufWriter::new(out);
        png.write_to(&mut out, image::ImageFormat::Png)
            .into_diagnostic()
            .context(format!("encoding {}", p.display()))?;
        out.flush().into_diagnostic()?;

        Ok(())
    }
}

fn decode(
    decoder: &TextureDecoder,
    file: &SerializedFile,
    object: &ObjectInfo,
) -> Result<(Texture2D, RgbaImage)> {
    let value = file.decode(object)?;
    let texture = Texture2D::from_object(&value)?;
    let image = decoder.decode(&texture)?;

    Ok((texture, image))
}

/// Replace characters that cannot appear in file names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}
