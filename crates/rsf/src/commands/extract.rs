use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use rsf_archive::{error::Error, RsfArchive};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Component, Path, PathBuf},
};
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input RSF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory, defaults to the archive name
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// The palette used to colour bitmaps
    #[arg(short, long, value_name = "NAME", default_value = "TRUERGB.PAL")]
    palette: String,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

/// Archive names are used as path components, refuse anything that would leave the target
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let mut rsf = RsfArchive::new(BufReader::new(f))?;

        let directory = match &self.directory {
            Some(directory) => directory.clone(),
            None if is_plain_name(&rsf.header().name) => PathBuf::from(&rsf.header().name),
            None => return Err(miette!("archive has no usable name, pass a target directory")),
        };

        rsf.extract_with(&self.palette, |file, data| {
            if !is_plain_name(file.directory()) || !is_plain_name(file.name()) {
                return Err(Error::CustomError(format!(
                    "refusing to extract {}",
                    file.path()
                )));
            }

            let p = directory.join(file.directory()).join(file.name());
            info!("writing {}", p.display());

            std::fs::create_dir_all(directory.join(file.directory()))?;
            let mut out = if !self.overwrite {
                File::create_new(&p)
            } else {
                File::create(&p)
            }
            .map_err(|e| Error::CustomError(format!("creating {}: {}", p.display(), e)))?;

            out.write_all(data)?;
            Ok(())
        })
        .context(format!("extracting {}", &self.file.display()))?;

        Ok(())
    }
}
