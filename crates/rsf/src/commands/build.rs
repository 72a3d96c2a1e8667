use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use rsf_archive::{
    types::{check_field, Header},
    write::RsfWriterOptions,
    EntryKind, RowPadding, RsfWriter,
};
use std::{fs::File, io::Write, path::PathBuf, time::SystemTime};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Args)]
pub struct BuildArgs {
    /// An input directory, each subdirectory becomes a directory of the archive
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target RSF file, defaults to the directory name with an `.RSF` extension
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// The archive name stored in the header, defaults to the directory name
    #[arg(short, long)]
    name: Option<String>,

    /// Remove row padding from bitmaps whose width is not a multiple of 4
    #[arg(long, default_value_t = false)]
    strip_row_padding: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

fn modified(entry: &DirEntry) -> Option<SystemTime> {
    entry.metadata().ok().and_then(|m| m.modified().ok())
}

impl BuildArgs {
    pub fn handle(&self) -> Result<()> {
        let root = self
            .directory
            .canonicalize()
            .into_diagnostic()
            .context(format!("path: {}", &self.directory.display()))?;
        let root_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(miette!("unable to name archive after {}", root.display()))?
            .to_owned();

        let target = self
            .file
            .clone()
            .unwrap_or_else(|| root.with_file_name(format!("{root_name}.RSF")));
        if !self.overwrite && target.exists() {
            return Err(miette!(
                "{} already exists, pass --overwrite to replace it",
                target.display()
            ));
        }

        let name = self.name.clone().unwrap_or(root_name);
        check_field(&name, Header::NAME_LEN).context("choosing the archive name")?;

        // Entries are packed in modification time order
        let entries = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(2)
            .sort_by(|a, b| {
                modified(a)
                    .cmp(&modified(b))
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .into_diagnostic()?;

        if !entries.iter().any(|e| e.depth() == 1 && e.file_type().is_dir()) {
            return Err(miette!("directory has no subdirectories"));
        }

        let row_padding = if self.strip_row_padding {
            RowPadding::Strip
        } else {
            RowPadding::Keep
        };

        // Nothing touches the target until the whole archive has been encoded
        let mut rsf = RsfWriter::new(
            Vec::new(),
            RsfWriterOptions::builder()
                .name(name)
                .row_padding(row_padding)
                .build(),
        );

        for entry in entries {
            let path = entry.path();
            let name = entry
                .file_name()
                .to_str()
                .ok_or(miette!("unable to convert {} to a string", path.display()))?;

            if entry.depth() == 1 {
                if entry.file_type().is_dir() {
                    info!("reading directory {}", name);
                    rsf.start_directory(name)
                        .context(format!("starting directory {}", path.display()))?;
                } else {
                    warn!("skipping {}, files must be inside a directory", path.display());
                }
                continue;
            }

            if entry.file_type().is_dir() {
                warn!("skipping nested directory {}", path.display());
                continue;
            }

            let kind = EntryKind::from_extension(path);
            info!("packing {} as {}", path.display(), kind);

            rsf.start_file(name, kind)
                .context(format!("starting entry for {}", path.display()))?;

            let mut f = File::open(path)
                .into_diagnostic()
                .context(format!("opening {}", path.display()))?;

            std::io::copy(&mut f, &mut rsf)
                .into_diagnostic()
                .context(format!("copying {}", path.display()))?;
        }

        let archive = rsf.finish().context("finalizing rsf file")?;

        info!("writing {} bytes to {}", archive.len(), target.display());
        let mut out = if !self.overwrite {
            File::create_new(&target)
        } else {
            File::create(&target)
        }
        .into_diagnostic()
        .context(format!("creating {}", &target.display()))?;

        if let Err(e) = out.write_all(&archive) {
            drop(out);
            if let Err(cleanup) = std::fs::remove_file(&target) {
                warn!("unable to remove {}: {}", target.display(), cleanup);
            }
            return Err(e)
                .into_diagnostic()
                .context(format!("writing {}", &target.display()));
        }

        Ok(())
    }
}
