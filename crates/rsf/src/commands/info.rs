use clap::Args;
use itertools::Itertools;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use rsf_archive::RsfArchive;
use std::{fs::File, io::BufReader, path::PathBuf};

#[derive(Args)]
pub struct InfoArgs {
    /// An input RSF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let rsf = RsfArchive::new(BufReader::new(f))?;
        let header = rsf.header();

        println!("{}", header.license.bold());
        println!("{} {}", "name:".dimmed(), header.name);
        println!("{} {}", "version:".dimmed(), header.version);
        println!("{} {}", "timestamp:".dimmed(), header.timestamp);
        println!("{} {}", "file size:".dimmed(), header.file_size);
        println!(
            "{} {} {} {}",
            "directories:".dimmed(),
            header.directory_count,
            "files:".dimmed(),
            header.file_count
        );
        println!(
            "{} {}",
            "reserved:".dimmed(),
            header.reserved.iter().map(|v| format!("{v:#06x}")).join(" ")
        );

        for directory in rsf.directories() {
            println!(
                "\n{} ({} entries from {})",
                directory.name.green(),
                directory.count,
                directory.start
            );
            for file in rsf.files_in(directory) {
                println!(
                    "  {:<12} {:>14} {:>8} bytes at {:#x}",
                    file.name,
                    file.kind.to_string(),
                    file.size,
                    file.start
                );
            }
        }

        Ok(())
    }
}
