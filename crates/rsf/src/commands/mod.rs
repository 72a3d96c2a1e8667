pub mod build;
pub mod extract;
pub mod info;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Extract an RSF file into a directory
    Extract(extract::ExtractArgs),
    /// Build an RSF file from a directory
    Build(build::BuildArgs),
    /// Show the header and directories of an RSF file
    Info(info::InfoArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Extract(extract) => extract.handle(),
            Commands::Build(build) => build.handle(),
            Commands::Info(info) => info.handle(),
        }
    }
}
