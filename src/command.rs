use clap::Subcommand;

pub mod demultiplex;
pub mod insertions;

pub use demultiplex::DemultiplexCMD;
pub use insertions::InsertionsCMD;

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    /// Split pooled reads into one FASTQ per sample by barcode
    Demultiplex(DemultiplexCMD),
    /// Count transposon junctions per barcode
    Insertions(InsertionsCMD),
}

impl Commands {
    pub fn try_execute(&mut self) -> anyhow::Result<()> {
        match self {
            Commands::Demultiplex(cmd) => cmd.try_execute(),
            Commands::Insertions(cmd) => cmd.try_execute(),
        }
    }
}
