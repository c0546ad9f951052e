use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lcaio_core::{Quantity, SectorMatching};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum QuantityArg {
    Production,
    Emissions,
    Impacts,
    /// Production, emissions and (when characterized) impacts from one solve.
    All,
}

impl QuantityArg {
    /// The single quantity to compute, `None` for `all`.
    pub fn single(self) -> Option<Quantity> {
        match self {
            QuantityArg::Production => Some(Quantity::Production),
            QuantityArg::Emissions => Some(Quantity::Emissions),
            QuantityArg::Impacts => Some(Quantity::Impacts),
            QuantityArg::All => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum MatchingArg {
    /// Same sector name in any region.
    Sector,
    /// Exact region+sector label only.
    RegionSector,
}

impl From<MatchingArg> for SectorMatching {
    fn from(arg: MatchingArg) -> Self {
        match arg {
            MatchingArg::Sector => SectorMatching::SectorOnly,
            MatchingArg::RegionSector => SectorMatching::RegionSector,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "lcaio",
    author,
    version,
    about = "Hybrid LCA/IO inventory engine",
    long_about = "Load foreground/background bundles and IO tables, hybridize foreground \
                  processes with IO sectors and compute lifecycle results."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file (fields of HybridizerConfig; missing fields default)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Metadata columns forming labels, e.g. `1` or `0,1,-1`
    #[arg(long, global = true, value_delimiter = ',', allow_hyphen_values = true)]
    pub label_columns: Option<Vec<isize>>,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log hybridization steps at info level
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute lifecycle production, emissions or impacts
    Lifecycle(LifecycleArgs),

    /// Convert a bundle between the binary container and JSON
    Convert(ConvertArgs),

    /// List the keys and shapes of a bundle
    Inspect(InspectArgs),
}

#[derive(Debug, Parser)]
pub struct LifecycleArgs {
    /// Bundle holding the foreground and background keys
    #[arg(long, value_name = "PATH")]
    pub bundle: PathBuf,

    /// Separate background bundle; defaults to `--bundle`
    #[arg(long, value_name = "PATH")]
    pub background: Option<PathBuf>,

    /// IO table (JSON) added to the background
    #[arg(long, value_name = "PATH")]
    pub io: Option<PathBuf>,

    /// IO categories (JSON object: name -> list of sector names)
    #[arg(long, value_name = "PATH")]
    pub categories: Option<PathBuf>,

    /// Hybridization records (JSON array), applied atomically in order
    #[arg(long, value_name = "PATH")]
    pub hybridize: Option<PathBuf>,

    /// Intrasector matching rule for hybridization
    #[arg(long, value_enum)]
    pub sector_matching: Option<MatchingArg>,

    #[arg(long, value_enum, default_value_t = QuantityArg::All)]
    pub quantity: QuantityArg,
}

#[derive(Debug, Parser)]
pub struct ConvertArgs {
    /// Source bundle (`.json` or binary)
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Destination bundle; format follows the extension
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// Bundle to inspect
    #[arg(long, value_name = "PATH")]
    pub bundle: PathBuf,
}
