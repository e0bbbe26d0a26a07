use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use crate::data::loader::{ReadOptions, Sources};

// ---------------------------------------------------------------------------
// Command line / environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Parser)]
#[command(name = "recharge-board")]
#[command(about = "Prepaid meter recharges by locality", long_about = None)]
pub struct Cli {
    /// Meter inventory, one column per locality
    #[arg(long, env = "RECHARGE_BOARD_INVENTORY", default_value = "Classeur1.xlsx")]
    pub inventory: PathBuf,

    /// Recharge journal (serial, amount, optional date)
    #[arg(long, env = "RECHARGE_BOARD_RECHARGES", default_value = "recharge1.xlsx")]
    pub recharges: PathBuf,

    /// Optional meter coordinates (serial, latitude, longitude)
    #[arg(long, env = "RECHARGE_BOARD_LOCATIONS")]
    pub locations: Option<PathBuf>,

    /// CSV field delimiter
    #[arg(short, long, env = "RECHARGE_BOARD_DELIMITER", default_value_t = ',')]
    pub delimiter: char,

    /// Seconds before the source files are read again
    #[arg(long, env = "RECHARGE_BOARD_CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,

    /// Currency label for amounts
    #[arg(long, env = "RECHARGE_BOARD_CURRENCY", default_value = "XAF")]
    pub currency: String,

    /// Number of bins in the amount histogram
    #[arg(long, env = "RECHARGE_BOARD_HISTOGRAM_BINS", default_value_t = 30)]
    pub histogram_bins: usize,
}

// ---------------------------------------------------------------------------
// Capabilities – optional features, decided once at startup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Map of meter positions in the details view.
    pub map: bool,
}

impl Capabilities {
    pub fn detect() -> Self {
        Self {
            map: cfg!(feature = "map"),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings – validated configuration handed to the app
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sources: Sources,
    pub read_options: ReadOptions,
    pub cache_ttl: Duration,
    pub currency: String,
    pub histogram_bins: usize,
    pub capabilities: Capabilities,
}

impl Settings {
    pub fn from_cli(cli: Cli, capabilities: Capabilities) -> Result<Self> {
        if !cli.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got '{}'", cli.delimiter);
        }
        if cli.histogram_bins == 0 {
            bail!("histogram bins must be at least 1");
        }

        Ok(Self {
            sources: Sources {
                inventory: cli.inventory,
                recharges: cli.recharges,
                locations: cli.locations,
            },
            read_options: ReadOptions {
                delimiter: cli.delimiter as u8,
            },
            cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
            currency: cli.currency,
            histogram_bins: cli.histogram_bins,
            capabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_workbook_exports() {
        let cli = Cli::try_parse_from(["recharge-board"]).unwrap();
        let settings = Settings::from_cli(cli, Capabilities { map: true }).unwrap();
        assert_eq!(settings.sources.inventory, PathBuf::from("Classeur1.xlsx"));
        assert_eq!(settings.sources.recharges, PathBuf::from("recharge1.xlsx"));
        assert_eq!(settings.sources.locations, None);
        assert_eq!(settings.cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.read_options.delimiter, b',');
        assert_eq!(settings.histogram_bins, 30);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "recharge-board",
            "--inventory",
            "inv.parquet",
            "-d",
            ";",
            "--cache-ttl-secs",
            "5",
            "--locations",
            "gps.csv",
        ])
        .unwrap();
        let settings = Settings::from_cli(cli, Capabilities { map: false }).unwrap();
        assert_eq!(settings.read_options.delimiter, b';');
        assert_eq!(settings.cache_ttl, Duration::from_secs(5));
        assert_eq!(settings.sources.locations, Some(PathBuf::from("gps.csv")));
        assert!(!settings.capabilities.map);
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let cli = Cli::try_parse_from(["recharge-board", "--delimiter", "§"]).unwrap();
        assert!(Settings::from_cli(cli, Capabilities::detect()).is_err());
    }

    #[test]
    fn map_capability_follows_the_build() {
        assert_eq!(Capabilities::detect().map, cfg!(feature = "map"));
    }
}
