//! nvstore CLI
//!
//! Command-line access to an nvstore manager and its volume.
//!
//! # Commands
//!
//! - `init`, `save`, `restore`, `check`, `remove`, `erase` - the store contract
//! - `mount`, `ls`, `cat`, `lines`, `cp`, `mv`, `rm`, `mkdir` - volume files
//! - `record get`, `record set` - positional record access

mod commands;

use clap::{Parser, Subcommand};
use nvstore_core::{BackendConfig, KvConfig, RecordConfig, StorageManager, StoreConfig};
use nvstore_kv::ValueType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// nvstore command-line storage tools.
#[derive(Parser)]
#[command(name = "nvstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON store configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Store name (key-value namespace)
    #[arg(global = true, short, long)]
    name: Option<String>,

    /// Use the key-value backend with partition images in this directory
    #[arg(global = true, long, conflicts_with = "root")]
    kv_dir: Option<PathBuf>,

    /// Use the record backend on a volume mounted at this directory
    #[arg(global = true, long)]
    root: Option<PathBuf>,

    /// Volume label
    #[arg(global = true, long)]
    label: Option<String>,

    /// Format the volume if it has no file system
    #[arg(global = true, long)]
    format_volume: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise the store
    Init,

    /// Save a typed value
    Save {
        /// Identifier
        id: String,
        /// Value type (u8, i8, u16, i16, u32, i32, u64, i64, string, blob)
        ty: ValueType,
        /// Value; blobs are hex
        value: String,
    },

    /// Restore a typed value
    Restore {
        /// Identifier
        id: String,
        /// Value type
        ty: ValueType,
        /// Capacity for strings and blobs, in bytes
        #[arg(long, default_value = "4000")]
        capacity: usize,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check whether an identifier has a value
    Check {
        /// Identifier
        id: String,
    },

    /// Remove one value
    Remove {
        /// Identifier
        id: String,
    },

    /// Remove every value of the store
    Erase {
        /// Erase the whole key-value partition instead of the namespace
        #[arg(long)]
        partition: bool,
    },

    /// Mount the volume and show its state
    Mount,

    /// List the files of a volume directory
    Ls {
        /// Directory, relative to the volume root
        dir: Option<PathBuf>,
    },

    /// Print a volume file line by line
    Cat {
        /// File, relative to the volume root
        path: PathBuf,
    },

    /// Count the lines of a volume file
    Lines {
        /// File, relative to the volume root
        path: PathBuf,
    },

    /// Copy a volume file
    Cp {
        /// Source file
        src: PathBuf,
        /// Destination file
        dst: PathBuf,
    },

    /// Rename a volume file
    Mv {
        /// Source file
        src: PathBuf,
        /// Destination file
        dst: PathBuf,
    },

    /// Delete a volume file
    Rm {
        /// File, relative to the volume root
        path: PathBuf,
    },

    /// Create a volume directory
    Mkdir {
        /// Directory, relative to the volume root
        path: PathBuf,
    },

    /// Positional record access
    #[command(subcommand)]
    Record(RecordCommand),
}

#[derive(Subcommand)]
enum RecordCommand {
    /// Read bytes from a record
    Get {
        /// Identifier
        id: String,
        /// Byte offset
        #[arg(short, long, default_value = "0")]
        offset: u64,
        /// Number of bytes to read
        #[arg(short, long, default_value = "64")]
        len: usize,
    },

    /// Write bytes into a record
    Set {
        /// Identifier
        id: String,
        /// Data, as text
        data: String,
        /// Byte offset
        #[arg(short, long, default_value = "0")]
        offset: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = store_config(&cli)?;
    let manager = StorageManager::from_config(&config)?;

    match cli.command {
        Commands::Init => commands::kv::init(&manager)?,
        Commands::Save { id, ty, value } => commands::kv::save(&manager, &id, ty, &value)?,
        Commands::Restore {
            id,
            ty,
            capacity,
            format,
        } => commands::kv::restore(&manager, &id, ty, capacity, &format)?,
        Commands::Check { id } => commands::kv::check(&manager, &id)?,
        Commands::Remove { id } => commands::kv::remove(&manager, &id)?,
        Commands::Erase { partition } => commands::kv::erase(&manager, partition)?,
        Commands::Mount => commands::fs::mount(&manager)?,
        Commands::Ls { dir } => commands::fs::ls(&manager, &dir.unwrap_or_default())?,
        Commands::Cat { path } => commands::fs::cat(&manager, &path)?,
        Commands::Lines { path } => commands::fs::lines(&manager, &path)?,
        Commands::Cp { src, dst } => commands::fs::cp(&manager, &src, &dst)?,
        Commands::Mv { src, dst } => commands::fs::mv(&manager, &src, &dst)?,
        Commands::Rm { path } => commands::fs::rm(&manager, &path)?,
        Commands::Mkdir { path } => commands::fs::mkdir(&manager, &path)?,
        Commands::Record(RecordCommand::Get { id, offset, len }) => {
            commands::record::get(&manager, &id, offset, len)?;
        }
        Commands::Record(RecordCommand::Set { id, data, offset }) => {
            commands::record::set(&manager, &id, data.as_bytes(), offset)?;
        }
    }

    Ok(())
}

/// Builds the store configuration: the `--config` file if given, then the
/// command-line overrides.
fn store_config(cli: &Cli) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str::<StoreConfig>(&text)?
        }
        None if cli.kv_dir.is_none() && cli.root.is_none() => {
            return Err("one of --config, --kv-dir or --root is required".into());
        }
        None => StoreConfig::default(),
    };

    if let Some(name) = &cli.name {
        config.name.clone_from(name);
    }
    if let Some(dir) = &cli.kv_dir {
        let partition = match &config.backend {
            BackendConfig::KeyValue(kv) => kv.partition.clone(),
            BackendConfig::Records(_) => KvConfig::default().partition,
        };
        let kv = KvConfig::new().partition(partition).file_engine(dir);
        config.backend = BackendConfig::KeyValue(kv);
    }
    if let Some(root) = &cli.root {
        let mut records = match &config.backend {
            BackendConfig::Records(records) => records.clone(),
            BackendConfig::KeyValue(_) => RecordConfig::default(),
        };
        records.mount.root.clone_from(root);
        config.backend = BackendConfig::Records(records);
    }
    if let BackendConfig::Records(records) = &mut config.backend {
        if let Some(label) = &cli.label {
            records.mount.label.clone_from(label);
        }
        if cli.format_volume {
            records.mount.format_if_mount_failed = true;
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_selects_record_backend() {
        let cli =
            Cli::try_parse_from(["nvstore", "--root", "/mnt/fat", "--format-volume", "ls"])
                .unwrap();
        let config = store_config(&cli).unwrap();
        let BackendConfig::Records(records) = config.backend else {
            panic!("expected the record backend");
        };
        assert_eq!(records.mount.root, PathBuf::from("/mnt/fat"));
        assert!(records.mount.format_if_mount_failed);
    }

    #[test]
    fn kv_dir_selects_file_engine() {
        let cli = Cli::try_parse_from([
            "nvstore", "--kv-dir", "state", "--name", "app", "save", "boots", "u16", "3",
        ])
        .unwrap();
        let config = store_config(&cli).unwrap();
        assert_eq!(config.name, "app");
        assert_eq!(
            config.backend,
            BackendConfig::KeyValue(KvConfig::new().file_engine("state"))
        );
    }

    #[test]
    fn a_backend_is_required() {
        let cli = Cli::try_parse_from(["nvstore", "init"]).unwrap();
        assert!(store_config(&cli).is_err());
    }

    #[test]
    fn value_type_is_parsed() {
        let cli =
            Cli::try_parse_from(["nvstore", "--kv-dir", "s", "restore", "k", "blob"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Restore {
                ty: ValueType::Blob,
                ..
            }
        ));
    }
}
