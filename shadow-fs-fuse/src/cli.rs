use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct Cli {
    /// Context log file, truncated on start
    #[arg(long, short)]
    pub log_file: PathBuf,

    /// Backing directory that stores the real file bytes
    #[arg(long, short)]
    pub root_dir: PathBuf,

    /// Number of inode slots
    #[arg(long, short)]
    pub inodes: usize,

    /// Number of data blocks
    #[arg(long, short = 'b')]
    pub data_blocks: usize,

    /// Size of one data block in bytes
    #[arg(long, short = 's')]
    pub block_size: usize,

    /// Read commands from this file instead of stdin
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Run even with root privileges
    #[arg(long)]
    pub allow_root: bool,
}
