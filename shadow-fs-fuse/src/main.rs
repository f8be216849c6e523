use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use backing_dev::BackingDevice;
use clap::Parser;
use shadow_fs::{Geometry, ShadowFileSystem};
use shadow_fs_fuse::{Cli, ContextLog, HostDir, Shell};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if !cli.allow_root && running_as_root() {
        eprintln!("Running as root opens unacceptable security holes, pass --allow-root to insist");
        std::process::exit(1);
    }

    let geometry =
        Geometry::new(cli.inodes, cli.data_blocks, cli.block_size).map_err(io::Error::other)?;
    let host_dir = HostDir::new(&cli.root_dir)?;
    log::info!("root_dir={:?} log_file={:?}", host_dir.root(), cli.log_file);

    let device: Arc<dyn BackingDevice> = Arc::new(host_dir);
    let fs = ShadowFileSystem::mount(geometry, device);
    let mut shell = Shell::new(fs, ContextLog::create(&cli.log_file)?);

    let mut stdout = io::stdout().lock();
    match &cli.script {
        Some(script) => shell.run(BufReader::new(File::open(script)?), &mut stdout)?,
        None => shell.run(io::stdin().lock(), &mut stdout)?,
    }

    let (fs, _) = shell.into_inner();
    let dump = fs.unmount();
    log::info!("unmounted with {} tracked files", dump.paths.len());

    Ok(())
}

fn running_as_root() -> bool {
    // SAFETY: getuid/geteuid 总是成功，没有副作用
    unsafe { libc::getuid() == 0 || libc::geteuid() == 0 }
}
