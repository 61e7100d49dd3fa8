use clap::Parser;
use pg_backup_rotated::backup::backup_config::{
    default_config_locations, locate_config, Configuration, Overrides,
};
use pg_backup_rotated::backup::result_error::result::Result;
use pg_backup_rotated::backup::run_backup;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Dump every PostgreSQL database into a dated daily or weekly directory and expire old ones
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file, searched next to the executable, in the current directory
    /// and in /etc/pg_backup when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Database server host, overrides the config file
    #[arg(long)]
    hostname: Option<String>,
    /// Database user, overrides the config file
    #[arg(long)]
    username: Option<String>,
    /// Root backup directory, overrides the config file
    #[arg(long)]
    backup_dir: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    let path = locate_config(args.config.as_deref(), &default_config_locations())?;
    info!("Using config file {:?}", path);
    let config = Configuration::load(
        &path,
        Overrides {
            hostname: args.hostname,
            username: args.username,
            backup_dir: args.backup_dir,
        },
    )?;

    let backup = run_backup(&config)?;
    info!(
        "Backup finished: {} artifacts in {:?}",
        backup.artifacts().len(),
        backup.dir()
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
