use clap::Parser;
use log::{debug, error, info};

use kclone::{
    cli::{args::CliArgs, command_handlers},
    Kclone, KcloneError,
};

fn run() -> anyhow::Result<()> {
    let cli_args: CliArgs = CliArgs::parse();
    debug!("{:?}", cli_args);

    if let Some(directory) = cli_args.set_default {
        command_handlers::do_set_default(&directory)?;
        return Ok(());
    }

    let url = cli_args.url.ok_or(KcloneError::Usage)?;

    let mut builder = Kclone::builder().test_mode(cli_args.test);
    if let Some(directory) = cli_args.directory {
        builder = builder.workspace_root(directory);
    }
    let kclone = builder.try_build()?;

    let clone_path = kclone.clone(&url)?;

    info!("Repository cloned into {}", clone_path);
    println!();
    for hint in command_handlers::open_hints(&clone_path) {
        println!("    {hint}");
    }
    println!();

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
