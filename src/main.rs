use anyhow::Result;
use clap::Parser;

use ballot_box::cli::commands::{
    exec::ExecCommand, init::InitCommand, replay::ReplayCommand, snapshot_store,
    status::StatusCommand,
};
use ballot_box::cli::{Cli, Commands};
use ballot_box::config::{config, log_env_file_status};
use ballot_box::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config()?;
    init_telemetry(&settings.observability)?;
    log_env_file_status();

    let store = snapshot_store(cli.state_file, &settings.storage);

    match cli.command {
        Commands::Init {
            admin,
            restrict_registration,
            force,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            InitCommand::new(store, settings.ballot.clone())
                .with_admin(admin)
                .with_restricted_registration(restrict_registration)
                .with_force(force)
                .execute()
                .await
        }),
        Commands::Exec { caller, action } => tokio::runtime::Runtime::new()?.block_on(async {
            ExecCommand::new(store, settings.ballot.clone(), caller, action.into_command())
                .execute()
                .await
        }),
        Commands::Replay { log, admin, save } => {
            tokio::runtime::Runtime::new()?.block_on(async {
                ReplayCommand::new(store, settings.ballot.clone(), log)
                    .with_admin(admin)
                    .with_save(save)
                    .execute()
                    .await
                    .map(|_| ())
            })
        }
        Commands::Status { caller } => tokio::runtime::Runtime::new()?.block_on(async {
            StatusCommand::new(store).with_caller(caller).execute().await
        }),
    }
}
