//! Remove an iSCSI export and destroy its volume.

use std::process::ExitCode;

use clap::Parser;
use targetd_utils::cli::{self, ConnectionArgs, InitiatorArgs};
use targetd_utils::{DestroyLunSpec, destroy_lun};

#[derive(Parser, Debug)]
#[command(name = "destroy-lun")]
#[command(about = "Remove the iSCSI export of a targetd volume and destroy the volume")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The pool the volume lives in
    #[arg(long)]
    pool: String,

    /// The name of the volume to destroy
    #[arg(long)]
    name: String,

    #[command(flatten)]
    initiator: InitiatorArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut session = match cli::setup(&args.connection).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let initiator_wwn = match args.initiator.resolve().await {
        Ok(name) => name,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let spec = DestroyLunSpec {
        pool: args.pool,
        volume_name: args.name,
        initiator_wwn,
    };

    let result = destroy_lun(&mut session, &spec).await;
    ExitCode::from(cli::finish(result, |()| {
        println!(
            "Destroyed volume - Pool:{} - Name:{} - Initiator:{}",
            spec.pool, spec.volume_name, spec.initiator_wwn
        );
    }))
}
