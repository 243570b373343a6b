//! Create a volume and export it to an iSCSI initiator.

use std::process::ExitCode;

use clap::Parser;
use targetd_utils::cli::{self, ConnectionArgs, InitiatorArgs};
use targetd_utils::{ExportSpec, VolumeSpec, create_lun};

#[derive(Parser, Debug)]
#[command(name = "create-lun")]
#[command(about = "Create a volume on a targetd pool and export it to an iSCSI initiator")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The pool to create the LUN from
    #[arg(long)]
    pool: String,

    /// The name of the volume to create
    #[arg(long)]
    name: String,

    /// The size of the LUN to create (in bytes)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    size: u64,

    /// The LUN number to export
    #[arg(long)]
    lun: u32,

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

    let volume = VolumeSpec {
        pool: args.pool.clone(),
        name: args.name.clone(),
        size_bytes: args.size,
    };
    let export = ExportSpec {
        pool: args.pool,
        volume_name: args.name,
        lun: args.lun,
        initiator_wwn,
    };

    let result = create_lun(&mut session, &volume, &export).await;
    ExitCode::from(cli::finish(result, |()| {
        println!(
            "Created Volume - Pool:{} - Name:{} - Size:{} - Initiator:{} - LUN:{}",
            volume.pool, volume.name, volume.size_bytes, export.initiator_wwn, export.lun
        );
    }))
}
