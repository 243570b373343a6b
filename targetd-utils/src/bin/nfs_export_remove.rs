//! Remove an NFS export of a filesystem volume.

use std::process::ExitCode;

use clap::Parser;
use targetd_utils::cli::{self, ConnectionArgs};
use targetd_utils::{NfsExportSpec, nfs_export_remove};

#[derive(Parser, Debug)]
#[command(name = "nfs-export-remove")]
#[command(about = "Remove the NFS export of a targetd filesystem volume")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The pool the filesystem lives in
    #[arg(long)]
    pool: String,

    /// The name of the exported filesystem
    #[arg(long)]
    name: String,

    /// The client the export allows mounts from
    #[arg(long, default_value = "*")]
    client: String,
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

    let spec = NfsExportSpec {
        client: args.client,
        pool: args.pool,
        name: args.name,
    };

    let result = nfs_export_remove(&mut session, &spec).await;
    ExitCode::from(cli::finish(result, |()| {
        println!(
            "Removed NFS export: Pool:{} - Name:{} - Client:{}",
            spec.pool, spec.name, spec.client
        );
    }))
}
