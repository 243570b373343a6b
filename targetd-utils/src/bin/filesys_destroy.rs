//! Destroy a filesystem volume.

use std::process::ExitCode;

use clap::Parser;
use targetd_utils::cli::{self, ConnectionArgs};
use targetd_utils::{FilesystemSpec, filesys_destroy};

#[derive(Parser, Debug)]
#[command(name = "filesys-destroy")]
#[command(about = "Destroy a targetd filesystem volume")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The pool the filesystem lives in
    #[arg(long)]
    pool: String,

    /// The name of the filesystem to destroy
    #[arg(long)]
    name: String,

    /// Client whose mounts are affected
    #[arg(long)]
    client: Option<String>,
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

    let spec = FilesystemSpec {
        pool: args.pool,
        name: args.name,
        client: args.client,
    };

    let result = filesys_destroy(&mut session, &spec).await;
    ExitCode::from(cli::finish(result, |()| {
        println!("Destroyed fs volume: Pool:{} - Name:{}", spec.pool, spec.name);
    }))
}
