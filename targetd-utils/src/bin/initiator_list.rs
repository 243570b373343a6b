//! List the initiators known to the daemon.

use std::process::ExitCode;

use clap::Parser;
use targetd_utils::cli::{self, ConnectionArgs};
use targetd_utils::initiator_list;

#[derive(Parser, Debug)]
#[command(name = "initiator-list")]
#[command(about = "List the initiators known to a targetd daemon")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,
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

    let result = initiator_list(&mut session).await;
    ExitCode::from(cli::finish(result, |initiators| {
        println!("{:<10} {:<25}", "Type", "Initiator WWN");
        for initiator in initiators {
            println!("{:<10} {:<25}", initiator.init_type, initiator.init_id);
        }
    }))
}
