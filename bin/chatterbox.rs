use chatterbox::{
    init_console_subscriber, init_tracing, Arguments, ConnectionOptions, Error, TcpSession,
};
use clap::{error::ErrorKind, Parser};
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{stdin, stdout};
use tracing::info;

fn main() -> ExitCode {
    let args = match Arguments::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!("{:#}", anyhow::Error::from(Error::from(e)));
            return ExitCode::FAILURE;
        }
    };

    match args.console {
        Some(addr) => init_console_subscriber(addr),
        None => init_tracing(args.verbose),
    }

    let options = ConnectionOptions::from(args);
    info!(%options, "Read options");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(chat(options));
    // The stdin reader may still be blocked on a line that will never be relayed.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn chat(options: ConnectionOptions) -> anyhow::Result<()> {
    info!("Connecting to {}", options.address());
    let mut session = TcpSession::connect(&options).await?;
    info!("Connected to server");

    let mut output = stdout();
    session.authenticate(&options, &mut output).await?;
    info!("Finished authentication");

    info!("Beginning chat streaming");
    session.stream(stdin(), &mut output).await;
    Ok(())
}
