use calltrace_collector::Collector;
use calltrace_core::Format;
use calltrace_logging::DiagnosticsBuilder;
use clap::Parser;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "calltrace-collector", about = "Receive and print calltrace event streams")]
struct Cli {
    /// Address to listen on (host:port or Unix socket path)
    #[arg(long, default_value = "localhost:8080")]
    listen: String,
    /// Wire format of incoming streams (json, cbor, text, debug)
    #[arg(long, default_value = "json")]
    format: String,
    /// Log level for collector diagnostics (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Human readable diagnostics instead of JSONL
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = DiagnosticsBuilder::new()
        .with_level(&cli.log_level)
        .with_pretty(cli.pretty)
        .init();

    let format: Format = cli.format.parse()?;
    let collector = Collector::bind(&cli.listen, format).await?;
    println!("Socket server listening on {} ({format})", collector.local_addr());

    let (tx, mut rx) = mpsc::channel(1024);
    let server = tokio::spawn(collector.run(tx));

    let mut printed = 0u64;
    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => {
                    printed += 1;
                    println!("{record}");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(rx);
    server.await?;
    println!("Received {printed} messages");
    Ok(())
}
