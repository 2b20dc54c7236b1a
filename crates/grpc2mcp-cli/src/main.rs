use clap::Parser;

/// Runs a gRPC front end that translates calls into JSON-RPC against an
/// upstream MCP server.
#[derive(Parser, Debug)]
#[command(name = "grpc2mcp", version, about)]
struct Args {
    /// Base URL of the upstream MCP server, e.g. http://localhost:8000/mcp
    #[arg(long)]
    upstream: String,

    /// Port to listen on; 0 picks an ephemeral port.
    #[arg(long, default_value_t = 50051)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let handle = grpc2mcp_proxy::start_async(args.upstream, args.port).await?;
    tracing::info!(addr = %handle.addr(), "grpc2mcp listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.shutdown().await;

    Ok(())
}
