//! Binds a `ModelContextProtocol` gRPC server in front of an upstream MCP
//! server (spec §4.9).

use std::net::SocketAddr;
use std::time::Duration;

use grpc2mcp_proto::model_context_protocol_server::ModelContextProtocolServer;
use grpc2mcp_proto::FILE_DESCRIPTOR_SET;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::interceptor::SessionLayer;
use crate::service::ProxyService;

/// Handle to a running server; dropping it does nothing, `shutdown` must
/// be called explicitly to begin the ~5s graceful drain (spec §6.2).
pub struct ShutdownHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl ShutdownHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.join).await;
    }
}

fn reflection_service() -> tonic_reflection::server::ServerReflectionServer<
    impl tonic_reflection::server::ServerReflection,
> {
    tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .expect("reflection service descriptor is malformed")
}

/// Starts the proxy on an ephemeral TCP port (port 0) or a caller-chosen
/// one, returning once it's ready to accept connections.
pub async fn start_async(upstream_url: String, port: u16) -> std::io::Result<ShutdownHandle> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    start_on_listener(listener, upstream_url).await
}

/// Starts the proxy on a caller-owned listener, letting tests bind an
/// ephemeral port up front and keep the address before the server task
/// is spawned.
pub async fn start_on_listener(
    listener: TcpListener,
    upstream_url: String,
) -> std::io::Result<ShutdownHandle> {
    let addr = listener.local_addr()?;
    let service = ProxyService::new(upstream_url);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let result = Server::builder()
            .layer(SessionLayer)
            .add_service(ModelContextProtocolServer::new(service))
            .add_service(reflection_service())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = shutdown_rx.await;
            })
            .await;

        if let Err(err) = result {
            tracing::error!(error = %err, "grpc server exited with an error");
        }
    });

    tracing::info!(%addr, "grpc2mcp proxy listening");

    Ok(ShutdownHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        join,
    })
}
