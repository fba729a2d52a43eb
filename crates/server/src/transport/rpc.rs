//! tarpc transport for the pitchmap server
//!
//! JSON over length-delimited TCP frames.

use futures::prelude::*;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Json;
use tokio::net::TcpListener;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{error, info};

use crate::handler::Handler;
use crate::protocol::{PitchmapService, PitchmapServiceClient};

/// Run the tarpc RPC server until `shutdown` resolves.
pub async fn run_server(
    listener: TcpListener,
    handler: Handler,
    mut shutdown: impl Future<Output = ()> + Unpin + Send + 'static,
) -> anyhow::Result<()> {
    info!("pitchmap RPC server listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((socket, peer)) => {
                        let server = handler.clone();
                        tokio::spawn(async move {
                            let framed = Framed::new(socket, LengthDelimitedCodec::new());
                            let transport = tarpc::serde_transport::new(framed, Json::default());

                            server::BaseChannel::with_defaults(transport)
                                .execute(server.serve())
                                .for_each(|response| async move {
                                    tokio::spawn(response);
                                })
                                .await;
                            tracing::debug!("RPC connection from {} closed", peer);
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping RPC server...");
                break;
            }
        }
    }

    Ok(())
}

/// Connect a client over the same framing as [`run_server`].
pub async fn connect(
    addr: impl tokio::net::ToSocketAddrs,
) -> anyhow::Result<PitchmapServiceClient> {
    let socket = tokio::net::TcpStream::connect(addr).await?;
    let framed = Framed::new(socket, LengthDelimitedCodec::new());
    let transport = tarpc::serde_transport::new(framed, Json::default());
    Ok(PitchmapServiceClient::new(tarpc::client::Config::default(), transport).spawn())
}
