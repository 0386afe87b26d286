use tokio::{
    io,
    net::{TcpListener, TcpStream},
    sync::mpsc::Sender,
    task::JoinHandle,
};

use crate::constants::READ_TX_ERR;

pub async fn bind(addr: &str) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Judge listening on {}", listener.local_addr()?);
    Ok(listener)
}

pub fn accept_connections(
    read_tx: Sender<TcpStream>,
    listener: TcpListener,
) -> JoinHandle<io::Result<()>> {
    tokio::spawn(async move {
        loop {
            let (socket, peer) = listener.accept().await?;
            tracing::info!("Client connected: {}", peer);
            read_tx.send(socket).await.expect(READ_TX_ERR);
        }
    })
}
