use std::sync::Arc;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpStream,
    sync::mpsc::{Receiver, Sender},
    task::JoinHandle,
};
use tokio_stream::{StreamExt, wrappers::LinesStream};

use crate::{
    constants::MSG_HANDLE_TX_ERR,
    models::MsgToHandle,
    transport::connection::{Connection, Sockets},
};

/// Splits every connection, registers its write half in `sockets` and
/// forwards each received line as one message.
///
/// Once the peer stops sending, the connection is dropped from `sockets`
/// right away if nothing is owed to it, otherwise by the responder after the
/// last reply.
pub fn read_sockets(
    sockets: Sockets,
    mut read_rx: Receiver<TcpStream>,
    msg_handle_tx: Sender<MsgToHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(socket) = read_rx.recv().await {
            let conn_id = uuid::Uuid::new_v4();

            let (read_half, write_half) = socket.into_split();
            let conn = Arc::new(Connection::new(write_half));
            sockets.insert(conn_id, conn.clone());

            let sockets = sockets.clone();
            let msg_handle_tx = msg_handle_tx.clone();
            tokio::spawn(async move {
                let mut lines = LinesStream::new(BufReader::new(read_half).lines());
                while let Some(line) = lines.next().await {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!("Failed to read from connection {}: {}", conn_id, e);
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    conn.request_received();
                    msg_handle_tx
                        .send(MsgToHandle::new(conn_id, &line))
                        .await
                        .expect(MSG_HANDLE_TX_ERR);
                }

                if conn.reading_stopped() {
                    sockets.remove(&conn_id);
                    tracing::debug!("Connection {} closed", conn_id);
                } else {
                    tracing::debug!("Connection {} stopped sending", conn_id);
                }
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dashmap::DashMap;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::TcpListener,
        sync::mpsc,
    };

    use super::*;
    use crate::{
        core::domain::SubmissionEvent, models::MsgToRes, transport::responding::respond,
    };

    async fn wait_until_empty(sockets: &Sockets) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !sockets.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{} connections still registered", sockets.len()));
    }

    #[tokio::test]
    async fn test_closed_connections_are_forgotten() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sockets: Sockets = Arc::new(DashMap::new());
        let (read_tx, read_rx) = mpsc::channel(16);
        let (msg_handle_tx, _msg_handle_rx) = mpsc::channel(16);
        read_sockets(sockets.clone(), read_rx, msg_handle_tx);

        for _ in 0..50 {
            let client = TcpStream::connect(addr).await.unwrap();
            let (server_side, _) = listener.accept().await.unwrap();
            read_tx.send(server_side).await.unwrap();
            drop(client);
        }

        wait_until_empty(&sockets).await;
    }

    #[tokio::test]
    async fn test_half_closed_connection_gets_its_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sockets: Sockets = Arc::new(DashMap::new());
        let (read_tx, read_rx) = mpsc::channel(16);
        let (msg_handle_tx, mut msg_handle_rx) = mpsc::channel(16);
        let (res_tx, res_rx) = mpsc::channel(16);
        read_sockets(sockets.clone(), read_rx, msg_handle_tx);
        respond(sockets.clone(), res_rx);

        let client = TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        read_tx.send(server_side).await.unwrap();

        let (client_read, mut client_write) = client.into_split();
        client_write.write_all(b"hello\n").await.unwrap();
        client_write.shutdown().await.unwrap();

        let msg = msg_handle_rx.recv().await.unwrap();
        assert_eq!(msg.text, "hello");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sockets.len(), 1);

        res_tx
            .send(MsgToRes::new(msg.conn_id, SubmissionEvent::Running))
            .await
            .unwrap();
        res_tx
            .send(MsgToRes::new(
                msg.conn_id,
                SubmissionEvent::Failed {
                    msg: "rejected".to_string(),
                },
            ))
            .await
            .unwrap();

        let mut lines = BufReader::new(client_read).lines();
        assert!(lines.next_line().await.unwrap().unwrap().contains("running"));
        assert!(lines.next_line().await.unwrap().unwrap().contains("rejected"));
        wait_until_empty(&sockets).await;
    }
}
