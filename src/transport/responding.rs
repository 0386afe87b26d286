use tokio::{sync::mpsc::Receiver, task::JoinHandle};

use crate::{
    models::MsgToRes,
    transport::{connection::Sockets, protocol::ServerMessage},
};

/// Writes every reply as one JSON line to the connection it belongs to.
pub fn respond(sockets: Sockets, mut res_rx: Receiver<MsgToRes>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = res_rx.recv().await {
            let conn_id = msg.conn_id;
            let is_final = msg.event.is_final();
            let reply: ServerMessage = msg.event.into();
            tracing::debug!("Reply to {}: {:?}", conn_id, reply);

            let Some(conn) = sockets.get(&conn_id).map(|entry| entry.value().clone()) else {
                tracing::warn!("Socket not found for connection {}", conn_id);
                continue;
            };

            let written = match serde_json::to_string(&reply) {
                Ok(mut line) => {
                    line.push('\n');
                    conn.write_line(&line).await
                }
                Err(e) => {
                    tracing::error!("Failed to serialize reply: {}", e);
                    Ok(())
                }
            };

            if let Err(e) = written {
                tracing::warn!("Failed to write to connection {}: {}", conn_id, e);
                sockets.remove(&conn_id);
            } else if is_final && conn.request_answered() {
                sockets.remove(&conn_id);
                tracing::debug!("Connection {} closed", conn_id);
            }
        }
    })
}
