use tokio::{
    sync::mpsc::{Receiver, Sender},
    task::JoinHandle,
};

use crate::{
    constants::{RES_TX_ERR, RUN_TX_ERR},
    core::domain::SubmissionEvent,
    models::{MsgToHandle, MsgToRes, SubmissionInCh},
    transport::protocol::parse_submission,
};

/// Turns raw lines into submissions. Anything that does not validate is
/// answered with an error and never reaches the judge.
pub fn handle_messages(
    res_tx: Sender<MsgToRes>,
    run_tx: Sender<SubmissionInCh>,
    mut msg_handle_rx: Receiver<MsgToHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = msg_handle_rx.recv().await {
            match parse_submission(&msg.text) {
                Ok(submission) => {
                    tracing::info!(
                        "Submission {} from {} with {} tests",
                        submission.id,
                        msg.conn_id,
                        submission.tests.len()
                    );
                    run_tx
                        .send(SubmissionInCh::new(msg.conn_id, submission))
                        .await
                        .expect(RUN_TX_ERR);
                }
                Err(e) => {
                    tracing::info!("Rejected message from {}: {}", msg.conn_id, e);
                    res_tx
                        .send(MsgToRes::new(
                            msg.conn_id,
                            SubmissionEvent::Failed { msg: e.to_string() },
                        ))
                        .await
                        .expect(RES_TX_ERR);
                }
            }
        }
    })
}
