use uuid::Uuid;

use crate::core::domain::{Submission, SubmissionEvent};

/// One line of text received from a connection.
#[derive(Debug, Clone)]
pub struct MsgToHandle {
    pub conn_id: Uuid,
    pub text: String,
}

impl MsgToHandle {
    pub fn new(conn_id: Uuid, text: &str) -> Self {
        MsgToHandle {
            conn_id,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionInCh {
    pub conn_id: Uuid,
    pub submission: Submission,
}

impl SubmissionInCh {
    pub fn new(conn_id: Uuid, submission: Submission) -> Self {
        SubmissionInCh {
            conn_id,
            submission,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MsgToRes {
    pub conn_id: Uuid,
    pub event: SubmissionEvent,
}

impl MsgToRes {
    pub fn new(conn_id: Uuid, event: SubmissionEvent) -> Self {
        MsgToRes { conn_id, event }
    }
}
