//! Request/response channels between execution contexts.
//!
//! Every request carries its own oneshot reply sender. A listener that does
//! not handle a request simply drops the sender, which the caller observes as
//! "no response".

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// Nobody is listening on the other side; the context was never loaded or
    /// has gone away.
    #[error("receiving end does not exist")]
    Disconnected,
}

#[derive(Debug)]
pub struct Envelope<Req, Resp> {
    pub message: Req,
    pub reply: oneshot::Sender<Resp>,
}

impl<Req, Resp> Envelope<Req, Resp> {
    pub fn respond(self, response: Resp) {
        // the requester may have gone away; nothing to do then
        let _ = self.reply.send(response);
    }
}

#[derive(Debug)]
pub struct Port<Req, Resp> {
    sender: mpsc::Sender<Envelope<Req, Resp>>,
}

impl<Req, Resp> Clone for Port<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

pub type Inbox<Req, Resp> = mpsc::Receiver<Envelope<Req, Resp>>;

pub fn channel<Req, Resp>(capacity: usize) -> (Port<Req, Resp>, Inbox<Req, Resp>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (Port { sender }, receiver)
}

impl<Req, Resp> Port<Req, Resp> {
    /// Sends one request and waits for its single reply. `Ok(None)` means the
    /// listener received the request but never answered.
    pub async fn request(&self, message: Req) -> Result<Option<Resp>, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope { message, reply })
            .await
            .map_err(|_| BridgeError::Disconnected)?;
        Ok(response.await.ok())
    }
}
