//! Message types passed between the tablet and the recognition worker.
//!
//! Uses std::sync::mpsc channels: the GUI thread sends snapshots, the worker
//! thread replies with outcomes tagged by the same ticket.

use image::GrayImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

use super::pipeline::RecognitionResult;

/// Shared flag telling an in-flight recognition to give up.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A surface snapshot waiting to be recognized.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Identifies which dispatch this is; replies carry it back
    pub ticket: u64,
    pub image: GrayImage,
    pub cancel: CancelToken,
}

/// The worker's answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionReply {
    pub ticket: u64,
    pub result: RecognitionResult,
}

/// Creates the request channel (tablet → worker).
pub fn create_request_queue() -> (Sender<RecognitionRequest>, Receiver<RecognitionRequest>) {
    channel()
}

/// Creates the reply channel (worker → tablet).
pub fn create_reply_queue() -> (Sender<RecognitionReply>, Receiver<RecognitionReply>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_request_queue_preserves_order() {
        let (sender, receiver) = create_request_queue();

        for ticket in 1..=3 {
            sender
                .send(RecognitionRequest {
                    ticket,
                    image: GrayImage::new(4, 4),
                    cancel: CancelToken::new(),
                })
                .expect("Failed to send");
        }

        for ticket in 1..=3 {
            assert_eq!(receiver.recv().unwrap().ticket, ticket);
        }
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_reply_queue();
        sender
            .send(RecognitionReply {
                ticket: 1,
                result: RecognitionResult::Recognized('A'),
            })
            .unwrap();

        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
