//! Recognition worker thread.
//!
//! Runs in a separate thread, receiving surface snapshots from the request
//! queue and answering with recognition results. The engine lives for the
//! whole life of the thread.

use anyhow::{Context, Result, anyhow};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::pipeline::RecognitionPipeline;
use super::queue::{
    RecognitionReply, RecognitionRequest, create_reply_queue, create_request_queue,
};

/// Runs the recognition worker loop.
///
/// Processes requests until the request channel is closed (sender dropped)
/// or nobody listens for replies anymore, then terminates the engine.
pub fn run_recognition_worker(
    receiver: Receiver<RecognitionRequest>,
    replies: Sender<RecognitionReply>,
    mut pipeline: RecognitionPipeline,
) {
    crate::log("Recognition worker started");

    while let Ok(request) = receiver.recv() {
        crate::log(&format!(
            "Recognition worker: processing ticket {}",
            request.ticket
        ));

        let result = pipeline.recognize(&request.image, &request.cancel);

        crate::log(&format!(
            "Recognition worker: ticket {} -> {}",
            request.ticket, result
        ));

        let reply = RecognitionReply {
            ticket: request.ticket,
            result,
        };
        if replies.send(reply).is_err() {
            crate::log("Recognition worker: reply channel closed, exiting");
            break;
        }
    }

    pipeline.shutdown();
    crate::log("Recognition worker finished");
}

/// Handle owned by the GUI thread.
pub struct RecognitionWorker {
    sender: Option<Sender<RecognitionRequest>>,
    replies: Receiver<RecognitionReply>,
    handle: Option<JoinHandle<()>>,
}

impl RecognitionWorker {
    /// Spawns the worker thread around `pipeline`.
    pub fn spawn(pipeline: RecognitionPipeline) -> Result<Self> {
        let (sender, receiver) = create_request_queue();
        let (reply_sender, replies) = create_reply_queue();

        let handle = thread::Builder::new()
            .name("recognition-worker".to_string())
            .spawn(move || run_recognition_worker(receiver, reply_sender, pipeline))
            .context("Failed to spawn recognition worker")?;

        Ok(Self {
            sender: Some(sender),
            replies,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, request: RecognitionRequest) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or_else(|| anyhow!("Recognition worker is shut down"))?
            .send(request)
            .map_err(|_| anyhow!("Recognition worker is not running"))
    }

    /// Next finished reply, if any. Never blocks.
    pub fn try_recv(&self) -> Option<RecognitionReply> {
        self.replies.try_recv().ok()
    }

    /// Closes the queue and waits for the worker to finish its current item.
    pub fn shutdown(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                crate::log(&format!("Recognition worker thread panicked: {:?}", e));
            }
        }
    }
}

impl Drop for RecognitionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
