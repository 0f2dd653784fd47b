//! Backend compute context and execution stream abstractions
//!
//! The host engine owns scheduling: it hands the plugin an execution stream
//! at enqueue time and expects the call to return once the work is queued,
//! not once it has finished. The backend context stands in for the vendor
//! numeric handle (a cuBLAS-style resource) that the plugin acquires at
//! `initialize` and releases at `terminate`.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::dims::AxisDecomposition;
use crate::kernel;

/// Vendor compute-resource handle used to issue the operator's numeric work.
///
/// Owned exclusively by one plugin instance between `initialize` and
/// `terminate`. The `Arc` the plugin keeps is only cloned into jobs already
/// in flight on that instance's stream, never across instances.
pub trait BackendContext: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dispatch the hardmax kernel over a flattened (outer, axis, inner) shape.
    fn launch_hardmax(&self, input: &[f32], output: &mut [f32], dims: &AxisDecomposition);
}

/// Reference backend running the kernel on the host CPU.
#[derive(Debug, Default)]
pub struct HostBackend;

impl BackendContext for HostBackend {
    fn name(&self) -> &'static str {
        "host"
    }

    fn launch_hardmax(&self, input: &[f32], output: &mut [f32], dims: &AxisDecomposition) {
        kernel::hardmax(input, output, dims);
    }
}

/// Unit of work queued on an execution stream.
pub type StreamJob = Box<dyn FnOnce() + Send + 'static>;

/// Host-supplied execution queue.
///
/// `submit` must not block on job completion; `synchronize` blocks until
/// everything queued so far has run. There is no cancellation: once queued,
/// a job runs to completion or the stream is torn down with its owner.
pub trait ExecutionStream: Send {
    fn submit(&self, job: StreamJob);
    fn synchronize(&self);
}

enum StreamMessage {
    Job(StreamJob),
    Fence(mpsc::Sender<()>),
    Shutdown,
}

/// In-process execution stream backed by a single worker thread.
///
/// Jobs run strictly in submission order, which is the ordering guarantee a
/// device stream gives.
pub struct HostStream {
    sender: mpsc::Sender<StreamMessage>,
    worker: Option<JoinHandle<()>>,
}

impl HostStream {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<StreamMessage>();
        let worker = std::thread::spawn(move || {
            while let Ok(message) = receiver.recv() {
                match message {
                    StreamMessage::Job(job) => job(),
                    StreamMessage::Fence(ack) => {
                        let _ = ack.send(());
                    }
                    StreamMessage::Shutdown => break,
                }
            }
        });
        Self {
            sender,
            worker: Some(worker),
        }
    }
}

impl Default for HostStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStream for HostStream {
    fn submit(&self, job: StreamJob) {
        // A send failure means the worker is gone; the owner is tearing the
        // stream down and the job is dropped with it.
        let _ = self.sender.send(StreamMessage::Job(job));
    }

    fn synchronize(&self) {
        let (ack, done) = mpsc::channel();
        if self.sender.send(StreamMessage::Fence(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl Drop for HostStream {
    fn drop(&mut self) {
        let _ = self.sender.send(StreamMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Host-visible stand-in for a device-resident tensor buffer.
///
/// Buffers are shared between the caller and jobs in flight on the stream,
/// so element access goes through a lock. The host synchronizes the stream
/// before reading results, matching the device-memory contract.
#[derive(Debug)]
pub struct DeviceBuffer {
    data: Mutex<Vec<f32>>,
}

impl DeviceBuffer {
    pub fn from_vec(data: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(data),
        })
    }

    pub fn zeroed(len: usize) -> Arc<Self> {
        Self::from_vec(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the buffer contents back to the caller.
    pub fn to_vec(&self) -> Vec<f32> {
        self.guard().clone()
    }

    pub(crate) fn guard(&self) -> MutexGuard<'_, Vec<f32>> {
        match self.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
