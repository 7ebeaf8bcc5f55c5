use super::{Demuxer, ReadSample};
use crate::es::Sample;
use crate::ts::TsPacketReader;
use crate::{ErrorKind, Result};
use crossbeam::channel::{self, Receiver};
use std::io::Read;
use std::thread::{self, JoinHandle};

/// Starts a demultiplexing session on a background thread.
///
/// Samples are handed over one at a time: the thread blocks until the previous
/// sample has been received. The session stops at the end of `stream`,
/// on the first error, or when the returned `SampleReceiver` is dropped.
pub fn spawn<R>(stream: R) -> SampleReceiver
where
    R: Read + Send + 'static,
{
    let (tx, rx) = channel::bounded(0);
    let handle = thread::spawn(move || -> Result<()> {
        let mut demuxer = Demuxer::new(TsPacketReader::new(stream));
        while let Some(sample) = track!(demuxer.read_sample())? {
            if tx.send(sample).is_err() {
                debug!("Sample receiver has been dropped");
                break;
            }
        }
        Ok(())
    });
    SampleReceiver { rx, handle }
}

/// Receiving side of a session started by `spawn`.
#[derive(Debug)]
pub struct SampleReceiver {
    rx: Receiver<Sample>,
    handle: JoinHandle<Result<()>>,
}
impl SampleReceiver {
    /// Receives the next sample.
    ///
    /// Returns `None` once the session has terminated.
    pub fn recv(&self) -> Option<Sample> {
        self.rx.recv().ok()
    }

    /// Stops receiving and waits for the session thread.
    ///
    /// Returns the error that terminated the session, if any.
    pub fn finish(self) -> Result<()> {
        let SampleReceiver { rx, handle } = self;
        drop(rx);
        match handle.join() {
            Ok(result) => track!(result),
            Err(_) => track_panic!(ErrorKind::Other, "Demultiplexing thread panicked"),
        }
    }
}
impl Iterator for SampleReceiver {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}
