//! Work posted to a document from other threads.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Document;

type Job = Box<dyn FnOnce(&mut Document) + Send>;

/// A queue of closures to run against a document.
///
/// Cloning a mailbox is cheap; every clone feeds the same queue. The queue
/// is drained by [`Document::process_posted`].
#[derive(Clone, Default)]
pub struct Mailbox {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl Mailbox {
    /// Queue a closure to run on the thread owning the document.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce(&mut Document) + Send + 'static,
    {
        self.jobs.lock().push_back(Box::new(job));
    }

    /// Number of jobs waiting.
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Take the oldest job. The lock is released before the job runs, so
    /// jobs may post more jobs.
    pub(crate) fn pop(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("pending", &self.len()).finish()
    }
}
