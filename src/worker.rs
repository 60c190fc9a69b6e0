use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Completed-call results, drained from the single-threaded side. The
/// queue is the only channel between workers and the event loop; no
/// engine cache ever crosses it.
pub struct CompletionQueue<T> {
    sender: Sender<anyhow::Result<T>>,
    receiver: Receiver<anyhow::Result<T>>,
}

impl<T> CompletionQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    /// Drains everything that finished since the last poll. Called from
    /// the event loop on a periodic tick.
    pub fn poll(&self) -> Vec<anyhow::Result<T>> {
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(result) => out.push(result),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

impl<T> Default for CompletionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size pool for blocking store calls. Jobs run to completion;
/// there is no cancellation and no timeout.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..size)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("roster-worker-{index}"))
                    .spawn(move || loop {
                        let job = {
                            let guard = match receiver.lock() {
                                Ok(guard) => guard,
                                Err(_) => return,
                            };
                            guard.recv()
                        };
                        match job {
                            Ok(job) => job(),
                            Err(_) => return,
                        }
                    })
                    .expect("spawning worker thread")
            })
            .collect();
        Self { sender: Some(sender), handles }
    }

    /// Runs a blocking call on a worker and posts its result into the
    /// queue. Send failures cannot happen while the pool is alive.
    pub fn submit<T, F>(&self, queue: &CompletionQueue<T>, call: F)
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let results = queue.sender.clone();
        let job: Job = Box::new(move || {
            let _ = results.send(call());
        });
        if let Some(sender) = &self.sender {
            let _ = sender.send(job);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn results_arrive_via_polling() {
        let pool = WorkerPool::new(2);
        let queue = CompletionQueue::new();
        for value in 0..4 {
            pool.submit(&queue, move || Ok(value * 2));
        }

        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < 4 && Instant::now() < deadline {
            for result in queue.poll() {
                seen.push(result.unwrap());
            }
            thread::sleep(Duration::from_millis(5));
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 2, 4, 6]);
    }

    #[test]
    fn errors_are_posted_not_lost() {
        let pool = WorkerPool::new(1);
        let queue: CompletionQueue<()> = CompletionQueue::new();
        pool.submit(&queue, || anyhow::bail!("store unreachable"));

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let results = queue.poll();
            if !results.is_empty() {
                assert!(results[0].is_err());
                break;
            }
            assert!(Instant::now() < deadline, "no result arrived");
            thread::sleep(Duration::from_millis(5));
        }
    }
}
