//! Background read-ahead for ordered iterators.
//!
//! [`Prefetch`] moves the wrapped iterator onto a dedicated producer thread.
//! The producer computes the next element ahead of time and hands it over a
//! bounded channel, so the latency of the wrapped iterator (typically a storage
//! scan) overlaps with whatever the consumer does between calls.
//!
//! # Protocol
//!
//! The producer loops: compute the next element (or the terminal outcome), then
//! wait until either the data channel accepts it or a control message arrives.
//!
//! A seek travels over the control channel. The producer answers with a
//! [`Message::SeekBoundary`] on the data channel: everything the consumer
//! receives before the boundary was produced before the seek. If the wrapped
//! iterator is already at or past the target, the producer keeps going without
//! touching it and the consumer keeps the in-flight elements `>= target`;
//! otherwise the producer drops its pending element, seeks, and resumes from the
//! landed position. Either way the consumer observes exactly the sequence the
//! wrapped iterator would have produced, which keeps the wrapper transparent.

use std::{cmp::Ordering, collections::VecDeque, sync::Arc, thread::JoinHandle, time::Duration};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Select, Sender};
use logdex_common::{Error, Result};
use logdex_workflow::CancellationToken;

use crate::{Comparator, OrderedIter};

/// How often a consumer waiting on the producer looks at its cancellation
/// token.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Data channel traffic from the producer to the consumer.
enum Message<T> {
    Item(T),
    Exhausted,
    Failed(Error),
    SeekBoundary,
}

/// Control traffic from the consumer to the producer.
enum Control<T> {
    Seek(T),
    Stop,
}

/// An [`OrderedIter`] whose wrapped iterator runs on a background thread.
pub struct Prefetch<T, C>
where
    T: Clone + Send + Sync + 'static,
{
    data_rx: Receiver<Message<T>>,
    control_tx: Sender<Control<T>>,
    worker: Option<JoinHandle<()>>,
    /// Messages received ahead of time while resolving a seek.
    lookahead: VecDeque<Message<T>>,
    current: Option<T>,
    finished: bool,
    cmp: Arc<C>,
    cancel: CancellationToken,
}

impl<T, C> Prefetch<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Comparator<T> + 'static,
{
    /// Starts a producer thread owning `inner`.
    ///
    /// `depth` is the number of elements the producer may run ahead (at least
    /// one). The producer stops early, reporting a cancellation error, once
    /// `cancel` fires.
    pub fn spawn<I>(
        inner: I,
        cmp: C,
        depth: usize,
        cancel: CancellationToken,
    ) -> Result<Prefetch<T, C>>
    where
        I: OrderedIter<Item = T> + 'static,
    {
        let (data_tx, data_rx) = channel::bounded(depth.max(1));
        let (control_tx, control_rx) = channel::unbounded();
        let cmp = Arc::new(cmp);
        let producer = Producer {
            inner,
            cmp: cmp.clone(),
            data_tx,
            control_rx,
            cancel: cancel.clone(),
            last: None,
            done: false,
        };
        let worker = std::thread::Builder::new()
            .name("logdex-prefetch".to_string())
            .spawn(move || producer.run())?;
        Ok(Prefetch {
            data_rx,
            control_tx,
            worker: Some(worker),
            lookahead: VecDeque::new(),
            current: None,
            finished: false,
            cmp,
            cancel,
        })
    }

    fn receive(&mut self) -> Message<T> {
        if let Some(msg) = self.lookahead.pop_front() {
            return msg;
        }
        self.recv_data().unwrap_or_else(Message::Failed)
    }

    /// Waits for the producer, giving up once the token fires. A producer
    /// stuck inside the wrapped iterator does not delay the cancellation.
    fn recv_data(&self) -> Result<Message<T>> {
        loop {
            match self.data_rx.recv_timeout(CANCEL_POLL) {
                Ok(msg) => return Ok(msg),
                Err(RecvTimeoutError::Timeout) => self.cancel.check()?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::storage(
                        "prefetch producer terminated",
                        channel::RecvError,
                    ));
                }
            }
        }
    }

    fn accept(&mut self, msg: Message<T>) -> Result<bool> {
        match msg {
            Message::Item(value) => {
                self.current = Some(value);
                Ok(true)
            }
            Message::Exhausted => {
                self.finish();
                Ok(false)
            }
            Message::Failed(e) => {
                self.finish();
                Err(e)
            }
            Message::SeekBoundary => unreachable!("seek boundary outside of a seek"),
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.current = None;
        self.lookahead.clear();
    }
}

impl<T, C> OrderedIter for Prefetch<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Comparator<T> + 'static,
{
    type Item = T;

    fn next(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        let msg = self.receive();
        self.accept(msg)
    }

    fn current(&self) -> &T {
        self.current
            .as_ref()
            .expect("Prefetch::current() called while not positioned")
    }

    fn seek(&mut self, target: &T) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        if let Some(current) = &self.current {
            if self.cmp.compare(current, target) != Ordering::Less {
                return Ok(true);
            }
        }

        // Elements already received ahead of time may answer the seek.
        while let Some(msg) = self.lookahead.pop_front() {
            match msg {
                Message::Item(value) if self.cmp.compare(&value, target) == Ordering::Less => {}
                msg => return self.accept(msg),
            }
        }

        if self.control_tx.send(Control::Seek(target.clone())).is_err() {
            self.finish();
            return Err(Error::storage(
                "prefetch producer terminated",
                channel::RecvError,
            ));
        }
        loop {
            match self.recv_data() {
                Ok(Message::SeekBoundary) => break,
                Ok(Message::Item(value)) => {
                    if self.cmp.compare(&value, target) != Ordering::Less {
                        self.lookahead.push_back(Message::Item(value));
                    }
                }
                Ok(terminal) => self.lookahead.push_back(terminal),
                Err(e) => {
                    self.finish();
                    return Err(e);
                }
            }
        }
        let msg = self.receive();
        self.accept(msg)
    }

    fn release(&mut self) {
        self.stop_producer();
        self.finish();
    }
}

impl<T, C> Prefetch<T, C>
where
    T: Clone + Send + Sync + 'static,
{
    fn stop_producer(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.control_tx.send(Control::Stop);
        // Drain until the producer hangs up, so a send blocked on a full
        // channel can observe the stop.
        for _ in self.data_rx.iter() {}
        if worker.join().is_err() {
            log::warn!("prefetch producer panicked");
        }
    }
}

impl<T, C> Drop for Prefetch<T, C>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.stop_producer();
    }
}

/// The producer side; owns the wrapped iterator exclusively.
struct Producer<I: OrderedIter, C> {
    inner: I,
    cmp: Arc<C>,
    data_tx: Sender<Message<I::Item>>,
    control_rx: Receiver<Control<I::Item>>,
    cancel: CancellationToken,
    /// Last element produced by `inner`, whether or not it was delivered.
    last: Option<I::Item>,
    /// `inner` reported its terminal outcome.
    done: bool,
}

enum Offer<T> {
    Delivered,
    Seek(T, Message<T>),
    Stop,
}

impl<I, C> Producer<I, C>
where
    I: OrderedIter,
    C: Comparator<I::Item>,
{
    fn run(mut self) {
        let mut pending: Option<Message<I::Item>> = None;
        loop {
            if pending.is_none() && !self.done {
                pending = Some(self.advance());
            }
            let control = match pending.take() {
                Some(msg) => match self.offer(msg) {
                    Offer::Delivered => continue,
                    Offer::Seek(target, msg) => {
                        pending = Some(msg);
                        Control::Seek(target)
                    }
                    Offer::Stop => Control::Stop,
                },
                None => self.control_rx.recv().unwrap_or(Control::Stop),
            };
            match control {
                Control::Seek(target) => match self.on_seek(target, pending.take()) {
                    Some(next) => pending = next,
                    None => break,
                },
                Control::Stop => break,
            }
        }
        self.inner.release();
    }

    /// Waits until the consumer takes `msg` or sends a control message.
    fn offer(&self, msg: Message<I::Item>) -> Offer<I::Item> {
        // Pending control messages win over more read-ahead.
        match self.control_rx.try_recv() {
            Ok(Control::Seek(target)) => return Offer::Seek(target, msg),
            Ok(Control::Stop) => return Offer::Stop,
            Err(_) => {}
        }
        let mut sel = Select::new();
        let send_index = sel.send(&self.data_tx);
        let control_index = sel.recv(&self.control_rx);
        let oper = sel.select();
        let index = oper.index();
        if index == send_index {
            match oper.send(&self.data_tx, msg) {
                Ok(()) => Offer::Delivered,
                Err(_) => Offer::Stop,
            }
        } else {
            debug_assert_eq!(index, control_index);
            match oper.recv(&self.control_rx) {
                Ok(Control::Seek(target)) => Offer::Seek(target, msg),
                Ok(Control::Stop) | Err(_) => Offer::Stop,
            }
        }
    }

    /// Handles a seek request. Returns the new pending message, or `None` if
    /// the consumer is gone.
    fn on_seek(
        &mut self,
        target: I::Item,
        pending: Option<Message<I::Item>>,
    ) -> Option<Option<Message<I::Item>>> {
        let past_target = self.done
            || self
                .last
                .as_ref()
                .is_some_and(|last| self.cmp.compare(last, &target) != Ordering::Less);
        self.data_tx.send(Message::SeekBoundary).ok()?;
        if past_target {
            Some(pending)
        } else {
            Some(Some(self.step(|inner| inner.seek(&target))))
        }
    }

    fn advance(&mut self) -> Message<I::Item> {
        self.step(|inner| inner.next())
    }

    fn step<F>(&mut self, op: F) -> Message<I::Item>
    where
        F: FnOnce(&mut I) -> Result<bool>,
    {
        if self.cancel.is_cancelled() {
            self.done = true;
            return Message::Failed(Error::cancelled());
        }
        match op(&mut self.inner) {
            Ok(true) => {
                let value = self.inner.current().clone();
                self.last = Some(value.clone());
                Message::Item(value)
            }
            Ok(false) => {
                self.done = true;
                Message::Exhausted
            }
            Err(e) => {
                self.done = true;
                Message::Failed(e)
            }
        }
    }
}
