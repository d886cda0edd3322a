//! Single-threaded cooperative event loop.
//!
//! Messages arrive on a channel (external events) or from commands the model returns (timers,
//! inline work). The loop only ever blocks waiting for the next message or timer deadline.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

use super::accumulator::CollectedBatch;

#[derive(Debug)]
pub enum Msg {
    /// A scheduled timer fired.
    Tick,
    /// A batch taken from the accumulator.
    Batch(CollectedBatch),
    Resize { width: u16, height: u16 },
    Quit,
}

/// Work requested by the model after handling a message.
pub enum Cmd {
    None,
    /// Deliver [`Msg::Tick`] after the given delay.
    Tick(Duration),
    /// Run on the loop thread; the returned message is handled next. Must not block.
    Perform(Box<dyn FnOnce() -> Msg + Send>),
    Batch(Vec<Cmd>),
    Quit,
}

impl Cmd {
    /// Combine commands, dropping `None`s.
    pub fn batch(cmds: Vec<Cmd>) -> Cmd {
        let mut cmds: Vec<Cmd> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.remove(0),
            _ => Cmd::Batch(cmds),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }
}

impl std::fmt::Debug for Cmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cmd::None => f.write_str("None"),
            Cmd::Tick(d) => write!(f, "Tick({:?})", d),
            Cmd::Perform(_) => f.write_str("Perform(..)"),
            Cmd::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Cmd::Quit => f.write_str("Quit"),
        }
    }
}

pub trait Model {
    fn init(&mut self) -> Cmd;
    fn update(&mut self, msg: Msg) -> Cmd;
    fn view(&self) -> String;
}

pub struct Program<M: Model> {
    model: M,
    tx: Sender<Msg>,
    rx: Receiver<Msg>,
    timers: BinaryHeap<Reverse<Instant>>,
    queue: VecDeque<Msg>,
}

impl<M: Model> Program<M> {
    pub fn new(model: M) -> Self {
        let (tx, rx) = unbounded();
        Self {
            model,
            tx,
            rx,
            timers: BinaryHeap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Sender for external events (signals, resize, quit).
    pub fn sender(&self) -> Sender<Msg> {
        self.tx.clone()
    }

    /// Run until the model returns [`Cmd::Quit`] or a [`Msg::Quit`] has been handled.
    /// Returns the model for inspection.
    pub fn run(mut self) -> M {
        let cmd = self.model.init();
        if self.exec(cmd) {
            return self.model;
        }
        while let Some(msg) = self.next_msg() {
            log::trace!("msg: {:?}", msg);
            let quit = matches!(msg, Msg::Quit);
            let cmd = self.model.update(msg);
            if self.exec(cmd) || quit {
                break;
            }
        }
        self.model
    }

    /// Execute `cmd`; returns true if it asked to quit.
    fn exec(&mut self, cmd: Cmd) -> bool {
        match cmd {
            Cmd::None => false,
            Cmd::Tick(delay) => {
                self.timers.push(Reverse(Instant::now() + delay));
                false
            }
            Cmd::Perform(f) => {
                self.queue.push_back(f());
                false
            }
            Cmd::Batch(cmds) => {
                let mut quit = false;
                for cmd in cmds {
                    quit |= self.exec(cmd);
                }
                quit
            }
            Cmd::Quit => true,
        }
    }

    fn next_msg(&mut self) -> Option<Msg> {
        if let Some(msg) = self.queue.pop_front() {
            return Some(msg);
        }
        loop {
            let now = Instant::now();
            let next_deadline = self.timers.peek().map(|Reverse(d)| *d);
            match next_deadline {
                Some(deadline) if deadline <= now => {
                    self.timers.pop();
                    return Some(Msg::Tick);
                }
                Some(deadline) => match self.rx.recv_timeout(deadline - now) {
                    Ok(msg) => return Some(msg),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return None,
                },
                None => return self.rx.recv().ok(),
            }
        }
    }
}
