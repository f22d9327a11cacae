use crate::core::Kind;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub(crate) struct QueuedInput {
    pub(crate) kind: Kind,
    pub(crate) value: Box<dyn Any>,
}

/// Handle onto an engine's FIFO input queue.
///
/// Handlers and hooks enqueue through [`Context::input`](super::Context::input);
/// observers and other code that cannot borrow the engine use a sink
/// obtained from [`Engine::sink`](super::Engine::sink). Inputs pushed while
/// a dispatch is running are processed before that dispatch returns to its
/// caller; otherwise they wait for the next [`Engine::input`](super::Engine::input)
/// or [`Engine::pump`](super::Engine::pump).
#[derive(Clone, Default)]
pub struct InputSink {
    queue: Rc<RefCell<VecDeque<QueuedInput>>>,
}

impl InputSink {
    pub fn push<I: 'static>(&self, input: I) {
        self.queue.borrow_mut().push_back(QueuedInput {
            kind: Kind::of::<I>(),
            value: Box::new(input),
        });
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub(crate) fn pop(&self) -> Option<QueuedInput> {
        self.queue.borrow_mut().pop_front()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut queue = self.queue.borrow_mut();
        let dropped = queue.len();
        queue.clear();
        dropped
    }
}

impl fmt::Debug for InputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<Kind> = self.queue.borrow().iter().map(|q| q.kind).collect();
        f.debug_struct("InputSink").field("pending", &kinds).finish()
    }
}
