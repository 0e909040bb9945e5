use std::cell::Cell;
use std::rc::Rc;

/// Cooperative cancellation flag with an optional parent.
///
/// A token reports cancelled when it, or any ancestor, was cancelled. Clones share the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// New token cancelled together with `self`, but cancellable on its own.
    pub fn child(&self) -> CancelToken {
        CancelToken {
            flag: Rc::new(Cell::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}
