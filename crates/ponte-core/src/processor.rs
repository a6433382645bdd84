//! Per-block processing entry point.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::lockfree::AtomicCounter;
use crate::transport::Frames;

/// User code run once per audio block on the server's realtime thread.
///
/// Implementations must not block, allocate, or perform I/O.
pub trait Processor: Send {
    fn process(&mut self, frames: Frames);
}

impl<F> Processor for F
where
    F: FnMut(Frames) + Send,
{
    fn process(&mut self, frames: Frames) {
        self(frames)
    }
}

/// Processor reference shared between the application and the bridge.
pub type SharedProcessor = Arc<Mutex<dyn Processor>>;

/// Wrap a processor for [`Bridge::set_processor`](crate::Bridge::set_processor).
pub fn shared<P: Processor + 'static>(processor: P) -> SharedProcessor {
    Arc::new(Mutex::new(processor))
}

struct Installed(SharedProcessor);

/// Holds the current processor, readable from the realtime thread without blocking.
pub(crate) struct ProcessorSlot {
    current: ArcSwapOption<Installed>,
    skipped: AtomicCounter,
}

impl ProcessorSlot {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            skipped: AtomicCounter::new(),
        }
    }

    pub(crate) fn set(&self, processor: Option<SharedProcessor>) {
        self.current.store(processor.map(|p| Arc::new(Installed(p))));
    }

    pub(crate) fn get(&self) -> Option<SharedProcessor> {
        self.current.load_full().map(|installed| Arc::clone(&installed.0))
    }

    /// Run the processor for one block. RT-safe.
    ///
    /// If another thread holds the processor lock the block is skipped and counted.
    #[inline]
    pub(crate) fn run(&self, frames: Frames) {
        let guard = self.current.load();
        let Some(installed) = guard.as_ref() else {
            return;
        };
        match installed.0.try_lock() {
            Some(mut processor) => processor.process(frames),
            None => self.skipped.increment(),
        };
    }

    pub(crate) fn skipped(&self) -> u64 {
        self.skipped.get()
    }
}
