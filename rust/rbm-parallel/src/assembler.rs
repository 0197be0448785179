//! Reassembles per-key results, arriving in any order, into the output bitmap.

use std::sync::Arc;

use rbm_bitmap::{Bitmap, Container};
use rbm_workflow::mpmc::Receiver;

/// The combined container for one key, tagged with its position in the
/// output.
#[derive(Debug)]
pub struct IndexedResult {
    pub key: u16,
    pub container: Arc<Container>,
    /// Assembly index, assigned in key order at dispatch time.
    pub index: usize,
    /// `true` when `container` still belongs to an input bitmap.
    pub shared: bool,
}

/// Messages consumed by the assembler: any number of results, plus exactly
/// one expected count sent after the last dispatch.
#[derive(Debug)]
pub enum AssemblerMessage {
    Result(IndexedResult),
    ExpectedCount(usize),
}

/// Collects [`IndexedResult`]s into slots addressed by assembly index.
#[derive(Debug, Default)]
pub struct ResultAssembler {
    slots: Vec<Option<(u16, Arc<Container>, bool)>>,
    received: usize,
    expected: Option<usize>,
}

impl ResultAssembler {
    pub fn new() -> ResultAssembler {
        ResultAssembler::default()
    }

    /// Records one message. Returns `true` once every expected result is in.
    pub fn accept(&mut self, message: AssemblerMessage) -> bool {
        match message {
            AssemblerMessage::Result(result) => {
                if result.index >= self.slots.len() {
                    self.slots.resize_with(result.index + 1, || None);
                }
                let slot = &mut self.slots[result.index];
                assert!(slot.is_none(), "duplicate assembly index {}", result.index);
                *slot = Some((result.key, result.container, result.shared));
                self.received += 1;
            }
            AssemblerMessage::ExpectedCount(count) => {
                assert!(self.expected.is_none(), "expected count sent twice");
                self.expected = Some(count);
            }
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.expected == Some(self.received)
    }

    /// Builds the output registry from slots `0..expected` in order. Empty
    /// containers are left out.
    ///
    /// # Panics
    ///
    /// Panics if called before [`ResultAssembler::is_complete`] holds.
    pub fn into_bitmap(self) -> Bitmap {
        assert!(
            self.is_complete(),
            "assembler finished with {} of {:?} results",
            self.received,
            self.expected
        );
        let mut bitmap = Bitmap::with_capacity(self.received);
        for (index, slot) in self.slots.into_iter().enumerate() {
            let Some((key, container, shared)) = slot else {
                panic!("missing result for assembly index {index}");
            };
            if !container.is_empty() {
                bitmap.append_container(key, container, shared);
            }
        }
        bitmap
    }

    /// Drains `messages` until the expected number of results has arrived.
    ///
    /// # Panics
    ///
    /// Panics if every sender disconnects first.
    pub fn run(mut self, messages: Receiver<AssemblerMessage>) -> Bitmap {
        while !self.is_complete() {
            match messages.recv() {
                Ok(message) => {
                    self.accept(message);
                }
                Err(_) => panic!(
                    "result queue disconnected after {} results (expected {:?})",
                    self.received, self.expected
                ),
            }
        }
        self.into_bitmap()
    }
}
