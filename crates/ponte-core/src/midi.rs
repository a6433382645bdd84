//! Short MIDI messages and a lock-free hand-off channel.
//!
//! A processor running on the realtime thread pushes [`MidiMsg`]s into a
//! [`MidiMsgProducer`]; an application thread drains them from the matching
//! [`MidiMsgConsumer`]. Neither side locks or allocates.

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use crate::transport::Frames;

const DEFAULT_CAPACITY: usize = 256;

/// A MIDI message of up to three bytes, stamped with its frame offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiMsg {
    pub data: [u8; 3],
    /// Number of meaningful bytes in `data`.
    pub len: usize,
    /// Frame offset within the block, or absolute frame time.
    pub time: Frames,
}

impl MidiMsg {
    /// `None` if `bytes` is empty or longer than three bytes.
    pub fn new(bytes: &[u8], time: Frames) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 3 {
            return None;
        }
        let mut data = [0u8; 3];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            data,
            len: bytes.len(),
            time,
        })
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8, time: Frames) -> Self {
        Self {
            data: [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            len: 3,
            time,
        }
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8, time: Frames) -> Self {
        Self {
            data: [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            len: 3,
            time,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len.min(3)]
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.data[0]
    }

    /// Channel (0-15) for channel voice messages.
    pub fn channel(&self) -> Option<u8> {
        let status = self.status();
        (0x80..0xF0).contains(&status).then_some(status & 0x0F)
    }
}

/// Realtime side of a MIDI channel.
pub struct MidiMsgProducer {
    producer: HeapProd<MidiMsg>,
}

impl MidiMsgProducer {
    /// Returns `false` if the ring buffer is full.
    #[inline]
    pub fn push(&mut self, msg: MidiMsg) -> bool {
        self.producer.try_push(msg).is_ok()
    }

    /// Number of messages pushed from `msgs`.
    #[inline]
    pub fn push_slice(&mut self, msgs: &[MidiMsg]) -> usize {
        self.producer.push_slice(msgs)
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.producer.vacant_len()
    }
}

/// Application side of a MIDI channel.
pub struct MidiMsgConsumer {
    consumer: HeapCons<MidiMsg>,
}

impl MidiMsgConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<MidiMsg> {
        self.consumer.try_pop()
    }

    pub fn drain(&mut self) -> Vec<MidiMsg> {
        let mut msgs = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(msg) = self.consumer.try_pop() {
            msgs.push(msg);
        }
        msgs
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }
}

pub fn midi_msg_channel(capacity: usize) -> (MidiMsgProducer, MidiMsgConsumer) {
    let rb = HeapRb::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (MidiMsgProducer { producer }, MidiMsgConsumer { consumer })
}

/// Channel holding 256 messages.
pub fn default_midi_msg_channel() -> (MidiMsgProducer, MidiMsgConsumer) {
    midi_msg_channel(DEFAULT_CAPACITY)
}
