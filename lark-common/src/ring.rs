// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Single-producer single-consumer byte ring between the USB
//! receive-complete context and the poll context.
//!
//! The producer is the transfer-completion path, the consumer is the main
//! poll loop. No lock: the producer only stores `head`, the consumer only
//! stores `tail`, and each index update is a single-word release after the
//! data it covers. Writes beyond free space drop the excess bytes rather
//! than overwriting queued data; capacity must exceed the largest burst
//! between two consecutive drains.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer<const N: usize> {
    head: AtomicUsize,
    tail: AtomicUsize,
    buf: UnsafeCell<[u8; N]>,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            buf: UnsafeCell::new([0; N]),
        }
    }

    #[inline]
    fn next(idx: usize) -> usize {
        (idx + 1) % N
    }

    /// Bytes queued and ready to read.
    pub fn available(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            N - tail + head
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Producer side. Never blocks; returns how many bytes were accepted.
    /// A full ring drops the tail end of `data` silently.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let mut written = 0;

        for &byte in data {
            let next = Self::next(head);
            if next == tail {
                break; // full
            }
            // SAFETY: slots in [head, tail) are owned by the producer until
            // the head store below publishes them.
            unsafe {
                (*self.buf.get())[head] = byte;
            }
            head = next;
            written += 1;
        }

        self.head.store(head, Ordering::Release);
        written
    }

    /// Consumer side. Never blocks; returns 0 when empty.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let mut tail = self.tail.load(Ordering::Relaxed);
        let mut count = 0;

        while tail != head && count < out.len() {
            // SAFETY: slots in [tail, head) were published by the producer.
            out[count] = unsafe { (*self.buf.get())[tail] };
            tail = Self::next(tail);
            count += 1;
        }

        self.tail.store(tail, Ordering::Release);
        count
    }

    /// Consumer side: discard everything currently queued.
    pub fn flush(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: SPSC only, one producer context and one consumer context.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}
