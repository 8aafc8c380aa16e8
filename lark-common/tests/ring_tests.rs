// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the SPSC transport ring buffer.

use lark_common::ring::RingBuffer;

#[test]
fn test_write_then_read_preserves_order() {
    let ring: RingBuffer<64> = RingBuffer::new();
    let data: Vec<u8> = (0u8..40).collect();

    assert_eq!(ring.write(&data), 40);
    assert_eq!(ring.available(), 40);

    let mut out = [0u8; 64];
    assert_eq!(ring.read(&mut out), 40);
    assert_eq!(&out[..40], &data[..]);
    assert!(ring.is_empty());
}

#[test]
fn test_read_empty_returns_zero() {
    let ring: RingBuffer<16> = RingBuffer::new();
    let mut out = [0u8; 8];
    assert_eq!(ring.read(&mut out), 0);
}

#[test]
fn test_overflow_drops_only_the_excess() {
    // Capacity is N-1: one slot stays open to tell full from empty.
    let ring: RingBuffer<16> = RingBuffer::new();
    let data: Vec<u8> = (0u8..20).collect();

    assert_eq!(ring.write(&data), 15);
    assert_eq!(ring.available(), 15);

    let mut out = [0u8; 20];
    assert_eq!(ring.read(&mut out), 15);
    // Everything that was queued survived, in order.
    assert_eq!(&out[..15], &data[..15]);
}

#[test]
fn test_full_ring_accepts_nothing() {
    let ring: RingBuffer<8> = RingBuffer::new();
    assert_eq!(ring.write(&[1; 7]), 7);
    assert_eq!(ring.write(&[2; 3]), 0);
    assert_eq!(ring.available(), 7);
}

#[test]
fn test_wraparound() {
    let ring: RingBuffer<8> = RingBuffer::new();
    let mut out = [0u8; 8];

    for round in 0u8..10 {
        let data = [round, round.wrapping_add(1), round.wrapping_add(2)];
        assert_eq!(ring.write(&data), 3);
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out[..3], &data);
    }
}

#[test]
fn test_partial_read() {
    let ring: RingBuffer<32> = RingBuffer::new();
    ring.write(&[1, 2, 3, 4, 5]);

    let mut out = [0u8; 2];
    assert_eq!(ring.read(&mut out), 2);
    assert_eq!(out, [1, 2]);
    assert_eq!(ring.available(), 3);

    let mut rest = [0u8; 8];
    assert_eq!(ring.read(&mut rest), 3);
    assert_eq!(&rest[..3], &[3, 4, 5]);
}

#[test]
fn test_flush_empties_the_ring() {
    let ring: RingBuffer<32> = RingBuffer::new();
    ring.write(&[1, 2, 3]);
    ring.flush();
    assert!(ring.is_empty());

    // Still usable afterwards.
    ring.write(&[9, 9]);
    assert_eq!(ring.available(), 2);
}

#[test]
fn test_interleaved_producer_consumer() {
    let ring: RingBuffer<8> = RingBuffer::new();
    let mut expected = Vec::new();
    let mut seen = Vec::new();
    let mut out = [0u8; 4];

    for i in 0u8..50 {
        let accepted = ring.write(&[i]);
        if accepted == 1 {
            expected.push(i);
        }
        if i % 3 == 0 {
            let n = ring.read(&mut out);
            seen.extend_from_slice(&out[..n]);
        }
    }
    let n = ring.read(&mut out);
    seen.extend_from_slice(&out[..n]);
    while ring.available() > 0 {
        let n = ring.read(&mut out);
        seen.extend_from_slice(&out[..n]);
    }

    assert_eq!(seen, expected);
}
