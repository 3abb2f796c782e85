// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::guest::{GuestMessage, GuestMessageType};
use serde_json::Value;
use talus_core::JobId;

fn sample() -> GuestMessage {
    GuestMessage {
        job: JobId::new(),
        idx: 7,
        tool: "Echo".into(),
        kind: GuestMessageType::Progress,
        data: Value::from(1),
    }
}

#[test]
fn encode_prefixes_with_big_endian_length() {
    let msg = sample();
    let framed = encode(&msg).unwrap();
    let body = serde_json::to_vec(&msg).unwrap();
    let len = u32::from_be_bytes(framed[..4].try_into().unwrap());
    assert_eq!(len as usize, body.len());
    assert_eq!(&framed[4..], body.as_slice());
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let msg = sample();
    let mut buf: Vec<u8> = Vec::new();
    write_message(&mut buf, &msg).await.unwrap();

    let mut cursor = std::io::Cursor::new(buf);
    let decoded: GuestMessage = read_message(&mut cursor).await.unwrap().unwrap();
    assert_eq!(decoded, msg);
}

#[tokio::test]
async fn read_message_returns_none_on_clean_eof() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let decoded: Option<GuestMessage> = read_message(&mut cursor).await.unwrap();
    assert!(decoded.is_none());
}

#[tokio::test]
async fn read_message_buffers_across_partial_reads() {
    let msg = sample();
    let framed = encode(&msg).unwrap();
    // Simulate a peer that writes the frame in two chunks, as a guest
    // bootstrap's socket might deliver it across multiple `recv` calls.
    let (first, second) = framed.split_at(6);
    let mut combined = Vec::new();
    combined.extend_from_slice(first);
    combined.extend_from_slice(second);
    let mut cursor = std::io::Cursor::new(combined);
    let decoded: GuestMessage = read_message(&mut cursor).await.unwrap().unwrap();
    assert_eq!(decoded, msg);
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
    let mut cursor = std::io::Cursor::new(buf);
    let result: Result<Option<GuestMessage>, WireError> = read_message(&mut cursor).await;
    assert!(matches!(result, Err(WireError::FrameTooLarge(_))));
}
