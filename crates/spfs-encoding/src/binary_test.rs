// Copyright (c) Sony Pictures Imageworks, et al.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/imageworks/spk

use super::*;

#[test]
fn test_int_roundtrip() {
    let mut buf = Vec::new();
    write_int(&mut buf, -42).unwrap();
    assert_eq!(read_int(buf.as_slice()).unwrap(), -42);
}

#[test]
fn test_uint_roundtrip() {
    let mut buf = Vec::new();
    write_uint(&mut buf, 1337).unwrap();
    assert_eq!(read_uint(buf.as_slice()).unwrap(), 1337);
}

#[test]
fn test_digest_roundtrip() {
    let digest = crate::Hasher::default().digest();
    let mut buf = Vec::new();
    write_digest(&mut buf, &digest).unwrap();
    assert_eq!(read_digest(buf.as_slice()).unwrap(), digest);
}

#[test]
fn test_string_roundtrip() {
    let mut buf = Vec::new();
    write_string(&mut buf, "hello, spfs").unwrap();
    let mut reader = buf.as_slice();
    assert_eq!(read_string(&mut reader).unwrap(), "hello, spfs");
}

#[test]
fn test_string_rejects_null_byte() {
    let mut buf = Vec::new();
    let res = write_string(&mut buf, "bad\x00string");
    assert!(matches!(res, Err(Error::StringHasNullCharacter)));
}

#[test]
fn test_string_reads_across_short_buffers() {
    // a BufReader with a tiny internal buffer forces read_string to loop
    // across multiple fill_buf calls before it finds the terminator
    let mut buf = Vec::new();
    write_string(&mut buf, "a longer string than the buffer").unwrap();
    let mut reader = std::io::BufReader::with_capacity(4, buf.as_slice());
    assert_eq!(
        read_string(&mut reader).unwrap(),
        "a longer string than the buffer"
    );
}

#[test]
fn test_header_roundtrip() {
    let mut buf = Vec::new();
    write_header(&mut buf, b"--TEST--").unwrap();
    assert!(consume_header(buf.as_slice(), b"--TEST--").is_ok());
}

#[test]
fn test_header_mismatch() {
    let mut buf = Vec::new();
    write_header(&mut buf, b"--TEST--").unwrap();
    let res = consume_header(buf.as_slice(), b"--OTHER--");
    assert!(matches!(res, Err(Error::InvalidHeader { .. })));
}
