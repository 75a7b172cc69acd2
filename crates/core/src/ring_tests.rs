use super::*;

#[test]
fn dump_equals_suffix_of_all_pushes() {
    let mut ring = RingBuffer::new(10);
    ring.push(b"hello ");
    ring.push(b"world");
    assert_eq!(ring.dump(), b"lo world");
    assert_eq!(ring.size(), 8);
}

#[test]
fn size_never_exceeds_cap() {
    let mut ring = RingBuffer::new(5);
    for _ in 0..50 {
        ring.push(b"abc");
    }
    assert!(ring.size() <= 5);
    assert_eq!(ring.dump(), b"babc"[1..].to_vec());
}

#[test]
fn single_push_larger_than_cap_keeps_tail() {
    let mut ring = RingBuffer::new(4);
    ring.push(b"0123456789");
    assert_eq!(ring.dump(), b"6789");
}

#[test]
fn clear_empties_buffer() {
    let mut ring = RingBuffer::new(16);
    ring.push(b"anything");
    ring.clear();
    assert_eq!(ring.size(), 0);
    assert_eq!(ring.dump(), Vec::<u8>::new());
}

#[test]
fn empty_push_is_noop() {
    let mut ring = RingBuffer::new(16);
    ring.push(b"");
    assert_eq!(ring.size(), 0);
}

#[test]
fn exact_cap_boundary() {
    let mut ring = RingBuffer::new(3);
    ring.push(b"a");
    ring.push(b"b");
    ring.push(b"c");
    assert_eq!(ring.dump(), b"abc");
    ring.push(b"d");
    assert_eq!(ring.dump(), b"bcd");
}

proptest::proptest! {
    #[test]
    fn contract_holds_for_arbitrary_push_sequences(chunks in proptest::collection::vec(proptest::collection::vec(0u8..255, 0..20), 0..30), cap in 1usize..64) {
        let mut ring = RingBuffer::new(cap);
        let mut all: Vec<u8> = Vec::new();
        for chunk in &chunks {
            ring.push(chunk);
            all.extend_from_slice(chunk);
        }
        let expected_len = all.len().min(cap);
        let expected = all[all.len() - expected_len..].to_vec();
        proptest::prop_assert!(ring.size() <= cap);
        proptest::prop_assert_eq!(ring.dump(), expected);
    }
}
