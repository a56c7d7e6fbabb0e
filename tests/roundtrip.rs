use byteorder::{ByteOrder, LittleEndian};
use mini_binary_xml::mbxml::tree;
use mini_binary_xml::{
    decode, encode, from_bytes, to_bytes, DecodeOptions, Element, MbxmlError, StringPool,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn sample_tree() -> Element {
    Element::new("a")
        .with_attribute("x", "1")
        .with_child(Element::new("b"))
        .with_child(Element::new("c").with_text("hi"))
}

fn nested_tree() -> Element {
    Element::new("library")
        .with_attribute("name", "Central")
        .with_attribute("city", "Nowhere")
        .with_child(
            Element::new("shelf")
                .with_attribute("id", "1")
                .with_child(Element::new("book").with_attribute("id", "1").with_text("Dune"))
                .with_child(Element::new("book").with_attribute("id", "2").with_text("Emma")),
        )
        .with_child(Element::new("shelf").with_attribute("id", "2"))
        .with_child(Element::new("note").with_text("Öffnungszeiten: 9–17 Uhr, 中文"))
}

/// Splits an encoded payload into (offsets, blob, node table start).
fn pool_layout(bytes: &[u8]) -> (Vec<i32>, &[u8], usize) {
    let count = LittleEndian::read_i32(&bytes[8..12]) as usize;
    let offsets: Vec<i32> = (0..count)
        .map(|i| LittleEndian::read_i32(&bytes[12 + i * 4..16 + i * 4]))
        .collect();
    let blob_base = 12 + count * 4;
    let last = *offsets.last().expect("non-empty pool") as usize;
    let last_len = LittleEndian::read_u16(&bytes[blob_base + last..blob_base + last + 2]) as usize;
    let blob_end = blob_base + last + 2 + last_len;
    (offsets, &bytes[blob_base..blob_end], blob_end)
}

#[test]
fn sample_tree_flattens_in_preorder() {
    let encoded = tree::flatten(&sample_tree());

    let strings: Vec<&str> = encoded.pool.iter().collect();
    assert_eq!(strings, vec!["a", "x", "1", "b", "c", "hi"]);
    assert_eq!(encoded.records.len(), 3);

    let a = encoded.record(0).expect("record a");
    assert_eq!(a.parent, None);
    assert_eq!(a.children, vec![1, 2]);
    assert_eq!(a.attributes, vec![(1, 2)]);
    assert_eq!(a.text, None);

    let b = encoded.record(1).expect("record b");
    assert_eq!(b.tag, 3);
    assert_eq!(b.parent, Some(0));
    assert!(b.children.is_empty());

    let c = encoded.record(2).expect("record c");
    assert_eq!(c.tag, 4);
    assert_eq!(c.text, Some(5));
    assert_eq!(c.parent, Some(0));
}

#[test]
fn sample_tree_round_trips() {
    let original = sample_tree();
    let bytes = to_bytes(&original).expect("encode");
    assert_eq!(&bytes[0..4], b"MBXM");
    assert_eq!(bytes[4], 1);
    assert_eq!(&bytes[5..8], &[0, 0, 0]);

    let decoded = from_bytes(&bytes).expect("decode");
    assert_eq!(decoded, original);
}

#[test]
fn nested_tree_round_trips_through_streams() {
    let original = nested_tree();
    let mut out = Vec::new();
    encode(&original, &mut out).expect("encode");

    let decoded = decode(&mut Cursor::new(out), &DecodeOptions::default()).expect("decode");
    assert_eq!(decoded, original);
}

#[test]
fn repeated_strings_share_one_pool_entry() {
    let tree = Element::new("row")
        .with_child(Element::new("cell").with_attribute("kind", "row").with_text("row"))
        .with_child(Element::new("cell").with_attribute("kind", "cell"));
    let encoded = tree::flatten(&tree);

    assert_eq!(encoded.pool.len(), 3);
    let row = encoded.pool.position("row").expect("row interned");
    let cell = encoded.pool.position("cell").expect("cell interned");
    assert_eq!(encoded.records[0].tag, row);
    assert_eq!(encoded.records[1].tag, cell);
    assert_eq!(encoded.records[2].tag, cell);
    assert_eq!(encoded.records[1].attributes[0].1, row);
    assert_eq!(encoded.records[1].text, Some(row));
}

#[test]
fn intern_is_stable_and_accepts_empty_string() {
    let mut pool = StringPool::new();
    let empty = pool.intern("");
    let a = pool.intern("a");
    assert_eq!(pool.intern(""), empty);
    assert_eq!(pool.intern("a"), a);
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.get(empty), Some(""));
    assert!(pool.get(2).is_none());
}

#[test]
fn offsets_are_strictly_increasing_and_bound_the_blob() {
    let tree = nested_tree();
    let bytes = to_bytes(&tree).expect("encode");
    let (offsets, blob, node_table_start) = pool_layout(&bytes);

    assert!(offsets.windows(2).all(|w| w[0] < w[1]), "offsets {:?}", offsets);
    assert_eq!(offsets[0], 0);

    let encoded = tree::flatten(&tree);
    let last = encoded.pool.iter().last().expect("last string");
    assert_eq!(blob.len(), *offsets.last().unwrap() as usize + 2 + last.len());

    let (expected_offsets, expected_blob) = encoded.pool.to_blob().expect("blob");
    assert_eq!(expected_blob.as_slice(), blob);
    assert_eq!(
        expected_offsets.iter().map(|&o| o as i32).collect::<Vec<_>>(),
        offsets
    );

    let record_count = LittleEndian::read_i32(&bytes[node_table_start..node_table_start + 4]);
    assert_eq!(record_count as usize, tree.subtree_len());
}

#[test]
fn duplicate_attribute_names_keep_order() {
    let original = Element::new("e")
        .with_attribute("k", "first")
        .with_attribute("other", "x")
        .with_attribute("k", "second");
    let decoded = from_bytes(&to_bytes(&original).expect("encode")).expect("decode");

    assert_eq!(
        decoded.attributes,
        vec![
            ("k".to_string(), "first".to_string()),
            ("other".to_string(), "x".to_string()),
            ("k".to_string(), "second".to_string()),
        ]
    );
    assert_eq!(decoded.attribute("k"), Some("first"));
}

#[test]
fn empty_text_is_distinct_from_absent_text() {
    let original = Element::new("root")
        .with_child(Element::new("empty").with_text(""))
        .with_child(Element::new("absent"));
    let decoded = from_bytes(&to_bytes(&original).expect("encode")).expect("decode");

    assert_eq!(decoded.children[0].text.as_deref(), Some(""));
    assert_eq!(decoded.children[1].text, None);
}

#[test]
fn attribute_capacity_boundary() {
    let mut at_limit = Element::new("wide");
    at_limit.attributes = vec![("k".to_string(), "v".to_string()); 65_535];
    let bytes = to_bytes(&at_limit).expect("65535 attributes encode");
    let decoded = from_bytes(&bytes).expect("decode");
    assert_eq!(decoded.attributes.len(), 65_535);

    let mut over = Element::new("wide");
    over.attributes = vec![("k".to_string(), "v".to_string()); 65_536];
    match to_bytes(&over) {
        Err(MbxmlError::TooManyAttributes { tag, count, max }) => {
            assert_eq!(tag, "wide");
            assert_eq!(count, 65_536);
            assert_eq!(max, 65_535);
        }
        other => panic!("expected TooManyAttributes, got {:?}", other),
    }
}

#[test]
fn child_capacity_is_enforced() {
    let mut over = Element::new("parent");
    over.children = vec![Element::new("leaf"); 65_536];
    assert!(matches!(
        to_bytes(&over),
        Err(MbxmlError::TooManyChildren { count: 65_536, .. })
    ));
}

#[test]
fn string_length_limit_is_enforced() {
    let fits = Element::new("t").with_text("x".repeat(65_535));
    let decoded = from_bytes(&to_bytes(&fits).expect("encode")).expect("decode");
    assert_eq!(decoded.text.as_ref().map(String::len), Some(65_535));

    // Multi-byte characters count by UTF-8 length, not by chars.
    let too_long = Element::new("t").with_text("é".repeat(32_768));
    assert!(matches!(
        to_bytes(&too_long),
        Err(MbxmlError::StringTooLong { len: 65_536, max: 65_535 })
    ));
}

#[test]
fn failed_encode_writes_nothing() {
    let mut out = Vec::new();
    let bad = Element::new("t").with_attribute("a", "x".repeat(70_000));
    assert!(encode(&bad, &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn deep_tree_round_trips() {
    let mut element = Element::new("leaf").with_text("bottom");
    for depth in 0..500 {
        element = Element::new(format!("level{}", depth % 7)).with_child(element);
    }
    let decoded = from_bytes(&to_bytes(&element).expect("encode")).expect("decode");
    assert_eq!(decoded, element);
    assert_eq!(decoded.subtree_len(), 501);
}

#[test]
fn very_deep_chain_round_trips_and_drops() {
    const DEPTH: usize = 100_000;
    let mut element = Element::new("leaf").with_text("bottom");
    for _ in 0..DEPTH {
        element = Element::new("n").with_child(element);
    }

    let bytes = to_bytes(&element).expect("encode");
    let decoded = from_bytes(&bytes).expect("decode");
    assert_eq!(decoded.subtree_len(), DEPTH + 1);

    let mut depth = 0;
    let mut node = &decoded;
    while let Some(child) = node.children.first() {
        assert!(child.children.len() <= 1);
        depth += 1;
        node = child;
    }
    assert_eq!(depth, DEPTH);
    assert_eq!(node.tag, "leaf");
    assert_eq!(node.text.as_deref(), Some("bottom"));

    drop(decoded);
    drop(element);
}

#[test]
fn independent_encodes_run_concurrently() {
    let trees: Vec<Element> = (0..8)
        .map(|i| nested_tree().with_attribute("worker", i.to_string()))
        .collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = trees
            .iter()
            .map(|t| s.spawn(move || from_bytes(&to_bytes(t).expect("encode")).expect("decode")))
            .collect();
        for (handle, tree) in handles.into_iter().zip(&trees) {
            assert_eq!(&handle.join().expect("thread"), tree);
        }
    });
}
