//! Property-based round-trip coverage: whatever the packer writes, the
//! unpacker reads back unchanged, across arbitrary scalar values and
//! container contents.

use std::collections::BTreeMap;

use codec::mem::MemBody;
use codec::Message;
use proptest::prelude::*;
use types::{ObjectPath, Variant};

fn fresh_message() -> Message {
    MemBody::signal(&ObjectPath::new("/prop"), "org.example.Prop", "Case")
}

fn arb_variant() -> impl Strategy<Value = Variant> {
    prop_oneof![
        any::<String>().prop_map(Variant::String),
        any::<bool>().prop_map(Variant::Bool),
        any::<u8>().prop_map(Variant::Byte),
        any::<i16>().prop_map(Variant::Int16),
        any::<u16>().prop_map(Variant::UInt16),
        any::<i32>().prop_map(Variant::Int32),
        any::<u32>().prop_map(Variant::UInt32),
        any::<i64>().prop_map(Variant::Int64),
        any::<u64>().prop_map(Variant::UInt64),
        // NaN never compares equal; stick to finite doubles
        (-1.0e12f64..1.0e12).prop_map(Variant::Double),
    ]
}

proptest! {
    #[test]
    fn scalars_round_trip(a in any::<u32>(), b in any::<i64>(), c in any::<bool>(), s in any::<String>()) {
        let msg = fresh_message();
        let mut p = msg.packer().unwrap();
        p.arg(&a).unwrap().arg(&b).unwrap().arg(&c).unwrap().arg(s.as_str()).unwrap();

        let (mut oa, mut ob, mut oc, mut os) = (0u32, 0i64, false, String::new());
        let mut u = msg.unpacker();
        u.arg(&mut oa).unwrap().arg(&mut ob).unwrap().arg(&mut oc).unwrap().arg(&mut os).unwrap();

        prop_assert_eq!(oa, a);
        prop_assert_eq!(ob, b);
        prop_assert_eq!(oc, c);
        prop_assert_eq!(os, s);
    }

    #[test]
    fn u32_sequences_round_trip(v in proptest::collection::vec(any::<u32>(), 0..16)) {
        let msg = fresh_message();
        msg.pack(&v).unwrap();

        let mut out: Vec<u32> = Vec::new();
        msg.unpack(&mut out).unwrap();
        prop_assert_eq!(out, v);
    }

    #[test]
    fn string_maps_round_trip(m in proptest::collection::btree_map(any::<String>(), any::<i32>(), 0..8)) {
        let msg = fresh_message();
        msg.pack(&m).unwrap();

        let mut out: BTreeMap<String, i32> = BTreeMap::new();
        msg.unpack(&mut out).unwrap();
        prop_assert_eq!(out, m);
    }

    #[test]
    fn variants_round_trip(v in arb_variant()) {
        let msg = fresh_message();
        msg.pack(&v).unwrap();

        let mut out = Variant::default();
        msg.unpack(&mut out).unwrap();
        prop_assert_eq!(out, v);
    }
}
