use docop_core::serializer::{
    deserialize, deserialize_from_string, serialize, serialize_to_string,
};
use docop_core::{
    ArrayOperation, CoordinateOperation, Error, ObjectOperation, Path, TextOperation,
    TransformOptions,
};
use proptest::prelude::*;
use serde_json::{json, Value};

const BASE: &str = "Lorem ipsum dolor sit amet";

fn base_chars() -> usize {
    BASE.chars().count()
}

/// Operations valid against `BASE`; deletes carry the real substring so they
/// behave like operations recorded from a live document.
fn text_op() -> impl Strategy<Value = TextOperation> {
    let n = base_chars();
    prop_oneof![
        (0..=n, "[a-z]{1,4}").prop_map(|(pos, text)| TextOperation::insert(pos, text)),
        (0..n)
            .prop_flat_map(move |pos| (Just(pos), 1..=(n - pos)))
            .prop_map(|(pos, len)| {
                let text: String = BASE.chars().skip(pos).take(len).collect();
                TextOperation::delete(pos, text)
            }),
    ]
}

fn base_items() -> Vec<Value> {
    (0..6).map(|n| json!(n)).collect()
}

fn array_op() -> impl Strategy<Value = ArrayOperation> {
    prop_oneof![
        (0..=6usize, 0..100i64).prop_map(|(pos, v)| ArrayOperation::insert(pos, json!(v))),
        (0..6usize).prop_map(|pos| ArrayOperation::delete(pos, base_items()[pos].clone())),
    ]
}

fn small_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(|s| json!(s)),
        any::<bool>().prop_map(|b| json!(b)),
    ]
}

fn path() -> impl Strategy<Value = Path> {
    prop::collection::vec("[a-z][a-z0-9]{0,3}", 1..4).prop_map(Path::new)
}

fn object_op() -> impl Strategy<Value = ObjectOperation> {
    prop_oneof![
        (path(), small_value()).prop_map(|(p, v)| ObjectOperation::create(p, v).unwrap()),
        (path(), small_value()).prop_map(|(p, v)| ObjectOperation::delete(p, v).unwrap()),
        (path(), small_value(), small_value())
            .prop_map(|(p, o, v)| ObjectOperation::set(p, o, v).unwrap()),
        (path(), text_op()).prop_map(|(p, t)| ObjectOperation::update(p, t).unwrap()),
        (path(), array_op()).prop_map(|(p, a)| ObjectOperation::update(p, a).unwrap()),
        (path(), any::<i32>()).prop_map(|(p, d)| {
            ObjectOperation::update(p, CoordinateOperation::shift(d as i64)).unwrap()
        }),
    ]
}

proptest! {
    #[test]
    fn text_transform_converges(a in text_op(), b in text_op()) {
        let (a2, b2) = TextOperation::transform(&a, &b, TransformOptions::default()).unwrap();
        let ab = b2.apply(&a.apply(BASE).unwrap()).unwrap();
        let ba = a2.apply(&b.apply(BASE).unwrap()).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn text_invert_round_trips(a in text_op()) {
        let applied = a.apply(BASE).unwrap();
        prop_assert_eq!(a.invert().apply(&applied).unwrap(), BASE);
    }

    #[test]
    fn text_conflict_matches_strict_mode(a in text_op(), b in text_op()) {
        let strict = TextOperation::transform(&a, &b, TransformOptions::strict());
        prop_assert_eq!(a.has_conflict(&b), matches!(strict, Err(Error::Conflict(_))));
    }

    #[test]
    fn array_transform_converges(a in array_op(), b in array_op()) {
        let base = base_items();
        let (a2, b2) = ArrayOperation::transform(&a, &b, TransformOptions::default()).unwrap();
        let ab = b2.apply(&a.apply(&base).unwrap()).unwrap();
        let ba = a2.apply(&b.apply(&base).unwrap()).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn array_invert_round_trips(a in array_op()) {
        let base = base_items();
        let applied = a.apply(&base).unwrap();
        prop_assert_eq!(a.invert().apply(&applied).unwrap(), base);
    }

    #[test]
    fn wire_round_trip_preserves_operations(op in object_op()) {
        let tokens = serialize(&op).unwrap();
        prop_assert_eq!(&deserialize(&tokens).unwrap(), &op);
        let record = serialize_to_string(&op).unwrap();
        prop_assert_eq!(&deserialize_from_string(&record).unwrap(), &op);
    }

    #[test]
    fn conflict_soundness(a in object_op(), b in object_op()) {
        let strict = ObjectOperation::transform(&a, &b, TransformOptions::strict());
        match strict {
            Err(Error::Conflict(_)) => prop_assert!(a.has_conflict(&b)),
            _ => prop_assert!(!a.has_conflict(&b)),
        }
    }

    #[test]
    fn object_invert_is_an_involution(op in object_op()) {
        prop_assert_eq!(&op.invert().invert(), &op);
    }
}
