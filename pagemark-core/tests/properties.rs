//! Property tests for the codec, estimator and reconciliation

use chrono::{DateTime, TimeZone, Utc};
use pagemark_core::codec::{decode, encode};
use pagemark_core::document::ContentNode;
use pagemark_core::reconcile::{reconcile_restore, reconcile_store};
use pagemark_core::{
    estimate, DeviceReadingState, LibraryColumns, LibraryReadingState, PathStep, Position,
    ReadStatus, SpineDocument, SpineEntry, SyncPolicy,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn spine() -> SpineDocument {
    SpineDocument::new(
        (0..5)
            .map(|i| SpineEntry::new(format!("OEBPS/text/part{}.xhtml", i), 40))
            .collect(),
    )
    .with_root("OEBPS/text/")
}

fn step() -> impl Strategy<Value = PathStep> {
    (1u32..40, proptest::option::of("[a-z][a-z0-9_-]{0,8}")).prop_map(|(index, anchor)| {
        match anchor {
            Some(anchor) => PathStep::new(index).with_anchor(anchor),
            None => PathStep::new(index),
        }
    })
}

/// Bookmarks as a device writes them
fn device_mark() -> impl Strategy<Value = String> {
    (
        0usize..5,
        prop::collection::vec(step(), 1..8),
        proptest::option::of(0u32..5000),
    )
        .prop_map(|(file, mut steps, offset)| {
            // the device never writes an unanchored leading 2
            if steps[0].index == 2 && steps[0].anchor.is_none() {
                steps[0].index = 1;
            }
            let path: String = steps.iter().map(|s| format!("/{}", s)).collect();
            let offset = offset.map(|o| format!(":{}", o)).unwrap_or_default();
            format!("part{}.xhtml#point({}{})", file, path, offset)
        })
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z ]{1,30}"]
}

fn node(depth: u32) -> BoxedStrategy<ContentNode> {
    let leaf = (text(), text()).prop_map(|(t, tail)| ContentNode::new("span").with_text(t).with_tail(tail));
    if depth == 0 {
        return leaf.boxed();
    }
    (text(), text(), prop::collection::vec(node(depth - 1), 0..4))
        .prop_map(|(t, tail, children)| {
            let mut node = ContentNode::new("div").with_text(t).with_tail(tail);
            node.children = children;
            node
        })
        .boxed()
}

fn timestamp() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    proptest::option::of((0i64..2_000_000).prop_map(|minutes| {
        Utc.timestamp_opt(1_500_000_000 + minutes * 60, 0).unwrap()
    }))
}

fn read_status() -> impl Strategy<Value = ReadStatus> {
    prop_oneof![
        Just(ReadStatus::Unread),
        Just(ReadStatus::Reading),
        Just(ReadStatus::Finished)
    ]
}

fn device_state() -> impl Strategy<Value = DeviceReadingState> {
    (
        proptest::option::of(device_mark()),
        read_status(),
        proptest::option::of(0u8..=100),
        timestamp(),
    )
        .prop_map(|(mark, read_status, raw_percent, last_read)| DeviceReadingState {
            mark,
            read_status,
            raw_percent,
            last_read,
            native_format: true,
        })
}

fn library_state() -> impl Strategy<Value = LibraryReadingState> {
    (
        proptest::option::of(device_mark()),
        proptest::option::of(0u8..=100),
        timestamp(),
    )
        .prop_map(|(bookmark, percent_read, last_read)| LibraryReadingState {
            bookmark,
            percent_read,
            last_read,
        })
}

fn policy() -> impl Strategy<Value = SyncPolicy> {
    prop::collection::vec(any::<bool>(), 7).prop_map(|f| SyncPolicy {
        clear_if_device_unread: f[0],
        store_only_if_more_recent: f[1],
        skip_if_library_finished: f[2],
        set_reading_status_on_restore: f[3],
        reset_position_on_restore: f[4],
        stamp_now_on_restore: f[5],
        run_in_background: f[6],
    })
}

// =============================================================================
// Codec
// =============================================================================

proptest! {
    #[test]
    fn encode_inverts_decode(mark in device_mark()) {
        let spine = spine();
        let position = decode(&spine, &mark).unwrap();
        prop_assert_eq!(encode(&spine, &position).unwrap(), mark);
    }

    #[test]
    fn decode_inverts_encode(mark in device_mark()) {
        let spine = spine();
        let position = decode(&spine, &mark).unwrap();
        let again = decode(&spine, &encode(&spine, &position).unwrap()).unwrap();
        prop_assert_eq!(again, position);
    }
}

// =============================================================================
// Estimator
// =============================================================================

proptest! {
    #[test]
    fn estimate_stays_in_bounds(
        body in node(3),
        spine_index in 0usize..5,
        steps in prop::collection::vec(1u32..12, 0..6),
        offset in proptest::option::of(0u32..500),
    ) {
        let spine = spine();
        let trees = vec![body; 5];
        let mut path = vec![PathStep::new(2), PathStep::new(4)];
        path.extend(steps.into_iter().map(PathStep::new));
        let mut position = Position::new(spine_index, path);
        position.text_offset = offset;

        let percent = estimate(&spine, &trees, &position).unwrap();
        prop_assert!((0.0..=100.0).contains(&percent), "out of bounds: {}", percent);
    }

    #[test]
    fn estimate_grows_with_spine_index(
        body in node(2),
        steps in prop::collection::vec(1u32..8, 0..4),
        offset in 0u32..200,
        a in 0usize..5,
        b in 0usize..5,
    ) {
        let spine = spine();
        let trees = vec![body; 5];
        let mut path = vec![PathStep::new(2), PathStep::new(4)];
        path.extend(steps.into_iter().map(PathStep::new));

        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let at = |index| {
            let position = Position::new(index, path.clone()).with_offset(offset);
            estimate(&spine, &trees, &position).unwrap()
        };
        prop_assert!(at(low) <= at(high) + 1e-9);
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

proptest! {
    #[test]
    fn store_is_pure(
        device in device_state(),
        library in library_state(),
        policy in policy(),
    ) {
        let columns = LibraryColumns::all();
        let first = reconcile_store(9, "content", &device, &library, &columns, &policy);
        let second = reconcile_store(9, "content", &device, &library, &columns, &policy);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn restore_is_pure(
        device in device_state(),
        library in library_state(),
        policy in policy(),
    ) {
        let columns = LibraryColumns::all();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let first = reconcile_restore(9, Some(("content", &device)), &library, &columns, &policy, now);
        let second = reconcile_restore(9, Some(("content", &device)), &library, &columns, &policy, now);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn finished_device_always_stores_100(
        mut device in device_state(),
        library in library_state(),
        mark in device_mark(),
    ) {
        device.mark = Some(mark);
        device.read_status = ReadStatus::Finished;
        let result = reconcile_store(
            9,
            "content",
            &device,
            &library,
            &LibraryColumns::all(),
            &SyncPolicy::default(),
        )
        .unwrap();
        match result.new_state {
            Some(pagemark_core::types::NewState::Library { candidate, .. }) => {
                prop_assert_eq!(candidate.percent_read, Some(100));
            }
            other => prop_assert!(false, "unexpected state {:?}", other),
        }
    }
}
