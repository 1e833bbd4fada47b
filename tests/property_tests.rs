// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Property-based tests for fragment reassembly.
//!
//! These check that reassembly is order independent and that repeated or
//! re-cased fragments never inflate progress or complete a transfer twice.

use airgap_xrpl_signer::scan::{ReassemblySession, ReceiveOutcome};
use airgap_xrpl_signer::ur::UrEncoder;
use proptest::prelude::*;

/// A multi-part transfer: message, fragment length and a delivery order.
fn multi_part_transfer() -> impl Strategy<Value = (Vec<u8>, Vec<String>)> {
    (
        proptest::collection::vec(any::<u8>(), 64..600),
        10usize..60,
    )
        .prop_flat_map(|(message, max_len)| {
            let parts = UrEncoder::new("bytes", &message, max_len)
                .unwrap()
                .first_pass();
            (Just(message), Just(parts).prop_shuffle())
        })
}

proptest! {
    /// A single-part UR is forwarded as soon as it is scanned.
    #[test]
    fn prop_single_part_completes_immediately(
        message in proptest::collection::vec(any::<u8>(), 1..200)
    ) {
        let ur = UrEncoder::encode_single("bytes", &message).unwrap();
        let mut session = ReassemblySession::new();

        match session.receive(&ur) {
            ReceiveOutcome::Complete(resource) => {
                prop_assert_eq!(resource.ur_type, "bytes");
                prop_assert_eq!(resource.payload, message);
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
        prop_assert!(session.is_submitted());
        prop_assert_eq!(session.receive(&ur), ReceiveOutcome::AlreadySubmitted);
    }

    /// Any delivery order completes exactly on the last distinct part.
    #[test]
    fn prop_shuffled_parts_complete_with_full_count(
        (message, parts) in multi_part_transfer()
    ) {
        let total = parts.len();
        prop_assume!(total > 1);
        let mut session = ReassemblySession::new();

        for (i, part) in parts.iter().enumerate() {
            let outcome = session.receive(part);
            if i + 1 < total {
                match outcome {
                    ReceiveOutcome::Progress(progress) => {
                        prop_assert_eq!(progress.received, i + 1);
                        prop_assert_eq!(progress.total, total);
                        prop_assert!(progress.percent < 100);
                    }
                    other => prop_assert!(false, "part {} gave {:?}", i, other),
                }
            } else {
                match outcome {
                    ReceiveOutcome::Complete(resource) => {
                        prop_assert_eq!(&resource.payload, &message);
                    }
                    other => prop_assert!(false, "last part gave {:?}", other),
                }
            }
        }

        let progress = session.progress().unwrap();
        prop_assert_eq!(progress.received, total);
        prop_assert_eq!(progress.percent, 100);
    }

    /// Re-scanning a part, in any case, never advances progress or completes twice.
    #[test]
    fn prop_duplicates_do_not_count(
        (_message, parts) in multi_part_transfer(),
        repeats in proptest::collection::vec(any::<prop::sample::Index>(), 1..10)
    ) {
        let total = parts.len();
        prop_assume!(total > 1);
        let mut session = ReassemblySession::new();

        // Everything but the last part, with repeats mixed in.
        for part in &parts[..total - 1] {
            prop_assert!(matches!(session.receive(part), ReceiveOutcome::Progress(_)));
        }
        for index in &repeats {
            let part = index.get(&parts[..total - 1]);
            prop_assert_eq!(session.receive(part), ReceiveOutcome::Duplicate);
            prop_assert_eq!(session.receive(&part.to_uppercase()), ReceiveOutcome::Duplicate);
        }
        prop_assert_eq!(session.progress().unwrap().received, total - 1);
        prop_assert_eq!(session.seen_count(), total - 1);

        let completed = matches!(session.receive(&parts[total - 1]), ReceiveOutcome::Complete(_));
        prop_assert!(completed);
        for part in &parts {
            prop_assert_eq!(session.receive(part), ReceiveOutcome::AlreadySubmitted);
        }
    }
}
