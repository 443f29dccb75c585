//! Property tests for reconciliation invariants under arbitrary fragment
//! event sequences.

use proptest::prelude::*;

use hashpane_core::{PaneId, RawConfig, fragment};
use hashpane_engine::{Effect, Gate, Input, OverlayWidget};

fn pane_id(n: u16) -> PaneId {
    PaneId::parse(&format!("{n:03}")).unwrap()
}

fn list_widget(multi: bool) -> OverlayWidget {
    let raw: RawConfig = serde_json::from_str(&format!(
        r#"{{
            "dashboard": "main", "multi_mode": {multi},
            "embedders": [{{"embed_id": "001"}}, {{"embed_id": "002"}}, {{"embed_id": "003"}}]
        }}"#
    ))
    .unwrap();
    OverlayWidget::new(raw).unwrap()
}

/// Sequences of fragment payloads over a small ID universe, including IDs
/// with no definition.
fn fragment_sequences() -> impl Strategy<Value = Vec<Vec<u16>>> {
    prop::collection::vec(prop::collection::vec(1u16..=6, 0..5), 1..16)
}

fn sorted(mut ids: Vec<PaneId>) -> Vec<PaneId> {
    ids.sort();
    ids.dedup();
    ids
}

proptest! {
    /// Multi capacity: after every event the open set is exactly the set the
    /// fragment names, and replaying the same fragment is silent.
    #[test]
    fn multi_open_set_tracks_the_fragment(seq in fragment_sequences()) {
        let mut gate = Gate::new();
        let mut w = list_widget(true);
        w.mount(&mut gate);

        for ids in &seq {
            let frag = fragment::encode(&ids.iter().map(|&n| pane_id(n)).collect::<Vec<_>>());
            w.handle(&mut gate, Input::FragmentChanged(frag.clone()));
            prop_assert_eq!(
                sorted(w.open_panes().to_vec()),
                sorted(fragment::decode(&frag))
            );

            let fx = w.handle(&mut gate, Input::FragmentChanged(frag));
            prop_assert!(fx.is_empty(), "replay produced {fx:?}");
        }
    }

    /// Single capacity: any fragment converges within one rewrite echo to at
    /// most one open pane, with no further rewrites and no oscillation.
    #[test]
    fn single_capacity_converges(seq in fragment_sequences()) {
        let mut gate = Gate::new();
        let mut w = list_widget(false);
        w.mount(&mut gate);

        for ids in &seq {
            let frag = fragment::encode(&ids.iter().map(|&n| pane_id(n)).collect::<Vec<_>>());
            let fx = w.handle(&mut gate, Input::FragmentChanged(frag.clone()));

            let settled = match fx.iter().find_map(|e| match e {
                Effect::WriteFragment(f) => Some(f.clone()),
                _ => None,
            }) {
                Some(echo) => {
                    let fx = w.handle(&mut gate, Input::FragmentChanged(echo.clone()));
                    prop_assert!(
                        !fx.iter().any(|e| matches!(e, Effect::WriteFragment(_))),
                        "echo rewrote again"
                    );
                    echo
                }
                None => frag,
            };

            prop_assert!(w.open_panes().len() <= 1);
            let fx = w.handle(&mut gate, Input::FragmentChanged(settled));
            prop_assert!(fx.is_empty(), "settled replay produced {fx:?}");
        }
    }

    /// A visibility blink in the middle of any session preserves the open
    /// set and reloads nothing.
    #[test]
    fn visibility_blink_is_lossless(seq in fragment_sequences()) {
        let mut gate = Gate::new();
        let mut w = list_widget(true);
        w.mount(&mut gate);

        for ids in &seq {
            let frag = fragment::encode(&ids.iter().map(|&n| pane_id(n)).collect::<Vec<_>>());
            w.handle(&mut gate, Input::FragmentChanged(frag));

            let before = w.open_panes().to_vec();
            w.handle(&mut gate, Input::ViewVisibility(false));
            prop_assert_eq!(w.open_panes(), before.as_slice());
            let fx = w.handle(&mut gate, Input::ViewVisibility(true));
            prop_assert_eq!(w.open_panes(), before.as_slice());
            prop_assert!(
                !fx.iter().any(|e| matches!(e, Effect::LoadContent { .. })),
                "restore reloaded content"
            );
        }
    }
}
