//! End-to-end overlay sessions driven through the public widget API: a
//! minimal host loop that echoes fragment rewrites back in and settles
//! content loads on demand.

use hashpane_core::{PaneId, RawConfig};
use hashpane_engine::{ContentDescriptor, Effect, Gate, Input, LoadError, OverlayWidget};

fn id(s: &str) -> PaneId {
    PaneId::parse(s).unwrap()
}

fn widget(json: &str) -> OverlayWidget {
    let raw: RawConfig = serde_json::from_str(json).expect("raw config parses");
    OverlayWidget::new(raw).expect("config is valid")
}

fn list_widget(multi: bool) -> OverlayWidget {
    widget(&format!(
        r#"{{
            "dashboard": "main", "multi_mode": {multi},
            "embedders": [{{"embed_id": "001"}}, {{"embed_id": "002"}}]
        }}"#
    ))
}

/// Send a fragment and echo every rewrite back in, like a host's location
/// bar would. Returns all effects from the whole exchange.
fn drive(w: &mut OverlayWidget, gate: &mut Gate, frag: &str) -> Vec<Effect> {
    let mut all = w.handle(gate, Input::FragmentChanged(frag.to_string()));
    for _ in 0..4 {
        let echo = all.iter().rev().find_map(|e| match e {
            Effect::WriteFragment(f) => Some(f.clone()),
            _ => None,
        });
        let Some(echo) = echo else { break };
        let fx = w.handle(gate, Input::FragmentChanged(echo));
        if fx.is_empty() {
            break;
        }
        all.extend(fx);
    }
    all
}

fn count<F: Fn(&Effect) -> bool>(fx: &[Effect], f: F) -> usize {
    fx.iter().filter(|e| f(e)).count()
}

fn settle_ok(w: &mut OverlayWidget, gate: &mut Gate, fx: &[Effect]) -> Vec<Effect> {
    let mut out = Vec::new();
    for e in fx {
        if let Effect::LoadContent { token, source, id, .. } = e {
            out.extend(w.handle(
                gate,
                Input::ContentResolved {
                    token: *token,
                    result: Ok(ContentDescriptor {
                        source: source.clone(),
                        id: *id,
                        title: None,
                    }),
                },
            ));
        }
    }
    out
}

#[test]
fn open_resolve_close_reopen_reuses_everything() {
    let mut gate = Gate::new();
    let mut w = list_widget(false);
    w.mount(&mut gate);

    let fx = drive(&mut w, &mut gate, "#embed_001");
    assert_eq!(w.open_panes(), &[id("001")]);
    assert_eq!(count(&fx, |e| matches!(e, Effect::LoadContent { .. })), 1);
    let fx = settle_ok(&mut w, &mut gate, &fx);
    assert_eq!(count(&fx, |e| matches!(e, Effect::MountContent { .. })), 1);

    let fx = drive(&mut w, &mut gate, "");
    assert!(w.open_panes().is_empty());
    assert_eq!(count(&fx, |e| matches!(e, Effect::HideLayer(_))), 1);
    assert_eq!(count(&fx, |e| matches!(e, Effect::RemoveLayer(_))), 0);

    // Reopen: pure show, no remount, no reload.
    let fx = drive(&mut w, &mut gate, "#embed_001");
    assert_eq!(count(&fx, |e| matches!(e, Effect::ShowLayer(_))), 1);
    assert_eq!(count(&fx, |e| matches!(e, Effect::MountLayer { .. })), 0);
    assert_eq!(count(&fx, |e| matches!(e, Effect::LoadContent { .. })), 0);
}

#[test]
fn multi_capacity_opens_independent_roots() {
    let mut gate = Gate::new();
    let mut w = list_widget(true);
    w.mount(&mut gate);

    let fx = drive(&mut w, &mut gate, "#embed_001,002");
    assert_eq!(w.open_panes(), &[id("001"), id("002")]);
    assert_eq!(
        count(&fx, |e| matches!(
            e,
            Effect::MountLayer { kind: hashpane_engine::LayerKind::PaneRoot(_), .. }
        )),
        2
    );
    assert_eq!(count(&fx, |e| matches!(e, Effect::LoadContent { .. })), 2);
    assert_eq!(count(&fx, |e| matches!(e, Effect::WriteFragment(_))), 0);

    // Dropping one ID closes only that pane.
    let fx = drive(&mut w, &mut gate, "#embed_001");
    assert_eq!(w.open_panes(), &[id("001")]);
    assert_eq!(count(&fx, |e| matches!(e, Effect::HideLayer(_))), 1);
}

#[test]
fn single_capacity_converges_to_the_last_id_in_two_cycles() {
    let mut gate = Gate::new();
    let mut w = list_widget(false);
    w.mount(&mut gate);

    let first = w.handle(&mut gate, Input::FragmentChanged("#embed_001,002".into()));
    assert_eq!(
        first,
        vec![Effect::WriteFragment("#embed_002".into())],
        "cycle one only rewrites"
    );

    let second = w.handle(&mut gate, Input::FragmentChanged("#embed_002".into()));
    assert_eq!(w.open_panes(), &[id("002")]);
    assert_eq!(count(&second, |e| matches!(e, Effect::WriteFragment(_))), 0);

    // Converged: the same fragment again is silent.
    let third = w.handle(&mut gate, Input::FragmentChanged("#embed_002".into()));
    assert!(third.is_empty());
}

#[test]
fn redundant_instances_share_one_owner() {
    let mut gate = Gate::new();
    let mut a = list_widget(false);
    let mut b = list_widget(false);
    a.mount(&mut gate);
    b.mount(&mut gate);
    assert!(a.is_owner(&gate));
    assert!(!b.is_owner(&gate));

    // Only the owner emits effects for the same event.
    let fx_a = drive(&mut a, &mut gate, "#embed_001");
    let fx_b = drive(&mut b, &mut gate, "#embed_001");
    assert!(!fx_a.is_empty());
    assert!(fx_b.is_empty());

    // The owner leaves mid-session; the survivor takes over and can serve
    // the fragment with its own definitions.
    a.unmount(&mut gate);
    assert!(b.is_owner(&gate));
    let fx = drive(&mut b, &mut gate, "#embed_002");
    assert_eq!(b.open_panes(), &[id("002")]);
    assert_eq!(count(&fx, |e| matches!(e, Effect::LoadContent { .. })), 1);
}

#[test]
fn undefined_id_shows_an_error_panel_and_closes_normally() {
    let mut gate = Gate::new();
    let mut w = list_widget(true);
    w.mount(&mut gate);

    let fx = drive(&mut w, &mut gate, "#embed_001,042");
    assert_eq!(w.open_panes(), &[id("001"), id("042")]);
    assert_eq!(count(&fx, |e| matches!(e, Effect::RenderError { .. })), 1);
    assert_eq!(count(&fx, |e| matches!(e, Effect::LoadContent { .. })), 1);

    let fx = drive(&mut w, &mut gate, "#embed_001");
    assert_eq!(w.open_panes(), &[id("001")]);
    assert_eq!(count(&fx, |e| matches!(e, Effect::HideLayer(_))), 1);
}

#[test]
fn failed_load_is_recovered_inline() {
    let mut gate = Gate::new();
    let mut w = list_widget(false);
    w.mount(&mut gate);

    let fx = drive(&mut w, &mut gate, "#embed_001");
    let token = fx
        .iter()
        .find_map(|e| match e {
            Effect::LoadContent { token, .. } => Some(*token),
            _ => None,
        })
        .expect("open starts a load");

    let fx = w.handle(
        &mut gate,
        Input::ContentResolved {
            token,
            result: Err(LoadError::SourceNotFound {
                id: id("001"),
                dashboard: "main".into(),
            }),
        },
    );
    assert_eq!(count(&fx, |e| matches!(e, Effect::RenderError { .. })), 1);
    // An error panel is a valid open state; closing follows the normal path.
    assert_eq!(w.open_panes(), &[id("001")]);
    let fx = drive(&mut w, &mut gate, "");
    assert_eq!(count(&fx, |e| matches!(e, Effect::HideLayer(_))), 1);
}

#[test]
fn session_teardown_removes_shared_layers_exactly_once() {
    let mut gate = Gate::new();
    let mut a = list_widget(false);
    let mut b = list_widget(false);
    a.mount(&mut gate);
    b.mount(&mut gate);

    let fx = a.unmount(&mut gate);
    assert_eq!(count(&fx, |e| matches!(e, Effect::RemoveLayer(_))), 0);
    assert!(gate.layers_mounted());

    let fx = b.unmount(&mut gate);
    assert_eq!(count(&fx, |e| matches!(e, Effect::RemoveLayer(_))), 3);
    assert!(!gate.layers_mounted());
    assert_eq!(gate.ref_count(), 0);

    // Idempotent: a second unmount adds nothing.
    let fx = b.unmount(&mut gate);
    assert!(fx.is_empty());
}

#[test]
fn default_visible_survives_the_startup_check() {
    let mut gate = Gate::new();
    let mut w = widget(
        r#"{
            "dashboard": "main",
            "embedders": [{"embed_id": "004", "default_visible": true}]
        }"#,
    );
    let fx = w.mount(&mut gate);
    assert_eq!(count(&fx, |e| matches!(e, Effect::WriteFragment(_))), 0);
    let fx = settle_ok(&mut w, &mut gate, &fx);
    assert_eq!(count(&fx, |e| matches!(e, Effect::MountContent { .. })), 1);

    // The deferred startup check sees an empty fragment and leaves the
    // default-visible pane alone.
    let fx = drive(&mut w, &mut gate, "");
    assert_eq!(count(&fx, |e| matches!(e, Effect::HideLayer(_))), 0);
}

#[test]
fn sibling_notification_round_trip() {
    let mut gate = Gate::new();
    // Two isolated local widgets sharing a visual scope.
    let mut a = widget(r#"{"dashboard": "main", "embed_id": "001", "portal_mode": "local"}"#);
    let mut b = widget(r#"{"dashboard": "main", "embed_id": "002", "portal_mode": "local"}"#);
    a.mount(&mut gate);
    b.mount(&mut gate);
    drive(&mut b, &mut gate, "#embed_002");
    assert_eq!(b.open_panes(), &[id("002")]);

    // A opens; the host relays the HideSiblings effect to B.
    let fx = drive(&mut a, &mut gate, "#embed_001");
    assert_eq!(count(&fx, |e| matches!(e, Effect::HideSiblings)), 1);
    let fx = b.handle(&mut gate, Input::SiblingOpened);
    assert!(b.open_panes().is_empty());
    assert!(fx.iter().any(|e| matches!(e, Effect::HideLayer(_))));
}
