//! Script thread to GUI thread round trips through the bridge

mod common;

use benchvis_rs::bridge::{BridgeError, PlotSource};
use benchvis_rs::executor::PendingDialog;
use benchvis_rs::views::ViewContent;
use benchvis_rs::{DockArea, ViewId, ViewKind};
use common::builders::power_supply;
use common::mock_helpers::{pump_until, run_with_gui, DialogAnswer};
use std::thread;

#[test]
fn test_views_created_from_script_thread() {
    let (registry, bridge, mut executor) = common::setup();
    let psu = power_supply(&registry);
    let v = psu.channel("V").unwrap();
    let i = psu.channel("I").unwrap();
    let conf = psu.configurable("output1").unwrap();

    let device = psu.clone();
    let ids = run_with_gui(
        &mut executor,
        move || {
            let id = device.id().to_string();
            bridge.add_device_tab(device.clone()).unwrap();
            let plot = bridge
                .create_plot_view(&id, DockArea::Top, PlotSource::Channel(v.clone()))
                .unwrap();
            let power = bridge
                .create_power_panel_view(
                    &id,
                    DockArea::Left,
                    v.active_signal().unwrap(),
                    i.active_signal().unwrap(),
                )
                .unwrap();
            let control = bridge
                .create_control_view(&id, DockArea::Right, conf)
                .unwrap();
            vec![plot, power, control]
        },
        |_| DialogAnswer::Ignore,
    );

    let kinds: Vec<_> = ids.iter().map(|id| id.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            Some(ViewKind::ChannelPlot),
            Some(ViewKind::PowerPanel),
            Some(ViewKind::SourceSinkControl)
        ]
    );
    let tab = executor.workspace().tab(psu.id()).unwrap();
    assert_eq!(tab.views.len(), 3);
    assert_eq!(tab.view(&ids[2]).unwrap().area, DockArea::Right);
    assert!(executor.notices().is_empty());
}

#[test]
fn test_view_without_tab_yields_invalid_id_and_notice() {
    let (registry, bridge, mut executor) = common::setup();
    let psu = power_supply(&registry);
    let sig = psu.channel("V").unwrap().active_signal().unwrap();

    let id_for_device = psu.id().to_string();
    let id = run_with_gui(
        &mut executor,
        move || {
            bridge
                .create_data_view(&id_for_device, DockArea::Left, sig)
                .unwrap()
        },
        |_| DialogAnswer::Ignore,
    );

    assert!(!id.is_valid());
    assert_eq!(id, ViewId::invalid());
    assert_eq!(executor.notices().len(), 1);
}

#[test]
fn test_non_blocking_requests_apply_in_order() {
    let (registry, bridge, mut executor) = common::setup();
    let psu = power_supply(&registry);
    let v = psu.channel("V").unwrap().active_signal().unwrap();
    let i = psu.channel("I").unwrap().active_signal().unwrap();

    let device = psu.clone();
    let view_id = run_with_gui(
        &mut executor,
        move || {
            bridge.add_device_tab(device.clone()).unwrap();
            let id = bridge
                .create_plot_view(
                    device.id(),
                    DockArea::Top,
                    PlotSource::Xy { x: v.clone(), y: i.clone() },
                )
                .unwrap();
            bridge.add_signal_to_plot_view(device.id(), &id, v.clone()).unwrap();
            bridge
                .add_signals_to_xy_plot_view(device.id(), &id, i, v)
                .unwrap();
            id
        },
        |_| DialogAnswer::Ignore,
    );

    let view = executor.workspace().view(psu.id(), &view_id).unwrap();
    match &view.content {
        ViewContent::XyPlot { curves } => {
            assert_eq!(curves.len(), 3);
            assert_eq!(curves[1].x.display_name(), curves[0].x.display_name());
        }
        other => panic!("unexpected content {:?}", other),
    }
}

#[test]
fn test_dialogs_accept_decline_and_cancel() {
    let (_registry, bridge, mut executor) = common::setup();

    let (confirmed, declined, name, count) = run_with_gui(
        &mut executor,
        move || {
            let confirmed = bridge.show_message("Hello", "Continue?").unwrap();
            let declined = bridge.show_message("Hello", "Really?").unwrap();
            let name = bridge.show_string_input("Name", "Name:", "A").unwrap();
            let count = bridge.show_int_input("Count", "n", 3, 1, 0, 10).unwrap();
            (confirmed, declined, name, count)
        },
        {
            let mut seen = 0;
            move |dialog| {
                seen += 1;
                match (seen, dialog) {
                    (1, PendingDialog::Message { .. }) => DialogAnswer::Accept,
                    (2, PendingDialog::Message { .. }) => DialogAnswer::Cancel,
                    (3, PendingDialog::StringInput { value, .. }) => {
                        value.push_str("BC");
                        DialogAnswer::Accept
                    }
                    (_, PendingDialog::IntInput { .. }) => DialogAnswer::Cancel,
                    (n, other) => panic!("unexpected dialog #{}: {:?}", n, other),
                }
            }
        },
    );

    assert!(confirmed);
    assert!(!declined);
    assert_eq!(name.as_deref(), Some("ABC"));
    assert_eq!(count, None);
}

#[test]
fn test_timed_out_dialog_is_withdrawn() {
    let (_registry, bridge, mut executor) = common::setup();
    let bridge = bridge.with_timeout(Some(common::test_timeout()));

    let script_bridge = bridge.clone();
    let value = run_with_gui(
        &mut executor,
        move || {
            script_bridge
                .show_double_input("Gain", "dB", 1.0, 1, 0.1, -10.0, 10.0)
                .unwrap()
        },
        |_| DialogAnswer::Ignore,
    );
    assert_eq!(value, None);

    // The late dialog is dropped on the next frame and cannot be answered
    executor.process_pending();
    assert_eq!(executor.pending_dialogs(), 0);

    // The context is free again
    let accepted = run_with_gui(
        &mut executor,
        move || bridge.show_message("Again", "ok").unwrap(),
        |_| DialogAnswer::Accept,
    );
    assert!(accepted);
}

#[test]
fn test_second_blocking_call_is_rejected() {
    let (_registry, bridge, mut executor) = common::setup();

    let script_bridge = bridge.clone();
    let handle = thread::spawn(move || script_bridge.show_message("First", "wait").unwrap());
    pump_until(&mut executor, |exec| exec.pending_dialogs() == 1);

    assert_eq!(
        bridge.show_message("Second", "nope"),
        Err(BridgeError::CallInFlight)
    );
    // A separate context is not affected
    assert_eq!(bridge.new_context().timeout(), bridge.timeout());

    executor.accept_dialog();
    assert!(handle.join().unwrap());
}

#[test]
fn test_gui_gone_disconnects_bridge() {
    let (_registry, bridge, executor) = common::setup();
    drop(executor);

    assert_eq!(
        bridge.show_message("t", "x"),
        Err(BridgeError::Disconnected)
    );
}
