//! Block-level behavior: rack pass-through and event buffer semantics.

use ensemble::core::client::EngineClient;
use ensemble::core::consts::{PATCHBAY_EVENT_COUNT, RACK_EVENT_COUNT};
use ensemble::core::plugin::{new_internal_plugin, PluginInit, PluginInstance};
use ensemble::prelude::*;
use ensemble::{EngineEvent, EngineShared, EventBuffer, ProcessMode};

#[test]
fn empty_rack_passes_inputs_through() {
    let shared = EngineShared::new(ProcessMode::ContinuousRack);
    shared.set_geometry(512, 48_000.0);

    let mut in_l = vec![1.0f32; 512];
    let mut in_r = vec![-1.0f32; 512];
    let mut out_l = vec![0.0f32; 512];
    let mut out_r = vec![0.0f32; 512];

    shared.process_rack(
        &mut [&mut in_l, &mut in_r],
        &mut [&mut out_l, &mut out_r],
        512,
    );

    assert!(out_l.iter().all(|&s| s == 1.0));
    assert!(out_r.iter().all(|&s| s == -1.0));
    assert_eq!(shared.time().snapshot().frame, 512);
}

#[test]
fn event_buffer_write_then_read_round_trips() {
    let mut buf = EventBuffer::new(PATCHBAY_EVENT_COUNT);

    for time in 0..3u32 {
        assert!(buf.write_control(time, 2, ControlEventKind::Parameter, 7, 0.25 * time as f64));
    }

    assert_eq!(buf.count(), 3);

    for time in 0..3u32 {
        match buf.get(time as usize).copied().unwrap() {
            EngineEvent::Control {
                time: t,
                channel,
                kind,
                param,
                value,
            } => {
                assert_eq!(t, time);
                assert_eq!(channel, 2);
                assert_eq!(kind, ControlEventKind::Parameter);
                assert_eq!(param, 7);
                assert_eq!(value, 0.25 * time as f64);
            }
            other => panic!("expected control event, got {other:?}"),
        }
    }

    assert!(buf.get(3).unwrap().is_null());
}

#[test]
fn rack_ports_share_the_engine_bus() {
    let shared = EngineShared::new(ProcessMode::ContinuousRack);
    let bus = shared.rack_bus().clone();

    let client = EngineClient::new(EngineType::Null, ProcessMode::ContinuousRack, Some(bus.clone()));
    let out_port = client.add_port(PortKind::Event, "events-out", false);
    let in_port = client.add_port(PortKind::Event, "events-in", true);

    let out_port = out_port.as_event().unwrap();
    let in_port = in_port.as_event().unwrap();

    // the output port writes the shared output bus
    out_port.write_midi(0, 1, 0, &[0x90, 64, 100]);
    out_port.write_control(1, 0, ControlEventKind::MidiProgram, 5, 0.0);
    unsafe {
        assert_eq!(bus.buffer(false).count(), 2);
    }

    // the input port reads the shared input bus, fed by the driver
    unsafe {
        bus.buffer_mut(true)
            .write_control(0, 0, ControlEventKind::Parameter, 10, 1.0);
    }
    assert_eq!(in_port.event_count(), 1);

    match in_port.get_event(0) {
        EngineEvent::Control { param, value, .. } => {
            assert_eq!(param, 10);
            assert_eq!(value, 1.0);
        }
        other => panic!("expected control event, got {other:?}"),
    }
    assert!(in_port.get_event(RACK_EVENT_COUNT as u32).is_null());
}

#[test]
fn gain_chain_processes_and_meters() {
    let shared = EngineShared::new(ProcessMode::ContinuousRack);
    shared.set_geometry(64, 48_000.0);

    for (i, name) in ["g1", "g2"].iter().enumerate() {
        let client = EngineClient::new(
            EngineType::Null,
            ProcessMode::ContinuousRack,
            Some(shared.rack_bus().clone()),
        );
        let init = PluginInit {
            id: i as u32,
            name,
            label: "gain",
            filename: "",
            client: &client,
        };
        let (control, unit) = new_internal_plugin(&init).unwrap();
        client.activate();
        shared.table().install(PluginInstance {
            control,
            unit,
            client,
        });
    }

    let mut in_l = vec![0.5f32; 64];
    let mut in_r = vec![0.25f32; 64];
    let mut out_l = vec![0.0f32; 64];
    let mut out_r = vec![0.0f32; 64];

    shared.process_rack(
        &mut [&mut in_l, &mut in_r],
        &mut [&mut out_l, &mut out_r],
        64,
    );

    assert!(out_l.iter().all(|&s| s == 0.5));
    assert!(out_r.iter().all(|&s| s == 0.25));

    assert_eq!(shared.table().input_peak(0, 0), 0.5);
    assert_eq!(shared.table().input_peak(0, 1), 0.25);
    assert_eq!(shared.table().output_peak(1, 0), 0.5);

    // constant signals measure the same in RMS
    assert!((shared.table().input_rms(0, 0) - 0.5).abs() < 1e-6);
    assert!((shared.table().output_rms(1, 1) - 0.25).abs() < 1e-6);

    // the UI report consumes the accumulated peaks
    let (ins, _) = shared.table().consume_peaks(0);
    assert_eq!(ins[0], 0.5);
    assert_eq!(shared.table().input_peak(0, 0), 0.0);
}

#[test]
fn geometry_changes_fan_out_to_plugins() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Probe {
        last_buffer_size: Arc<AtomicU32>,
    }

    impl PluginUnit for Probe {
        fn process(&mut self, _i: &[&[f32]], _o: &mut [&mut [f32]], _f: usize) {}
        fn buffer_size_changed(&mut self, new_buffer_size: u32) {
            self.last_buffer_size.store(new_buffer_size, Ordering::Relaxed);
        }
    }

    let shared = EngineShared::new(ProcessMode::ContinuousRack);
    shared.set_geometry(512, 48_000.0);

    let seen = Arc::new(AtomicU32::new(0));
    let client = EngineClient::new(EngineType::Null, ProcessMode::ContinuousRack, None);
    let init = PluginInit {
        id: 0,
        name: "probe",
        label: "noop",
        filename: "",
        client: &client,
    };
    let (control, _unit) = new_internal_plugin(&init).unwrap();
    shared.table().install(PluginInstance {
        control,
        unit: Box::new(Probe {
            last_buffer_size: seen.clone(),
        }),
        client,
    });

    let mut in_l = vec![0.0f32; 16];
    let mut in_r = vec![0.0f32; 16];
    let mut out_l = vec![0.0f32; 16];
    let mut out_r = vec![0.0f32; 16];

    shared.process_rack(
        &mut [&mut in_l, &mut in_r],
        &mut [&mut out_l, &mut out_r],
        16,
    );
    assert_eq!(seen.load(std::sync::atomic::Ordering::Relaxed), 512);

    shared.set_geometry(1024, 48_000.0);
    shared.process_rack(
        &mut [&mut in_l, &mut in_r],
        &mut [&mut out_l, &mut out_r],
        16,
    );
    assert_eq!(seen.load(std::sync::atomic::Ordering::Relaxed), 1024);
}
