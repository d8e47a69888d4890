//! End-to-end engine scenarios over the dummy driver.

use ensemble::prelude::*;
use ensemble::{BinaryType, OptionKind, PluginType, ProcessMode};

fn rack_engine(client_name: &str) -> Engine {
    let mut engine = Engine::new_by_driver_name("Dummy").expect("dummy driver");
    engine.set_option(OptionKind::PreferredSampleRate, 48_000, "");
    engine.set_option(OptionKind::PreferredBufferSize, 512, "");
    engine.init(client_name).expect("engine init");
    engine
}

fn add_noop(engine: &mut Engine, name: &str) -> u32 {
    engine
        .add_plugin(BinaryType::Native, PluginType::Internal, "null", Some(name), "noop")
        .expect("add internal plugin")
}

#[test]
fn add_remove_compacts_ids() {
    let mut engine = rack_engine("add-remove");
    assert!(engine.is_running());
    assert_eq!(engine.sample_rate(), 48_000.0);
    assert_eq!(engine.buffer_size(), 512);

    let first = add_noop(&mut engine, "a");
    assert_eq!(first, 0);
    let second = add_noop(&mut engine, "b");
    assert_eq!(second, 1);

    engine.remove_plugin(0).unwrap();

    assert_eq!(engine.current_plugin_count(), 1);
    let survivor = engine.plugin(0).expect("remaining plugin");
    assert_eq!(survivor.id(), 0);
    assert_eq!(survivor.info().name, "b");

    engine.close().unwrap();
}

#[test]
fn callbacks_fire_on_add_and_remove() {
    use std::sync::{Arc, Mutex};

    let mut engine = rack_engine("callbacks");
    let seen: Arc<Mutex<Vec<(CallbackAction, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    engine.set_callback(Box::new(move |action, id, _, _, _, _| {
        sink.lock().unwrap().push((action, id));
    }));

    let id = add_noop(&mut engine, "x");
    engine.remove_plugin(id).unwrap();
    engine.close().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], (CallbackAction::PluginAdded, 0));
    assert_eq!(seen[1], (CallbackAction::PluginRemoved, 0));
}

#[test]
fn capacity_bounds_are_enforced() {
    let mut engine = rack_engine("capacity");
    let max = engine.max_plugin_number();

    for i in 0..max {
        assert_eq!(add_noop(&mut engine, &format!("p{i}")), i);
    }

    let err = engine
        .add_plugin(BinaryType::Native, PluginType::Internal, "null", None, "noop")
        .unwrap_err();
    assert!(matches!(err, ensemble::Error::AtCapacity));
    assert!(!engine.last_error().is_empty());

    // one slot frees up, the next add succeeds and lands at the top
    engine.remove_plugin(3).unwrap();
    assert_eq!(add_noop(&mut engine, "again"), max - 1);

    engine.close().unwrap();
}

#[test]
fn unique_names_count_up() {
    let mut engine = rack_engine("naming");
    add_noop(&mut engine, "synth");
    add_noop(&mut engine, "synth");

    let names = engine.plugin_names();
    assert_eq!(names, ["synth", "synth (2)"]);

    let mut derived = Vec::new();
    for _ in 0..8 {
        let name = engine.get_new_unique_plugin_name("synth");
        derived.push(name.clone());
        add_noop(&mut engine, &name);
    }

    assert_eq!(derived.first().map(String::as_str), Some("synth (3)"));
    assert_eq!(derived.last().map(String::as_str), Some("synth (10)"));

    engine.close().unwrap();
}

#[test]
fn option_gating_while_running() {
    let mut engine = rack_engine("options");

    assert!(!engine.set_option(OptionKind::ProcessMode, 3, ""));
    assert_eq!(engine.options().process_mode, ProcessMode::ContinuousRack);
    assert!(!engine.last_error().is_empty());

    // bridge paths stay settable while running
    assert!(engine.set_option(OptionKind::PathBridgeNative, 0, "/opt/bridge"));
    assert_eq!(engine.options().bridge_native, "/opt/bridge");

    engine.close().unwrap();

    // once stopped the mode can change
    assert!(engine.set_option(OptionKind::ProcessMode, 3, ""));
    assert_eq!(engine.options().process_mode, ProcessMode::Patchbay);
}

#[test]
fn removing_unknown_plugin_reports_not_found() {
    let mut engine = rack_engine("missing");
    let err = engine.remove_plugin(5).unwrap_err();
    assert!(matches!(err, ensemble::Error::PluginNotFound(5)));
    engine.close().unwrap();
}

#[test]
fn unknown_loaders_set_last_error_verbatim() {
    let mut engine = rack_engine("loader");
    let err = engine
        .add_plugin(BinaryType::Native, PluginType::Sf2, "piano.sf2", None, "piano")
        .unwrap_err();

    assert!(matches!(err, ensemble::Error::LoaderFailed(_)));
    assert!(engine.last_error().contains("SF2"));
    engine.close().unwrap();
}

#[test]
fn project_save_lists_active_plugins_in_order() {
    let mut engine = rack_engine("project");
    engine
        .add_plugin(BinaryType::Native, PluginType::Internal, "", Some("first"), "gain")
        .unwrap();
    add_noop(&mut engine, "second");

    let dir = std::env::temp_dir().join("ensemble-it");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("session.carxp");

    engine.save_project(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("<CARLA-PRESET VERSION='0.5.0'>"));
    let first = contents.find("<Name>first</Name>").unwrap();
    let second = contents.find("<Name>second</Name>").unwrap();
    assert!(first < second);

    engine.load_project(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    engine.close().unwrap();
}

#[test]
fn meter_snapshot_reads_silence_for_idle_engine() {
    let mut engine = rack_engine("meters");
    let id = engine
        .add_plugin(BinaryType::Native, PluginType::Internal, "", None, "gain")
        .unwrap();

    // the dummy driver feeds silence, so every level stays at zero
    std::thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(engine.meter_snapshot(id), ensemble::MeterSnapshot::default());
    assert_eq!(engine.input_peak(id, 0), 0.0);

    engine.close().unwrap();
}

#[test]
fn host_builder_round_trip() {
    let mut host = Host::builder()
        .driver("Dummy")
        .client_name("builder-test")
        .process_mode(ProcessMode::ContinuousRack)
        .buffer_size(256)
        .sample_rate(44_100)
        .build()
        .unwrap();

    let id = host
        .engine_mut()
        .add_plugin(BinaryType::Native, PluginType::Internal, "", None, "gain")
        .unwrap();
    assert_eq!(id, 0);
    assert_eq!(host.engine().current_plugin_count(), 1);

    host.close().unwrap();
}
