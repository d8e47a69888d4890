//! The typed control surface: one method per outbound message.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::thread::JoinHandle;

use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::error::{OscError, Result};
use crate::sender::OscSender;

/// Owner of the sender thread. Created once per engine; hand out
/// [`SurfaceHandle`]s to anything that needs to emit messages.
pub struct ControlSurface {
    handle: SurfaceHandle,
    worker: JoinHandle<()>,
}

impl ControlSurface {
    /// Connect to a UI at `target`, messages addressed under `base_path`
    /// (e.g. `"/Ensemble"`).
    pub fn connect(target: impl ToSocketAddrs, base_path: &str) -> Result<Self> {
        let target: SocketAddr = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| OscError::InvalidAddress("no address resolved".into()))?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let (sender, worker) = OscSender::spawn(socket, target);

        Ok(Self {
            handle: SurfaceHandle {
                sender,
                base_path: base_path.trim_end_matches('/').to_owned(),
            },
            worker,
        })
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle.clone()
    }

    /// Packets dropped because the queue was full.
    pub fn dropped_count(&self) -> usize {
        self.handle.sender.dropped_count()
    }

    /// Flush and stop the sender thread. Outstanding [`SurfaceHandle`]s must
    /// be dropped first or this will wait on them.
    pub fn close(self) {
        drop(self.handle);
        let _ = self.worker.join();
    }
}

/// Cheap cloneable sending handle.
#[derive(Clone)]
pub struct SurfaceHandle {
    sender: OscSender,
    base_path: String,
}

impl SurfaceHandle {
    fn send(&self, path: &str, args: Vec<OscType>) {
        let msg = OscMessage {
            addr: format!("{}/{}", self.base_path, path),
            args,
        };

        match encoder::encode(&OscPacket::Message(msg)) {
            Ok(packet) => self.sender.enqueue(packet),
            Err(err) => tracing::warn!(path, "OSC encode failed: {err}"),
        }
    }

    // -- control namespace --------------------------------------------------

    pub fn add_plugin_start(&self, plugin_id: i32, name: &str) {
        self.send(
            "add_plugin_start",
            vec![OscType::Int(plugin_id), OscType::String(name.into())],
        );
    }

    pub fn add_plugin_end(&self, plugin_id: i32) {
        self.send("add_plugin_end", vec![OscType::Int(plugin_id)]);
    }

    pub fn remove_plugin(&self, plugin_id: i32) {
        self.send("remove_plugin", vec![OscType::Int(plugin_id)]);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_plugin_data(
        &self,
        plugin_id: i32,
        plugin_type: i32,
        category: i32,
        hints: i32,
        real_name: &str,
        label: &str,
        maker: &str,
        copyright: &str,
        unique_id: i64,
    ) {
        self.send(
            "set_plugin_data",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(plugin_type),
                OscType::Int(category),
                OscType::Int(hints),
                OscType::String(real_name.into()),
                OscType::String(label.into()),
                OscType::String(maker.into()),
                OscType::String(copyright.into()),
                OscType::Long(unique_id),
            ],
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_plugin_ports(
        &self,
        plugin_id: i32,
        audio_ins: i32,
        audio_outs: i32,
        midi_ins: i32,
        midi_outs: i32,
        c_ins: i32,
        c_outs: i32,
        c_totals: i32,
    ) {
        self.send(
            "set_plugin_ports",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(audio_ins),
                OscType::Int(audio_outs),
                OscType::Int(midi_ins),
                OscType::Int(midi_outs),
                OscType::Int(c_ins),
                OscType::Int(c_outs),
                OscType::Int(c_totals),
            ],
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_parameter_data(
        &self,
        plugin_id: i32,
        index: i32,
        param_type: i32,
        hints: i32,
        name: &str,
        label: &str,
        current: f64,
    ) {
        self.send(
            "set_parameter_data",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::Int(param_type),
                OscType::Int(hints),
                OscType::String(name.into()),
                OscType::String(label.into()),
                OscType::Double(current),
            ],
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_parameter_ranges(
        &self,
        plugin_id: i32,
        index: i32,
        min: f64,
        max: f64,
        default: f64,
        step: f64,
        step_small: f64,
        step_large: f64,
    ) {
        self.send(
            "set_parameter_ranges",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::Double(min),
                OscType::Double(max),
                OscType::Double(default),
                OscType::Double(step),
                OscType::Double(step_small),
                OscType::Double(step_large),
            ],
        );
    }

    pub fn set_parameter_midi_cc(&self, plugin_id: i32, index: i32, cc: i32) {
        self.send(
            "set_parameter_midi_cc",
            vec![OscType::Int(plugin_id), OscType::Int(index), OscType::Int(cc)],
        );
    }

    pub fn set_parameter_midi_channel(&self, plugin_id: i32, index: i32, channel: i32) {
        self.send(
            "set_parameter_midi_channel",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::Int(channel),
            ],
        );
    }

    pub fn set_parameter_value(&self, plugin_id: i32, index: i32, value: f64) {
        self.send(
            "set_parameter_value",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::Double(value),
            ],
        );
    }

    pub fn set_default_value(&self, plugin_id: i32, index: i32, value: f64) {
        self.send(
            "set_default_value",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::Double(value),
            ],
        );
    }

    pub fn set_program(&self, plugin_id: i32, index: i32) {
        self.send(
            "set_program",
            vec![OscType::Int(plugin_id), OscType::Int(index)],
        );
    }

    pub fn set_program_count(&self, plugin_id: i32, count: i32) {
        self.send(
            "set_program_count",
            vec![OscType::Int(plugin_id), OscType::Int(count)],
        );
    }

    pub fn set_program_name(&self, plugin_id: i32, index: i32, name: &str) {
        self.send(
            "set_program_name",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::String(name.into()),
            ],
        );
    }

    pub fn set_midi_program(&self, plugin_id: i32, index: i32) {
        self.send(
            "set_midi_program",
            vec![OscType::Int(plugin_id), OscType::Int(index)],
        );
    }

    pub fn set_midi_program_count(&self, plugin_id: i32, count: i32) {
        self.send(
            "set_midi_program_count",
            vec![OscType::Int(plugin_id), OscType::Int(count)],
        );
    }

    pub fn set_midi_program_data(
        &self,
        plugin_id: i32,
        index: i32,
        bank: i32,
        program: i32,
        name: &str,
    ) {
        self.send(
            "set_midi_program_data",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(index),
                OscType::Int(bank),
                OscType::Int(program),
                OscType::String(name.into()),
            ],
        );
    }

    pub fn note_on(&self, plugin_id: i32, channel: i32, note: i32, velocity: i32) {
        self.send(
            "note_on",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(channel),
                OscType::Int(note),
                OscType::Int(velocity),
            ],
        );
    }

    pub fn note_off(&self, plugin_id: i32, channel: i32, note: i32) {
        self.send(
            "note_off",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(channel),
                OscType::Int(note),
            ],
        );
    }

    pub fn set_input_peak_value(&self, plugin_id: i32, port_id: i32, value: f64) {
        self.send(
            "set_input_peak_value",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(port_id),
                OscType::Double(value),
            ],
        );
    }

    pub fn set_output_peak_value(&self, plugin_id: i32, port_id: i32, value: f64) {
        self.send(
            "set_output_peak_value",
            vec![
                OscType::Int(plugin_id),
                OscType::Int(port_id),
                OscType::Double(value),
            ],
        );
    }

    pub fn exit(&self) {
        self.send("exit", Vec::new());
    }

    // -- bridge namespace ---------------------------------------------------

    pub fn bridge_audio_count(&self, ins: i32, outs: i32, total: i32) {
        self.send(
            "bridge_audio_count",
            vec![OscType::Int(ins), OscType::Int(outs), OscType::Int(total)],
        );
    }

    pub fn bridge_midi_count(&self, ins: i32, outs: i32, total: i32) {
        self.send(
            "bridge_midi_count",
            vec![OscType::Int(ins), OscType::Int(outs), OscType::Int(total)],
        );
    }

    pub fn bridge_parameter_count(&self, ins: i32, outs: i32, total: i32) {
        self.send(
            "bridge_parameter_count",
            vec![OscType::Int(ins), OscType::Int(outs), OscType::Int(total)],
        );
    }

    pub fn bridge_program_count(&self, count: i32) {
        self.send("bridge_program_count", vec![OscType::Int(count)]);
    }

    pub fn bridge_midi_program_count(&self, count: i32) {
        self.send("bridge_midi_program_count", vec![OscType::Int(count)]);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn bridge_plugin_info(
        &self,
        category: i32,
        hints: i32,
        name: &str,
        label: &str,
        maker: &str,
        copyright: &str,
        unique_id: i64,
    ) {
        self.send(
            "bridge_plugin_info",
            vec![
                OscType::Int(category),
                OscType::Int(hints),
                OscType::String(name.into()),
                OscType::String(label.into()),
                OscType::String(maker.into()),
                OscType::String(copyright.into()),
                OscType::Long(unique_id),
            ],
        );
    }

    pub fn bridge_parameter_info(&self, index: i32, name: &str, unit: &str) {
        self.send(
            "bridge_parameter_info",
            vec![
                OscType::Int(index),
                OscType::String(name.into()),
                OscType::String(unit.into()),
            ],
        );
    }

    pub fn bridge_parameter_data(
        &self,
        index: i32,
        param_type: i32,
        rindex: i32,
        hints: i32,
        midi_channel: i32,
        midi_cc: i32,
    ) {
        self.send(
            "bridge_parameter_data",
            vec![
                OscType::Int(index),
                OscType::Int(param_type),
                OscType::Int(rindex),
                OscType::Int(hints),
                OscType::Int(midi_channel),
                OscType::Int(midi_cc),
            ],
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn bridge_parameter_ranges(
        &self,
        index: i32,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
        step_small: f64,
        step_large: f64,
    ) {
        self.send(
            "bridge_parameter_ranges",
            vec![
                OscType::Int(index),
                OscType::Double(default),
                OscType::Double(min),
                OscType::Double(max),
                OscType::Double(step),
                OscType::Double(step_small),
                OscType::Double(step_large),
            ],
        );
    }

    pub fn bridge_program_info(&self, index: i32, name: &str) {
        self.send(
            "bridge_program_info",
            vec![OscType::Int(index), OscType::String(name.into())],
        );
    }

    pub fn bridge_midi_program_info(&self, index: i32, bank: i32, program: i32, label: &str) {
        self.send(
            "bridge_midi_program_info",
            vec![
                OscType::Int(index),
                OscType::Int(bank),
                OscType::Int(program),
                OscType::String(label.into()),
            ],
        );
    }

    pub fn bridge_configure(&self, key: &str, value: &str) {
        self.send(
            "bridge_configure",
            vec![OscType::String(key.into()), OscType::String(value.into())],
        );
    }

    pub fn bridge_set_parameter_value(&self, index: i32, value: f64) {
        self.send(
            "bridge_set_parameter_value",
            vec![OscType::Int(index), OscType::Double(value)],
        );
    }

    pub fn bridge_set_default_value(&self, index: i32, value: f64) {
        self.send(
            "bridge_set_default_value",
            vec![OscType::Int(index), OscType::Double(value)],
        );
    }

    pub fn bridge_set_program(&self, index: i32) {
        self.send("bridge_set_program", vec![OscType::Int(index)]);
    }

    pub fn bridge_set_midi_program(&self, index: i32) {
        self.send("bridge_set_midi_program", vec![OscType::Int(index)]);
    }

    pub fn bridge_set_custom_data(&self, data_type: &str, key: &str, value: &str) {
        self.send(
            "bridge_set_custom_data",
            vec![
                OscType::String(data_type.into()),
                OscType::String(key.into()),
                OscType::String(value.into()),
            ],
        );
    }

    pub fn bridge_set_chunk_data(&self, chunk_file: &str) {
        self.send(
            "bridge_set_chunk_data",
            vec![OscType::String(chunk_file.into())],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn recv_message(socket: &UdpSocket) -> OscMessage {
        let mut buf = [0u8; 2048];
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        match rosc::decoder::decode_udp(&buf[..len]).unwrap().1 {
            OscPacket::Message(msg) => msg,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn messages_carry_base_path_and_tags() {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let surface = ControlSurface::connect(rx.local_addr().unwrap(), "/Ensemble").unwrap();
        let handle = surface.handle();

        handle.add_plugin_start(3, "synth");
        let msg = recv_message(&rx);
        assert_eq!(msg.addr, "/Ensemble/add_plugin_start");
        assert_eq!(
            msg.args,
            vec![OscType::Int(3), OscType::String("synth".into())]
        );

        handle.set_parameter_value(0, 2, 0.5);
        let msg = recv_message(&rx);
        assert_eq!(msg.addr, "/Ensemble/set_parameter_value");
        assert_eq!(
            msg.args,
            vec![OscType::Int(0), OscType::Int(2), OscType::Double(0.5)]
        );

        handle.bridge_plugin_info(1, 0, "n", "l", "m", "c", 42);
        let msg = recv_message(&rx);
        assert_eq!(msg.addr, "/Ensemble/bridge_plugin_info");
        assert_eq!(msg.args.len(), 7);
        assert_eq!(msg.args[6], OscType::Long(42));

        handle.exit();
        let msg = recv_message(&rx);
        assert_eq!(msg.addr, "/Ensemble/exit");
        assert!(msg.args.is_empty());

        drop(handle);
        surface.close();
    }
}
