//! Shared state of a loopback server: clients, port graph, transport and clock.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use ponte_core::config::{validate_client_name, validate_port_name, CLIENT_NAME_SIZE};
use ponte_core::lockfree::AtomicFloat;
use ponte_core::{
    ClientOptions, Error, Frames, LatencyMode, PortDirection, PortHandle, PortId, PortInfo,
    PortKind, Result, ServerCallbacks, TransportPosition,
};

use crate::notifier::{self, Delivery, Event};
use crate::transport::TransportClock;

pub(crate) type ClientId = u64;

/// Name of the pseudo client owning the physical ports.
pub(crate) const SYSTEM_CLIENT: &str = "system";

struct ClientEntry {
    name: String,
    callbacks: Arc<dyn ServerCallbacks>,
    active: bool,
}

struct PortEntry {
    info: PortInfo,
    /// `None` for physical ports.
    owner: Option<ClientId>,
}

fn no_retired() -> Arc<[PortInfo]> {
    Arc::from(Vec::new())
}

struct State {
    running: bool,
    sample_rate: u32,
    buffer_size: Frames,
    freewheeling: bool,
    clients: BTreeMap<ClientId, ClientEntry>,
    next_client: ClientId,
    ports: BTreeMap<PortId, PortEntry>,
    next_port: PortId,
    /// Source, destination.
    connections: Vec<(PortId, PortId)>,
    transport: TransportClock,
    frame_time: Frames,
    last_frame_time: Frames,
    notifier: Option<Sender<Delivery>>,
}

impl State {
    fn client(&self, id: ClientId) -> Result<&ClientEntry> {
        if !self.running {
            return Err(Error::ServerGone);
        }
        self.clients.get(&id).ok_or(Error::ServerGone)
    }

    fn client_mut(&mut self, id: ClientId) -> Result<&mut ClientEntry> {
        if !self.running {
            return Err(Error::ServerGone);
        }
        self.clients.get_mut(&id).ok_or(Error::ServerGone)
    }

    fn name_taken(&self, name: &str) -> bool {
        self.clients.values().any(|client| client.name == name)
            || self
                .ports
                .values()
                .any(|port| port.info.client_name() == name)
    }

    fn unique_name(&self, name: &str, exact: bool) -> Result<String> {
        if !self.name_taken(name) {
            return Ok(name.to_string());
        }
        if exact {
            return Err(Error::NameTaken(name.to_string()));
        }
        (1..100)
            .map(|n| format!("{}-{:02}", name, n))
            .find(|candidate| candidate.len() < CLIENT_NAME_SIZE && !self.name_taken(candidate))
            .ok_or_else(|| Error::NameTaken(name.to_string()))
    }

    fn find_by_name(&self, full_name: &str) -> Option<(PortId, PortInfo)> {
        self.ports
            .iter()
            .find(|(_, port)| port.info.full_name == full_name)
            .map(|(id, port)| (*id, port.info.clone()))
    }

    fn add_port(
        &mut self,
        info_for: impl FnOnce(PortHandle) -> PortInfo,
        owner: Option<ClientId>,
    ) -> (PortId, PortInfo) {
        let id = self.next_port;
        self.next_port += 1;
        let info = info_for(PortHandle::new(u64::from(id)));
        self.ports.insert(
            id,
            PortEntry {
                info: info.clone(),
                owner,
            },
        );
        (id, info)
    }

    fn send(&self, client: &ClientEntry, event: Event, retired: &Arc<[PortInfo]>) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(Delivery::Notify {
                target: Arc::clone(&client.callbacks),
                event,
                retired: Arc::clone(retired),
            });
        }
    }

    fn broadcast(&self, event: Event, retired: &Arc<[PortInfo]>, except: Option<ClientId>) {
        for (id, client) in &self.clients {
            if Some(*id) != except {
                self.send(client, event.clone(), retired);
            }
        }
    }

    fn graph_changed(&self, retired: &Arc<[PortInfo]>) {
        self.broadcast(Event::GraphOrder, retired, None);
        self.broadcast(Event::Latency(LatencyMode::Capture), retired, None);
        self.broadcast(Event::Latency(LatencyMode::Playback), retired, None);
    }

    /// Disconnect and remove `ids`, notifying every remaining client.
    fn retire_ports(&mut self, ids: &[PortId]) {
        let retired: Arc<[PortInfo]> = ids
            .iter()
            .filter_map(|id| self.ports.get(id).map(|port| port.info.clone()))
            .collect::<Vec<_>>()
            .into();

        let (dropped, kept): (Vec<(PortId, PortId)>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|(a, b)| ids.contains(a) || ids.contains(b));
        self.connections = kept;
        for &(a, b) in &dropped {
            self.broadcast(
                Event::PortConnect {
                    a,
                    b,
                    connected: false,
                },
                &retired,
                None,
            );
        }
        if !dropped.is_empty() {
            self.graph_changed(&retired);
        }

        for &id in ids {
            if self.ports.remove(&id).is_some() {
                self.broadcast(
                    Event::PortRegistration {
                        id,
                        registered: false,
                    },
                    &retired,
                    None,
                );
            }
        }
    }

    fn endpoints(&self, source: &str, destination: &str) -> Result<(PortId, PortId)> {
        let (a, src) = self
            .find_by_name(source)
            .ok_or_else(|| Error::NoSuchPort(source.to_string()))?;
        let (b, dst) = self
            .find_by_name(destination)
            .ok_or_else(|| Error::NoSuchPort(destination.to_string()))?;
        if src.direction != PortDirection::Output || dst.direction != PortDirection::Input {
            return Err(Error::InvalidDirection {
                from: source.to_string(),
                to: destination.to_string(),
            });
        }
        if src.kind != dst.kind {
            return Err(Error::TypeMismatch {
                from: source.to_string(),
                to: destination.to_string(),
            });
        }
        Ok((a, b))
    }
}

/// Layout of the physical ports owned by the `system` pseudo client.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SystemPorts {
    pub audio_capture: usize,
    pub audio_playback: usize,
    pub midi_capture: usize,
    pub midi_playback: usize,
}

pub(crate) struct Engine {
    state: Mutex<State>,
    cpu_load: AtomicFloat,
    realtime: bool,
    started: Instant,
    this: Weak<Engine>,
}

impl Engine {
    pub(crate) fn new(
        sample_rate: u32,
        buffer_size: Frames,
        realtime: bool,
        system: SystemPorts,
    ) -> Arc<Self> {
        let mut state = State {
            running: true,
            sample_rate,
            buffer_size,
            freewheeling: false,
            clients: BTreeMap::new(),
            next_client: 1,
            ports: BTreeMap::new(),
            next_port: 1,
            connections: Vec::new(),
            transport: TransportClock::default(),
            frame_time: 0,
            last_frame_time: 0,
            notifier: None,
        };

        let physical = [
            ("capture", PortKind::Audio, PortDirection::Output, system.audio_capture),
            ("playback", PortKind::Audio, PortDirection::Input, system.audio_playback),
            ("midi_capture", PortKind::Midi, PortDirection::Output, system.midi_capture),
            ("midi_playback", PortKind::Midi, PortDirection::Input, system.midi_playback),
        ];
        for (prefix, kind, direction, count) in physical {
            for n in 1..=count {
                let full_name = format!("{}:{}_{}", SYSTEM_CLIENT, prefix, n);
                state.add_port(
                    |handle| PortInfo::new(handle, full_name, kind, direction).physical(),
                    None,
                );
            }
        }

        Arc::new_cyclic(|this| Self {
            state: Mutex::new(state),
            cpu_load: AtomicFloat::new(0.0),
            realtime,
            started: Instant::now(),
            this: this.clone(),
        })
    }

    // ------------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------------

    pub(crate) fn open(
        &self,
        name: &str,
        options: ClientOptions,
        callbacks: Arc<dyn ServerCallbacks>,
    ) -> Result<(ClientId, String)> {
        validate_client_name(name)?;
        let mut state = self.state.lock();
        if !state.running {
            return Err(Error::ServerUnavailable(
                "loopback server has shut down".to_string(),
            ));
        }
        if state.notifier.is_none() {
            let tx = notifier::spawn(self.this.clone())
                .map_err(|e| Error::Backend(format!("failed to start notifier thread: {}", e)))?;
            state.notifier = Some(tx);
        }

        let granted = state.unique_name(name, options.use_exact_name)?;
        let id = state.next_client;
        state.next_client += 1;
        let entry = ClientEntry {
            name: granted.clone(),
            callbacks,
            active: false,
        };
        state.send(&entry, Event::ThreadInit, &no_retired());
        state.clients.insert(id, entry);
        state.broadcast(
            Event::ClientRegistration {
                name: granted.clone(),
                registered: true,
            },
            &no_retired(),
            Some(id),
        );

        if granted != name {
            tracing::debug!("Loopback client '{}' opened as '{}'", name, granted);
        } else {
            tracing::debug!("Loopback client '{}' opened", granted);
        }
        Ok((id, granted))
    }

    pub(crate) fn close(&self, id: ClientId) -> Result<()> {
        let mut state = self.state.lock();
        state.client(id)?;
        let Some(entry) = state.clients.remove(&id) else {
            return Err(Error::ServerGone);
        };

        let owned: Vec<PortId> = state
            .ports
            .iter()
            .filter(|(_, port)| port.owner == Some(id))
            .map(|(port_id, _)| *port_id)
            .collect();
        state.retire_ports(&owned);
        state.broadcast(
            Event::ClientRegistration {
                name: entry.name.clone(),
                registered: false,
            },
            &no_retired(),
            None,
        );

        tracing::debug!("Loopback client '{}' closed", entry.name);
        Ok(())
    }

    pub(crate) fn set_active(&self, id: ClientId, active: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.client_mut(id)?.active = active;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Ports and connections
    // ------------------------------------------------------------------------

    pub(crate) fn register_port(
        &self,
        id: ClientId,
        short_name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> Result<PortInfo> {
        let mut state = self.state.lock();
        let client_name = state.client(id)?.name.clone();
        validate_port_name(&client_name, short_name)?;
        let full_name = format!("{}:{}", client_name, short_name);
        if state.find_by_name(&full_name).is_some() {
            return Err(Error::PortExists(full_name));
        }

        let (port_id, info) = state.add_port(
            |handle| PortInfo::new(handle, full_name, kind, direction),
            Some(id),
        );
        state.broadcast(
            Event::PortRegistration {
                id: port_id,
                registered: true,
            },
            &no_retired(),
            None,
        );
        Ok(info)
    }

    pub(crate) fn unregister_port(&self, id: ClientId, handle: PortHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.client(id)?;
        let missing = || Error::NoSuchPort(format!("handle {}", handle.raw()));
        let port_id = PortId::try_from(handle.raw()).map_err(|_| missing())?;
        let port = state.ports.get(&port_id).ok_or_else(missing)?;
        if port.owner != Some(id) {
            return Err(Error::NotOwner(port.info.full_name.clone()));
        }
        state.retire_ports(&[port_id]);
        Ok(())
    }

    pub(crate) fn connect(&self, id: ClientId, source: &str, destination: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.client(id)?;
        let (a, b) = state.endpoints(source, destination)?;
        if state.connections.contains(&(a, b)) {
            return Err(Error::AlreadyConnected {
                from: source.to_string(),
                to: destination.to_string(),
            });
        }
        state.connections.push((a, b));
        state.broadcast(
            Event::PortConnect {
                a,
                b,
                connected: true,
            },
            &no_retired(),
            None,
        );
        state.graph_changed(&no_retired());
        tracing::debug!("Loopback connected {} -> {}", source, destination);
        Ok(())
    }

    pub(crate) fn disconnect(&self, id: ClientId, source: &str, destination: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.client(id)?;
        let (a, b) = state.endpoints(source, destination)?;
        let Some(index) = state.connections.iter().position(|edge| *edge == (a, b)) else {
            return Err(Error::NotConnected {
                from: source.to_string(),
                to: destination.to_string(),
            });
        };
        state.connections.remove(index);
        state.broadcast(
            Event::PortConnect {
                a,
                b,
                connected: false,
            },
            &no_retired(),
            None,
        );
        state.graph_changed(&no_retired());
        tracing::debug!("Loopback disconnected {} -> {}", source, destination);
        Ok(())
    }

    pub(crate) fn port_names(&self, id: ClientId) -> Result<Vec<String>> {
        let state = self.state.lock();
        state.client(id)?;
        Ok(state
            .ports
            .values()
            .map(|port| port.info.full_name.clone())
            .collect())
    }

    pub(crate) fn port_by_name(&self, id: ClientId, full_name: &str) -> Option<PortInfo> {
        let state = self.state.lock();
        state.client(id).ok()?;
        state.find_by_name(full_name).map(|(_, info)| info)
    }

    pub(crate) fn lookup_id(&self, port: PortId) -> Option<PortInfo> {
        self.state
            .lock()
            .ports
            .get(&port)
            .map(|entry| entry.info.clone())
    }

    // ------------------------------------------------------------------------
    // Transport and clock
    // ------------------------------------------------------------------------

    pub(crate) fn start_transport(&self, id: ClientId) -> Result<()> {
        let mut state = self.state.lock();
        state.client(id)?;
        state.transport.start();
        Ok(())
    }

    pub(crate) fn stop_transport(&self, id: ClientId) -> Result<()> {
        let mut state = self.state.lock();
        state.client(id)?;
        state.transport.stop();
        Ok(())
    }

    pub(crate) fn query_transport(&self, id: ClientId) -> Result<TransportPosition> {
        let state = self.state.lock();
        state.client(id)?;
        Ok(state.transport.position(state.sample_rate, self.usecs()))
    }

    pub(crate) fn reposition_transport(
        &self,
        id: ClientId,
        position: &TransportPosition,
    ) -> Result<()> {
        if let Some(bbt) = &position.bbt {
            bbt.validate()?;
        }
        let mut state = self.state.lock();
        state.client(id)?;
        state.transport.reposition(position);
        Ok(())
    }

    pub(crate) fn sample_rate(&self, id: ClientId) -> Result<u32> {
        let state = self.state.lock();
        state.client(id)?;
        Ok(state.sample_rate)
    }

    pub(crate) fn buffer_size(&self, id: ClientId) -> Result<Frames> {
        let state = self.state.lock();
        state.client(id)?;
        Ok(state.buffer_size)
    }

    pub(crate) fn cpu_load(&self, id: ClientId) -> Result<f32> {
        self.state.lock().client(id)?;
        Ok(self.cpu_load.get())
    }

    pub(crate) fn is_realtime(&self, id: ClientId) -> Result<bool> {
        self.state.lock().client(id)?;
        Ok(self.realtime)
    }

    pub(crate) fn frame_time(&self, id: ClientId) -> Result<Frames> {
        let state = self.state.lock();
        state.client(id)?;
        Ok(state.frame_time)
    }

    pub(crate) fn last_frame_time(&self, id: ClientId) -> Result<Frames> {
        let state = self.state.lock();
        state.client(id)?;
        Ok(state.last_frame_time)
    }

    fn usecs(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    /// Run one process cycle on the calling thread.
    pub(crate) fn run_cycle(&self) {
        let (targets, frames, sample_rate) = {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            state.transport.begin_cycle();
            state.last_frame_time = state.frame_time;
            let targets: Vec<Arc<dyn ServerCallbacks>> = state
                .clients
                .values()
                .filter(|client| client.active)
                .map(|client| Arc::clone(&client.callbacks))
                .collect();
            (targets, state.buffer_size, state.sample_rate)
        };

        let started = Instant::now();
        for target in &targets {
            target.process(frames);
        }
        let elapsed = started.elapsed().as_secs_f64();

        {
            let mut state = self.state.lock();
            state.transport.end_cycle(frames);
            state.frame_time = state.frame_time.wrapping_add(frames);
        }

        if sample_rate > 0 && frames > 0 {
            let period = frames as f64 / sample_rate as f64;
            self.cpu_load
                .set((elapsed / period * 100.0).clamp(0.0, 100.0) as f32);
        }
    }

    // ------------------------------------------------------------------------
    // Server-side events
    // ------------------------------------------------------------------------

    pub(crate) fn set_sample_rate(&self, rate: u32) {
        let mut state = self.state.lock();
        if !state.running || rate == 0 || state.sample_rate == rate {
            return;
        }
        state.sample_rate = rate;
        state.broadcast(Event::SampleRate(rate), &no_retired(), None);
    }

    pub(crate) fn set_buffer_size(&self, frames: Frames) {
        let mut state = self.state.lock();
        if !state.running || frames == 0 || state.buffer_size == frames {
            return;
        }
        state.buffer_size = frames;
        state.broadcast(Event::BufferSize(frames), &no_retired(), None);
    }

    pub(crate) fn set_freewheel(&self, freewheel: bool) {
        let mut state = self.state.lock();
        if !state.running || state.freewheeling == freewheel {
            return;
        }
        state.freewheeling = freewheel;
        state.broadcast(Event::Freewheel(freewheel), &no_retired(), None);
    }

    pub(crate) fn is_freewheeling(&self) -> bool {
        self.state.lock().freewheeling
    }

    pub(crate) fn report_xrun(&self) {
        let state = self.state.lock();
        if state.running {
            state.broadcast(Event::Xrun, &no_retired(), None);
        }
    }

    pub(crate) fn rename_port(&self, full_name: &str, new_short_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if !state.running {
            return Err(Error::ServerGone);
        }
        let (id, info) = state
            .find_by_name(full_name)
            .ok_or_else(|| Error::NoSuchPort(full_name.to_string()))?;
        let client = info.client_name().to_string();
        validate_port_name(&client, new_short_name)?;
        let new_name = format!("{}:{}", client, new_short_name);
        if new_name == full_name {
            return Ok(());
        }
        if state.find_by_name(&new_name).is_some() {
            return Err(Error::PortExists(new_name));
        }

        if let Some(entry) = state.ports.get_mut(&id) {
            entry.info.full_name = new_name.clone();
        }
        state.broadcast(
            Event::PortRename {
                id,
                old_name: full_name.to_string(),
                new_name,
            },
            &no_retired(),
            None,
        );
        Ok(())
    }

    pub(crate) fn shutdown(&self, reason: &str) {
        let mut state = self.state.lock();
        if !state.running {
            return;
        }
        state.broadcast(
            Event::Shutdown {
                reason: reason.to_string(),
            },
            &no_retired(),
            None,
        );
        state.running = false;
        state.clients.clear();
        state.ports.clear();
        state.connections.clear();
        tracing::info!("Loopback server shut down: {}", reason);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Block until every callback queued so far has been delivered.
    pub(crate) fn sync(&self) {
        let Some(tx) = self.state.lock().notifier.clone() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(Delivery::Barrier(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub(crate) fn clients(&self) -> Vec<String> {
        self.state
            .lock()
            .clients
            .values()
            .map(|client| client.name.clone())
            .collect()
    }

    pub(crate) fn connections(&self) -> Vec<(String, String)> {
        let state = self.state.lock();
        state
            .connections
            .iter()
            .filter_map(|(a, b)| {
                let source = state.ports.get(a)?;
                let destination = state.ports.get(b)?;
                Some((
                    source.info.full_name.clone(),
                    destination.info.full_name.clone(),
                ))
            })
            .collect()
    }
}
