use std::collections::{HashMap, VecDeque};

use netsim_devices::{Host, Hub, Router, Switch};
use netsim_protocol::{Bit, IpPacket};
use netsim_wire::WireBoard;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SimParams;
use crate::error::SimError;
use crate::script::{Instruction, Op};

/// The four device kinds the driver dispatches over.
#[derive(Debug)]
pub(crate) enum DeviceSlot {
    Host(Host),
    Hub(Hub),
    Switch(Switch),
    Router(Router),
}

impl DeviceSlot {
    fn name(&self) -> &str {
        match self {
            DeviceSlot::Host(host) => host.name(),
            DeviceSlot::Hub(hub) => hub.name(),
            DeviceSlot::Switch(switch) => switch.name(),
            DeviceSlot::Router(router) => router.name(),
        }
    }

    fn ports(&self) -> usize {
        match self {
            DeviceSlot::Host(_) => 1,
            DeviceSlot::Hub(hub) => hub.ports(),
            DeviceSlot::Switch(switch) => switch.ports(),
            DeviceSlot::Router(router) => router.ports(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            DeviceSlot::Host(host) => host.is_active(),
            DeviceSlot::Hub(_) => false,
            DeviceSlot::Switch(switch) => switch.is_active(),
            DeviceSlot::Router(router) => router.is_active(),
        }
    }

    fn has_attachments(&self) -> bool {
        match self {
            DeviceSlot::Host(host) => host.is_attached(),
            DeviceSlot::Hub(hub) => hub.has_attachments(),
            DeviceSlot::Switch(switch) => switch.has_attachments(),
            DeviceSlot::Router(router) => router.has_attachments(),
        }
    }
}

/// One tick's `(received, sent)` wire values per port, for the hub and
/// switch transcript tables.
pub(crate) type PortRow = (u64, Vec<(Option<Bit>, Option<Bit>)>);

#[derive(Debug)]
pub(crate) struct DeviceEntry {
    pub(crate) slot: DeviceSlot,
    /// Fully disconnected devices are parked: they keep their state but
    /// are not ticked and do not hold the simulation open.
    pub(crate) parked: bool,
    pub(crate) port_rows: Vec<PortRow>,
}

/// The tick-driven driver: executes scripted instructions, advances every
/// device in the mandated phase order, and decides when the run is over.
#[derive(Debug)]
pub struct Simulation {
    params: SimParams,
    rng: ChaCha8Rng,
    board: WireBoard,
    pub(crate) entries: Vec<DeviceEntry>,
    names: HashMap<String, usize>,
    ports: HashMap<String, (usize, usize)>,
    pending: VecDeque<Instruction>,
    time: u64,
    end_delay: u64,
}

impl Simulation {
    pub fn new(params: SimParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            board: WireBoard::new(),
            entries: Vec::new(),
            names: HashMap::new(),
            ports: HashMap::new(),
            pending: VecDeque::new(),
            time: 0,
            end_delay: params.signal_time,
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Queue a parsed script. Instructions must already be sorted by time
    /// ([`crate::parse_script`] guarantees this).
    pub fn load_script(&mut self, instructions: Vec<Instruction>) {
        self.pending.extend(instructions);
    }

    /// Run to termination: until the script is exhausted, every port has
    /// drained, and the end-delay window has passed.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.still_running() {
            self.tick()?;
        }
        Ok(())
    }

    fn still_running(&mut self) -> bool {
        let busy = !self.pending.is_empty()
            || self
                .entries
                .iter()
                .any(|entry| !entry.parked && entry.slot.is_active());
        if !busy {
            self.end_delay = self.end_delay.saturating_sub(1);
        }
        self.end_delay > 0
    }

    /// One simulated tick, in the order everything else depends on:
    /// instructions, wire reset, host transmit, hub fixpoint, switch and
    /// router transmit + receive, host receive.
    pub fn tick(&mut self) -> Result<(), SimError> {
        while self
            .pending
            .front()
            .is_some_and(|inst| inst.time <= self.time)
        {
            let inst = self.pending.pop_front().expect("checked non-empty");
            self.execute(inst.op)?;
        }

        self.board.clear_all();

        for i in 0..self.entries.len() {
            if self.entries[i].parked {
                continue;
            }
            if let DeviceSlot::Host(host) = &mut self.entries[i].slot {
                host.advance(&mut self.board);
            }
        }

        self.settle_hubs();

        for i in 0..self.entries.len() {
            if self.entries[i].parked {
                continue;
            }
            match &mut self.entries[i].slot {
                DeviceSlot::Switch(switch) => switch.advance(&mut self.board),
                DeviceSlot::Router(router) => router.advance(&mut self.board),
                _ => {}
            }
        }
        for i in 0..self.entries.len() {
            if self.entries[i].parked {
                continue;
            }
            match &mut self.entries[i].slot {
                DeviceSlot::Switch(switch) => switch.sample(&self.board, &mut self.rng),
                DeviceSlot::Router(router) => router.sample(self.time, &self.board, &mut self.rng),
                _ => {}
            }
        }
        for i in 0..self.entries.len() {
            if self.entries[i].parked {
                continue;
            }
            let row = match &self.entries[i].slot {
                DeviceSlot::Switch(switch) => Some(switch.port_values(&self.board)),
                _ => None,
            };
            if let Some(row) = row {
                self.entries[i].port_rows.push((self.time, row));
            }
        }

        for i in 0..self.entries.len() {
            if self.entries[i].parked {
                continue;
            }
            if let DeviceSlot::Host(host) = &mut self.entries[i].slot {
                host.sample(self.time, &self.board, &mut self.rng);
            }
        }

        self.time += 1;
        Ok(())
    }

    /// Repeat hub merge passes until the medium stops changing, bounded by
    /// the device count. Hub topologies are assumed acyclic; a chain of N
    /// hubs settles in at most N passes.
    fn settle_hubs(&mut self) {
        let received: Vec<(usize, Vec<Option<Bit>>)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.parked)
            .filter_map(|(i, entry)| match &entry.slot {
                DeviceSlot::Hub(hub) => Some((i, hub.port_values(&self.board))),
                _ => None,
            })
            .collect();

        for _ in 0..self.entries.len() {
            let mut changed = false;
            for i in 0..self.entries.len() {
                if self.entries[i].parked {
                    continue;
                }
                if let DeviceSlot::Hub(hub) = &self.entries[i].slot {
                    changed |= hub.merge(&mut self.board);
                }
            }
            if !changed {
                break;
            }
        }

        for (i, rx) in received {
            let tx = match &self.entries[i].slot {
                DeviceSlot::Hub(hub) => hub.port_values(&self.board),
                _ => continue,
            };
            let row = rx.into_iter().zip(tx).collect();
            self.entries[i].port_rows.push((self.time, row));
        }
    }

    fn execute(&mut self, op: Op) -> Result<(), SimError> {
        tracing::debug!(time = self.time, ?op, "executing instruction");
        match op {
            Op::CreateHub { name, ports } => {
                self.add_device(DeviceSlot::Hub(Hub::new(name, ports)))
            }
            Op::CreateHost { name } => self.add_device(DeviceSlot::Host(Host::new(
                name,
                self.params.signal_time,
                self.params.check,
                self.params.error_prob,
            ))),
            Op::CreateSwitch { name, ports } => self.add_device(DeviceSlot::Switch(Switch::new(
                name,
                ports,
                self.params.signal_time,
            ))),
            Op::CreateRouter { name, ports } => self.add_device(DeviceSlot::Router(Router::new(
                name,
                ports,
                self.params.signal_time,
                self.params.check,
            ))),
            Op::Connect { port_a, port_b } => self.connect(&port_a, &port_b),
            Op::Disconnect { port } => self.disconnect(&port),
            Op::Send { host, data } => {
                self.host_mut(&host)?.send_stream(&data);
                Ok(())
            }
            Op::SendFrame {
                host,
                dest,
                payload,
            } => {
                let (entry, rng) = self.host_with_rng(&host)?;
                entry.send_frame(dest, &payload, rng);
                Ok(())
            }
            Op::AssignMac { device, iface, mac } => {
                let idx = self.device_index(&device)?;
                match &mut self.entries[idx].slot {
                    DeviceSlot::Host(host) => {
                        if iface != 1 {
                            return Err(SimError::NoSuchInterface { device, iface });
                        }
                        host.set_mac(mac);
                        Ok(())
                    }
                    DeviceSlot::Router(router) => {
                        if iface == 0 || iface > router.ports() {
                            return Err(SimError::NoSuchInterface { device, iface });
                        }
                        router.set_mac(iface - 1, mac);
                        Ok(())
                    }
                    _ => Err(SimError::WrongDeviceKind {
                        device,
                        expected: "host or router",
                    }),
                }
            }
            Op::AssignIp {
                device,
                iface,
                ip,
                mask,
            } => {
                let idx = self.device_index(&device)?;
                match &mut self.entries[idx].slot {
                    DeviceSlot::Host(host) => {
                        if iface != 1 {
                            return Err(SimError::NoSuchInterface { device, iface });
                        }
                        host.set_ip(ip, mask);
                        Ok(())
                    }
                    DeviceSlot::Router(router) => {
                        if iface == 0 || iface > router.ports() {
                            return Err(SimError::NoSuchInterface { device, iface });
                        }
                        router.set_ip(iface - 1, ip, mask);
                        Ok(())
                    }
                    _ => Err(SimError::WrongDeviceKind {
                        device,
                        expected: "host or router",
                    }),
                }
            }
            Op::SendPacket {
                host,
                dest,
                payload,
            } => {
                let (entry, rng) = self.host_with_rng(&host)?;
                let Some(src) = entry.ip() else {
                    return Err(SimError::MissingAddress { device: host });
                };
                entry.send_ip_packet(IpPacket::new(dest, src, 0, &payload), rng);
                Ok(())
            }
            Op::Ping { host, dest } => {
                let (entry, rng) = self.host_with_rng(&host)?;
                if entry.ip().is_none() {
                    return Err(SimError::MissingAddress { device: host });
                }
                entry.ping(dest, rng);
                Ok(())
            }
            Op::RouteAdd { device, route } => {
                self.router_mut(&device)?.add_route(route);
                Ok(())
            }
            Op::RouteRemove { device, route } => {
                self.router_mut(&device)?.remove_route(&route);
                Ok(())
            }
            Op::RouteReset { device } => {
                self.router_mut(&device)?.reset_routes();
                Ok(())
            }
        }
    }

    fn add_device(&mut self, slot: DeviceSlot) -> Result<(), SimError> {
        let name = slot.name().to_string();
        if self.names.contains_key(&name) {
            return Err(SimError::DuplicateDevice(name));
        }
        let index = self.entries.len();
        for port in 1..=slot.ports() {
            self.ports.insert(format!("{name}_{port}"), (index, port - 1));
        }
        self.names.insert(name, index);
        self.entries.push(DeviceEntry {
            slot,
            parked: false,
            port_rows: Vec::new(),
        });
        Ok(())
    }

    /// Attach a duplex link between two ports. The link is shared (one
    /// conductor) when either side is a hub.
    pub fn connect(&mut self, port_a: &str, port_b: &str) -> Result<(), SimError> {
        let &(dev_a, idx_a) = self
            .ports
            .get(port_a)
            .ok_or_else(|| SimError::UnknownPort(port_a.to_string()))?;
        let &(dev_b, idx_b) = self
            .ports
            .get(port_b)
            .ok_or_else(|| SimError::UnknownPort(port_b.to_string()))?;

        self.entries[dev_a].parked = false;
        self.entries[dev_b].parked = false;

        let shared = matches!(self.entries[dev_a].slot, DeviceSlot::Hub(_))
            || matches!(self.entries[dev_b].slot, DeviceSlot::Hub(_));
        let (end_a, end_b) = if shared {
            self.board.shared_link()
        } else {
            self.board.full_link()
        };

        self.attach(dev_a, idx_a, end_a, port_a)?;
        self.attach(dev_b, idx_b, end_b, port_b)?;
        Ok(())
    }

    fn attach(
        &mut self,
        device: usize,
        port_idx: usize,
        endpoint: netsim_wire::Endpoint,
        port_name: &str,
    ) -> Result<(), SimError> {
        let time = self.time;
        let result = match &mut self.entries[device].slot {
            DeviceSlot::Host(host) => host.attach(endpoint, time),
            DeviceSlot::Hub(hub) => hub.attach(port_idx, endpoint),
            DeviceSlot::Switch(switch) => switch.attach(port_idx, endpoint),
            DeviceSlot::Router(router) => router.attach(port_idx, endpoint),
        };
        result.map_err(|_| SimError::PortInUse(port_name.to_string()))
    }

    /// Detach the endpoint on one port. A device left with no attachments
    /// is parked until something reconnects it.
    pub fn disconnect(&mut self, port: &str) -> Result<(), SimError> {
        let &(device, port_idx) = self
            .ports
            .get(port)
            .ok_or_else(|| SimError::UnknownPort(port.to_string()))?;

        let time = self.time;
        match &mut self.entries[device].slot {
            DeviceSlot::Host(host) => host.detach(time),
            DeviceSlot::Hub(hub) => hub.detach(port_idx),
            DeviceSlot::Switch(switch) => switch.detach(port_idx),
            DeviceSlot::Router(router) => router.detach(port_idx),
        }

        if !self.entries[device].slot.has_attachments() {
            self.entries[device].parked = true;
        }
        Ok(())
    }

    fn device_index(&self, name: &str) -> Result<usize, SimError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownDevice(name.to_string()))
    }

    fn host_mut(&mut self, name: &str) -> Result<&mut Host, SimError> {
        let idx = self.device_index(name)?;
        match &mut self.entries[idx].slot {
            DeviceSlot::Host(host) => Ok(host),
            _ => Err(SimError::UnknownHost(name.to_string())),
        }
    }

    fn host_with_rng(&mut self, name: &str) -> Result<(&mut Host, &mut ChaCha8Rng), SimError> {
        let idx = self.device_index(name)?;
        match &mut self.entries[idx].slot {
            DeviceSlot::Host(host) => Ok((host, &mut self.rng)),
            _ => Err(SimError::UnknownHost(name.to_string())),
        }
    }

    fn router_mut(&mut self, name: &str) -> Result<&mut Router, SimError> {
        let idx = self.device_index(name)?;
        match &mut self.entries[idx].slot {
            DeviceSlot::Router(router) => Ok(router),
            _ => Err(SimError::WrongDeviceKind {
                device: name.to_string(),
                expected: "router",
            }),
        }
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        match &self.entries[*self.names.get(name)?].slot {
            DeviceSlot::Host(host) => Some(host),
            _ => None,
        }
    }

    pub fn hub(&self, name: &str) -> Option<&Hub> {
        match &self.entries[*self.names.get(name)?].slot {
            DeviceSlot::Hub(hub) => Some(hub),
            _ => None,
        }
    }

    pub fn switch(&self, name: &str) -> Option<&Switch> {
        match &self.entries[*self.names.get(name)?].slot {
            DeviceSlot::Switch(switch) => Some(switch),
            _ => None,
        }
    }

    pub fn router(&self, name: &str) -> Option<&Router> {
        match &self.entries[*self.names.get(name)?].slot {
            DeviceSlot::Router(router) => Some(router),
            _ => None,
        }
    }
}
