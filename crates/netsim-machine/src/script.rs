//! The instruction script: one whitespace-separated instruction per line,
//! first token the tick it fires on. Blank lines and `#` comments are
//! skipped. Parse errors are fatal and carry the line number.

use core::net::Ipv4Addr;

use netsim_devices::Route;
use netsim_protocol::{bits, Bit, MacAddr};
use thiserror::Error;

/// A scheduled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub time: u64,
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    CreateHub { name: String, ports: usize },
    CreateHost { name: String },
    CreateSwitch { name: String, ports: usize },
    CreateRouter { name: String, ports: usize },
    Connect { port_a: String, port_b: String },
    Disconnect { port: String },
    Send { host: String, data: Vec<Bit> },
    SendFrame { host: String, dest: MacAddr, payload: Vec<Bit> },
    AssignMac { device: String, iface: usize, mac: MacAddr },
    AssignIp { device: String, iface: usize, ip: Ipv4Addr, mask: Ipv4Addr },
    SendPacket { host: String, dest: Ipv4Addr, payload: Vec<Bit> },
    Ping { host: String, dest: Ipv4Addr },
    RouteAdd { device: String, route: Route },
    RouteRemove { device: String, route: Route },
    RouteReset { device: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

struct Line<'a> {
    number: usize,
    tokens: Vec<&'a str>,
    cursor: usize,
}

impl<'a> Line<'a> {
    fn fail(&self, message: impl Into<String>) -> ScriptError {
        ScriptError {
            line: self.number,
            message: message.into(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, ScriptError> {
        let token = self
            .tokens
            .get(self.cursor)
            .copied()
            .ok_or_else(|| self.fail(format!("missing {what}")))?;
        self.cursor += 1;
        Ok(token)
    }

    fn next_usize(&mut self, what: &str) -> Result<usize, ScriptError> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| self.fail(format!("invalid {what} {token:?}")))
    }

    fn next_mac(&mut self, what: &str) -> Result<MacAddr, ScriptError> {
        let token = self.next(what)?;
        token.parse().map_err(|_| self.fail(format!("invalid {what} {token:?}")))
    }

    fn next_ip(&mut self, what: &str) -> Result<Ipv4Addr, ScriptError> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| self.fail(format!("invalid {what} {token:?}")))
    }

    fn next_hex(&mut self, what: &str) -> Result<Vec<Bit>, ScriptError> {
        let token = self.next(what)?;
        bits::from_hex(token).ok_or_else(|| self.fail(format!("invalid {what} {token:?}")))
    }

    fn finish(&self) -> Result<(), ScriptError> {
        match self.tokens.get(self.cursor) {
            Some(extra) => Err(self.fail(format!("unexpected trailing token {extra:?}"))),
            None => Ok(()),
        }
    }
}

/// Parse a whole script. Instructions come back stably sorted by time, so
/// same-tick instructions keep their script order.
pub fn parse_script(text: &str) -> Result<Vec<Instruction>, ScriptError> {
    let mut instructions = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut line = Line {
            number: idx + 1,
            tokens: trimmed.split_whitespace().collect(),
            cursor: 0,
        };
        instructions.push(parse_line(&mut line)?);
    }
    instructions.sort_by_key(|inst| inst.time);
    Ok(instructions)
}

fn parse_line(line: &mut Line<'_>) -> Result<Instruction, ScriptError> {
    let time_token = line.next("time")?;
    let time: u64 = time_token
        .parse()
        .map_err(|_| line.fail(format!("invalid time {time_token:?}")))?;

    let verb = line.next("instruction")?;
    let op = match verb {
        "create" => {
            let kind = line.next("device type")?;
            let name = line.next("device name")?.to_string();
            match kind {
                "hub" => Op::CreateHub {
                    name,
                    ports: line.next_usize("port count")?,
                },
                "host" => Op::CreateHost { name },
                "switch" => Op::CreateSwitch {
                    name,
                    ports: line.next_usize("port count")?,
                },
                "router" => Op::CreateRouter {
                    name,
                    ports: line.next_usize("port count")?,
                },
                other => return Err(line.fail(format!("unknown device type {other:?}"))),
            }
        }
        "connect" => Op::Connect {
            port_a: line.next("port")?.to_string(),
            port_b: line.next("port")?.to_string(),
        },
        "disconnect" => Op::Disconnect {
            port: line.next("port")?.to_string(),
        },
        "send" => {
            let host = line.next("host")?.to_string();
            let raw = line.next("bit string")?;
            let mut data = Vec::with_capacity(raw.len());
            for c in raw.chars() {
                match c {
                    '0' => data.push(0),
                    '1' => data.push(1),
                    other => return Err(line.fail(format!("invalid bit {other:?}"))),
                }
            }
            Op::Send { host, data }
        }
        "send_frame" => Op::SendFrame {
            host: line.next("host")?.to_string(),
            dest: line.next_mac("destination MAC")?,
            payload: line.next_hex("payload")?,
        },
        "mac" => Op::AssignMac {
            device: line.next("device")?.to_string(),
            iface: line.next_usize("interface")?,
            mac: line.next_mac("MAC address")?,
        },
        "ip" => Op::AssignIp {
            device: line.next("device")?.to_string(),
            iface: line.next_usize("interface")?,
            ip: line.next_ip("IP address")?,
            mask: line.next_ip("mask")?,
        },
        "send_packet" => Op::SendPacket {
            host: line.next("host")?.to_string(),
            dest: line.next_ip("destination IP")?,
            payload: line.next_hex("payload")?,
        },
        "ping" => Op::Ping {
            host: line.next("host")?.to_string(),
            dest: line.next_ip("destination IP")?,
        },
        "route" => {
            let device = line.next("device")?.to_string();
            match line.next("route action")? {
                "add" => Op::RouteAdd {
                    device,
                    route: parse_route(line)?,
                },
                "remove" => Op::RouteRemove {
                    device,
                    route: parse_route(line)?,
                },
                "reset" => Op::RouteReset { device },
                other => return Err(line.fail(format!("unknown route action {other:?}"))),
            }
        }
        other => return Err(line.fail(format!("unknown instruction {other:?}"))),
    };

    line.finish()?;
    Ok(Instruction { time, op })
}

fn parse_route(line: &mut Line<'_>) -> Result<Route, ScriptError> {
    Ok(Route {
        dest: line.next_ip("destination network")?,
        mask: line.next_ip("mask")?,
        gateway: line.next_ip("gateway")?,
        iface: line.next_usize("interface")?,
    })
}
