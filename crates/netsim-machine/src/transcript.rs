//! Per-device transcript files, written when a run finishes.
//!
//! Every device gets `{name}.txt`. Hosts and routers write an action
//! table (time / device / action / info); hubs and switches write a
//! per-tick port table of received and sent bits. Hosts additionally get
//! `{name}_data.txt` with link-layer receipts and `{name}_payload.txt`
//! with network-layer receipts.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use netsim_devices::{Host, LogEntry, Router};
use netsim_protocol::Bit;

use crate::simulation::{DeviceEntry, DeviceSlot, PortRow, Simulation};

const TIME_W: usize = 10;
const DEVICE_W: usize = 12;
const ACTION_W: usize = 14;
const INFO_W: usize = 30;
const PORT_W: usize = 11;

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

fn action_table(name: &str, log: &[LogEntry]) -> String {
    let header = format!(
        "| {} | {} | {} | {} |",
        center("Time (ms)", TIME_W),
        center("Device", DEVICE_W),
        center("Action", ACTION_W),
        center("Info", INFO_W),
    );
    let rule = "-".repeat(header.chars().count());

    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{rule}");
    for entry in log {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:<width$} |",
            center(&entry.time.to_string(), TIME_W),
            center(name, DEVICE_W),
            center(&entry.action, ACTION_W),
            entry.info,
            width = INFO_W,
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

fn bit_cell(bit: Option<Bit>) -> String {
    match bit {
        Some(bit) => bit.to_string(),
        None => "-".to_string(),
    }
}

fn port_table(name: &str, ports: usize, rows: &[PortRow]) -> String {
    let mut header = format!("| {} |", center("Time (ms)", TIME_W));
    for port in 1..=ports {
        let _ = write!(header, " {} |", center(&format!("{name}_{port}"), PORT_W));
    }
    let rule = "-".repeat(header.chars().count());

    let mut legend = format!("| {} |", center("", TIME_W));
    for _ in 0..ports {
        let _ = write!(legend, " {} |", center("Rece . Sent", PORT_W));
    }

    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{legend}");
    let _ = writeln!(out, "{rule}");
    for (time, cells) in rows {
        let _ = write!(out, "| {} |", center(&time.to_string(), TIME_W));
        for &(received, sent) in cells {
            if received.is_none() {
                let _ = write!(out, " {} |", center("---", PORT_W));
            } else {
                let _ = write!(
                    out,
                    " {:>4} . {:<4} |",
                    bit_cell(received),
                    bit_cell(sent),
                );
            }
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{rule}");
    out
}

fn host_data_file(host: &Host) -> String {
    let mut out = String::new();
    for record in host.data_records() {
        let _ = write!(out, "{} {} {}", record.time, record.source, record.payload_hex);
        if record.error {
            out.push_str(" ERROR");
        }
        out.push('\n');
    }
    out
}

fn host_payload_file(host: &Host) -> String {
    let mut out = String::new();
    for record in host.payload_records() {
        let _ = writeln!(out, "{} {} {}", record.time, record.source, record.payload_hex);
    }
    out
}

fn write_entry(dir: &Path, entry: &DeviceEntry) -> io::Result<()> {
    match &entry.slot {
        DeviceSlot::Host(host) => {
            fs::write(
                dir.join(format!("{}.txt", host.name())),
                action_table(host.name(), host.log()),
            )?;
            fs::write(
                dir.join(format!("{}_data.txt", host.name())),
                host_data_file(host),
            )?;
            fs::write(
                dir.join(format!("{}_payload.txt", host.name())),
                host_payload_file(host),
            )?;
        }
        DeviceSlot::Hub(hub) => {
            fs::write(
                dir.join(format!("{}.txt", hub.name())),
                port_table(hub.name(), hub.ports(), &entry.port_rows),
            )?;
        }
        DeviceSlot::Switch(switch) => {
            fs::write(
                dir.join(format!("{}.txt", switch.name())),
                port_table(switch.name(), switch.ports(), &entry.port_rows),
            )?;
        }
        DeviceSlot::Router(router) => {
            fs::write(
                dir.join(format!("{}.txt", router.name())),
                router_table(router),
            )?;
        }
    }
    Ok(())
}

fn router_table(router: &Router) -> String {
    action_table(router.name(), router.log())
}

/// Write every device's transcript under `dir`, creating it if needed.
pub fn write_transcripts(sim: &Simulation, dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for entry in &sim.entries {
        write_entry(dir, entry)?;
    }
    Ok(())
}
