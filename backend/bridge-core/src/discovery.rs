//! Looking for a running host application in the process table.

use log::{debug, trace};
use sysinfo::{Process, ProcessesToUpdate, System};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProcess {
    pub pid: u32,
    pub name: String,
}

/// Every process whose name contains `name`, ignoring case.
pub fn find_host_processes(name: &str) -> Vec<HostProcess> {
    let needle = name.to_ascii_lowercase();

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    trace!("Scanning {} processes for '{name}'", sys.processes().len());

    let mut found: Vec<HostProcess> = sys
        .processes()
        .iter()
        .filter(|(_, process)| process_name(process).to_ascii_lowercase().contains(&needle))
        .map(|(pid, process)| HostProcess {
            pid: pid.as_u32(),
            name: process_name(process),
        })
        .collect();

    found.sort_by_key(|process| process.pid);
    debug!("Found {} process(es) matching '{name}'", found.len());
    found
}

pub fn is_host_running(name: &str) -> bool {
    !find_host_processes(name).is_empty()
}

fn process_name(process: &Process) -> String {
    process.name().to_string_lossy().to_string()
}
