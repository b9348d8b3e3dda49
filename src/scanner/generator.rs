//! Work unit generation for one sweep.

use crate::config::ShuffleOptions;
use crate::types::{Port, PortSet, TargetSet, WorkUnit};
use rand::seq::SliceRandom;
use rand::Rng;
use std::net::Ipv4Addr;

/// The fixed host and port lists a scan sweeps over.
///
/// Units come out grouped by host: every port of one host before the next
/// host. Shuffling permutes host order and, independently for each host,
/// port order; it never adds or drops a unit.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    hosts: Vec<Ipv4Addr>,
    ports: Vec<Port>,
    shuffle: ShuffleOptions,
}

impl WorkPlan {
    pub fn new(targets: &TargetSet, ports: &PortSet, shuffle: ShuffleOptions) -> Self {
        Self {
            hosts: targets.addresses().to_vec(),
            ports: ports.ports().to_vec(),
            shuffle,
        }
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Number of units in every sweep.
    pub fn len(&self) -> usize {
        self.hosts.len() * self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce the dispatch order for one sweep.
    pub fn units_for_sweep<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<WorkUnit> {
        let mut hosts = self.hosts.clone();
        if self.shuffle.hosts {
            hosts.shuffle(rng);
        }

        let mut units = Vec::with_capacity(self.len());
        let mut ports = self.ports.clone();
        for host in hosts {
            if self.shuffle.ports {
                ports.shuffle(rng);
            }
            units.extend(ports.iter().map(|&port| WorkUnit::new(host, port)));
        }
        units
    }
}
