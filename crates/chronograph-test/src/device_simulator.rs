//! Device Simulator - synthetic recording sessions with known clock truth
//!
//! Simulates:
//! - Acquisition devices whose local clocks drift and are offset from true time
//! - Several recording epochs per device, each with its own data files
//! - Devices that also stamp absolute (UTC) time
//! - Mapping records measured between device pairs
//!
//! Every simulated session carries the ground-truth mapping between any two
//! devices, so conversions through the sync graph can be checked exactly.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chronograph_core::{ChronoResult, ClockType, EpochNode, NodeFilter, NodeIndex, TimeMapping};
use chronograph_sync::{
    EpochSource, FileFind, GraphConfig, InternalEdge, MappingRecord, MappingRecordSet, Session,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Clock model: `local = drift_rate * true_time + offset`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockDriftModel {
    /// Drift rate (1.0 = perfect, >1.0 = fast, <1.0 = slow)
    pub drift_rate: f64,
    /// Local clock reading at true time zero, seconds
    pub offset: f64,
}

impl ClockDriftModel {
    pub fn new(drift_rate: f64, offset: f64) -> Self {
        ClockDriftModel { drift_rate, offset }
    }

    /// Perfect clock (no drift, no offset)
    pub fn perfect() -> Self {
        Self::new(1.0, 0.0)
    }

    /// Slightly fast clock
    pub fn fast() -> Self {
        Self::new(1.0001, 12.5)
    }

    /// Slightly slow clock
    pub fn slow() -> Self {
        Self::new(0.9999, -40.0)
    }

    /// Clock started at an arbitrary point, no drift
    pub fn offset_only(offset: f64) -> Self {
        Self::new(1.0, offset)
    }

    /// Random clock within realistic crystal tolerances
    pub fn random(rng: &mut StdRng) -> Self {
        Self::new(
            1.0 + rng.gen_range(-2e-4..=2e-4),
            rng.gen_range(-1000.0..=1000.0),
        )
    }

    /// Local clock reading at `true_time`
    pub fn local_time(&self, true_time: f64) -> f64 {
        self.drift_rate * true_time + self.offset
    }

    /// Mapping from true time to this clock
    pub fn true_to_local(&self) -> ChronoResult<TimeMapping> {
        TimeMapping::new(self.drift_rate, self.offset)
    }
}

/// One recording epoch of a simulated device
#[derive(Clone, Debug)]
pub struct SimulatedEpoch {
    pub id: String,
    pub files: Vec<PathBuf>,
}

/// Simulated acquisition device
#[derive(Clone, Debug)]
pub struct SimulatedDevice {
    pub name: String,
    pub clock: ClockDriftModel,
    pub epochs: Vec<SimulatedEpoch>,
    /// Device also stamps UTC, linked to its local clock per epoch
    pub stamps_utc: bool,
}

impl SimulatedDevice {
    pub fn new(name: impl Into<String>, clock: ClockDriftModel, epoch_count: usize) -> Self {
        let name = name.into();
        let epochs = (0..epoch_count)
            .map(|i| SimulatedEpoch {
                id: format!("epoch{i}"),
                files: vec![
                    PathBuf::from(format!("/session/{name}/epoch{i}.dat")),
                    PathBuf::from(format!("/session/{name}/epoch{i}.meta")),
                ],
            })
            .collect();
        SimulatedDevice {
            name,
            clock,
            epochs,
            stamps_utc: false,
        }
    }

    pub fn with_utc(mut self) -> Self {
        self.stamps_utc = true;
        self
    }

    /// Make an epoch list an extra file, e.g. one also recorded by another device
    pub fn share_file(&mut self, epoch: usize, path: impl Into<PathBuf>) {
        if let Some(e) = self.epochs.get_mut(epoch) {
            e.files.push(path.into());
        }
    }
}

impl EpochSource for SimulatedDevice {
    fn epoch_nodes(&self) -> Vec<EpochNode> {
        let mut nodes = Vec::new();
        for epoch in &self.epochs {
            nodes.push(
                EpochNode::new(&self.name, &epoch.id, ClockType::DevLocalTime)
                    .with_files(epoch.files.iter().cloned()),
            );
            if self.stamps_utc {
                nodes.push(EpochNode::new(&self.name, &epoch.id, ClockType::Utc));
            }
        }
        nodes
    }

    fn epoch_graph(&self) -> Vec<InternalEdge> {
        if !self.stamps_utc {
            return Vec::new();
        }
        let Ok(to_local) = self.clock.true_to_local() else {
            return Vec::new();
        };
        let to_utc = to_local.invert();
        (0..self.epochs.len())
            .map(|i| InternalEdge::new(2 * i, 2 * i + 1, 1.0, to_utc))
            .collect()
    }
}

/// Recording session with several devices and measured links between them
pub struct SessionSimulator {
    rng: StdRng,
    devices: Vec<SimulatedDevice>,
    links: Vec<(usize, usize)>,
}

impl SessionSimulator {
    pub fn new(seed: u64) -> Self {
        SessionSimulator {
            rng: StdRng::seed_from_u64(seed),
            devices: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add a device with a random clock, returns its position
    pub fn add_device(&mut self, name: impl Into<String>, epoch_count: usize) -> usize {
        let clock = ClockDriftModel::random(&mut self.rng);
        self.add_device_with_clock(SimulatedDevice::new(name, clock, epoch_count))
    }

    pub fn add_device_with_clock(&mut self, device: SimulatedDevice) -> usize {
        self.devices.push(device);
        self.devices.len() - 1
    }

    /// Declare that the first epochs of devices `a` and `b` were measured
    /// against each other
    pub fn link(&mut self, a: usize, b: usize) {
        self.links.push((a, b));
    }

    pub fn devices(&self) -> &[SimulatedDevice] {
        &self.devices
    }

    pub fn device(&self, position: usize) -> Option<&SimulatedDevice> {
        self.devices.get(position)
    }

    /// True mapping from device `a`'s local clock to device `b`'s
    pub fn ground_truth(&self, a: usize, b: usize) -> ChronoResult<TimeMapping> {
        let to_a = self.devices[a].clock.true_to_local()?;
        let to_b = self.devices[b].clock.true_to_local()?;
        to_a.invert().checked_compose(&to_b)
    }

    /// Mapping record for a link, measured on both devices' first epochs
    pub fn record(&self, a: usize, b: usize) -> ChronoResult<MappingRecord> {
        let files = self.devices[a].epochs[0]
            .files
            .iter()
            .chain(self.devices[b].epochs[0].files.iter())
            .cloned();
        Ok(MappingRecord::new(
            &self.devices[a].name,
            &self.devices[b].name,
            self.ground_truth(a, b)?,
        )
        .with_files(files))
    }

    /// Build a session graph: one FileFind rule per link, then every device
    pub fn build(&self, config: GraphConfig) -> ChronoResult<Session> {
        let session = Session::with_config("simulated", config)?;
        session.build(|graph| {
            for &(a, b) in &self.links {
                let mut records = MappingRecordSet::new();
                records.insert(self.record(a, b)?)?;
                let rule = FileFind::new(&self.devices[a].name, &self.devices[b].name)
                    .with_records(records)
                    .with_sync_file_name(None);
                graph.add_rule(rule)?;
            }
            for device in &self.devices {
                graph.add_epoch_source(device)?;
            }
            Ok(())
        })?;
        Ok(session)
    }

    /// Local-clock node of a device epoch in a built session
    pub fn local_node(&self, session: &Session, device: usize, epoch: usize) -> Option<NodeIndex> {
        let d = self.devices.get(device)?;
        let filter = NodeFilter::new()
            .owner(&d.name)
            .epoch_id(&d.epochs.get(epoch)?.id)
            .clock_type(ClockType::DevLocalTime);
        session.find_node_index(&filter).first().copied()
    }
}

/// Predefined session scenarios
pub mod scenarios {
    use super::*;

    /// Devices linked pairwise in a line: dev0 - dev1 - ... - devN
    pub fn linked_chain(count: usize, seed: u64) -> SessionSimulator {
        let mut sim = SessionSimulator::new(seed);
        for i in 0..count {
            sim.add_device(format!("dev{i}"), 1);
        }
        for i in 1..count {
            sim.link(i - 1, i);
        }
        sim
    }

    /// Devices that all stamp UTC, no explicit links
    pub fn utc_swarm(count: usize, seed: u64) -> SessionSimulator {
        let mut sim = SessionSimulator::new(seed);
        for i in 0..count {
            let clock = ClockDriftModel::random(&mut sim.rng);
            sim.add_device_with_clock(SimulatedDevice::new(format!("dev{i}"), clock, 2).with_utc());
        }
        sim
    }

    /// Two linked pairs with nothing between them
    pub fn split_lab(seed: u64) -> SessionSimulator {
        let mut sim = SessionSimulator::new(seed);
        let ephys = sim.add_device("ephys", 1);
        let stim = sim.add_device("stim", 1);
        let camera = sim.add_device("camera", 1);
        let tracker = sim.add_device("tracker", 1);
        sim.link(ephys, stim);
        sim.link(camera, tracker);
        sim
    }

    /// Ground-truth keyed by device name pair, for reporting
    pub fn truth_table(
        sim: &SessionSimulator,
    ) -> ChronoResult<BTreeMap<(String, String), TimeMapping>> {
        let mut table = BTreeMap::new();
        for a in 0..sim.devices.len() {
            for b in 0..sim.devices.len() {
                if a != b {
                    table.insert(
                        (sim.devices[a].name.clone(), sim.devices[b].name.clone()),
                        sim.ground_truth(a, b)?,
                    );
                }
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronograph_sync::EdgeOrigin;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn test_clock_drift_model() {
        let clock = ClockDriftModel::fast();
        assert!(clock.local_time(1000.0) > 1000.0 + clock.offset);

        let mapping = clock.true_to_local().unwrap();
        assert!(close(mapping.apply(500.0), clock.local_time(500.0)));
    }

    #[test]
    fn test_seeded_clocks_repeat() {
        let a = scenarios::linked_chain(3, 7);
        let b = scenarios::linked_chain(3, 7);
        let c = scenarios::linked_chain(3, 8);
        assert_eq!(a.devices()[1].clock, b.devices()[1].clock);
        assert_ne!(a.devices()[1].clock, c.devices()[1].clock);
    }

    #[test]
    fn test_chain_matches_ground_truth() {
        let sim = scenarios::linked_chain(5, 42);
        let session = sim.build(GraphConfig::default()).unwrap();

        let from = sim.local_node(&session, 0, 0).unwrap();
        let to = sim.local_node(&session, 4, 0).unwrap();
        let truth = sim.ground_truth(0, 4).unwrap();

        let path = session.conversion_path(from, to).unwrap();
        assert_eq!(path.hops(), 4);
        for t in [0.0, 12.5, 3600.0, -250.0] {
            assert!(close(path.apply(t), truth.apply(t)));
        }
    }

    #[test]
    fn test_utc_devices_connect_through_utc() {
        let sim = scenarios::utc_swarm(3, 9);
        let session = sim.build(GraphConfig::default()).unwrap();

        let from = sim.local_node(&session, 0, 1).unwrap();
        let to = sim.local_node(&session, 2, 0).unwrap();
        let truth = sim.ground_truth(0, 2).unwrap();

        let path = session.conversion_path(from, to).unwrap();
        // local -> utc -> utc -> local
        assert_eq!(path.hops(), 3);
        assert!(close(path.apply(100.0), truth.apply(100.0)));

        let graph = session.read();
        assert_eq!(graph.edge(path.nodes[1], path.nodes[2]).unwrap().origin, EdgeOrigin::Automatic);
    }

    #[test]
    fn test_split_lab_has_no_bridge() {
        let sim = scenarios::split_lab(1);
        let session = sim.build(GraphConfig::default()).unwrap();

        let ephys = sim.local_node(&session, 0, 0).unwrap();
        let stim = sim.local_node(&session, 1, 0).unwrap();
        let camera = sim.local_node(&session, 2, 0).unwrap();

        assert!(session.time_convert(ephys, stim, 1.0).is_ok());
        let err = session.time_convert(ephys, camera, 1.0).unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_later_epochs_not_covered_by_record() {
        let mut sim = SessionSimulator::new(3);
        let a = sim.add_device("a", 2);
        let b = sim.add_device("b", 2);
        sim.link(a, b);
        let session = sim.build(GraphConfig::default()).unwrap();

        let a1 = sim.local_node(&session, a, 1).unwrap();
        let b1 = sim.local_node(&session, b, 1).unwrap();
        assert!(session.time_convert(a1, b1, 0.0).is_err());
    }

    #[test]
    fn test_truth_table_is_consistent() {
        let sim = scenarios::linked_chain(3, 11);
        let table = scenarios::truth_table(&sim).unwrap();
        assert_eq!(table.len(), 6);

        let ab = table[&("dev0".to_string(), "dev1".to_string())];
        let ba = table[&("dev1".to_string(), "dev0".to_string())];
        assert!(ab.compose(&ba).approx_eq(&TimeMapping::identity(), 1e-6));
    }
}
