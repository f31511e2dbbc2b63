//! Aerodrome configuration
//!
//! Bundles the static data the scheduler runs on: navigation graph, taxiway
//! registry, spawn slots and zones, and the service road. Everything here is
//! validated once at construction and never mutated afterwards.

use anyhow::{Context, Result};

use super::navigation::{NavigationGraph, Successors, WalkedRoute};
use super::registry::TaxiwayRegistry;
use super::spawn::{inbound_route, SpawnSlot, SpawnZone};
use super::types::{NodeId, Point, SegmentId, WayRole, Waypoint};

/// Static configuration of one aerodrome
#[derive(Debug, Clone)]
pub struct AerodromeConfig {
    pub graph: NavigationGraph,
    pub registry: TaxiwayRegistry,
    /// Stands in slot order; slot index doubles as aircraft id
    pub slots: Vec<SpawnSlot>,
    pub zones: Vec<SpawnZone>,
    /// Points the decorative service vehicle shuttles along
    pub service_path: Vec<Point>,
}

impl AerodromeConfig {
    pub fn new(
        graph: NavigationGraph,
        registry: TaxiwayRegistry,
        slots: Vec<SpawnSlot>,
        zones: Vec<SpawnZone>,
    ) -> Self {
        Self {
            graph,
            registry,
            slots,
            zones,
            service_path: Vec::new(),
        }
    }

    pub fn with_service_path(mut self, service_path: Vec<Point>) -> Self {
        self.service_path = service_path;
        self
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn segment_count(&self) -> usize {
        self.registry.segment_count()
    }

    /// Checks that every lookup the scheduler makes is total and that every
    /// route releases what it acquires
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;

        for (waypoint, segment, _) in self.registry.entries() {
            if !self.graph.contains(waypoint) {
                anyhow::bail!("{} registers {} which is not in the graph", segment, waypoint);
            }
        }

        for zone in &self.zones {
            self.validate_segment_list(&zone.name, &zone.segments)?;
            for branch in &zone.overrides {
                self.validate_segment_list(&zone.name, &branch.segments)?;
                let branches_there = match self.graph.successors(branch.at) {
                    Some(Successors::Branch(targets)) => {
                        targets.contains(&branch.toward)
                    }
                    _ => false,
                };
                if !branches_there {
                    anyhow::bail!(
                        "Zone {} overrides a branch from node {} toward {} that does not exist",
                        zone.name,
                        branch.at.0,
                        branch.toward
                    );
                }
            }
        }

        let mut stands: Vec<NodeId> = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            let zone = self
                .zones
                .get(slot.zone)
                .with_context(|| format!("Slot {} names missing zone {}", index, slot.zone))?;

            if stands.contains(&slot.position) {
                anyhow::bail!("Slot {} shares its stand with another slot", index);
            }
            stands.push(slot.position);

            if !self.graph.reaches_exit(slot.position) {
                anyhow::bail!("Slot {} cannot reach the exit", index);
            }
            if let Some(dead_end) = self.graph.dead_end_from(slot.position) {
                anyhow::bail!("Slot {} can strand at node {} with no edge", index, dead_end.0);
            }

            for route in self.graph.routes_to_exit(slot.position) {
                self.check_outbound_route(index, &route)?;
                self.check_inbound_route(index, zone, &route)?;
            }
        }

        Ok(())
    }

    fn validate_segment_list(&self, zone: &str, segments: &[SegmentId]) -> Result<()> {
        for (position, segment) in segments.iter().enumerate() {
            if segment.0 >= self.registry.segment_count() {
                anyhow::bail!("Zone {} reserves unknown {}", zone, segment);
            }
            if segments[..position].contains(segment) {
                anyhow::bail!("Zone {} reserves {} twice", zone, segment);
            }
        }
        Ok(())
    }

    /// Outbound aircraft must leave every segment they enter
    fn check_outbound_route(&self, slot: usize, route: &WalkedRoute) -> Result<()> {
        let mut held: Vec<SegmentId> = Vec::new();
        let waypoints = route
            .positions
            .iter()
            .map(|node| Waypoint::Node(*node))
            .chain(std::iter::once(Waypoint::Exit));

        for waypoint in waypoints {
            match self.registry.lookup(waypoint) {
                Some((segment, WayRole::Start)) => {
                    if !held.contains(&segment) {
                        held.push(segment);
                    }
                }
                Some((segment, WayRole::End)) => {
                    let index = held.iter().position(|s| *s == segment).with_context(|| {
                        format!(
                            "Outbound route from slot {} leaves {} at {} without entering it",
                            slot, segment, waypoint
                        )
                    })?;
                    held.remove(index);
                }
                Some((_, WayRole::Ignore)) | None => {}
            }
        }

        if !held.is_empty() {
            anyhow::bail!(
                "Outbound route from slot {} exits still holding {:?}",
                slot,
                held
            );
        }
        Ok(())
    }

    /// Inbound aircraft may only cross segments their zone reserves, and must
    /// release all of them by the time they reach the stand
    fn check_inbound_route(&self, slot: usize, zone: &SpawnZone, route: &WalkedRoute) -> Result<()> {
        let mut reserved: Vec<SegmentId> = zone.required_segments(route).to_vec();

        for waypoint in inbound_route(route) {
            let Some((segment, role)) = self.registry.lookup(waypoint) else {
                continue;
            };
            let index = reserved.iter().position(|s| *s == segment).with_context(|| {
                format!(
                    "Inbound route to slot {} crosses {} at {} without reserving it",
                    slot, segment, waypoint
                )
            })?;
            if role == WayRole::Start {
                reserved.remove(index);
            }
        }

        if !reserved.is_empty() {
            anyhow::bail!(
                "Inbound route to slot {} reaches its stand still holding {:?}",
                slot,
                reserved
            );
        }
        Ok(())
    }

    /// Builds the built-in aerodrome: 40 stands, 11 taxiway segments and a
    /// single runway. Coordinates are pixels on a 1920x1080 chart.
    pub fn default_aerodrome() -> Result<Self> {
        let mut graph = NavigationGraph::new();

        let all_points = TAXI_EDGES
            .iter()
            .flat_map(|(from, to)| [*from, *to])
            .chain(RUNWAY_DEPARTURE_POINTS.iter().copied())
            .chain(BRANCH_POINT.iter().copied())
            .chain(BRANCH_TARGETS.iter().copied())
            .chain(STANDS.iter().copied());
        for (x, y) in all_points {
            graph.add_position(Point::new(x, y));
        }

        let node = |graph: &NavigationGraph, (x, y): (f32, f32)| -> Result<NodeId> {
            graph
                .position_at(Point::new(x, y))
                .with_context(|| format!("No position at ({}, {})", x, y))
        };

        for (from, to) in TAXI_EDGES {
            let from = node(&graph, *from)?;
            let to = node(&graph, *to)?;
            graph.connect(from, to)?;
        }
        for point in RUNWAY_DEPARTURE_POINTS {
            let from = node(&graph, *point)?;
            graph.connect(from, Waypoint::Exit)?;
        }

        let branch_at = node(&graph, BRANCH_POINT[0])?;
        let westward = Waypoint::Node(node(&graph, BRANCH_TARGETS[0])?);
        let eastward = Waypoint::Node(node(&graph, BRANCH_TARGETS[1])?);
        graph.connect_branch(branch_at, vec![westward, eastward])?;

        let mut registry = TaxiwayRegistry::new(SEGMENT_COUNT);
        for (point, segment, role) in TAXIWAY_ENDS {
            let at = node(&graph, *point)?;
            registry.register(at, SegmentId(*segment), *role)?;
        }
        // Leaving the aerodrome is the far end of the runway segment
        registry.register(Waypoint::Exit, SegmentId(0), WayRole::End)?;

        let segments = |ids: &[usize]| ids.iter().map(|id| SegmentId(*id)).collect::<Vec<_>>();
        let zones = vec![
            SpawnZone::new("north apron", segments(&[9, 0])),
            SpawnZone::new("east apron", segments(&[8, 1, 0])),
            SpawnZone::new("central apron", segments(&[7, 10, 1, 0])),
            SpawnZone::new("west apron", segments(&[6, 10, 1, 0])).with_override(
                branch_at,
                westward,
                segments(&[6, 10, 4, 0]),
            ),
        ];

        let mut slots = Vec::with_capacity(STANDS.len());
        for (index, stand) in STANDS.iter().enumerate() {
            let zone = match index {
                0..=14 => 0,
                15..=20 => 1,
                21..=28 => 2,
                _ => 3,
            };
            slots.push(SpawnSlot::new(node(&graph, *stand)?, zone));
        }

        let service_path = SERVICE_ROAD
            .iter()
            .map(|(x, y)| Point::new(*x, *y))
            .collect();

        let config = Self::new(graph, registry, slots, zones).with_service_path(service_path);
        config.validate().context("Built-in aerodrome failed validation")?;
        Ok(config)
    }
}

/// Number of physical taxiway segments on the built-in aerodrome
const SEGMENT_COUNT: usize = 11;

/// Last positions before take-off; their successor is the exit marker
const RUNWAY_DEPARTURE_POINTS: &[(f32, f32)] = &[(1431.0, 580.0), (936.0, 580.0)];

/// Junction where west apron traffic picks a runway end at random
const BRANCH_POINT: &[(f32, f32)] = &[(1071.0, 684.0)];

/// West then east targets of the branch point
const BRANCH_TARGETS: &[(f32, f32)] = &[(1045.0, 683.0), (1106.0, 682.0)];

const SERVICE_ROAD: &[(f32, f32)] = &[
    (1480.0, 720.0),
    (1500.0, 720.0),
    (1520.0, 721.0),
    (1540.0, 721.0),
    (1560.0, 721.0),
    (1580.0, 722.0),
    (1600.0, 722.0),
    (1620.0, 722.0),
    (1640.0, 723.0),
];

/// Start and end positions of each taxiway segment, outbound direction
const TAXIWAY_ENDS: &[((f32, f32), usize, WayRole)] = &[
    ((1713.0, 454.0), 9, WayRole::Start),
    ((1710.0, 558.0), 9, WayRole::End),
    ((1711.0, 548.0), 0, WayRole::Start),
    ((1651.0, 759.0), 8, WayRole::Start),
    ((1710.0, 694.0), 8, WayRole::End),
    ((1711.0, 702.0), 1, WayRole::Start),
    ((1711.0, 601.0), 1, WayRole::End),
    ((1711.0, 608.0), 0, WayRole::Start),
    ((1442.0, 736.0), 7, WayRole::Start),
    ((1442.0, 698.0), 7, WayRole::End),
    ((1439.0, 705.0), 10, WayRole::Start),
    ((1690.0, 682.0), 10, WayRole::End),
    ((1680.0, 684.0), 1, WayRole::Start),
    ((1076.0, 767.0), 6, WayRole::Start),
    ((1075.0, 702.0), 6, WayRole::End),
    ((1072.0, 710.0), 10, WayRole::Start),
    ((714.0, 679.0), 4, WayRole::Start),
    ((723.0, 684.0), 10, WayRole::End),
    ((658.0, 610.0), 0, WayRole::Start),
    ((667.0, 599.0), 4, WayRole::End),
];

/// Stands in slot order
const STANDS: &[(f32, f32)] = &[
    (1750.0, 444.0),
    (1750.0, 420.0),
    (1748.0, 364.0),
    (1727.0, 365.0),
    (1748.0, 324.0),
    (1727.0, 324.0),
    (1746.0, 292.0),
    (1746.0, 269.0),
    (1746.0, 245.0),
    (1687.0, 316.0),
    (1687.0, 336.0),
    (1687.0, 357.0),
    (1688.0, 378.0),
    (1689.0, 398.0),
    (1688.0, 419.0),
    (1651.0, 782.0),
    (1629.0, 782.0),
    (1607.0, 782.0),
    (1585.0, 782.0),
    (1564.0, 782.0),
    (1540.0, 783.0),
    (1488.0, 775.0),
    (1462.0, 775.0),
    (1390.0, 794.0),
    (1367.0, 749.0),
    (1334.0, 749.0),
    (1304.0, 750.0),
    (1274.0, 751.0),
    (1246.0, 751.0),
    (1215.0, 749.0),
    (1183.0, 750.0),
    (1150.0, 749.0),
    (1120.0, 749.0),
    (1092.0, 750.0),
    (1093.0, 785.0),
    (1121.0, 785.0),
    (1151.0, 784.0),
    (1182.0, 785.0),
    (1219.0, 797.0),
    (1220.0, 825.0),
];

/// Ordinary outbound edges
const TAXI_EDGES: &[((f32, f32), (f32, f32))] = &[
    ((1750.0, 444.0), (1731.0, 447.0)),
    ((1750.0, 420.0), (1730.0, 423.0)),
    ((1712.0, 432.0), (1713.0, 454.0)),
    ((1730.0, 423.0), (1712.0, 432.0)),
    ((1731.0, 447.0), (1713.0, 454.0)),
    ((1713.0, 454.0), (1710.0, 482.0)),
    ((1710.0, 482.0), (1711.0, 514.0)),
    ((1711.0, 514.0), (1711.0, 548.0)),
    ((1710.0, 408.0), (1712.0, 432.0)),
    ((1710.0, 385.0), (1710.0, 408.0)),
    ((1732.0, 385.0), (1710.0, 385.0)),
    ((1708.0, 364.0), (1710.0, 385.0)),
    ((1707.0, 342.0), (1708.0, 364.0)),
    ((1732.0, 344.0), (1707.0, 342.0)),
    ((1707.0, 320.0), (1707.0, 342.0)),
    ((1723.0, 300.0), (1707.0, 320.0)),
    ((1725.0, 278.0), (1723.0, 300.0)),
    ((1725.0, 256.0), (1725.0, 278.0)),
    ((1746.0, 245.0), (1725.0, 256.0)),
    ((1746.0, 269.0), (1725.0, 278.0)),
    ((1746.0, 292.0), (1723.0, 300.0)),
    ((1687.0, 316.0), (1707.0, 320.0)),
    ((1687.0, 336.0), (1707.0, 342.0)),
    ((1748.0, 324.0), (1732.0, 344.0)),
    ((1687.0, 357.0), (1708.0, 364.0)),
    ((1688.0, 378.0), (1732.0, 385.0)),
    ((1748.0, 364.0), (1732.0, 385.0)),
    ((1689.0, 398.0), (1710.0, 408.0)),
    ((1688.0, 419.0), (1710.0, 408.0)),
    ((1727.0, 324.0), (1707.0, 342.0)),
    ((1727.0, 365.0), (1710.0, 385.0)),
    ((1711.0, 548.0), (1710.0, 558.0)),
    ((1540.0, 783.0), (1560.0, 760.0)),
    ((1560.0, 760.0), (1589.0, 761.0)),
    ((1564.0, 782.0), (1589.0, 761.0)),
    ((1585.0, 782.0), (1589.0, 761.0)),
    ((1589.0, 761.0), (1621.0, 760.0)),
    ((1607.0, 782.0), (1621.0, 760.0)),
    ((1621.0, 760.0), (1651.0, 759.0)),
    ((1629.0, 782.0), (1651.0, 759.0)),
    ((1651.0, 782.0), (1651.0, 759.0)),
    ((1651.0, 759.0), (1664.0, 742.0)),
    ((1664.0, 742.0), (1704.0, 737.0)),
    ((1704.0, 737.0), (1711.0, 702.0)),
    ((1711.0, 702.0), (1710.0, 694.0)),
    ((1710.0, 694.0), (1712.0, 660.0)),
    ((1712.0, 660.0), (1712.0, 633.0)),
    ((1712.0, 633.0), (1711.0, 608.0)),
    ((1711.0, 608.0), (1711.0, 601.0)),
    ((1711.0, 601.0), (1706.0, 578.0)),
    ((1246.0, 751.0), (1261.0, 771.0)),
    ((1261.0, 771.0), (1288.0, 772.0)),
    ((1274.0, 751.0), (1288.0, 772.0)),
    ((1288.0, 772.0), (1317.0, 770.0)),
    ((1304.0, 750.0), (1317.0, 770.0)),
    ((1317.0, 770.0), (1352.0, 769.0)),
    ((1334.0, 749.0), (1352.0, 769.0)),
    ((1352.0, 769.0), (1390.0, 771.0)),
    ((1367.0, 749.0), (1390.0, 771.0)),
    ((1390.0, 794.0), (1390.0, 771.0)),
    ((1390.0, 771.0), (1415.0, 778.0)),
    ((1415.0, 778.0), (1441.0, 767.0)),
    ((1462.0, 775.0), (1441.0, 767.0)),
    ((1488.0, 775.0), (1471.0, 753.0)),
    ((1441.0, 767.0), (1442.0, 736.0)),
    ((1471.0, 753.0), (1442.0, 736.0)),
    ((1442.0, 736.0), (1439.0, 705.0)),
    ((1439.0, 705.0), (1442.0, 698.0)),
    ((1442.0, 698.0), (1468.0, 683.0)),
    ((1468.0, 683.0), (1515.0, 684.0)),
    ((1515.0, 684.0), (1555.0, 683.0)),
    ((1555.0, 683.0), (1595.0, 683.0)),
    ((1595.0, 683.0), (1640.0, 683.0)),
    ((1640.0, 683.0), (1680.0, 684.0)),
    ((1680.0, 684.0), (1690.0, 682.0)),
    ((1690.0, 682.0), (1712.0, 660.0)),
    ((1220.0, 825.0), (1201.0, 810.0)),
    ((1201.0, 810.0), (1202.0, 771.0)),
    ((1219.0, 797.0), (1202.0, 771.0)),
    ((1215.0, 749.0), (1202.0, 771.0)),
    ((1202.0, 771.0), (1166.0, 766.0)),
    ((1182.0, 785.0), (1166.0, 766.0)),
    ((1183.0, 750.0), (1166.0, 766.0)),
    ((1166.0, 766.0), (1134.0, 766.0)),
    ((1150.0, 749.0), (1134.0, 766.0)),
    ((1151.0, 784.0), (1134.0, 766.0)),
    ((1134.0, 766.0), (1105.0, 765.0)),
    ((1120.0, 749.0), (1105.0, 765.0)),
    ((1121.0, 785.0), (1105.0, 765.0)),
    ((1105.0, 765.0), (1076.0, 767.0)),
    ((1092.0, 750.0), (1076.0, 767.0)),
    ((1093.0, 785.0), (1076.0, 767.0)),
    ((1076.0, 767.0), (1071.0, 735.0)),
    ((1071.0, 735.0), (1072.0, 710.0)),
    ((1072.0, 710.0), (1075.0, 702.0)),
    ((1075.0, 702.0), (1071.0, 684.0)),
    ((1106.0, 682.0), (1143.0, 683.0)),
    ((1143.0, 683.0), (1183.0, 683.0)),
    ((1183.0, 683.0), (1215.0, 684.0)),
    ((1215.0, 684.0), (1249.0, 683.0)),
    ((1249.0, 683.0), (1288.0, 683.0)),
    ((1288.0, 683.0), (1327.0, 683.0)),
    ((1327.0, 683.0), (1366.0, 683.0)),
    ((1366.0, 683.0), (1403.0, 683.0)),
    ((1403.0, 683.0), (1437.0, 682.0)),
    ((1437.0, 682.0), (1468.0, 683.0)),
    ((1045.0, 683.0), (1016.0, 683.0)),
    ((1016.0, 683.0), (987.0, 685.0)),
    ((987.0, 685.0), (953.0, 684.0)),
    ((953.0, 684.0), (918.0, 685.0)),
    ((918.0, 685.0), (877.0, 685.0)),
    ((877.0, 685.0), (838.0, 687.0)),
    ((838.0, 687.0), (798.0, 686.0)),
    ((798.0, 686.0), (758.0, 686.0)),
    ((758.0, 686.0), (723.0, 684.0)),
    ((723.0, 684.0), (714.0, 679.0)),
    ((714.0, 679.0), (684.0, 667.0)),
    ((684.0, 667.0), (671.0, 640.0)),
    ((671.0, 640.0), (658.0, 610.0)),
    ((658.0, 610.0), (667.0, 599.0)),
    ((667.0, 599.0), (691.0, 581.0)),
    ((691.0, 581.0), (719.0, 580.0)),
    ((719.0, 580.0), (752.0, 580.0)),
    ((752.0, 580.0), (786.0, 579.0)),
    ((786.0, 579.0), (819.0, 580.0)),
    ((819.0, 580.0), (851.0, 581.0)),
    ((851.0, 581.0), (898.0, 580.0)),
    ((898.0, 580.0), (945.0, 580.0)),
    ((945.0, 580.0), (992.0, 579.0)),
    ((992.0, 579.0), (1037.0, 580.0)),
    ((1037.0, 580.0), (1086.0, 580.0)),
    ((1086.0, 580.0), (1154.0, 579.0)),
    ((1154.0, 579.0), (1222.0, 580.0)),
    ((1222.0, 580.0), (1293.0, 579.0)),
    ((1293.0, 579.0), (1362.0, 579.0)),
    ((1362.0, 579.0), (1431.0, 580.0)),
    ((1710.0, 558.0), (1706.0, 578.0)),
    ((1706.0, 578.0), (1677.0, 579.0)),
    ((1677.0, 579.0), (1650.0, 580.0)),
    ((1650.0, 580.0), (1617.0, 580.0)),
    ((1617.0, 580.0), (1583.0, 580.0)),
    ((1583.0, 580.0), (1551.0, 580.0)),
    ((1551.0, 580.0), (1518.0, 580.0)),
    ((1518.0, 580.0), (1471.0, 580.0)),
    ((1471.0, 580.0), (1424.0, 580.0)),
    ((1424.0, 580.0), (1378.0, 580.0)),
    ((1378.0, 580.0), (1331.0, 580.0)),
    ((1331.0, 580.0), (1248.0, 580.0)),
    ((1248.0, 580.0), (1214.0, 580.0)),
    ((1214.0, 580.0), (1144.0, 580.0)),
    ((1144.0, 580.0), (1074.0, 580.0)),
    ((1074.0, 580.0), (1005.0, 580.0)),
    ((1005.0, 580.0), (936.0, 580.0)),
];
