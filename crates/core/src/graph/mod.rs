//! Landmark connection topologies.
//!
//! Face topologies come from the detector's fixed tables. The hand
//! tessellation is derived locally from anatomical grouping rules and built
//! exactly once when the graph is constructed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Directed pair of landmark indices joined by a drawn edge.
pub type Edge = (usize, usize);

/// Named face-region topology selectable by the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionTopology {
    #[default]
    Tesselation,
    Contours,
    FaceOval,
    Lips,
    LeftEye,
    RightEye,
}

impl ConnectionTopology {
    pub const ALL: [ConnectionTopology; 6] = [
        ConnectionTopology::Tesselation,
        ConnectionTopology::Contours,
        ConnectionTopology::FaceOval,
        ConnectionTopology::Lips,
        ConnectionTopology::LeftEye,
        ConnectionTopology::RightEye,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tesselation => "TESSELATION",
            Self::Contours => "CONTOURS",
            Self::FaceOval => "FACE_OVAL",
            Self::Lips => "LIPS",
            Self::LeftEye => "LEFT_EYE",
            Self::RightEye => "RIGHT_EYE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|topology| topology.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ConnectionTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which hand edge set the mesh strategy draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandTopology {
    /// Locally derived tessellation.
    Derived,
    /// The detector's built-in connection table.
    Builtin,
}

impl HandTopology {
    /// The derived tessellation accompanies the face tessellation; every
    /// other face topology pairs with the detector's own hand table.
    pub fn for_face(topology: ConnectionTopology) -> Self {
        match topology {
            ConnectionTopology::Tesselation => Self::Derived,
            _ => Self::Builtin,
        }
    }
}

/// Topology tables as shipped by a landmark detector.
#[derive(Debug, Clone, Default)]
pub struct TopologyTables {
    pub face: BTreeMap<ConnectionTopology, Vec<Edge>>,
    pub hand_connections: Vec<Edge>,
}

impl TopologyTables {
    /// The region tables every 468-point face mesh detector agrees on, plus
    /// the 21-point hand skeleton. No tessellation table is included.
    pub fn reference() -> Self {
        let mut face = BTreeMap::new();
        face.insert(ConnectionTopology::FaceOval, FACE_OVAL.to_vec());
        face.insert(ConnectionTopology::Lips, LIPS.to_vec());
        face.insert(ConnectionTopology::LeftEye, LEFT_EYE.to_vec());
        face.insert(ConnectionTopology::RightEye, RIGHT_EYE.to_vec());
        Self {
            face,
            hand_connections: HAND_CONNECTIONS.to_vec(),
        }
    }
}

/// Immutable set of connection topologies used by the drawing strategies.
#[derive(Debug, Clone)]
pub struct ConnectionGraph {
    face: BTreeMap<ConnectionTopology, Vec<Edge>>,
    hand_builtin: Vec<Edge>,
    hand_derived: Vec<Edge>,
}

impl ConnectionGraph {
    /// Builds the graph from detector tables. Missing region tables are
    /// filled in: `CONTOURS` becomes the union of the region tables, and
    /// `TESSELATION` falls back to `CONTOURS`.
    pub fn new(tables: TopologyTables) -> Self {
        let TopologyTables {
            mut face,
            hand_connections,
        } = tables;

        if !face.contains_key(&ConnectionTopology::Contours) {
            let union = dedup_edges(
                [
                    ConnectionTopology::FaceOval,
                    ConnectionTopology::Lips,
                    ConnectionTopology::LeftEye,
                    ConnectionTopology::RightEye,
                ]
                .iter()
                .filter_map(|topology| face.get(topology))
                .flatten()
                .copied(),
            );
            face.insert(ConnectionTopology::Contours, union);
        }
        if !face.contains_key(&ConnectionTopology::Tesselation) {
            let contours = face
                .get(&ConnectionTopology::Contours)
                .cloned()
                .unwrap_or_default();
            face.insert(ConnectionTopology::Tesselation, contours);
        }
        for topology in ConnectionTopology::ALL {
            face.entry(topology).or_default();
        }

        Self {
            face,
            hand_builtin: hand_connections,
            hand_derived: derive_hand_tessellation(),
        }
    }

    pub fn face(&self, topology: ConnectionTopology) -> &[Edge] {
        self.face.get(&topology).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn hand(&self, topology: HandTopology) -> &[Edge] {
        match topology {
            HandTopology::Derived => &self.hand_derived,
            HandTopology::Builtin => &self.hand_builtin,
        }
    }
}

impl Default for ConnectionGraph {
    fn default() -> Self {
        Self::new(TopologyTables::reference())
    }
}

/// Assembles the hand tessellation from the palm ring, each finger's joints
/// (adjacent and skip-one) and the cross-finger web. Duplicates are dropped.
pub fn derive_hand_tessellation() -> Vec<Edge> {
    const FINGER_BASES: [usize; 5] = [1, 5, 9, 13, 17];

    let mut edges = Vec::new();

    // Palm ring: wrist to each finger base, then base to base.
    for base in FINGER_BASES {
        edges.push((0, base));
    }
    edges.push((1, 2));
    edges.push((2, 5));
    for pair in FINGER_BASES[1..].windows(2) {
        edges.push((pair[0], pair[1]));
    }
    edges.push((1, 5));
    // Wrist to each second joint.
    for base in FINGER_BASES {
        edges.push((0, base + 1));
    }

    for base in FINGER_BASES {
        edges.extend([
            (base, base + 1),
            (base + 1, base + 2),
            (base + 2, base + 3),
            (base, base + 2),
            (base + 1, base + 3),
        ]);
    }

    // Web between fingers.
    edges.extend([(1, 9), (5, 13), (9, 17), (2, 9), (5, 17)]);

    dedup_edges(edges)
}

fn dedup_edges(edges: impl IntoIterator<Item = Edge>) -> Vec<Edge> {
    let mut seen = BTreeSet::new();
    edges
        .into_iter()
        .filter(|&(a, b)| seen.insert((a.min(b), a.max(b))))
        .collect()
}

pub const FACE_OVAL: [Edge; 36] = [
    (10, 338), (338, 297), (297, 332), (332, 284), (284, 251), (251, 389),
    (389, 356), (356, 454), (454, 323), (323, 361), (361, 288), (288, 397),
    (397, 365), (365, 379), (379, 378), (378, 400), (400, 377), (377, 152),
    (152, 148), (148, 176), (176, 149), (149, 150), (150, 136), (136, 172),
    (172, 58), (58, 132), (132, 93), (93, 234), (234, 127), (127, 162),
    (162, 21), (21, 54), (54, 103), (103, 67), (67, 109), (109, 10),
];

pub const LIPS: [Edge; 40] = [
    (61, 146), (146, 91), (91, 181), (181, 84), (84, 17), (17, 314),
    (314, 405), (405, 321), (321, 375), (375, 291), (61, 185), (185, 40),
    (40, 39), (39, 37), (37, 0), (0, 267), (267, 269), (269, 270),
    (270, 409), (409, 291), (78, 95), (95, 88), (88, 178), (178, 87),
    (87, 14), (14, 317), (317, 402), (402, 318), (318, 324), (324, 308),
    (78, 191), (191, 80), (80, 81), (81, 82), (82, 13), (13, 312),
    (312, 311), (311, 310), (310, 415), (415, 308),
];

pub const LEFT_EYE: [Edge; 16] = [
    (263, 249), (249, 390), (390, 373), (373, 374), (374, 380), (380, 381),
    (381, 382), (382, 362), (263, 466), (466, 388), (388, 387), (387, 386),
    (386, 385), (385, 384), (384, 398), (398, 362),
];

pub const RIGHT_EYE: [Edge; 16] = [
    (33, 7), (7, 163), (163, 144), (144, 145), (145, 153), (153, 154),
    (154, 155), (155, 133), (33, 246), (246, 161), (161, 160), (160, 159),
    (159, 158), (158, 157), (157, 173), (173, 133),
];

pub const HAND_CONNECTIONS: [Edge; 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];
