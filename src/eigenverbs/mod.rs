// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Eigenverbs: Gaussian beam projections of acoustic rays onto the
reverberation interfaces at their points of collision.

The name comes from the fact that eigenverbs provide discrete components
of the total reverberation in the same way that eigenrays provide
discrete components of the total transmission loss. Collections store
one list per interface along with a quadtree spatial index over the
geographic bounding boxes of the Gaussian footprints, so that the
bistatic overlap search only visits verbs in the neighbourhood of a
receiver verb.

To avoid conversions during envelope generation, direction, grazing,
source_de, and source_az are all stored in radians. The eigenray
structure stores the equivalent fields in degrees at the I/O boundary.
*/

use std::sync::Arc;

use crate::geo::{earth_radius, WVector, TWO_PI};


/// Types of interface interactions that eigenverbs keep track of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceType {
    /// Collision with the ocean bottom.
    Bottom,
    /// Collision with the ocean surface.
    Surface,
    /// Downward crossing through the top of volume layer `k`.
    VolumeUpper(usize),
    /// Upward crossing through the bottom of volume layer `k`.
    VolumeLower(usize),
}

impl InterfaceType {
    /// Index of this interface inside an eigenverb collection:
    /// bottom=0, surface=1, then alternating upper/lower per layer.
    pub fn index(&self) -> usize {
        match self {
            InterfaceType::Bottom => 0,
            InterfaceType::Surface => 1,
            InterfaceType::VolumeUpper(k) => 2 + 2 * k,
            InterfaceType::VolumeLower(k) => 3 + 2 * k,
        }
    }

    /// Reverse of [`InterfaceType::index`].
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => InterfaceType::Bottom,
            1 => InterfaceType::Surface,
            n if n % 2 == 0 => InterfaceType::VolumeUpper((n - 2) / 2),
            n => InterfaceType::VolumeLower((n - 3) / 2),
        }
    }
}

/// Axis-aligned geographic bounding box in radians of colatitude and
/// longitude.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    /// Smallest colatitude (radians).
    pub theta_min: f64,
    /// Largest colatitude (radians).
    pub theta_max: f64,
    /// Smallest longitude (radians).
    pub phi_min: f64,
    /// Largest longitude (radians).
    pub phi_max: f64,
}

impl BoundingBox {
    /// Box centred on a position with the given half-extents in meters.
    /// The longitude extent is scaled by cos(latitude).
    pub fn from_centre(centre: &WVector, half_north: f64, half_east: f64) -> Self {
        let earth = earth_radius(centre.latitude());
        let dtheta = half_north / earth;
        let dphi = half_east / (earth * centre.theta.sin().abs().max(1e-6));
        BoundingBox {
            theta_min: centre.theta - dtheta,
            theta_max: centre.theta + dtheta,
            phi_min: centre.phi - dphi,
            phi_max: centre.phi + dphi,
        }
    }

    /// True when two boxes overlap.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.theta_min <= other.theta_max
            && other.theta_min <= self.theta_max
            && self.phi_min <= other.phi_max
            && other.phi_min <= self.phi_max
    }

    /// True when this box fully contains another box.
    fn contains(&self, other: &BoundingBox) -> bool {
        self.theta_min <= other.theta_min
            && other.theta_max <= self.theta_max
            && self.phi_min <= other.phi_min
            && other.phi_max <= self.phi_max
    }
}

/// Gaussian beam projection of an acoustic ray onto a reverberation
/// interface at the point of collision.
#[derive(Clone, Debug)]
pub struct Eigenverb {
    /// One way travel time for this path (seconds).
    pub time: f64,
    /// Fraction of the total source level that reaches the ensonified
    /// patch (linear units, one entry per frequency). Computed as the
    /// fraction of solid angle for this ray at launch, times the boundary
    /// and attenuation losses along the path, divided by the sine of the
    /// grazing angle.
    pub power: Vec<f64>,
    /// Length of the DE projection of the beam onto the interface (meters).
    pub length: f64,
    /// Length squared, cached because the overlap math uses it heavily.
    pub length2: f64,
    /// Width of the AZ projection of the beam onto the interface (meters).
    pub width: f64,
    /// Width squared.
    pub width2: f64,
    /// Location of impact with the interface.
    pub position: WVector,
    /// Compass heading of the length axis (radians, clockwise from north).
    pub direction: f64,
    /// Grazing angle at impact (radians, positive is up).
    pub grazing: f64,
    /// Sound speed at the point of impact (m/s).
    pub sound_speed: f64,
    /// Index of the launch DE in the source fan.
    pub de_index: usize,
    /// Index of the launch AZ in the source fan.
    pub az_index: usize,
    /// Launch depression/elevation angle (radians, positive up).
    pub source_de: f64,
    /// Launch azimuth angle (radians, clockwise from north).
    pub source_az: f64,
    /// Number of interactions with the surface boundary.
    pub surface: u16,
    /// Number of interactions with the bottom boundary.
    pub bottom: u16,
    /// Number of caustics encountered along this path.
    pub caustic: u16,
    /// Number of upper vertices encountered along this path.
    pub upper: u16,
    /// Number of lower vertices encountered along this path.
    pub lower: u16,
    /// Cached geographic bounding box with a 1.5 sigma halo.
    pub bounding_box: BoundingBox,
}

impl Eigenverb {
    /// Recompute the bounding box from the footprint: a 1.5 sigma halo
    /// around the length/width ellipse, projected on north/east axes.
    pub fn update_bounding_box(&mut self) {
        let (sin_dir, cos_dir) = self.direction.sin_cos();
        let half_north = 1.5 * ((self.length * cos_dir).abs() + (self.width * sin_dir).abs());
        let half_east = 1.5 * ((self.length * sin_dir).abs() + (self.width * cos_dir).abs());
        self.bounding_box = BoundingBox::from_centre(&self.position, half_north, half_east);
    }
}

/// Quadtree over bounding boxes, the spatial index behind
/// `find_eigenverbs`. Entries whose boxes straddle a split stay in the
/// branch node.
struct QuadTree {
    bounds: BoundingBox,
    entries: Vec<(BoundingBox, usize)>,
    children: Option<Box<[QuadTree; 4]>>,
    depth: usize,
}

const QUAD_NODE_CAPACITY: usize = 8;
const QUAD_MAX_DEPTH: usize = 8;

impl QuadTree {
    fn new(bounds: BoundingBox, depth: usize) -> Self {
        QuadTree {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    fn insert(&mut self, bbox: BoundingBox, id: usize) {
        if self.children.is_none()
            && self.entries.len() >= QUAD_NODE_CAPACITY
            && self.depth < QUAD_MAX_DEPTH
        {
            self.split();
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains(&bbox) {
                    child.insert(bbox, id);
                    return;
                }
            }
        }
        self.entries.push((bbox, id));
    }

    fn split(&mut self) {
        let mid_theta = 0.5 * (self.bounds.theta_min + self.bounds.theta_max);
        let mid_phi = 0.5 * (self.bounds.phi_min + self.bounds.phi_max);
        let quads = [
            BoundingBox {
                theta_min: self.bounds.theta_min,
                theta_max: mid_theta,
                phi_min: self.bounds.phi_min,
                phi_max: mid_phi,
            },
            BoundingBox {
                theta_min: self.bounds.theta_min,
                theta_max: mid_theta,
                phi_min: mid_phi,
                phi_max: self.bounds.phi_max,
            },
            BoundingBox {
                theta_min: mid_theta,
                theta_max: self.bounds.theta_max,
                phi_min: self.bounds.phi_min,
                phi_max: mid_phi,
            },
            BoundingBox {
                theta_min: mid_theta,
                theta_max: self.bounds.theta_max,
                phi_min: mid_phi,
                phi_max: self.bounds.phi_max,
            },
        ];
        let depth = self.depth + 1;
        self.children = Some(Box::new(quads.map(|q| QuadTree::new(q, depth))));
        let entries = std::mem::take(&mut self.entries);
        for (bbox, id) in entries {
            self.insert(bbox, id);
        }
    }

    fn query(&self, bbox: &BoundingBox, hits: &mut Vec<usize>) {
        for (entry_box, id) in &self.entries {
            if entry_box.intersects(bbox) {
                hits.push(*id);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.intersects(bbox) {
                    child.query(bbox, hits);
                }
            }
        }
    }
}

/// Shared reference to an immutable eigenverb collection.
pub type EigenverbCollectionRef = Arc<EigenverbCollection>;

/// Collection of eigenverbs from one wavefront, organized per interface
/// with a spatial index per interface. Populated while the wavefront
/// propagates, read-only thereafter.
pub struct EigenverbCollection {
    interfaces: Vec<Vec<Arc<Eigenverb>>>,
    indexes: Vec<Option<QuadTree>>,
}

impl EigenverbCollection {
    /// Create an empty collection for an ocean with `num_volumes` volume
    /// scattering layers.
    pub fn new(num_volumes: usize) -> Self {
        let count = 2 + 2 * num_volumes;
        EigenverbCollection {
            interfaces: (0..count).map(|_| Vec::new()).collect(),
            indexes: (0..count).map(|_| None).collect(),
        }
    }

    /// Number of interfaces, including both sides of each volume layer.
    pub fn num_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    /// All eigenverbs for one interface.
    pub fn eigenverbs(&self, interface: usize) -> &[Arc<Eigenverb>] {
        &self.interfaces[interface]
    }

    /// Total number of eigenverbs across all interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.iter().map(|v| v.len()).sum()
    }

    /// True when no eigenverbs have been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an eigenverb to the collection during wavefront propagation.
    /// The spatial index for the interface is rebuilt lazily on the next
    /// query.
    pub fn add_eigenverb(&mut self, interface: InterfaceType, mut verb: Eigenverb) {
        verb.update_bounding_box();
        let n = interface.index();
        self.interfaces[n].push(Arc::new(verb));
        self.indexes[n] = None;
    }

    /// Build the spatial indexes. Called once after propagation so that
    /// the published collection can serve queries without mutation.
    pub fn build_indexes(&mut self) {
        for n in 0..self.interfaces.len() {
            if self.indexes[n].is_some() || self.interfaces[n].is_empty() {
                continue;
            }
            let mut bounds = self.interfaces[n][0].bounding_box;
            for verb in &self.interfaces[n][1..] {
                let b = verb.bounding_box;
                bounds.theta_min = bounds.theta_min.min(b.theta_min);
                bounds.theta_max = bounds.theta_max.max(b.theta_max);
                bounds.phi_min = bounds.phi_min.min(b.phi_min);
                bounds.phi_max = bounds.phi_max.max(b.phi_max);
            }
            let mut tree = QuadTree::new(bounds, 0);
            for (id, verb) in self.interfaces[n].iter().enumerate() {
                tree.insert(verb.bounding_box, id);
            }
            self.indexes[n] = Some(tree);
        }
    }

    /// Find all eigenverbs on one interface whose bounding box intersects
    /// the query box.
    pub fn find_eigenverbs(
        &self,
        interface: usize,
        bbox: &BoundingBox,
    ) -> Vec<Arc<Eigenverb>> {
        let verbs = &self.interfaces[interface];
        match &self.indexes[interface] {
            Some(tree) => {
                let mut hits = Vec::new();
                tree.query(bbox, &mut hits);
                hits.sort_unstable();
                hits.iter().map(|&id| verbs[id].clone()).collect()
            }
            // index not built yet, fall back to a linear scan
            None => verbs
                .iter()
                .filter(|verb| verb.bounding_box.intersects(bbox))
                .cloned()
                .collect(),
        }
    }
}

/// Normalize a compass angle into [0, 2 pi).
pub fn wrap_compass(angle: f64) -> f64 {
    let mut a = angle % TWO_PI;
    if a < 0.0 {
        a += TWO_PI;
    }
    a
}
