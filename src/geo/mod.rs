// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
World vectors in geodetic spherical earth coordinates, great circle
utilities, orientation, and dense DE x AZ vector fields.

All propagation math works in (rho, theta, phi) where rho is the distance
from the centre of the earth in meters, theta is colatitude in radians
(0 at the north pole), and phi is longitude in radians. Latitude in
degrees and altitude in meters only appear at the I/O boundary.
*/

use std::f64::consts::PI;


/// Semi-major axis of the WGS-84 ellipsoid (meters).
pub const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;

/// Semi-minor axis of the WGS-84 ellipsoid (meters).
pub const WGS84_SEMI_MINOR: f64 = 6_356_752.314_245;

/// Two pi. Used to wrap compass angles into [0, 2 pi).
pub const TWO_PI: f64 = 2.0 * PI;

/// Geocentric radius of the WGS-84 ellipsoid at a geodetic latitude.
///
/// # Arguments
///
/// * `latitude` - Geodetic latitude (degrees)
///
/// # Returns
///
/// * Distance from the centre of the earth to the ellipsoid surface (meters)
///
pub fn earth_radius(latitude: f64) -> f64 {
    let (s, c) = latitude.to_radians().sin_cos();
    let a2 = WGS84_SEMI_MAJOR * WGS84_SEMI_MAJOR;
    let b2 = WGS84_SEMI_MINOR * WGS84_SEMI_MINOR;
    let num = (a2 * c).powi(2) + (b2 * s).powi(2);
    let den = (WGS84_SEMI_MAJOR * c).powi(2) + (WGS84_SEMI_MINOR * s).powi(2);
    (num / den).sqrt()
}

/// Convert latitude in degrees to colatitude in radians.
pub fn to_colatitude(latitude: f64) -> f64 {
    PI / 2.0 - latitude.to_radians()
}

/// Convert colatitude in radians to latitude in degrees.
pub fn to_latitude(theta: f64) -> f64 {
    (PI / 2.0 - theta).to_degrees()
}

/// Individual world vector in spherical earth coordinates.
///
/// Used both for positions, where the components are the coordinates
/// themselves, and for directions, where the components are expressed in
/// the local orthonormal basis (rho=up, theta=south, phi=east) at some
/// reference position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WVector {
    /// Radial coordinate in meters, or radial direction component.
    pub rho: f64,
    /// Colatitude coordinate in radians, or southward direction component.
    pub theta: f64,
    /// Longitude coordinate in radians, or eastward direction component.
    pub phi: f64,
}

impl WVector {
    /// Creates a new world vector from raw (rho, theta, phi) components.
    pub fn new(rho: f64, theta: f64, phi: f64) -> Self {
        WVector { rho, theta, phi }
    }

    /// Creates a position from geodetic earth coordinates.
    ///
    /// # Arguments
    ///
    /// * `latitude` - Latitude (degrees)
    ///
    /// * `longitude` - Longitude (degrees)
    ///
    /// * `altitude` - Height above the sea surface (meters, positive up)
    ///
    pub fn from_geodetic(latitude: f64, longitude: f64, altitude: f64) -> Self {
        WVector {
            rho: earth_radius(latitude) + altitude,
            theta: to_colatitude(latitude),
            phi: longitude.to_radians(),
        }
    }

    /// Latitude component of geodetic earth coordinates (degrees).
    pub fn latitude(&self) -> f64 {
        to_latitude(self.theta)
    }

    /// Longitude component of geodetic earth coordinates (degrees).
    pub fn longitude(&self) -> f64 {
        self.phi.to_degrees()
    }

    /// Height above the sea surface (meters, positive up).
    pub fn altitude(&self) -> f64 {
        self.rho - earth_radius(self.latitude())
    }

    /// Dot product between this position and another position,
    /// treating both as vectors from the centre of the earth.
    pub fn dot(&self, other: &WVector) -> f64 {
        self.rho
            * other.rho
            * (self.theta.sin() * other.theta.sin() * (self.phi - other.phi).cos()
                + self.theta.cos() * other.theta.cos())
    }

    /// Dot product divided by the magnitude of the two vectors.
    pub fn dotnorm(&self, other: &WVector) -> f64 {
        self.theta.sin() * other.theta.sin() * (self.phi - other.phi).cos()
            + self.theta.cos() * other.theta.cos()
    }

    /// Square of the straight line distance between two points in space.
    pub fn distance2(&self, origin: &WVector) -> f64 {
        (self.rho * self.rho + origin.rho * origin.rho - 2.0 * self.dot(origin)).max(0.0)
    }

    /// Straight line distance between two points in space.
    pub fn distance(&self, origin: &WVector) -> f64 {
        self.distance2(origin).sqrt()
    }

    /// Component-wise dot product for direction vectors expressed in a
    /// common local basis.
    pub fn vdot(&self, other: &WVector) -> f64 {
        self.rho * other.rho + self.theta * other.theta + self.phi * other.phi
    }

    /// Magnitude of a direction vector expressed in a local basis.
    pub fn vnorm(&self) -> f64 {
        self.vdot(self).sqrt()
    }

    /// Scale a direction vector to unit magnitude. Zero vectors are
    /// left untouched.
    pub fn normalize(&mut self) {
        let n = self.vnorm();
        if n > 0.0 {
            self.rho /= n;
            self.theta /= n;
            self.phi /= n;
        }
    }

    /// Surface area of the triangle (self, p2, p3) from the lengths of
    /// its sides.
    ///
    /// # Arguments
    ///
    /// * `p2` - Second point in space
    ///
    /// * `p3` - Third point in space
    ///
    pub fn area(&self, p2: &WVector, p3: &WVector) -> f64 {
        let a = self.distance(p2);
        let b = self.distance(p3);
        let c = p2.distance(p3);
        let product = (a + b + c) * (b + c - a) * (c + a - b) * (a + b - c);
        if product <= 0.0 {
            return 0.0;
        }
        0.25 * product.sqrt()
    }

    /// Surface area between four points in space, as the sum of the two
    /// triangles (self, p2, p3) and (self, p3, p4).
    pub fn quad_area(&self, p2: &WVector, p3: &WVector, p4: &WVector) -> f64 {
        self.area(p2, p3) + self.area(p3, p4)
    }

    /// Build an acoustic ray direction in the local tangent plane from
    /// launch angles.
    ///
    /// # Arguments
    ///
    /// * `de` - Depression/elevation angle (radians, positive is up)
    ///
    /// * `az` - Azimuthal angle (radians, clockwise from true north)
    ///
    pub fn from_de_az(de: f64, az: f64) -> Self {
        let (sde, cde) = de.sin_cos();
        let (saz, caz) = az.sin_cos();
        WVector {
            rho: sde,
            theta: -cde * caz,
            phi: cde * saz,
        }
    }

    /// Extract depression/elevation and azimuthal angles from an acoustic
    /// ray direction in the local tangent plane.
    ///
    /// # Returns
    ///
    /// * Tuple of (de, az) where de is radians positive up, and az is
    ///   radians clockwise from true north in [0, 2 pi).
    ///
    pub fn direction_angles(&self) -> (f64, f64) {
        let horizontal = (self.theta * self.theta + self.phi * self.phi).sqrt();
        let de = self.rho.atan2(horizontal);
        let mut az = self.phi.atan2(-self.theta);
        if az < 0.0 {
            az += TWO_PI;
        }
        (de, az)
    }

    /// Great circle range and bearing from this position to another
    /// position along the earth's surface.
    ///
    /// # Arguments
    ///
    /// * `location` - Position the range and bearing are measured to.
    ///
    /// # Returns
    ///
    /// * Tuple of (range, bearing) where range is in meters along the
    ///   surface and bearing is radians clockwise from true north.
    ///
    pub fn gc_range(&self, location: &WVector) -> (f64, f64) {
        let lat1 = PI / 2.0 - self.theta;
        let lat2 = PI / 2.0 - location.theta;
        let dlon = location.phi - self.phi;
        let dlat = lat2 - lat1;
        let h = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let angle = 2.0 * h.sqrt().min(1.0).asin();
        let range = angle * earth_radius(self.latitude());
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let mut bearing = y.atan2(x);
        if bearing < 0.0 {
            bearing += TWO_PI;
        }
        (range, bearing)
    }

    /// Position on the earth's surface at a great circle range and bearing
    /// from this position. The new position keeps this position's rho.
    ///
    /// # Arguments
    ///
    /// * `range` - Distance along the earth's surface (meters).
    ///
    /// * `bearing` - True bearing to the new point (radians).
    ///
    pub fn gc_position(&self, range: f64, bearing: f64) -> WVector {
        let lat1 = PI / 2.0 - self.theta;
        let delta = range / earth_radius(self.latitude());
        let lat2 =
            (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
        let lon2 = self.phi
            + (bearing.sin() * delta.sin() * lat1.cos())
                .atan2(delta.cos() - lat1.sin() * lat2.sin());
        WVector {
            rho: self.rho,
            theta: PI / 2.0 - lat2,
            phi: lon2,
        }
    }
}

/// Dense matrix of world vectors indexed by (de, az), stored as three
/// row-major component planes.
#[derive(Clone, Debug)]
pub struct WVectorField {
    num_de: usize,
    num_az: usize,
    /// Radial component plane.
    pub rho: Vec<f64>,
    /// Colatitude component plane.
    pub theta: Vec<f64>,
    /// Longitude component plane.
    pub phi: Vec<f64>,
}

impl WVectorField {
    /// Creates a zero-filled field with the requested fan dimensions.
    pub fn new(num_de: usize, num_az: usize) -> Self {
        let len = num_de * num_az;
        WVectorField {
            num_de,
            num_az,
            rho: vec![0.0; len],
            theta: vec![0.0; len],
            phi: vec![0.0; len],
        }
    }

    /// Number of depression/elevation angles in the fan.
    pub fn num_de(&self) -> usize {
        self.num_de
    }

    /// Number of azimuthal angles in the fan.
    pub fn num_az(&self) -> usize {
        self.num_az
    }

    /// Flattened element index for cell (de, az).
    #[inline]
    pub fn index(&self, de: usize, az: usize) -> usize {
        de * self.num_az + az
    }

    /// Copy one element out of the field.
    #[inline]
    pub fn get(&self, de: usize, az: usize) -> WVector {
        let n = self.index(de, az);
        WVector {
            rho: self.rho[n],
            theta: self.theta[n],
            phi: self.phi[n],
        }
    }

    /// Overwrite one element of the field.
    #[inline]
    pub fn set(&mut self, de: usize, az: usize, value: &WVector) {
        let n = self.index(de, az);
        self.rho[n] = value.rho;
        self.theta[n] = value.theta;
        self.phi[n] = value.phi;
    }

    /// Fill every element with the same vector.
    pub fn fill(&mut self, value: &WVector) {
        self.rho.fill(value.rho);
        self.theta.fill(value.theta);
        self.phi.fill(value.phi);
    }
}

/// Physical orientation of a sensor as Tait-Bryan yaw, pitch, and roll
/// rotations with a cached rotation matrix.
///
/// A yaw of zero points the object north; positive yaw moves the nose to
/// the right. The first column of the rotation matrix is the body's
/// forward vector in world (north, east, up) coordinates, the second
/// column is the right direction, and the third column is up.
#[derive(Clone, Copy, Debug)]
pub struct Orientation {
    yaw: f64,
    pitch: f64,
    roll: f64,
    rotation: [[f64; 3]; 3],
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::new(0.0, 0.0, 0.0)
    }
}

impl Orientation {
    /// Construct an orientation from a given yaw, pitch, and roll.
    ///
    /// # Arguments
    ///
    /// * `yaw` - Compass heading (degrees)
    ///
    /// * `pitch` - Up/down tilt relative to the local ocean surface (degrees)
    ///
    /// * `roll` - Left/right tilt relative to the local ocean surface (degrees)
    ///
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        let (sy, cy) = yaw.to_radians().sin_cos();
        let (sp, cp) = pitch.to_radians().sin_cos();
        let (sr, cr) = roll.to_radians().sin_cos();
        // columns are the body's forward, right, and up axes in
        // (north, east, up) world coordinates
        let rotation = [
            [cy * cp, cy * sp * sr - sy * cr, -cy * sp * cr - sy * sr],
            [sy * cp, sy * sp * sr + cy * cr, -sy * sp * cr + cy * sr],
            [sp, -cp * sr, cp * cr],
        ];
        Orientation {
            yaw,
            pitch,
            roll,
            rotation,
        }
    }

    /// Compass heading (degrees).
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// Up/down tilt (degrees).
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Left/right tilt (degrees).
    pub fn roll(&self) -> f64 {
        self.roll
    }

    /// Rotate a world (north, east, up) vector into body (forward, right,
    /// up) coordinates. Used to express arrival directions in array
    /// coordinates before evaluating beam patterns.
    pub fn world_to_body(&self, v: &BVector) -> BVector {
        let r = &self.rotation;
        BVector {
            front: r[0][0] * v.front + r[1][0] * v.right + r[2][0] * v.up,
            right: r[0][1] * v.front + r[1][1] * v.right + r[2][1] * v.up,
            up: r[0][2] * v.front + r[1][2] * v.right + r[2][2] * v.up,
        }
    }

    /// Rotate a body (forward, right, up) vector into world coordinates.
    pub fn body_to_world(&self, v: &BVector) -> BVector {
        let r = &self.rotation;
        BVector {
            front: r[0][0] * v.front + r[0][1] * v.right + r[0][2] * v.up,
            right: r[1][0] * v.front + r[1][1] * v.right + r[1][2] * v.up,
            up: r[2][0] * v.front + r[2][1] * v.right + r[2][2] * v.up,
        }
    }
}

/// Direction in the local tangent frame of a sensor. In world form the
/// components are (north, east, up); after rotation by an orientation the
/// components are (forward, right, up) of the array.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BVector {
    /// Northward (or forward) component.
    pub front: f64,
    /// Eastward (or right) component.
    pub right: f64,
    /// Upward component.
    pub up: f64,
}

impl BVector {
    /// Build a unit tangent-frame vector from arrival angles.
    ///
    /// # Arguments
    ///
    /// * `de` - Depression/elevation angle (radians, positive up)
    ///
    /// * `az` - Azimuth (radians, clockwise from true north)
    ///
    pub fn from_de_az(de: f64, az: f64) -> Self {
        let (sde, cde) = de.sin_cos();
        let (saz, caz) = az.sin_cos();
        BVector {
            front: cde * caz,
            right: cde * saz,
            up: sde,
        }
    }

    /// Extract (de, az) angles in radians from this vector.
    pub fn direction_angles(&self) -> (f64, f64) {
        let horizontal = (self.front * self.front + self.right * self.right).sqrt();
        let de = self.up.atan2(horizontal);
        let mut az = self.right.atan2(self.front);
        if az < 0.0 {
            az += TWO_PI;
        }
        (de, az)
    }
}
