// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
N-dimensional data set and its interpolation.

A grid is defined by N monotonic axes and a dense, row-major block of
values. Each axis carries its own interpolation type (nearest, linear,
or PCHIP) and edge policy (clamp to the boundary value, or extrapolate
with the boundary slope). PCHIP axes use monotonicity preserving cubic
Hermite interpolation with Fritsch-Carlson derivatives, and default to
the clamped edge policy to avoid overshoots at the domain edge.
*/

use crate::seq::SeqRef;

pub mod error;
pub use error::GridError;

#[cfg(test)]
mod test;

/// Interpolation scheme used along one axis of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InterpKind {
    /// Return the value of the nearest node.
    Nearest,
    /// Tensor-product linear interpolation.
    #[default]
    Linear,
    /// Piecewise Cubic Hermite Interpolating Polynomial with
    /// Fritsch-Carlson monotonicity-preserving derivatives.
    Pchip,
}

/// N-dimensional data set with per-axis interpolation control.
#[derive(Clone, Debug)]
pub struct DataGrid<const N: usize> {
    axes: [SeqRef; N],
    data: Vec<f64>,
    interp: [InterpKind; N],
    edge_limit: [bool; N],
    strides: [usize; N],
}

impl<const N: usize> DataGrid<N> {
    /// Construct a grid from its axes and a row-major value block.
    ///
    /// # Arguments
    ///
    /// * `axes` - One monotonic sequence per dimension.
    ///
    /// * `data` - Row-major values, length = product of the axis sizes.
    ///
    pub fn new(axes: [SeqRef; N], data: Vec<f64>) -> Result<Self, GridError> {
        let expected: usize = axes.iter().map(|a| a.size()).product();
        if data.len() != expected {
            return Err(GridError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let mut strides = [1usize; N];
        for dim in (0..N.saturating_sub(1)).rev() {
            strides[dim] = strides[dim + 1] * axes[dim + 1].size();
        }
        Ok(DataGrid {
            axes,
            data,
            interp: [InterpKind::Linear; N],
            edge_limit: [false; N],
            strides,
        })
    }

    /// Construct a zero-filled grid from its axes.
    pub fn zeroed(axes: [SeqRef; N]) -> Self {
        let len: usize = axes.iter().map(|a| a.size()).product();
        // the value block always matches the axes by construction
        DataGrid::new(axes, vec![0.0; len]).unwrap_or_else(|_| unreachable!())
    }

    /// Axis for one dimension of the grid.
    pub fn axis(&self, dim: usize) -> &SeqRef {
        &self.axes[dim]
    }

    /// Interpolation type along one axis.
    pub fn interp_kind(&self, dim: usize) -> InterpKind {
        self.interp[dim]
    }

    /// Define the interpolation type along one axis. Choosing PCHIP also
    /// enables the clamped edge policy for that axis, since extrapolated
    /// cubics can produce extreme values.
    pub fn set_interp(&mut self, dim: usize, kind: InterpKind) {
        self.interp[dim] = kind;
        if kind == InterpKind::Pchip {
            self.edge_limit[dim] = true;
        }
    }

    /// Edge policy along one axis: true clamps queries to the boundary
    /// value, false extrapolates with the boundary slope.
    pub fn set_edge_limit(&mut self, dim: usize, limit: bool) {
        self.edge_limit[dim] = limit;
    }

    /// Retrieve the value at a node of the grid.
    pub fn data(&self, index: &[usize; N]) -> f64 {
        self.data[self.offset(index)]
    }

    /// Overwrite the value at a node of the grid.
    pub fn set_data(&mut self, index: &[usize; N], value: f64) {
        let n = self.offset(index);
        self.data[n] = value;
    }

    /// Interpolate the value of the grid at a real-valued coordinate.
    pub fn interpolate(&self, coords: &[f64; N]) -> f64 {
        let mut index = [0usize; N];
        self.interp_dim(0, coords, &mut index).0
    }

    /// Interpolate the value and per-axis derivative of the grid at a
    /// real-valued coordinate. Derivatives are expressed per unit of the
    /// raw axis coordinate.
    pub fn interpolate_gradient(&self, coords: &[f64; N], gradient: &mut [f64; N]) -> f64 {
        let mut index = [0usize; N];
        let (value, grad) = self.interp_dim(0, coords, &mut index);
        *gradient = grad;
        value
    }

    fn offset(&self, index: &[usize; N]) -> usize {
        let mut n = 0;
        for dim in 0..N {
            n += index[dim] * self.strides[dim];
        }
        n
    }

    /// Recursive kernel: interpolate dimensions `dim..N` with the leading
    /// dimensions pinned by `index`. Returns the value and its gradient.
    fn interp_dim(
        &self,
        dim: usize,
        coords: &[f64; N],
        index: &mut [usize; N],
    ) -> (f64, [f64; N]) {
        if dim == N {
            return (self.data[self.offset(index)], [0.0; N]);
        }
        let axis = &self.axes[dim];
        let mut x = coords[dim];
        if self.edge_limit[dim] {
            let lo = axis.value(0).min(axis.value(axis.size() - 1));
            let hi = axis.value(0).max(axis.value(axis.size() - 1));
            x = x.clamp(lo, hi);
        }
        let i = axis.find_index(x);
        match self.interp[dim] {
            InterpKind::Nearest => {
                let mid = 0.5 * (axis.value(i) + axis.value(i + 1));
                index[dim] = if (x - mid) * axis.increment(i).signum() < 0.0 {
                    i
                } else {
                    i + 1
                };
                let (value, mut grad) = self.interp_dim(dim + 1, coords, index);
                grad[dim] = 0.0;
                (value, grad)
            }
            InterpKind::Linear => {
                index[dim] = i;
                let (v0, g0) = self.interp_dim(dim + 1, coords, index);
                index[dim] = i + 1;
                let (v1, g1) = self.interp_dim(dim + 1, coords, index);
                let h = axis.increment(i);
                let u = (x - axis.value(i)) / h;
                let mut grad = [0.0; N];
                for k in 0..N {
                    grad[k] = g0[k] + u * (g1[k] - g0[k]);
                }
                grad[dim] = (v1 - v0) / h;
                (v0 + u * (v1 - v0), grad)
            }
            InterpKind::Pchip => self.interp_pchip(dim, coords, index, x, i),
        }
    }

    /// PCHIP along one axis. The derivative along this axis is exact; the
    /// cross-axis components of the gradient use the linear weights of the
    /// bracketing nodes.
    fn interp_pchip(
        &self,
        dim: usize,
        coords: &[f64; N],
        index: &mut [usize; N],
        x: f64,
        i: usize,
    ) -> (f64, [f64; N]) {
        let axis = &self.axes[dim];
        let last = axis.size() - 1;
        let im1 = i.saturating_sub(1);
        let ip2 = (i + 2).min(last);

        index[dim] = im1;
        let (vm1, _) = self.interp_dim(dim + 1, coords, index);
        index[dim] = i;
        let (v0, g0) = self.interp_dim(dim + 1, coords, index);
        index[dim] = i + 1;
        let (v1, g1) = self.interp_dim(dim + 1, coords, index);
        index[dim] = ip2;
        let (v2, _) = self.interp_dim(dim + 1, coords, index);

        let h = axis.value(i + 1) - axis.value(i);
        let h_prev = axis.value(i) - axis.value(im1);
        let h_next = axis.value(ip2) - axis.value(i + 1);
        let secant = (v1 - v0) / h;
        let secant_prev = if h_prev != 0.0 {
            (v0 - vm1) / h_prev
        } else {
            secant
        };
        let secant_next = if h_next != 0.0 {
            (v2 - v1) / h_next
        } else {
            secant
        };
        let d0 = if i == 0 {
            pchip_endpoint(h, h_next, secant, secant_next)
        } else {
            fritsch_carlson(h_prev, h, secant_prev, secant)
        };
        let d1 = if i + 1 == last {
            pchip_endpoint(h, h_prev, secant, secant_prev)
        } else {
            fritsch_carlson(h, h_next, secant, secant_next)
        };

        let t = (x - axis.value(i)) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let b0 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let b1 = t3 - 2.0 * t2 + t;
        let b2 = -2.0 * t3 + 3.0 * t2;
        let b3 = t3 - t2;
        let value = b0 * v0 + h * b1 * d0 + b2 * v1 + h * b3 * d1;

        let mut grad = [0.0; N];
        for k in 0..N {
            grad[k] = g0[k] + t * (g1[k] - g0[k]);
        }
        grad[dim] = (6.0 * t2 - 6.0 * t) * (v0 - v1) / h
            + (3.0 * t2 - 4.0 * t + 1.0) * d0
            + (3.0 * t2 - 2.0 * t) * d1;
        (value, grad)
    }
}

/// Fritsch-Carlson derivative at the node between two intervals.
/// Secants with opposite signs, or a zero secant, force the derivative
/// to zero so that the interpolant preserves monotonicity.
pub fn fritsch_carlson(h_prev: f64, h: f64, secant_prev: f64, secant: f64) -> f64 {
    if secant_prev * secant <= 0.0 {
        return 0.0;
    }
    let w1 = 2.0 * h + h_prev;
    let w2 = h + 2.0 * h_prev;
    (w1 + w2) / (w1 / secant_prev + w2 / secant)
}

/// One-sided derivative estimate at a grid endpoint, limited so the
/// interpolant stays monotone near the boundary.
fn pchip_endpoint(h: f64, h_far: f64, secant: f64, secant_far: f64) -> f64 {
    if h_far == 0.0 {
        return secant;
    }
    let d = ((2.0 * h + h_far) * secant - h * secant_far) / (h + h_far);
    if d * secant <= 0.0 {
        0.0
    } else if secant_far * secant <= 0.0 && d.abs() > 3.0 * secant.abs() {
        3.0 * secant
    } else {
        d
    }
}
