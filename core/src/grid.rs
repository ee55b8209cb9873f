//! Voxel addressing for the simulated tissue volume.
//!
//! Every spatial quantity in the simulation lives on one rectangular grid.
//! [`VoxelGrid`] maps continuous [`Point`] positions onto discrete [`Voxel`]
//! addresses and back, and enumerates neighbourhoods in a fixed order so that
//! any consumer drawing random numbers per neighbour stays reproducible.

use serde::{Deserialize, Serialize};

const OFFSET_RANGE: [i32; 3] = [-1, 0, 1];

/// Discrete address of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Voxel {
    x: u32,
    y: u32,
    z: u32,
}

impl Voxel {
    /// Creates a voxel address from its three axis indices.
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Index along the x axis.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Index along the y axis.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Index along the z axis.
    #[must_use]
    pub const fn z(&self) -> u32 {
        self.z
    }

    /// Applies a signed offset, returning `None` when any axis drops below zero.
    ///
    /// The result is not bounds-checked against a grid; pair this with
    /// [`VoxelGrid::is_valid`].
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Option<Voxel> {
        Some(Voxel::new(
            self.x.checked_add_signed(dx)?,
            self.y.checked_add_signed(dy)?,
            self.z.checked_add_signed(dz)?,
        ))
    }
}

/// Continuous position inside the simulated volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
    z: f64,
}

impl Point {
    /// Creates a point from its world coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// World x coordinate.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// World y coordinate.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// World z coordinate.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
}

/// Number of voxels along each axis of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    x_len: u32,
    y_len: u32,
    z_len: u32,
}

impl GridShape {
    /// Creates a new shape descriptor.
    #[must_use]
    pub const fn new(x_len: u32, y_len: u32, z_len: u32) -> Self {
        Self {
            x_len,
            y_len,
            z_len,
        }
    }

    /// Number of voxels along the x axis.
    #[must_use]
    pub const fn x_len(&self) -> u32 {
        self.x_len
    }

    /// Number of voxels along the y axis.
    #[must_use]
    pub const fn y_len(&self) -> u32 {
        self.y_len
    }

    /// Number of voxels along the z axis.
    #[must_use]
    pub const fn z_len(&self) -> u32 {
        self.z_len
    }

    /// Total number of voxels described by the shape.
    ///
    /// Returns `None` when the count does not fit in `usize`.
    #[must_use]
    pub fn voxel_count(&self) -> Option<usize> {
        let x_len = usize::try_from(self.x_len).ok()?;
        let y_len = usize::try_from(self.y_len).ok()?;
        let z_len = usize::try_from(self.z_len).ok()?;
        x_len.checked_mul(y_len)?.checked_mul(z_len)
    }

    /// Reports whether the voxel lies within the extents.
    #[must_use]
    pub const fn contains(&self, voxel: Voxel) -> bool {
        voxel.x < self.x_len && voxel.y < self.y_len && voxel.z < self.z_len
    }

    /// Linear storage index of the voxel, x varying fastest.
    #[must_use]
    pub fn index(&self, voxel: Voxel) -> Option<usize> {
        if !self.contains(voxel) {
            return None;
        }
        let x = usize::try_from(voxel.x).ok()?;
        let y = usize::try_from(voxel.y).ok()?;
        let z = usize::try_from(voxel.z).ok()?;
        let x_len = usize::try_from(self.x_len).ok()?;
        let y_len = usize::try_from(self.y_len).ok()?;
        Some((z * y_len + y) * x_len + x)
    }

    /// Inverse of [`GridShape::index`].
    #[must_use]
    pub fn voxel_at(&self, index: usize) -> Option<Voxel> {
        if index >= self.voxel_count()? {
            return None;
        }
        let x_len = usize::try_from(self.x_len).ok()?;
        let y_len = usize::try_from(self.y_len).ok()?;
        let x = u32::try_from(index % x_len).ok()?;
        let y = u32::try_from((index / x_len) % y_len).ok()?;
        let z = u32::try_from(index / (x_len * y_len)).ok()?;
        Some(Voxel::new(x, y, z))
    }

    /// Iterates every voxel in linear storage order.
    pub fn voxels(&self) -> impl Iterator<Item = Voxel> {
        let shape = *self;
        (0..shape.z_len).flat_map(move |z| {
            (0..shape.y_len).flat_map(move |y| (0..shape.x_len).map(move |x| Voxel::new(x, y, z)))
        })
    }
}

/// Edge length of a voxel along each axis, in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    dx: f64,
    dy: f64,
    dz: f64,
}

impl Spacing {
    /// Creates a spacing descriptor.
    #[must_use]
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Same spacing on every axis.
    #[must_use]
    pub const fn uniform(length: f64) -> Self {
        Self::new(length, length, length)
    }

    /// Voxel length along x.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }

    /// Voxel length along y.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.dy
    }

    /// Voxel length along z.
    #[must_use]
    pub const fn dz(&self) -> f64 {
        self.dz
    }

    /// Spacing as an `[x, y, z]` array.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }
}

/// Neighbourhood connectivity used when enumerating adjacent voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// Six neighbours sharing a face.
    Face,
    /// Eighteen neighbours sharing a face or an edge.
    Edge,
    /// Twenty-six neighbours sharing a face, an edge, or a corner.
    Vertex,
}

impl Connectivity {
    const fn max_moved_axes(self) -> u8 {
        match self {
            Self::Face => 1,
            Self::Edge => 2,
            Self::Vertex => 3,
        }
    }
}

/// Immutable coordinate system of the simulation.
///
/// Voxel `(i, j, k)` covers `origin + [i, i + 1) * dx` along x (and likewise
/// for y and z); [`VoxelGrid::voxel_to_point`] returns the cell centre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelGrid {
    shape: GridShape,
    spacing: Spacing,
    origin: Point,
}

impl VoxelGrid {
    /// Creates a grid anchored at the world origin.
    #[must_use]
    pub const fn new(shape: GridShape, spacing: Spacing) -> Self {
        Self::with_origin(shape, spacing, Point::new(0.0, 0.0, 0.0))
    }

    /// Creates a grid anchored at an explicit origin.
    #[must_use]
    pub const fn with_origin(shape: GridShape, spacing: Spacing, origin: Point) -> Self {
        Self {
            shape,
            spacing,
            origin,
        }
    }

    /// Extents of the grid.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Voxel edge lengths.
    #[must_use]
    pub const fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// World position of the corner of voxel `(0, 0, 0)`.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Maps a point to the voxel containing it.
    ///
    /// Coordinates are truncated toward the lower voxel boundary. Points
    /// outside the volume clamp to the nearest boundary voxel.
    #[must_use]
    pub fn point_to_voxel(&self, point: Point) -> Voxel {
        Voxel::new(
            axis_index(point.x, self.origin.x, self.spacing.dx, self.shape.x_len),
            axis_index(point.y, self.origin.y, self.spacing.dy, self.shape.y_len),
            axis_index(point.z, self.origin.z, self.spacing.dz, self.shape.z_len),
        )
    }

    /// Centre of the voxel in world coordinates.
    #[must_use]
    pub fn voxel_to_point(&self, voxel: Voxel) -> Point {
        Point::new(
            axis_center(voxel.x, self.origin.x, self.spacing.dx),
            axis_center(voxel.y, self.origin.y, self.spacing.dy),
            axis_center(voxel.z, self.origin.z, self.spacing.dz),
        )
    }

    /// Reports whether the voxel lies inside the grid.
    #[must_use]
    pub const fn is_valid(&self, voxel: Voxel) -> bool {
        self.shape.contains(voxel)
    }

    /// Valid neighbours of `voxel` under the requested connectivity.
    ///
    /// Offsets are enumerated z-major, then y, then x, each from -1 to 1, so
    /// the order is identical on every call.
    pub fn neighbors(
        &self,
        voxel: Voxel,
        connectivity: Connectivity,
    ) -> impl Iterator<Item = Voxel> + '_ {
        let limit = connectivity.max_moved_axes();
        unit_offsets()
            .filter(move |&(dx, dy, dz)| {
                let moved = u8::from(dx != 0) + u8::from(dy != 0) + u8::from(dz != 0);
                moved > 0 && moved <= limit
            })
            .filter_map(move |(dx, dy, dz)| voxel.offset(dx, dy, dz))
            .filter(move |candidate| self.is_valid(*candidate))
    }

    /// Valid voxels within `radius` steps of `voxel` along every axis,
    /// including `voxel` itself.
    pub fn cube(&self, voxel: Voxel, radius: u32) -> impl Iterator<Item = Voxel> {
        let x_range = clamped_range(voxel.x, radius, self.shape.x_len);
        let y_range = clamped_range(voxel.y, radius, self.shape.y_len);
        let z_range = clamped_range(voxel.z, radius, self.shape.z_len);
        z_range.flat_map(move |z| {
            let x_range = x_range.clone();
            y_range
                .clone()
                .flat_map(move |y| x_range.clone().map(move |x| Voxel::new(x, y, z)))
        })
    }
}

fn unit_offsets() -> impl Iterator<Item = (i32, i32, i32)> {
    OFFSET_RANGE.into_iter().flat_map(|dz| {
        OFFSET_RANGE
            .into_iter()
            .flat_map(move |dy| OFFSET_RANGE.into_iter().map(move |dx| (dx, dy, dz)))
    })
}

fn clamped_range(center: u32, radius: u32, len: u32) -> std::ops::Range<u32> {
    if center >= len {
        return 0..0;
    }
    let start = center.saturating_sub(radius);
    let end = center.saturating_add(radius).saturating_add(1).min(len);
    start..end
}

fn axis_index(coordinate: f64, origin: f64, spacing: f64, len: u32) -> u32 {
    let max = len.saturating_sub(1);
    let scaled = ((coordinate - origin) / spacing).floor();
    if !(scaled > 0.0) {
        return 0;
    }
    if scaled >= f64::from(max) {
        return max;
    }
    scaled as u32
}

fn axis_center(index: u32, origin: f64, spacing: f64) -> f64 {
    origin + (f64::from(index) + 0.5) * spacing
}
