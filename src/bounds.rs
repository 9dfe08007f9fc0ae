//! Broad-phase bounding volumes.
//!
//! Each body carries a cheap proxy volume that is refreshed from its pose every
//! tick. Pairs whose proxies do not overlap skip narrow-phase detection. The
//! pairwise test is looked up in an [`OverlapTable`] keyed by the unordered
//! pair of [`BoundKind`]s; the table is validated for completeness before any
//! stepping happens.

use log::error;

use crate::error::PhysicsError;
use crate::geometry::Pose;
use crate::math::Vec3;

/// Concrete bounded volume kinds that take part in table dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundKind {
    Sphere,
    Disk,
}

impl BoundKind {
    pub const ALL: [BoundKind; 2] = [BoundKind::Sphere, BoundKind::Disk];
}

/// World-space proxy volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundVolume {
    Sphere {
        center: Vec3,
        radius: f64,
    },
    /// Flat disk; `local_normal` is fixed in the body frame and `normal` is
    /// its current world-space image.
    Disk {
        center: Vec3,
        local_normal: Vec3,
        normal: Vec3,
        radius: f64,
    },
    /// Overlaps everything. Used for bodies without a meaningful proxy.
    Unbounded,
}

impl BoundVolume {
    pub fn sphere(radius: f64) -> Self {
        BoundVolume::Sphere {
            center: Vec3::zeros(),
            radius,
        }
    }

    pub fn disk(local_normal: Vec3, radius: f64) -> Self {
        let local_normal = local_normal.try_normalize(0.0).unwrap_or_else(Vec3::z);
        BoundVolume::Disk {
            center: Vec3::zeros(),
            local_normal,
            normal: local_normal,
            radius,
        }
    }

    /// `None` for [`BoundVolume::Unbounded`], which is never dispatched.
    pub fn kind(&self) -> Option<BoundKind> {
        match self {
            BoundVolume::Sphere { .. } => Some(BoundKind::Sphere),
            BoundVolume::Disk { .. } => Some(BoundKind::Disk),
            BoundVolume::Unbounded => None,
        }
    }

    /// Re-centre on the owner's pose.
    pub fn update(&mut self, pose: &Pose) {
        match self {
            BoundVolume::Sphere { center, .. } => *center = pose.position,
            BoundVolume::Disk {
                center,
                local_normal,
                normal,
                ..
            } => {
                *center = pose.position;
                *normal = pose.rotate(local_normal);
            }
            BoundVolume::Unbounded => {}
        }
    }
}

/// Pairwise overlap test. Arguments arrive in the order the pair was registered.
pub type OverlapTest = fn(&BoundVolume, &BoundVolume) -> bool;

/// Dispatch table from unordered kind pairs to overlap tests.
#[derive(Clone)]
pub struct OverlapTable {
    entries: Vec<(BoundKind, BoundKind, OverlapTest)>,
}

impl core::fmt::Debug for OverlapTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(a, b, _)| (a, b)))
            .finish()
    }
}

impl Default for OverlapTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(BoundKind::Sphere, BoundKind::Sphere, sphere_sphere);
        table.register(BoundKind::Sphere, BoundKind::Disk, sphere_disk);
        table.register(BoundKind::Disk, BoundKind::Disk, disk_disk);
        table
    }
}

impl OverlapTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `test` for the pair `(a, b)`, replacing any earlier test for
    /// the same unordered pair.
    pub fn register(&mut self, a: BoundKind, b: BoundKind, test: OverlapTest) {
        self.entries
            .retain(|(x, y, _)| !((*x == a && *y == b) || (*x == b && *y == a)));
        self.entries.push((a, b, test));
    }

    fn lookup(&self, a: BoundKind, b: BoundKind) -> Option<(OverlapTest, bool)> {
        self.entries.iter().find_map(|(x, y, test)| {
            if *x == a && *y == b {
                Some((*test, false))
            } else if *x == b && *y == a {
                Some((*test, true))
            } else {
                None
            }
        })
    }

    /// Check that every unordered pair of kinds has a test.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        for (i, a) in BoundKind::ALL.iter().enumerate() {
            for b in &BoundKind::ALL[i..] {
                if self.lookup(*a, *b).is_none() {
                    error!("overlap table is missing {:?}/{:?}", a, b);
                    return Err(PhysicsError::UnregisteredBoundPair { a: *a, b: *b });
                }
            }
        }
        Ok(())
    }

    /// Broad-phase test for two volumes. Unbounded volumes overlap everything.
    pub fn overlaps(&self, a: &BoundVolume, b: &BoundVolume) -> Result<bool, PhysicsError> {
        let (Some(ka), Some(kb)) = (a.kind(), b.kind()) else {
            return Ok(true);
        };
        match self.lookup(ka, kb) {
            Some((test, false)) => Ok(test(a, b)),
            Some((test, true)) => Ok(test(b, a)),
            None => Err(PhysicsError::UnregisteredBoundPair { a: ka, b: kb }),
        }
    }
}

/// Squared centre distance against squared radius sum; tangency counts.
fn sphere_sphere(a: &BoundVolume, b: &BoundVolume) -> bool {
    debug_assert_eq!(
        (a.kind(), b.kind()),
        (Some(BoundKind::Sphere), Some(BoundKind::Sphere)),
        "sphere_sphere registered for the wrong kinds"
    );
    match (a, b) {
        (
            BoundVolume::Sphere {
                center: c1,
                radius: r1,
            },
            BoundVolume::Sphere {
                center: c2,
                radius: r2,
            },
        ) => (c1 - c2).norm_squared() <= (r1 + r2) * (r1 + r2),
        _ => false,
    }
}

/// Sphere first, disk second; the table swaps arguments to match.
fn sphere_disk(a: &BoundVolume, b: &BoundVolume) -> bool {
    debug_assert_eq!(
        (a.kind(), b.kind()),
        (Some(BoundKind::Sphere), Some(BoundKind::Disk)),
        "sphere_disk registered for the wrong kinds or argument order"
    );
    match (a, b) {
        (
            BoundVolume::Sphere { center, radius },
            BoundVolume::Disk {
                center: disk_center,
                normal,
                radius: disk_radius,
                ..
            },
        ) => {
            let offset = center - disk_center;
            let height = offset.dot(normal);
            let in_plane = (offset - normal * height).norm();
            height.abs() <= *radius && in_plane <= *disk_radius
        }
        _ => false,
    }
}

// Disks are only used for fixed walls, which never need to be culled against each other.
fn disk_disk(_: &BoundVolume, _: &BoundVolume) -> bool {
    true
}
