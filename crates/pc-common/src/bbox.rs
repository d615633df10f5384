//! Axis-aligned 3D bounding box operations used throughout the octree engine.

use serde::{Deserialize, Serialize};

/// A 3D axis-aligned bounding box in world (store SRID) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub xmin: f64,
    pub ymin: f64,
    pub zmin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub zmax: f64,
}

/// The eight octants a node splits into, named by compass direction and
/// up/down, matching the viewer-facing hierarchy tree keys.
pub const OCTANT_CODES: [&str; 8] = [
    "nwu", "nwd", "neu", "ned", "swu", "swd", "seu", "sed",
];

impl BoundingBox3 {
    pub fn new(xmin: f64, ymin: f64, zmin: f64, xmax: f64, ymax: f64, zmax: f64) -> Self {
        Self {
            xmin,
            ymin,
            zmin,
            xmax,
            ymax,
            zmax,
        }
    }

    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 6 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }
        let num = |i: usize| -> Result<f64, BboxParseError> {
            parts[i]
                .trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[i].to_string()))
        };
        Ok(Self {
            xmin: num(0)?,
            ymin: num(1)?,
            zmin: num(2)?,
            xmax: num(3)?,
            ymax: num(4)?,
            zmax: num(5)?,
        })
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn depth_y(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn height_z(&self) -> f64 {
        self.zmax - self.zmin
    }

    pub fn intersects(&self, other: &BoundingBox3) -> bool {
        self.xmin < other.xmax
            && self.xmax > other.xmin
            && self.ymin < other.ymax
            && self.ymax > other.ymin
            && self.zmin < other.zmax
            && self.zmax > other.zmin
    }

    pub fn intersection(&self, other: &BoundingBox3) -> Option<BoundingBox3> {
        if !self.intersects(other) {
            return None;
        }
        Some(BoundingBox3 {
            xmin: self.xmin.max(other.xmin),
            ymin: self.ymin.max(other.ymin),
            zmin: self.zmin.max(other.zmin),
            xmax: self.xmax.min(other.xmax),
            ymax: self.ymax.min(other.ymax),
            zmax: self.zmax.min(other.zmax),
        })
    }

    pub fn contains_point(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.xmin
            && x <= self.xmax
            && y >= self.ymin
            && y <= self.ymax
            && z >= self.zmin
            && z <= self.zmax
    }

    /// Quantized cache-key fragment (the full `.hcy` filename glues several
    /// of these together, see `pc_hierarchy::cache`).
    pub fn cache_key(&self) -> String {
        format!(
            "{:.3}_{:.3}_{:.3}_{:.3}_{:.3}_{:.3}",
            self.xmin, self.ymin, self.zmin, self.xmax, self.ymax, self.zmax
        )
    }

    /// Split this box into its 8 octants at the geometric midpoint of each
    /// axis. The returned array is ordered to match `OCTANT_CODES`:
    /// nwu, nwd, neu, ned, swu, swd, seu, sed. North = +y, East = +x, Up = +z.
    pub fn split_octants(&self) -> [BoundingBox3; 8] {
        let mx = (self.xmin + self.xmax) / 2.0;
        let my = (self.ymin + self.ymax) / 2.0;
        let mz = (self.zmin + self.zmax) / 2.0;

        let mk = |xmin: f64, ymin: f64, zmin: f64, xmax: f64, ymax: f64, zmax: f64| BoundingBox3 {
            xmin,
            ymin,
            zmin,
            xmax,
            ymax,
            zmax,
        };

        [
            // nwu: west(-x) north(+y) up(+z)
            mk(self.xmin, my, mz, mx, self.ymax, self.zmax),
            // nwd: west north down
            mk(self.xmin, my, self.zmin, mx, self.ymax, mz),
            // neu: east north up
            mk(mx, my, mz, self.xmax, self.ymax, self.zmax),
            // ned: east north down
            mk(mx, my, self.zmin, self.xmax, self.ymax, mz),
            // swu: west south(-y) up
            mk(self.xmin, self.ymin, mz, mx, my, self.zmax),
            // swd: west south down
            mk(self.xmin, self.ymin, self.zmin, mx, my, mz),
            // seu: east south up
            mk(mx, self.ymin, mz, self.xmax, my, self.zmax),
            // sed: east south down
            mk(mx, self.ymin, self.zmin, self.xmax, my, mz),
        ]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("invalid bbox format: {0}. expected 'xmin,ymin,zmin,xmax,ymax,zmax'")]
    InvalidFormat(String),

    #[error("invalid number in bbox: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bbox_string() {
        let bbox = BoundingBox3::from_wms_string("0,0,0,100,100,10").unwrap();
        assert_eq!(bbox.xmax, 100.0);
        assert_eq!(bbox.zmax, 10.0);
    }

    #[test]
    fn intersection_works() {
        let a = BoundingBox3::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let b = BoundingBox3::new(5.0, 5.0, 5.0, 15.0, 15.0, 15.0);
        let c = BoundingBox3::new(20.0, 20.0, 20.0, 30.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let i = a.intersection(&b).unwrap();
        assert_eq!(i.xmin, 5.0);
        assert_eq!(i.xmax, 10.0);
    }

    #[test]
    fn octants_tile_exactly_with_no_overlap() {
        let root = BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0);
        let kids = root.split_octants();

        // every octant is half-width on every axis
        for k in &kids {
            assert_eq!(k.width(), 50.0);
            assert_eq!(k.depth_y(), 50.0);
            assert_eq!(k.height_z(), 50.0);
        }

        // total volume matches the parent (exact tiling, no overlap/gap)
        let total: f64 = kids
            .iter()
            .map(|k| k.width() * k.depth_y() * k.height_z())
            .sum();
        assert_eq!(total, root.width() * root.depth_y() * root.height_z());
    }

    #[test]
    fn octants_clamp_to_parent_bounds() {
        let root = BoundingBox3::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0);
        let kids = root.split_octants();
        for k in &kids {
            assert!(k.xmin >= root.xmin && k.xmax <= root.xmax);
            assert!(k.ymin >= root.ymin && k.ymax <= root.ymax);
            assert!(k.zmin >= root.zmin && k.zmax <= root.zmax);
        }
    }
}
