use serde::Serialize;

/// Axis-aligned bounding box in lon/lat degrees (or any planar 2D space).
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_point(x: f64, y: f64) -> Self {
        Aabb2::new([x, y], [x, y])
    }

    pub fn extend_point(&mut self, x: f64, y: f64) {
        self.min[0] = self.min[0].min(x);
        self.min[1] = self.min[1].min(y);
        self.max[0] = self.max[0].max(x);
        self.max[1] = self.max[1].max(y);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.extend_point(other.min[0], other.min[1]);
        out.extend_point(other.max[0], other.max[1]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn union_covers_both() {
        let a = Aabb2::new([0.0, 0.0], [1.0, 1.0]);
        let b = Aabb2::new([2.0, -1.0], [3.0, 0.5]);
        let u = a.union(&b);
        assert_eq!(u, Aabb2::new([0.0, -1.0], [3.0, 1.0]));
    }
}
