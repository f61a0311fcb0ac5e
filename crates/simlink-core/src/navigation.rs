//! Grid navigation helpers.
//!
//! Pure functions over positions reported in agent metadata. Distances are
//! measured on the horizontal plane; the vertical `y` axis is ignored.

use simlink_types::Point3;

/// Euclidean distance between two points projected onto the horizontal
/// (x, z) plane.
#[allow(clippy::suboptimal_flops)]
pub fn distance(p1: &Point3, p2: &Point3) -> f64 {
    let dx = p1.x - p2.x;
    let dz = p1.z - p2.z;
    (dx.powi(2) + dz.powi(2)).sqrt()
}

/// Stable key for the grid cell containing `(x, z)`: both coordinates
/// rounded to one decimal place, separated by a space.
pub fn key_for_point(x: f64, z: f64) -> String {
    format!("{x:.1} {z:.1}")
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn point(x: f64, z: f64) -> Point3 {
        Point3::new(x, 0.0, z)
    }

    #[test]
    fn distance_matches_known_values() {
        let p1 = point(1.5, 2.5);
        let p2 = point(4.33, 7.5);
        let p3 = point(2.5, 3.5);
        assert_eq!(distance(&p1, &p2), 5.745_337_239_884_183);
        assert_eq!(distance(&p1, &p1), 0.0);
        assert_eq!(distance(&p1, &p3), 2.0_f64.sqrt());
    }

    #[test]
    fn distance_is_symmetric() {
        let p1 = point(-3.25, 0.5);
        let p2 = point(7.0, -1.75);
        assert_eq!(distance(&p1, &p2), distance(&p2, &p1));
    }

    #[test]
    fn distance_ignores_vertical_axis() {
        let low = Point3::new(1.0, 0.0, 1.0);
        let high = Point3::new(1.0, 5.0, 1.0);
        assert_eq!(distance(&low, &high), 0.0);
    }

    #[test]
    fn key_rounds_to_one_decimal() {
        assert_eq!(key_for_point(2.567, -3.43), "2.6 -3.4");
        assert_eq!(key_for_point(0.0, 1.0), "0.0 1.0");
    }
}
