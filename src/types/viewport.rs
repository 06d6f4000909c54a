use geo::{Coord, Point, Rect};
use rstar::AABB;

/// The region and resolution the last clustering pass ran with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    pub region: Rect<f64>,
    /// Map units per pixel.
    pub resolution: f64,
}

impl ViewportState {
    pub fn new(region: Rect<f64>, resolution: f64) -> Self {
        Self { region, resolution }
    }

    /// Converts a pixel distance into map units at this resolution.
    pub fn map_distance(&self, pixels: f64) -> f64 {
        map_distance(pixels, self.resolution)
    }
}

/// Pixels times map units per pixel.
pub fn map_distance(pixels: f64, resolution: f64) -> f64 {
    pixels * resolution
}

/// A rectangle centred on `point`, grown by `distance` on every side.
pub fn buffer_point(point: Point<f64>, distance: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: point.x() - distance,
            y: point.y() - distance,
        },
        Coord {
            x: point.x() + distance,
            y: point.y() + distance,
        },
    )
}

pub fn rect_to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_grows_every_side() {
        let rect = buffer_point(Point::new(1.0, -1.0), 2.0);
        assert_eq!(rect.min(), Coord { x: -1.0, y: -3.0 });
        assert_eq!(rect.max(), Coord { x: 3.0, y: 1.0 });
    }

    #[test]
    fn zero_buffer_is_the_point() {
        let rect = buffer_point(Point::new(4.0, 5.0), 0.0);
        assert_eq!(rect.min(), rect.max());
    }

    #[test]
    fn map_distance_scales_by_resolution() {
        let viewport = ViewportState::new(buffer_point(Point::new(0.0, 0.0), 10.0), 0.5);
        assert_eq!(viewport.map_distance(20.0), 10.0);
    }
}
