// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! [Slippy map](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames) tile arithmetic.
//!
//! A tile id is `y * 2^zoom + x`. Zoom levels are limited to [MAX_ZOOM],
//! so that no tile id ever equals `u32::MAX` (used by [VertexId::EMPTY](crate::VertexId::EMPTY)).

use crate::Coordinate;

/// Highest supported zoom level.
pub const MAX_ZOOM: u32 = 15;

/// Web-mercator latitude limit.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Returns the (x, y) tile coordinates containing a position.
pub fn tile_xy(lon: f64, lat: f64, zoom: u32) -> (u32, u32) {
    debug_assert!(zoom <= MAX_ZOOM);
    let n = (1u64 << zoom) as f64;
    let max = (1u32 << zoom) - 1;

    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * n).floor();

    (clamp_index(x, max), clamp_index(y, max))
}

fn clamp_index(v: f64, max: u32) -> u32 {
    if v <= 0.0 {
        0
    } else if v >= max as f64 {
        max
    } else {
        v as u32
    }
}

/// Returns the id of the tile containing a position.
pub fn tile_id(lon: f64, lat: f64, zoom: u32) -> u32 {
    let (x, y) = tile_xy(lon, lat, zoom);
    tile_id_from_xy(x, y, zoom)
}

pub fn tile_id_from_xy(x: u32, y: u32, zoom: u32) -> u32 {
    y * (1u32 << zoom) + x
}

pub fn tile_id_to_xy(tile_id: u32, zoom: u32) -> (u32, u32) {
    let n = 1u32 << zoom;
    (tile_id % n, tile_id / n)
}

/// Returns the geographic extent of a tile.
pub fn tile_bounds(tile_id: u32, zoom: u32) -> BoundingBox {
    let (x, y) = tile_id_to_xy(tile_id, zoom);
    let n = (1u64 << zoom) as f64;
    let lon = |x: f64| x / n * 360.0 - 180.0;
    let lat = |y: f64| {
        (std::f64::consts::PI * (1.0 - 2.0 * y / n))
            .sinh()
            .atan()
            .to_degrees()
    };

    BoundingBox {
        min_lon: lon(x as f64),
        min_lat: lat(y as f64 + 1.0),
        max_lon: lon(x as f64 + 1.0),
        max_lat: lat(y as f64),
    }
}

/// Axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, c: Coordinate) -> bool {
        c.lon >= self.min_lon && c.lon <= self.max_lon && c.lat >= self.min_lat && c.lat <= self.max_lat
    }

    /// Lists ids of all tiles intersecting the box, row by row.
    pub fn tiles(&self, zoom: u32) -> Vec<u32> {
        let (min_x, min_y) = tile_xy(self.min_lon, self.max_lat, zoom);
        let (max_x, max_y) = tile_xy(self.max_lon, self.min_lat, zoom);

        let mut ids = Vec::with_capacity(((max_x - min_x + 1) * (max_y - min_y + 1)) as usize);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                ids.push(tile_id_from_xy(x, y, zoom));
            }
        }
        return ids;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_of_known_position() {
        // Warsaw, Palace of Culture and Science, at zoom 14
        assert_eq!(tile_xy(21.0067, 52.2318, 14), (9148, 5394));
        assert_eq!(tile_id(21.0067, 52.2318, 14), 5394 * 16384 + 9148);
    }

    #[test]
    fn corners_are_clamped() {
        assert_eq!(tile_xy(-180.0, 90.0, 14), (0, 0));
        assert_eq!(tile_xy(180.0, -90.0, 14), (16383, 16383));
        assert_ne!(tile_id(180.0, -90.0, MAX_ZOOM), u32::MAX);
    }

    #[test]
    fn bounds_contain_their_positions() {
        let id = tile_id(7.4246, 43.7384, 14);
        let bounds = tile_bounds(id, 14);
        assert!(bounds.contains(Coordinate::new(7.4246, 43.7384)));
        assert_eq!(tile_id_to_xy(id, 14), tile_xy(7.4246, 43.7384, 14));
    }

    #[test]
    fn tiles_in_box() {
        let id = tile_id(0.0005, 0.0005, 14);
        let inner = BoundingBox {
            min_lon: 0.001,
            min_lat: 0.001,
            max_lon: 0.002,
            max_lat: 0.002,
        };
        assert_eq!(inner.tiles(14), vec![id]);

        let wide = BoundingBox {
            min_lon: -0.001,
            ..inner
        };
        assert_eq!(wide.tiles(14), vec![id - 1, id]);
    }
}
