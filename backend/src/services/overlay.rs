//! Aperture overlays for finder charts.
//!
//! The planner does not fetch images. It hands a finder-image consumer the
//! centre, field size and aperture outlines to draw.

use qtty::{Arcminutes, Arcseconds, Degrees};
use serde::{Deserialize, Serialize};

use crate::models::{Configuration, Coordinate};
use crate::services::offset::apply_tangent_offset;

/// One slit corner, as a tangent-plane offset and as a sky position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlitCorner {
    pub east: Arcseconds,
    pub north: Arcseconds,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlitOverlay {
    pub center: Coordinate,
    pub length: Arcseconds,
    pub width: Arcseconds,
    /// Long axis, east of north.
    pub position_angle: Degrees,
    pub corners: [SlitCorner; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberOverlay {
    pub center: Coordinate,
    pub radius: Arcseconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ApertureOverlay {
    Slit(SlitOverlay),
    Fiber(FiberOverlay),
}

impl SlitOverlay {
    pub fn new(center: Coordinate, length: Arcseconds, width: Arcseconds, position_angle: Degrees) -> Self {
        let (sin_pa, cos_pa) = position_angle.sin_cos();
        let half_l = length.value() / 2.0;
        let half_w = width.value() / 2.0;

        // Long axis points along PA, short axis 90° east of it.
        let corner = |l: f64, w: f64| {
            let east = l * sin_pa + w * cos_pa;
            let north = l * cos_pa - w * sin_pa;
            let (east, north) = (Arcseconds::new(east), Arcseconds::new(north));
            SlitCorner {
                east,
                north,
                coordinate: apply_tangent_offset(&center, east, north),
            }
        };

        Self {
            center,
            length,
            width,
            position_angle,
            corners: [
                corner(half_l, half_w),
                corner(half_l, -half_w),
                corner(-half_l, -half_w),
                corner(-half_l, half_w),
            ],
        }
    }
}

/// Overlays derivable from a configuration's recognised attributes.
///
/// Needs the configuration coordinate. A slit needs length, width and PA; a
/// fiber needs its radius. Incomplete groups produce nothing.
pub fn aperture_overlays(config: &Configuration) -> Vec<ApertureOverlay> {
    let Some(center) = config.coordinates else {
        return Vec::new();
    };

    let mut overlays = Vec::new();
    if let Some(slit) = config.recognized.slit() {
        overlays.push(ApertureOverlay::Slit(SlitOverlay::new(
            center,
            slit.length,
            slit.width,
            slit.position_angle,
        )));
    }
    if let Some(radius) = config.recognized.fiber() {
        overlays.push(ApertureOverlay::Fiber(FiberOverlay { center, radius }));
    }
    overlays
}

/// What a finder-image service consumer needs for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinderRequest {
    pub configuration: String,
    pub center: Coordinate,
    pub field_size: Arcminutes,
    pub overlays: Vec<ApertureOverlay>,
    /// Offset star to mark, when one is attached.
    pub offset_star: Option<Coordinate>,
}

/// Finder request for `config`, or `None` without a coordinate.
pub fn finder_request(config: &Configuration, field_size: Arcminutes) -> Option<FinderRequest> {
    let center = config.coordinates?;
    Some(FinderRequest {
        configuration: config.name.clone(),
        center,
        field_size,
        overlays: aperture_overlays(config),
        offset_star: config.offset_star.as_ref().map(|s| s.coordinate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AngleValue, AttributeValue};
    use crate::services::offset::{angular_separation, compute_offset};

    fn slit_config(pa: f64) -> Configuration {
        let mut config = Configuration::new("primary");
        config.coordinates = Some(Coordinate::from_degrees(148.9685, 69.6797).unwrap());
        config
            .set_attribute("slit_length", AttributeValue::Angle(AngleValue::arcsec(128.0)))
            .unwrap();
        config
            .set_attribute("slit_width", AttributeValue::Angle(AngleValue::arcsec(1.5)))
            .unwrap();
        config
            .set_attribute("PA", AttributeValue::Angle(AngleValue::deg(pa)))
            .unwrap();
        config
    }

    #[test]
    fn test_slit_corners_at_zero_pa() {
        let overlays = aperture_overlays(&slit_config(0.0));
        assert_eq!(overlays.len(), 1);
        let ApertureOverlay::Slit(slit) = &overlays[0] else {
            panic!("expected a slit overlay");
        };
        let c = slit.corners[0];
        assert!((c.north.value() - 64.0).abs() < 1e-9);
        assert!((c.east.value() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_slit_corners_follow_position_angle() {
        let overlays = aperture_overlays(&slit_config(90.0));
        let ApertureOverlay::Slit(slit) = &overlays[0] else {
            panic!("expected a slit overlay");
        };
        // Long axis now points east
        let c = slit.corners[0];
        assert!((c.east.value() - 64.0).abs() < 1e-9);
        assert!((c.north.value() + 0.75).abs() < 1e-9);

        // Diagonal of the slit on the sky
        let diagonal = angular_separation(&slit.corners[0].coordinate, &slit.corners[2].coordinate);
        let expected = (128.0f64.powi(2) + 1.5f64.powi(2)).sqrt() / 3600.0;
        assert!((diagonal.value() - expected).abs() < 1e-6);

        // The projected corner sits where the tangent offset says it does
        let back = compute_offset(&slit.center, &c.coordinate);
        assert!((back.delta_ra.value() - 64.0).abs() < 0.05);
    }

    #[test]
    fn test_partial_group_gives_no_overlay() {
        let mut config = Configuration::new("partial");
        config.coordinates = Some(Coordinate::from_degrees(10.0, 10.0).unwrap());
        config
            .set_attribute("slit_width", AttributeValue::Angle(AngleValue::arcsec(1.0)))
            .unwrap();
        assert!(aperture_overlays(&config).is_empty());
    }

    #[test]
    fn test_fiber_overlay_and_missing_coordinate() {
        let mut config = Configuration::new("ifu");
        config
            .set_attribute("fiber_radius", AttributeValue::Angle(AngleValue::arcsec(2.0)))
            .unwrap();
        assert!(aperture_overlays(&config).is_empty());
        assert!(finder_request(&config, Arcminutes::new(5.0)).is_none());

        config.coordinates = Some(Coordinate::from_degrees(10.0, 10.0).unwrap());
        let request = finder_request(&config, Arcminutes::new(5.0)).unwrap();
        assert_eq!(request.overlays.len(), 1);
        assert!(matches!(
            &request.overlays[0],
            ApertureOverlay::Fiber(f) if f.radius.value() == 2.0
        ));
        assert!(request.offset_star.is_none());
    }

    #[test]
    fn test_overlay_serialization_is_tagged() {
        let overlays = aperture_overlays(&slit_config(60.0));
        let json = serde_json::to_value(&overlays[0]).unwrap();
        assert_eq!(json["shape"], "slit");
        assert_eq!(json["length"], 128.0);
        assert_eq!(json["corners"].as_array().unwrap().len(), 4);
    }
}
