//! Offset geometry between two sky positions.
//!
//! Separation is the great-circle distance (Vincenty form, stable at both
//! small and antipodal separations). The signed deltas are the east/north
//! displacement a telescope applies to slew from one position to the other.

use qtty::{Arcsecond, Arcseconds, Degrees};
use serde::{Deserialize, Serialize};

use crate::models::Coordinate;

/// Offset from one coordinate to another, in arcseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub separation: Arcseconds,
    /// East-positive offset on the sky (already scaled by cos δ).
    pub delta_ra: Arcseconds,
    /// North-positive offset.
    pub delta_dec: Arcseconds,
}

impl Offset {
    /// Position angle of the displacement, east of north, in [0°, 360°).
    pub fn position_angle(&self) -> Degrees {
        let pa = self
            .delta_ra
            .value()
            .atan2(self.delta_dec.value())
            .to_degrees();
        Degrees::new(pa).wrap_pos()
    }

    /// The offset for the opposite direction.
    pub fn reversed(&self) -> Offset {
        Offset {
            separation: self.separation,
            delta_ra: -self.delta_ra,
            delta_dec: -self.delta_dec,
        }
    }
}

/// Great-circle separation between two coordinates.
pub fn angular_separation(a: &Coordinate, b: &Coordinate) -> Degrees {
    let (sin_d1, cos_d1) = a.dec.sin_cos();
    let (sin_d2, cos_d2) = b.dec.sin_cos();
    let (sin_dra, cos_dra) = (b.ra - a.ra).sin_cos();

    let x = cos_d2 * sin_dra;
    let y = cos_d1 * sin_d2 - sin_d1 * cos_d2 * cos_dra;
    let num = (x * x + y * y).sqrt();
    let den = sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_dra;

    Degrees::new(num.atan2(den).to_degrees())
}

/// Offset to move from `from` to `to`.
///
/// This is a small-angle approximation of the tangent-plane (gnomonic)
/// offset at `from`: ΔRA is the wrapped RA difference scaled by the cosine
/// of the mean declination of the pair, and ΔDec is the plain declination
/// difference. Swapping the arguments negates both deltas exactly. For
/// blind-offset distances of an arcminute or two the result agrees with the
/// projection inverted by [`apply_tangent_offset`] to a few hundredths of an
/// arcsecond away from the poles, growing with separation and declination.
pub fn compute_offset(from: &Coordinate, to: &Coordinate) -> Offset {
    let separation = angular_separation(from, to);
    let mean_dec = Degrees::new(0.5 * (from.dec.value() + to.dec.value()));

    let dra = (to.ra - from.ra).wrap_signed() * mean_dec.cos();
    let ddec = to.dec - from.dec;

    log::debug!(
        "Offset {} -> {}: sep={:.3}\" dRA={:.3}\" dDec={:.3}\"",
        from.to_hmsdms(),
        to.to_hmsdms(),
        separation.to::<Arcsecond>().value(),
        dra.to::<Arcsecond>().value(),
        ddec.to::<Arcsecond>().value()
    );

    Offset {
        separation: separation.to::<Arcsecond>(),
        delta_ra: dra.to::<Arcsecond>(),
        delta_dec: ddec.to::<Arcsecond>(),
    }
}

/// Coordinate reached by moving `east`/`north` arcseconds from `center`
/// on the tangent plane (inverse gnomonic projection).
pub fn apply_tangent_offset(center: &Coordinate, east: Arcseconds, north: Arcseconds) -> Coordinate {
    let xi = east.to::<qtty::Radian>().value();
    let eta = north.to::<qtty::Radian>().value();
    let (sin_d0, cos_d0) = center.dec.sin_cos();

    let denom = cos_d0 - eta * sin_d0;
    let dra = xi.atan2(denom);
    let dec = (sin_d0 + eta * cos_d0).atan2((xi * xi + denom * denom).sqrt());

    Coordinate {
        ra: (center.ra + Degrees::new(dra.to_degrees())).wrap_pos(),
        dec: Degrees::new(dec.to_degrees()),
        frame: center.frame,
    }
}
