// Nearby filter - distance-annotated radius search over a candidate batch

use serde::Serialize;

use crate::core::GeoPoint;
use crate::error::{AppError, AppResult};
use crate::models::{Event, Venue};

/// Anything with an optional stored coordinate
pub trait Located {
    fn geopoint(&self) -> Option<GeoPoint>;
}

impl Located for Event {
    fn geopoint(&self) -> Option<GeoPoint> {
        self.location.geopoint
    }
}

impl Located for Venue {
    fn geopoint(&self) -> Option<GeoPoint> {
        self.location.geopoint
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Nearby<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance_km: f64,
}

/// Keep candidates within `radius_km` of `center`, nearest first, at most `limit`.
/// Candidates without a geopoint are skipped.
pub fn filter_nearby<T: Located>(
    candidates: impl IntoIterator<Item = T>,
    center: &GeoPoint,
    radius_km: f64,
    limit: usize,
) -> AppResult<Vec<Nearby<T>>> {
    center.validate()?;
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(AppError::Validation(format!("Invalid radius: {}", radius_km)));
    }

    let mut nearby: Vec<Nearby<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let point = item.geopoint()?;
            let distance_km = center.distance_km(&point);
            (distance_km <= radius_km).then_some(Nearby { item, distance_km })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby.truncate(limit);
    Ok(nearby)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Spot(&'static str, Option<GeoPoint>);

    impl Located for Spot {
        fn geopoint(&self) -> Option<GeoPoint> {
            self.1
        }
    }

    fn at(lat: f64, lng: f64) -> Option<GeoPoint> {
        Some(GeoPoint { latitude: lat, longitude: lng })
    }

    #[test]
    fn test_filters_sorts_and_truncates() {
        let center = GeoPoint::new(40.7128, -74.0060).unwrap();
        let spots = vec![
            Spot("far", at(40.80, -74.0060)),
            Spot("none", None),
            Spot("near", at(40.7130, -74.0060)),
            Spot("la", at(34.0522, -118.2437)),
            Spot("mid", at(40.75, -74.0060)),
        ];

        let result = filter_nearby(spots.clone(), &center, 10.0, 10).unwrap();
        let names: Vec<_> = result.iter().map(|n| n.item.0).collect();
        assert_eq!(names, vec!["near", "mid", "far"]);
        assert!(result.iter().all(|n| n.distance_km <= 10.0));
        assert!(result.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));

        let top = filter_nearby(spots, &center, 10.0, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].item.0, "near");
    }

    #[test]
    fn test_rejects_invalid_center() {
        let center = GeoPoint { latitude: f64::NAN, longitude: 0.0 };
        let err = filter_nearby(Vec::<Spot>::new(), &center, 10.0, 5).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let center = GeoPoint { latitude: 0.0, longitude: 0.0 };
        assert!(filter_nearby(Vec::<Spot>::new(), &center, -1.0, 5).is_err());
    }
}
