//! Reference data for the supported locations.

use crate::models::{Coordinate, Location, LocationId, MarketData};

static LOCATIONS: [Location; 4] = [
    Location {
        id: LocationId::Austin,
        name: "Austin, TX - Domain Northside",
        coords: Coordinate::new(30.3990, -97.7215),
        market: MarketData {
            population: 2_300_000,
            median_income: 75_853.0,
            employment_growth: 3.2,
            new_business_permits: 847,
        },
    },
    Location {
        id: LocationId::Miami,
        name: "Miami, FL - Wynwood",
        coords: Coordinate::new(25.8010, -80.1995),
        market: MarketData {
            population: 6_200_000,
            median_income: 44_581.0,
            employment_growth: 2.8,
            new_business_permits: 1205,
        },
    },
    Location {
        id: LocationId::Denver,
        name: "Denver, CO - RiNo",
        coords: Coordinate::new(39.7643, -104.9848),
        market: MarketData {
            population: 2_950_000,
            median_income: 78_177.0,
            employment_growth: 2.5,
            new_business_permits: 623,
        },
    },
    Location {
        id: LocationId::Phoenix,
        name: "Phoenix, AZ - Roosevelt Row",
        coords: Coordinate::new(33.4534, -112.0685),
        market: MarketData {
            population: 4_900_000,
            median_income: 64_927.0,
            employment_growth: 3.5,
            new_business_permits: 912,
        },
    },
];

/// Look up the reference data for a location.
pub fn lookup(id: LocationId) -> &'static Location {
    match id {
        LocationId::Austin => &LOCATIONS[0],
        LocationId::Miami => &LOCATIONS[1],
        LocationId::Denver => &LOCATIONS[2],
        LocationId::Phoenix => &LOCATIONS[3],
    }
}
