//! Place categories and per-polygon tallies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of place counted inside a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Restaurants, cafes, juice and food shops
    Eatery,
    /// Corporate offices, companies, co-working spaces
    Office,
    /// Apartment buildings and residential complexes
    Apartment,
    /// Paying-guest accommodation, hostels, co-living, service apartments
    Pg,
    /// Gyms and fitness centres
    Gym,
    /// Beauty and hair salons, barbers, spas
    Salon,
}

impl Category {
    /// Get all categories in report order
    pub fn all() -> &'static [Category] {
        &[
            Category::Eatery,
            Category::Office,
            Category::Apartment,
            Category::Pg,
            Category::Gym,
            Category::Salon,
        ]
    }

    /// Plural field name used in JSON reports
    pub fn field_name(&self) -> &'static str {
        match self {
            Category::Eatery => "eateries",
            Category::Office => "offices",
            Category::Apartment => "apartments",
            Category::Pg => "pgs",
            Category::Gym => "gyms",
            Category::Salon => "salons",
        }
    }

    /// Column header used in CSV output
    pub fn column_name(&self) -> &'static str {
        match self {
            Category::Eatery => "no. of eateries",
            Category::Office => "no. of offices",
            Category::Apartment => "no. of apartments",
            Category::Pg => "no. of PGs",
            Category::Gym => "no. of gyms",
            Category::Salon => "no. of salons",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// Number of matching places per category for one polygon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub eateries: usize,
    pub offices: usize,
    pub apartments: usize,
    pub pgs: usize,
    pub gyms: usize,
    pub salons: usize,
}

impl CategoryCounts {
    /// Set the count for a given category
    pub fn set(&mut self, category: Category, count: usize) {
        match category {
            Category::Eatery => self.eateries = count,
            Category::Office => self.offices = count,
            Category::Apartment => self.apartments = count,
            Category::Pg => self.pgs = count,
            Category::Gym => self.gyms = count,
            Category::Salon => self.salons = count,
        }
    }

    /// Get the count for a given category
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Eatery => self.eateries,
            Category::Office => self.offices,
            Category::Apartment => self.apartments,
            Category::Pg => self.pgs,
            Category::Gym => self.gyms,
            Category::Salon => self.salons,
        }
    }

    pub fn total(&self) -> usize {
        Category::all().iter().map(|c| self.get(*c)).sum()
    }
}
