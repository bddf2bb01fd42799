//! Category membership rules.
//!
//! Each category decides independently from a place's declared types and
//! its lowercased name. Name rules are substring matches, so "pg" also hits
//! inside longer words; the exclusion lists exist to undo the worst of that.

use crate::models::{Category, Place};

const EATERY_TYPES: &[&str] = &["restaurant", "food", "cafe", "meal_takeaway", "bakery", "bar"];
const EATERY_KEYWORDS: &[&str] = &["restaurant", "cafe", "juice", "food", "dining", "bistro"];

const OFFICE_KEYWORDS: &[&str] = &[
    "corporate office",
    "company",
    "technical company",
    "insurance company",
    "co-working space",
    "coworking space",
    "software company",
    "co-working",
    "coworking",
    "corporate",
    "ltd",
    "inc",
    "corporation",
    "pvt",
    "limited",
    "pvt ltd",
    "private limited",
];
const OFFICE_EXCLUDED_TYPES: &[&str] = &[
    "restaurant",
    "cafe",
    "food",
    "store",
    "shopping_mall",
    "hospital",
    "school",
    "university",
    "park",
    "church",
    "mosque",
    "temple",
    "gas_station",
    "atm",
    "bank",
    "lodging",
];
const OFFICE_EXCLUDED_KEYWORDS: &[&str] = &["restaurant", "cafe", "hotel", "resort", "mall", "store"];

const APARTMENT_KEYWORDS: &[&str] = &[
    "apartment building",
    "apartment buildings",
    "apartment complex",
    "residency",
    "residential building",
    "residential buildings",
    "apartment",
    "apartments",
    "residential",
    "complex",
    "residence",
];
/// Lodging words that mark a place as short-stay rather than residential
const SHORT_STAY_KEYWORDS: &[&str] = &["hotel", "resort", "pg", "hostel", "paying guest", "co-living"];

const PG_KEYWORDS: &[&str] = &[
    "pg",
    "pgs",
    "hostel",
    "hostels",
    "co-living",
    "coliving",
    "paying guest",
    "service apartment",
    "service apartments",
];

const GYM_KEYWORDS: &[&str] = &[
    "gym",
    "fitness centre",
    "fitness center",
    "fitness centres",
    "fitness centers",
    "sports complex",
    "fitness",
    "workout",
    "health club",
    "athletic club",
    "training center",
    "training centre",
];

const SALON_TYPES: &[&str] = &["beauty_salon", "hair_care", "spa", "hair_salon", "barber"];
const SALON_KEYWORDS: &[&str] = &[
    "salon",
    "beauty salon",
    "hair salon",
    "barber",
    "barber shop",
    "haircut",
    "spa",
    "beauty parlor",
    "beauty parlour",
    "hair care",
    "haircutting",
    "hair styling",
    "unisex salon",
    "hair dresser",
    "haircut salon",
    "beauty center",
    "beauty centre",
];
const NAIL_KEYWORDS: &[&str] = &["nail", "nail art", "nail salon"];
const SALON_CORE_KEYWORDS: &[&str] = &["salon", "hair", "barber", "beauty"];

/// Lowercased view of a place used by the rules
struct Features {
    name: String,
    types: Vec<String>,
}

impl Features {
    fn of(place: &Place) -> Self {
        Self {
            name: place.normalized_name(),
            types: place.normalized_types(),
        }
    }

    fn has_type(&self, t: &str) -> bool {
        self.types.iter().any(|own| own == t)
    }

    fn has_any_type(&self, list: &[&str]) -> bool {
        list.iter().any(|t| self.has_type(t))
    }

    fn name_has(&self, kw: &str) -> bool {
        self.name.contains(kw)
    }

    fn name_has_any(&self, list: &[&str]) -> bool {
        list.iter().any(|kw| self.name.contains(kw))
    }
}

/// Whether `place` belongs to `category`
pub fn matches(category: Category, place: &Place) -> bool {
    let f = Features::of(place);
    match category {
        Category::Eatery => is_eatery(&f),
        Category::Office => is_office(&f),
        Category::Apartment => is_apartment(&f),
        Category::Pg => is_pg(&f),
        Category::Gym => is_gym(&f),
        Category::Salon => is_salon(&f),
    }
}

fn is_eatery(f: &Features) -> bool {
    f.has_any_type(EATERY_TYPES) || f.name_has_any(EATERY_KEYWORDS)
}

fn is_office(f: &Features) -> bool {
    let named = f.name_has_any(OFFICE_KEYWORDS) || f.name.ends_with("company") || f.name_has("software");
    named && !f.has_any_type(OFFICE_EXCLUDED_TYPES) && !f.name_has_any(OFFICE_EXCLUDED_KEYWORDS)
}

fn is_apartment(f: &Features) -> bool {
    let short_stay = f.name_has_any(SHORT_STAY_KEYWORDS);
    let residential_lodging = f.has_type("lodging") && !short_stay;
    let candidate = f.name_has_any(APARTMENT_KEYWORDS) || residential_lodging;

    candidate && !(short_stay && !f.name_has("apartment") && !f.name_has("residential"))
}

fn is_pg(f: &Features) -> bool {
    let mut is_pg = f.name_has_any(PG_KEYWORDS);

    if !is_pg && f.has_type("lodging") && !f.name_has("hotel") && !f.name_has("resort") {
        is_pg = f.name_has("service") && f.name_has("apartment");
    }

    if (f.name_has("hotel") || f.name_has("resort"))
        && !f.name_has_any(&["pg", "hostel", "service apartment", "paying guest"])
    {
        is_pg = false;
    }

    if f.name_has("apartment") && !f.name_has("service") && !f.name_has_any(&["pg", "hostel", "paying guest"]) {
        is_pg = false;
    }

    is_pg
}

fn is_gym(f: &Features) -> bool {
    f.has_type("gym") || f.name_has_any(GYM_KEYWORDS)
}

fn is_salon(f: &Features) -> bool {
    let matched = f.has_any_type(SALON_TYPES) || f.name_has_any(SALON_KEYWORDS);
    let nail_only = f.name_has_any(NAIL_KEYWORDS) && !f.name_has_any(SALON_CORE_KEYWORDS);
    matched && !nail_only
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LatLng;

    fn place(name: &str, types: &[&str]) -> Place {
        Place::new("id", name, types, LatLng::new(0.0, 0.0))
    }

    #[test]
    fn test_eatery_by_type_or_name() {
        assert!(matches(Category::Eatery, &place("Corner Spot", &["Bakery"])));
        assert!(matches(Category::Eatery, &place("Fresh Juice Bar", &["store"])));
        assert!(!matches(Category::Eatery, &place("City Hardware", &["hardware_store"])));
    }

    #[test]
    fn test_office_keywords_and_exclusions() {
        assert!(matches(Category::Office, &place("Acme Software Solutions", &["point_of_interest"])));
        assert!(matches(Category::Office, &place("Infra Pvt Ltd", &["establishment"])));
        assert!(matches(Category::Office, &place("The Trading Company", &[])));
        // excluded by type
        assert!(!matches(Category::Office, &place("Acme Ltd", &["bank"])));
        // excluded by name
        assert!(!matches(Category::Office, &place("Corporate Cafe", &["point_of_interest"])));
        assert!(!matches(Category::Office, &place("Green Park", &["park"])));
    }

    #[test]
    fn test_apartment_rules() {
        assert!(matches(Category::Apartment, &place("Prestige Residency", &[])));
        // plain lodging without short-stay words counts
        assert!(matches(Category::Apartment, &place("Sunrise Towers", &["lodging"])));
        // hotels do not
        assert!(!matches(Category::Apartment, &place("Grand Hotel", &["lodging"])));
        // a hotel named as apartments is kept
        assert!(matches(Category::Apartment, &place("Hotel Apartments Suites", &["lodging"])));
        // pg hostel residence: short-stay word without apartment/residential
        assert!(!matches(Category::Apartment, &place("Boys Hostel Residence", &[])));
    }

    #[test]
    fn test_pg_rules() {
        assert!(matches(Category::Pg, &place("Sri Sai PG for Gents", &["lodging"])));
        assert!(matches(Category::Pg, &place("Zolo Coliving", &[])));
        assert!(matches(Category::Pg, &place("Stay Service Apartment", &["lodging"])));
        // hotels without PG words are not PGs
        assert!(!matches(Category::Pg, &place("Lakeview Hotel", &["lodging"])));
        // regular apartments are not PGs
        assert!(!matches(Category::Pg, &place("Maple Apartments", &["lodging"])));
        // apartment with hostel word stays a PG
        assert!(matches(Category::Pg, &place("Hostel Apartment Block", &[])));
        // plain lodging needs service + apartment
        assert!(!matches(Category::Pg, &place("Sunrise Towers", &["lodging"])));
    }

    #[test]
    fn test_gym_rules() {
        assert!(matches(Category::Gym, &place("Iron House", &["gym"])));
        assert!(matches(Category::Gym, &place("Cult Fitness", &[])));
        assert!(matches(Category::Gym, &place("Elite Health Club", &[])));
        assert!(!matches(Category::Gym, &place("Yoga Books", &["book_store"])));
    }

    #[test]
    fn test_salon_rules() {
        assert!(matches(Category::Salon, &place("Looks", &["beauty_salon"])));
        assert!(matches(Category::Salon, &place("Sharp Barber Shop", &[])));
        assert!(matches(Category::Salon, &place("Nail & Hair Studio Salon", &[])));
        // nail-only places are excluded even with a salon type
        assert!(!matches(Category::Salon, &place("Polished Nail Art", &["spa"])));
    }

    #[test]
    fn test_place_can_match_several_categories() {
        let cafe = place("Green Cafe Coworking", &["cafe"]);
        let matched: Vec<Category> = Category::all().iter().copied().filter(|c| matches(*c, &cafe)).collect();
        assert_eq!(matched, vec![Category::Eatery]);

        let serviced = place("Service Apartment Residency", &["lodging"]);
        assert!(matches(Category::Apartment, &serviced));
        assert!(matches(Category::Pg, &serviced));
    }
}
