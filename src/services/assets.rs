//! Static driver and constructor asset tables.
//!
//! Maps feed identifiers to display names and the image files the dashboard
//! ships. The feed is inconsistent about which identifier it uses for
//! constructors (`red_bull` vs `McLaren`), so lookups fall back to a
//! case-insensitive match on both the API id and the display name.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverAsset {
    pub api_name: &'static str,
    pub display_name: &'static str,
    pub image_file: &'static str,
    pub constructor: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructorAsset {
    pub api_name: &'static str,
    pub display_name: &'static str,
    pub logo_file: &'static str,
    pub car_design_file: &'static str,
}

const fn driver(
    api_name: &'static str,
    display_name: &'static str,
    image_file: &'static str,
    constructor: &'static str,
) -> DriverAsset {
    DriverAsset {
        api_name,
        display_name,
        image_file,
        constructor,
    }
}

const fn constructor(
    api_name: &'static str,
    display_name: &'static str,
    logo_file: &'static str,
    car_design_file: &'static str,
) -> ConstructorAsset {
    ConstructorAsset {
        api_name,
        display_name,
        logo_file,
        car_design_file,
    }
}

pub const DRIVER_ASSETS: &[DriverAsset] = &[
    driver("piastri", "Oscar Piastri", "piastri.avif", "McLaren"),
    driver("norris", "Lando Norris", "norris.avif", "McLaren"),
    driver("max_verstappen", "Max Verstappen", "verstappen.avif", "Red Bull"),
    driver("lawson", "Liam Lawson", "lawson.avif", "RB F1 Team"),
    driver("russell", "George Russell", "russell.avif", "Mercedes"),
    driver("antonelli", "Andrea Kimi Antonelli", "antonelli.avif", "Mercedes"),
    driver("leclerc", "Charles Leclerc", "leclerc.avif", "Ferrari"),
    driver("hamilton", "Lewis Hamilton", "hamilton.avif", "Ferrari"),
    driver("albon", "Alexander Albon", "albon.avif", "Williams"),
    driver("sainz", "Carlos Sainz", "sainz.avif", "Williams"),
    driver("ocon", "Esteban Ocon", "ocon.avif", "Haas F1 Team"),
    driver("bearman", "Oliver Bearman", "bearman.avif", "Haas F1 Team"),
    driver("stroll", "Lance Stroll", "stroll.avif", "Aston Martin"),
    driver("alonso", "Fernando Alonso", "alonso.avif", "Aston Martin"),
    driver("hadjar", "Isack Hadjar", "hadjar.avif", "RB F1 Team"),
    driver("tsunoda", "Yuki Tsunoda", "tsunoda.avif", "RB F1 Team"),
    driver("gasly", "Pierre Gasly", "gasly.avif", "Alpine F1 Team"),
    driver("doohan", "Jack Doohan", "doohan.avif", "Alpine F1 Team"),
    driver("colapinto", "Franco Colapinto", "colapinto.avif", "Alpine F1 Team"),
    driver("hulkenberg", "Nico Hülkenberg", "hulkenberg.avif", "Sauber"),
    driver("bortoleto", "Gabriel Bortoleto", "bortoleto.avif", "Sauber"),
];

pub const CONSTRUCTOR_ASSETS: &[ConstructorAsset] = &[
    constructor("McLaren", "McLaren", "mclaren.avif", "mclaren-car.avif"),
    constructor("red_bull", "Red Bull", "red_bull.avif", "redbull-car.avif"),
    constructor("Mercedes", "Mercedes", "mercedes.avif", "mercedes-car.avif"),
    constructor("Ferrari", "Ferrari", "ferrari.avif", "ferrari-car.avif"),
    constructor("Williams", "Williams", "williams.avif", "williams-car.avif"),
    constructor("Haas F1 Team", "Haas F1 Team", "haas.avif", "haas-car.avif"),
    constructor("Aston Martin", "Aston Martin", "aston-martin.avif", "aston-martin-car.avif"),
    constructor("RB F1 Team", "RB F1 Team", "rb.png", "rb-car.avif"),
    constructor("Alpine F1 Team", "Alpine F1 Team", "alpine.avif", "alpine-car.avif"),
    constructor("Sauber", "Sauber", "sauber.avif", "sauber-car.avif"),
];

pub fn find_driver(key: &str) -> Option<&'static DriverAsset> {
    DRIVER_ASSETS
        .iter()
        .find(|d| d.api_name == key)
        .or_else(|| {
            DRIVER_ASSETS.iter().find(|d| {
                d.api_name.eq_ignore_ascii_case(key) || d.display_name.eq_ignore_ascii_case(key)
            })
        })
}

pub fn find_constructor(key: &str) -> Option<&'static ConstructorAsset> {
    CONSTRUCTOR_ASSETS
        .iter()
        .find(|c| c.api_name == key)
        .or_else(|| {
            CONSTRUCTOR_ASSETS.iter().find(|c| {
                c.api_name.eq_ignore_ascii_case(key) || c.display_name.eq_ignore_ascii_case(key)
            })
        })
}

/// Constructor asset for a feed constructor, trying its id before its name.
pub fn constructor_for(constructor_id: &str, name: &str) -> Option<&'static ConstructorAsset> {
    find_constructor(constructor_id).or_else(|| find_constructor(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_driver_exact() {
        let d = find_driver("max_verstappen").unwrap();
        assert_eq!(d.image_file, "verstappen.avif");
        assert_eq!(d.constructor, "Red Bull");
    }

    #[test]
    fn test_find_driver_by_display_name() {
        assert_eq!(find_driver("lewis hamilton").map(|d| d.api_name), Some("hamilton"));
    }

    #[test]
    fn test_find_driver_miss() {
        assert!(find_driver("senna").is_none());
    }

    #[test]
    fn test_find_constructor_mixed_identifiers() {
        assert_eq!(find_constructor("red_bull").map(|c| c.logo_file), Some("red_bull.avif"));
        assert_eq!(find_constructor("mclaren").map(|c| c.logo_file), Some("mclaren.avif"));
        assert_eq!(find_constructor("Red Bull").map(|c| c.api_name), Some("red_bull"));
    }

    #[test]
    fn test_constructor_for_falls_back_to_name() {
        let c = constructor_for("haas", "Haas F1 Team").unwrap();
        assert_eq!(c.car_design_file, "haas-car.avif");
        assert!(constructor_for("brawn", "Brawn").is_none());
    }

    #[test]
    fn test_tables_have_unique_api_names() {
        for (i, d) in DRIVER_ASSETS.iter().enumerate() {
            assert!(DRIVER_ASSETS[i + 1..].iter().all(|o| o.api_name != d.api_name));
        }
        for (i, c) in CONSTRUCTOR_ASSETS.iter().enumerate() {
            assert!(CONSTRUCTOR_ASSETS[i + 1..]
                .iter()
                .all(|o| o.api_name != c.api_name));
        }
    }

    #[test]
    fn test_every_driver_constructor_is_known() {
        for d in DRIVER_ASSETS {
            assert!(
                find_constructor(d.constructor).is_some(),
                "{} drives for unknown constructor {}",
                d.api_name,
                d.constructor
            );
        }
    }
}
