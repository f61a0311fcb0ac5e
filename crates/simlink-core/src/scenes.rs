//! Catalog of scene names the simulation ships with.
//!
//! Single-room indoor scenes come in four blocks of thirty (kitchens,
//! living rooms, bedrooms, bathrooms). Apartment scenes are split into
//! training and validation sets of five variants each.

/// First floor plan number of each single-room block.
const ROOM_BLOCKS: [u32; 4] = [1, 201, 301, 401];

/// Floor plans per single-room block.
const ROOMS_PER_BLOCK: u32 = 30;

/// Number of training apartments.
const TRAIN_APARTMENTS: u32 = 12;

/// Number of validation apartments.
const VAL_APARTMENTS: u32 = 3;

/// Variants per apartment.
const APARTMENT_VARIANTS: u32 = 5;

/// Single-room indoor scene names (`FloorPlan1` .. `FloorPlan430`).
pub fn indoor_scenes() -> Vec<String> {
    ROOM_BLOCKS
        .iter()
        .flat_map(|&start| {
            (start..start.saturating_add(ROOMS_PER_BLOCK)).map(|n| format!("FloorPlan{n}"))
        })
        .collect()
}

/// Apartment scene names (`FloorPlan_Train1_1` .. `FloorPlan_Val3_5`).
pub fn apartment_scenes() -> Vec<String> {
    let split = |name: &'static str, count: u32| {
        (1..=count).flat_map(move |apartment| {
            (1..=APARTMENT_VARIANTS)
                .map(move |variant| format!("FloorPlan_{name}{apartment}_{variant}"))
        })
    };
    split("Train", TRAIN_APARTMENTS)
        .chain(split("Val", VAL_APARTMENTS))
        .collect()
}

/// Every known scene name, indoor scenes first.
pub fn scene_names() -> Vec<String> {
    let mut names = indoor_scenes();
    names.extend(apartment_scenes());
    names
}

/// Whether `name` is a known scene.
pub fn is_known_scene(name: &str) -> bool {
    scene_names().iter().any(|scene| scene == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_sizes() {
        assert_eq!(scene_names().len(), 195);
        assert_eq!(indoor_scenes().len(), 120);
        assert_eq!(apartment_scenes().len(), 195 - 120);
    }

    #[test]
    fn catalog_bounds() {
        let indoor = indoor_scenes();
        assert_eq!(indoor.first().map(String::as_str), Some("FloorPlan1"));
        assert_eq!(indoor.last().map(String::as_str), Some("FloorPlan430"));
        assert!(!indoor.iter().any(|s| s == "FloorPlan31"));

        let apartments = apartment_scenes();
        assert_eq!(apartments.first().map(String::as_str), Some("FloorPlan_Train1_1"));
        assert_eq!(apartments.last().map(String::as_str), Some("FloorPlan_Val3_5"));
    }

    #[test]
    fn known_scene_lookup() {
        assert!(is_known_scene("FloorPlan28"));
        assert!(is_known_scene("FloorPlan_Train12_5"));
        assert!(!is_known_scene("FloorPlan_Val4_1"));
    }
}
