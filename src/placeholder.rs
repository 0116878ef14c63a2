//! Placeholder payloads for blocks mined without descriptive fields.

use crate::blockchain::Payload;
use rand::seq::SliceRandom;
use rand::Rng;

pub static ANIMAL_TYPES: [&str; 50] = [
    "Pikachu", "Charizard", "Bulbasaur", "Squirtle", "Jigglypuff", "Snorlax", "Eevee", "Mewtwo",
    "Gengar", "Meowth", "Psyduck", "Charmander", "Mew", "Vaporeon", "Flareon", "Jolteon",
    "Blastoise", "Dragonite", "Gyarados", "Lapras", "Butterfree", "Snorlax", "Machamp",
    "Arcanine", "Raichu", "Alakazam", "Magikarp", "Golem", "Ditto", "Zapdos", "Articuno",
    "Moltres", "Gloom", "Clefairy", "Clefable", "Chansey", "Kingler", "Nidoking", "Nidoqueen",
    "Persian", "Golduck", "Poliwrath", "Tentacruel", "Victreebel", "Rapidash", "Slowbro",
    "Magneton", "Farfetch'd", "Dodrio", "Seaking",
];

pub static PET_NAMES: [&str; 24] = [
    "Ash Ketchum", "Misty Waterflower", "Brock Harrison", "Gary Oak", "Jessie Rocket",
    "James Rocket", "Tracey Sketchit", "May Maple", "Max Maple", "Dawn Berlitz",
    "Iris Dragon", "Cilan Striaton", "Serena Yvonne", "Clemont Meyer", "Bonnie Meyer",
    "Lillie Aether", "Kiawe Akala", "Lana Konikoni", "Mallow Aina", "Sophocles Hokulani",
    "Goh Vermilion", "Chloe Cerise", "Liko Rising", "Roy Rising",
];

/// Pick a random category label and pet name.
pub fn random_payload() -> Payload {
    random_payload_with(&mut rand::thread_rng())
}

pub fn random_payload_with<R: Rng + ?Sized>(rng: &mut R) -> Payload {
    Payload::new(
        *ANIMAL_TYPES.choose(rng).unwrap_or(&ANIMAL_TYPES[0]),
        *PET_NAMES.choose(rng).unwrap_or(&PET_NAMES[0]),
    )
}

/// Keep caller-supplied values; empty or missing ones are replaced with
/// random placeholders.
pub fn fill_payload(animal_type: Option<String>, pet_name: Option<String>) -> Payload {
    let fallback = random_payload();
    let keep = |value: Option<String>| value.filter(|v| !v.is_empty());

    Payload {
        animal_type: keep(animal_type).unwrap_or(fallback.animal_type),
        pet_name: keep(pet_name).unwrap_or(fallback.pet_name),
    }
}
