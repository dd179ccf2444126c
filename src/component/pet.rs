use rand::Rng;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::id::ComponentId;

const SPECIES: [&str; 9] = ["🐶", "🐱", "🐰", "🐦", "🐹", "🦊", "🐢", "🦜", "🐠"];
const NAMES: [&str; 9] = [
    "Buddy", "Luna", "Charlie", "Max", "Bella", "Daisy", "Rocky", "Lucy", "Bailey",
];
/// Card colour by number of homes, the last one repeats
const HOME_COLORS: [&str; 6] = [
    "#8bc34a", "#cddc39", "#ffeb3b", "#ffc107", "#ff9800", "#ff5722",
];

/// Which list a pet card sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PetLocation {
    Shelter,
    ForeverHome,
}

/// A pet that can be adopted into new homes and returned to the shelter
///
/// Every adoption moves the card to a new home: the home counter goes up
/// and a fresh home id is issued. Returning to the shelter only moves the
/// card back; the adoption record stays.
pub struct AdoptedPet {
    id: ComponentId,
    species: &'static str,
    name: &'static str,
    homes: u32,
    home_id: String,
    location: PetLocation,
    connected: bool,
}

impl AdoptedPet {
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let species = SPECIES[rng.random_range(0..SPECIES.len())];
        let name = NAMES[rng.random_range(0..NAMES.len())];
        Self::named(species, name)
    }

    pub fn named(species: &'static str, name: &'static str) -> Self {
        Self {
            id: ComponentId::random(),
            species,
            name,
            homes: 0,
            home_id: new_home_id(),
            location: PetLocation::Shelter,
            connected: false,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn species(&self) -> &'static str {
        self.species
    }

    pub fn homes(&self) -> u32 {
        self.homes
    }

    pub fn home_id(&self) -> &str {
        &self.home_id
    }

    pub fn location(&self) -> PetLocation {
        self.location
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn connect(&mut self) {
        if self.connected {
            return;
        }
        info!(
            component = "adopted-pet",
            id = %self.id,
            pet = %self.label(),
            "Arrived at the shelter"
        );
        self.connected = true;
    }

    /// Moves the pet into a new home, returns the home count
    pub fn adopt(&mut self) -> u32 {
        info!(component = "adopted-pet", id = %self.id, pet = %self.label(), "Being adopted");
        self.homes += 1;
        self.home_id = new_home_id();
        self.location = PetLocation::ForeverHome;
        info!(
            component = "adopted-pet",
            id = %self.id,
            pet = %self.label(),
            home = self.homes,
            home_id = %self.home_id,
            "New home, adjusting to my new document"
        );
        self.homes
    }

    pub fn return_to_shelter(&mut self) {
        info!(
            component = "adopted-pet",
            id = %self.id,
            pet = %self.label(),
            "Returned to the shelter"
        );
        self.location = PetLocation::Shelter;
    }

    /// Adoption line of the card
    pub fn adoption_status(&self) -> String {
        let history = if self.homes > 0 {
            "(Previously adopted)"
        } else {
            "(Never adopted)"
        };
        format!("{} {}", self.homes, history)
    }

    pub fn card_color(&self) -> &'static str {
        let index = (self.homes as usize).min(HOME_COLORS.len() - 1);
        HOME_COLORS[index]
    }

    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        info!(
            component = "adopted-pet",
            id = %self.id,
            pet = %self.label(),
            "Left our system, good luck"
        );
        self.connected = false;
    }

    fn label(&self) -> String {
        format!("{} {}", self.species, self.name)
    }
}

impl Default for AdoptedPet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AdoptedPet {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn new_home_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pet_waits_in_shelter() {
        let mut pet = AdoptedPet::new();
        pet.connect();

        assert!(SPECIES.contains(&pet.species()));
        assert!(NAMES.contains(&pet.name()));
        assert_eq!(pet.location(), PetLocation::Shelter);
        assert_eq!(pet.homes(), 0);
        assert_eq!(pet.adoption_status(), "0 (Never adopted)");
        assert_eq!(pet.card_color(), "#8bc34a");
    }

    #[test]
    fn test_each_adoption_is_a_new_home() {
        let mut pet = AdoptedPet::named("🦊", "Rocky");
        pet.connect();
        let shelter_home = pet.home_id().to_string();

        assert_eq!(pet.adopt(), 1);
        let first_home = pet.home_id().to_string();
        assert_eq!(pet.adopt(), 2);

        assert_eq!(pet.location(), PetLocation::ForeverHome);
        assert_ne!(pet.home_id(), shelter_home);
        assert_ne!(pet.home_id(), first_home);
        assert_eq!(pet.adoption_status(), "2 (Previously adopted)");
        assert_eq!(pet.card_color(), "#ffeb3b");
    }

    #[test]
    fn test_return_keeps_adoption_record() {
        let mut pet = AdoptedPet::named("🐢", "Max");
        pet.adopt();

        pet.return_to_shelter();

        assert_eq!(pet.location(), PetLocation::Shelter);
        assert_eq!(pet.homes(), 1);
        assert_eq!(pet.adoption_status(), "1 (Previously adopted)");
    }

    #[test]
    fn test_card_color_saturates() {
        let mut pet = AdoptedPet::named("🐠", "Luna");
        for _ in 0..10 {
            pet.adopt();
        }

        assert_eq!(pet.card_color(), "#ff5722");
    }
}
