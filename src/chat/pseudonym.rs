use std::collections::{HashMap, HashSet};

use rand::{Rng, seq::IndexedRandom};

use super::ParticipantId;

/// Shown for anyone who never had a pseudonym assigned.
pub const ANONYMOUS: &str = "Anonymous";

pub const DEFAULT_POOL: &[&str] = &[
    "Ghost 👻", "Shadow 🕶", "Wolf 🐺", "Mystery 🤖", "Cat 🐱", "Angel 😇",
    "Warrior 🏹", "Specter 👀", "Dragon 🐉", "Raven 🦅", "Whirlwind 🌪", "Spark ⚡",
    "Hidden 🕵️", "Echo 🔊", "Panther 🐆", "Eclipse 🌑", "Phoenix 🔥", "Viking ⚔️",
    "Glimmer ✨", "Stealth 🐾", "Samurai 🏯", "Wanderer 🌍", "Silence 🤫", "Bolt ⚡",
    "Nocturne 🌙", "Nomad 🎒", "Spy 🕶", "Titan 🏛", "Storm ⛈", "Lion 🦁",
    "Serpent 🐍", "Demon 😈", "Eagle 🦅", "Light 💡", "Enigma ❓", "Gloom 🌫",
    "Hunter 🏹", "Thunder ⚡", "Rebel 🎭", "Stranger 🚶", "Magic 🔮", "Comet ☄️",
    "Explorer 🗺", "Hawk 🦅", "Seeker 🔍", "Chameleon 🦎", "Shadow Hunter 🌑",
    "Lynx 🐆", "Vortex 🌪", "Unknown ❌", "Sneak 🕵️", "Dusk 🌘", "Watcher 👁️",
    "Runner 🏃", "Invisible 🌀", "Cobra 🐍", "Mirage 🏜", "Inferno 🔥", "Arcane 📜",
    "Loner 🚶", "Meteor ☄", "Cyclone 🌪", "Mystic 🧙", "Star 🌠", "Drifter 🌎",
    "Sentinel 🛡", "Destroyer 💥", "Lurker in the Dark 🔦", "The Whisper 🗣️",
    "Nebula 🌌", "Neon 🎆", "Abyss 🌊", "Chaos ☠️", "Chimera 🐉", "Morning Star 💫",
    "Soul Thief 👁", "Sorcerer 🔮", "Night Rider 🌙", "Faceless 🤖",
];

/// Pseudonyms handed out during the lifetime of the process.
///
/// Labels are drawn uniformly with replacement, so two participants may end
/// up with the same one. Entries are never removed.
#[derive(Debug)]
pub struct Pseudonyms {
    pool: Vec<String>,
    assigned: HashMap<ParticipantId, String>,
}

impl Default for Pseudonyms {
    fn default() -> Self {
        Self {
            pool: DEFAULT_POOL.iter().map(|label| label.to_string()).collect(),
            assigned: HashMap::new(),
        }
    }
}

impl Pseudonyms {
    /// `None` when `pool` is empty. Repeated labels are kept once, first occurrence wins.
    pub fn new(pool: impl IntoIterator<Item = String>) -> Option<Self> {
        let mut seen = HashSet::new();
        let pool: Vec<String> = pool
            .into_iter()
            .filter(|label| seen.insert(label.clone()))
            .collect();
        if pool.is_empty() {
            return None;
        }

        Some(Self {
            pool,
            assigned: HashMap::new(),
        })
    }

    pub fn ensure_assigned(&mut self, id: ParticipantId) -> String {
        self.ensure_assigned_with(id, &mut rand::rng())
    }

    pub fn ensure_assigned_with<R: Rng + ?Sized>(&mut self, id: ParticipantId, rng: &mut R) -> String {
        let pool = &self.pool;
        self.assigned
            .entry(id)
            .or_insert_with(|| {
                pool.choose(rng)
                    .cloned()
                    .unwrap_or_else(|| ANONYMOUS.to_owned())
            })
            .clone()
    }

    pub fn lookup(&self, id: ParticipantId) -> &str {
        self.assigned
            .get(&id)
            .map(String::as_str)
            .unwrap_or(ANONYMOUS)
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_rejected() {
        assert!(Pseudonyms::new(Vec::new()).is_none());
    }

    #[test]
    fn repeated_labels_are_kept_once() {
        let pseudonyms = Pseudonyms::new(
            ["Fox", "Owl", "Fox", "Lynx", "Owl"].map(str::to_owned),
        ).unwrap();
        assert_eq!(pseudonyms.pool(), ["Fox", "Owl", "Lynx"]);
    }

    #[test]
    fn assignment_is_stable() {
        let mut pseudonyms = Pseudonyms::default();
        let first = pseudonyms.ensure_assigned(ParticipantId(7));
        for _ in 0..32 {
            assert_eq!(pseudonyms.ensure_assigned(ParticipantId(7)), first);
        }
        assert_eq!(pseudonyms.lookup(ParticipantId(7)), first);
    }

    #[test]
    fn assigned_labels_come_from_pool() {
        let mut pseudonyms = Pseudonyms::new(["Fox".to_owned(), "Owl".to_owned()]).unwrap();
        for id in 0..20 {
            let label = pseudonyms.ensure_assigned(ParticipantId(id));
            assert!(pseudonyms.pool().contains(&label));
        }
    }

    #[test]
    fn collisions_are_allowed() {
        let mut pseudonyms = Pseudonyms::new(["Fox".to_owned()]).unwrap();
        assert_eq!(pseudonyms.ensure_assigned(ParticipantId(1)), "Fox");
        assert_eq!(pseudonyms.ensure_assigned(ParticipantId(2)), "Fox");
    }

    #[test]
    fn lookup_falls_back_to_anonymous() {
        let pseudonyms = Pseudonyms::default();
        assert_eq!(pseudonyms.lookup(ParticipantId(42)), ANONYMOUS);
    }

    #[test]
    fn default_pool_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for label in DEFAULT_POOL {
            assert!(seen.insert(label), "duplicate label {label}");
        }
    }
}
