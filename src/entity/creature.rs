//! Creature templates: read-only stat blocks shared by every unit of a kind

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::constants::INITIATIVE_SCALE;
use crate::core::error::{Result, TacticsError};

/// Base stats for one kind of creature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureTemplate {
    pub id: String,
    pub name: String,
    pub health: i32,
    pub attack: i32,
    pub armour: i32,
    /// Movement points granted at the start of each turn
    pub movement: f32,
    /// Higher ratings act more often
    pub initiative_rating: f32,
    #[serde(default = "default_range")]
    pub range: i32,
    #[serde(default)]
    pub critical_strike_chance: f32,
    #[serde(default = "default_attacks")]
    pub attacks_per_turn: i32,
}

fn default_range() -> i32 {
    1
}

fn default_attacks() -> i32 {
    1
}

impl CreatureTemplate {
    /// Initiative consumed by one turn of this creature
    pub fn initiative_step(&self) -> f32 {
        INITIATIVE_SCALE / self.initiative_rating
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.health <= 0 {
            return Err(format!("creature '{}' must have positive health", self.id));
        }
        if !(self.initiative_rating > 0.0) || !self.initiative_rating.is_finite() {
            return Err(format!(
                "creature '{}' has initiative_rating {} (must be finite and > 0)",
                self.id, self.initiative_rating
            ));
        }
        if !(self.movement >= 0.0) || !self.movement.is_finite() {
            return Err(format!(
                "creature '{}' has movement {} (must be finite and >= 0)",
                self.id, self.movement
            ));
        }
        if !(0.0..=1.0).contains(&self.critical_strike_chance) {
            return Err(format!(
                "creature '{}' has critical_strike_chance {} (must be in [0, 1])",
                self.id, self.critical_strike_chance
            ));
        }
        if self.range < 1 || self.attacks_per_turn < 0 || self.attack < 0 || self.armour < 0 {
            return Err(format!(
                "creature '{}' needs range >= 1 and non-negative attack, armour and attacks",
                self.id
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CreatureFile {
    #[serde(rename = "creature")]
    creatures: Vec<CreatureTemplate>,
}

/// Registry of creature templates, loaded once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct CreatureRegistry {
    templates: AHashMap<String, Arc<CreatureTemplate>>,
}

impl CreatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creatures shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("../../data/creatures.toml"))
    }

    /// Parse a `[[creature]]` table array
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CreatureFile = toml::from_str(content)?;
        let mut registry = Self::new();
        for template in file.creatures {
            registry.register(template)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, template: CreatureTemplate) -> Result<Arc<CreatureTemplate>> {
        template.validate().map_err(TacticsError::Config)?;
        let template = Arc::new(template);
        self.templates
            .insert(template.id.clone(), Arc::clone(&template));
        Ok(template)
    }

    pub fn get(&self, id: &str) -> Option<Arc<CreatureTemplate>> {
        self.templates.get(id).cloned()
    }

    pub fn require(&self, id: &str) -> Result<Arc<CreatureTemplate>> {
        self.get(id)
            .ok_or_else(|| TacticsError::CreatureNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
