//! Skill registry: name to constructor, with cached lazy instantiation.
//!
//! The registry is an explicitly constructed object passed by reference;
//! there is no global registry. Constructors are registered at startup and
//! instances are created once per registry and cached.

use crate::skills::{
    EnhanceSkill, ExportSkill, OutlineSkill, ResearchSkill, Skill, SkillMetadata, VisualizeSkill,
};
use slidesmith_abstraction::Model;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Constructor for a skill. Receives the model to generate with, or `None`
/// when the registry only needs the instance for its metadata.
pub type SkillConstructor = fn(Option<Arc<dyn Model + Send + Sync>>) -> Arc<dyn Skill>;

/// Registry mapping skill names to constructors and cached instances.
pub struct SkillRegistry {
    constructors: RwLock<HashMap<String, SkillConstructor>>,
    instances: RwLock<HashMap<String, Arc<dyn Skill>>>,
}

impl fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillRegistry")
            .field(
                "skill_count",
                &self.constructors.try_read().map(|c| c.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl SkillRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { constructors: RwLock::new(HashMap::new()), instances: RwLock::new(HashMap::new()) }
    }

    /// Creates a registry with the five standard skills registered.
    pub async fn with_default_skills() -> Self {
        let registry = Self::new();
        registry.register(|model| Arc::new(ResearchSkill::new(model))).await;
        registry.register(|model| Arc::new(OutlineSkill::new(model))).await;
        registry.register(|model| Arc::new(EnhanceSkill::new(model))).await;
        registry.register(|model| Arc::new(VisualizeSkill::new(model))).await;
        registry.register(|model| Arc::new(ExportSkill::new(model))).await;
        registry
    }

    /// Registers a skill constructor. The skill's name is read from a
    /// model-less temporary instance.
    ///
    /// # Returns
    /// Returns `true` if the name was new, `false` if it replaced an
    /// existing registration.
    pub async fn register(&self, constructor: SkillConstructor) -> bool {
        let name = constructor(None).metadata().name;
        debug!(skill = %name, "registering skill");

        let mut constructors = self.constructors.write().await;
        let was_new = constructors.insert(name.clone(), constructor).is_none();
        drop(constructors);

        if !was_new {
            warn!(skill = %name, "skill replaced in registry");
            // A replaced constructor invalidates any cached instance
            self.instances.write().await.remove(&name);
        }
        was_new
    }

    /// Resolves a skill by name, instantiating it with the given model on
    /// first use and caching the instance.
    ///
    /// # Returns
    /// Returns `None` when no constructor is registered under the name.
    pub async fn resolve(
        &self,
        name: &str,
        model: Arc<dyn Model + Send + Sync>,
    ) -> Option<Arc<dyn Skill>> {
        if let Some(instance) = self.instances.read().await.get(name) {
            return Some(Arc::clone(instance));
        }

        let constructor = *self.constructors.read().await.get(name)?;

        let mut instances = self.instances.write().await;
        // Another caller may have instantiated while we waited for the lock
        if let Some(instance) = instances.get(name) {
            return Some(Arc::clone(instance));
        }
        let instance = constructor(Some(model));
        instances.insert(name.to_string(), Arc::clone(&instance));
        Some(instance)
    }

    /// Lists the metadata of every registered skill.
    pub async fn list_skills(&self) -> Vec<SkillMetadata> {
        let constructors = self.constructors.read().await;
        let mut skills: Vec<SkillMetadata> =
            constructors.values().map(|constructor| constructor(None).metadata()).collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    /// Finds a skill by its slash command.
    pub async fn find_by_command(&self, command: &str) -> Option<SkillMetadata> {
        self.list_skills().await.into_iter().find(|meta| meta.command == command)
    }

    /// Searches skills by name, display name, or description.
    pub async fn search(&self, query: &str) -> Vec<SkillMetadata> {
        let query = query.to_lowercase();
        self.list_skills()
            .await
            .into_iter()
            .filter(|meta| {
                meta.name.to_lowercase().contains(&query)
                    || meta.display_name.to_lowercase().contains(&query)
                    || meta.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Checks whether a skill name is registered.
    pub async fn is_registered(&self, name: &str) -> bool {
        self.constructors.read().await.contains_key(name)
    }

    /// Returns the number of registered skills.
    pub async fn count(&self) -> usize {
        self.constructors.read().await.len()
    }

    /// Drops every cached instance, keeping registrations.
    pub async fn clear_instances(&self) {
        self.instances.write().await.clear();
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}
