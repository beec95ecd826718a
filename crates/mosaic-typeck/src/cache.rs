use std::collections::HashMap;

use mosaic_types::{functional_method, ClassId, FunctionalMethod, SamError, Type, TypeEnv};

use crate::TypeckConfig;

/// Per-compilation state shared by every body checked against the same [`TypeEnv`].
///
/// Independent compilations must use independent sessions.
#[derive(Debug, Default)]
pub struct Session {
    pub config: TypeckConfig,
    cache: ResolveCache,
}

#[derive(Debug, Default)]
struct ResolveCache {
    class_names: HashMap<String, Option<ClassId>>,
    functional_methods: HashMap<Type, Result<FunctionalMethod, SamError>>,
}

impl Session {
    pub fn new(config: TypeckConfig) -> Self {
        Self {
            config,
            cache: ResolveCache::default(),
        }
    }

    /// Resolve a simple or qualified class name through the implicit imports.
    pub fn resolve_class_name(&mut self, env: &dyn TypeEnv, name: &str) -> Option<ClassId> {
        if let Some(hit) = self.cache.class_names.get(name) {
            return *hit;
        }
        let found = env.lookup_class(name).or_else(|| {
            self.config
                .implicit_imports
                .iter()
                .find_map(|pkg| env.lookup_class(&format!("{pkg}.{name}")))
        });
        self.cache.class_names.insert(name.to_string(), found);
        found
    }

    pub fn functional_method(
        &mut self,
        env: &dyn TypeEnv,
        ty: &Type,
    ) -> Result<FunctionalMethod, SamError> {
        if let Some(hit) = self.cache.functional_methods.get(ty) {
            return hit.clone();
        }
        let found = functional_method(env, ty, self.config.sam_tie_break);
        self.cache.functional_methods.insert(ty.clone(), found.clone());
        found
    }

    /// Drop every cached lookup; call when the environment changes.
    pub fn clear(&mut self) {
        self.cache.class_names.clear();
        self.cache.functional_methods.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.class_names.len() + self.cache.functional_methods.len()
    }
}
