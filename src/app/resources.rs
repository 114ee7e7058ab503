use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

/// Type map of the resources shared by every handler of an [App](`super::App`)
#[derive(Clone, Default)]
pub struct Resources(HashMap<TypeId, Arc<dyn Any + Send + Sync>>);

impl Resources {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert<R>(&mut self, res: R)
    where
        R: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<R>();
        self.0.insert(type_id, Arc::new(res));
    }

    pub fn get<R>(&self) -> Option<Arc<R>>
    where
        R: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<R>();
        self.0.get(&type_id).and_then(|res| {
            // Clone the Arc<dyn Any + Send + Sync> first
            let arc = Arc::clone(res);

            // Then downcast it into Arc<R>
            arc.downcast::<R>().ok()
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config(&'static str);

    #[test]
    fn it_indexes_resources_by_type() {
        let mut resources = Resources::new();
        resources.insert(Config("one"));
        resources.insert(42u32);

        assert_eq!(resources.get::<Config>().map(|c| c.0), Some("one"));
        assert_eq!(resources.get::<u32>().as_deref(), Some(&42));
        assert!(resources.get::<String>().is_none());

        // only one resource per type
        resources.insert(Config("two"));
        assert_eq!(resources.len(), 2);
        assert_eq!(resources.get::<Config>().map(|c| c.0), Some("two"));
    }
}
