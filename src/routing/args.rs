use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

// Structure to store path arguments when matching
// a route
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct PathArgs(Vec<(Arc<str>, String)>);

impl PathArgs {
    pub fn iter(&self) -> impl Iterator<Item = &(Arc<str>, String)> {
        self.0.iter()
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == key.as_ref())
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let existing = self.0.iter_mut().find(|(k, _)| k.as_ref() == key.as_ref());
        if let Some((_, v)) = existing {
            let old = v.clone();
            *v = value.into();
            return Some(old);
        } else {
            self.0.push((Arc::from(key.as_ref()), value.into()))
        }
        None
    }

    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.0.iter().any(|(k, _)| k.as_ref() == key.as_ref())
    }
}

impl Display for PathArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self
            .0
            .iter()
            .map(|(key, value)| format!("\"{key}\": \"{value}\""))
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "{{{entries}}}")
    }
}

impl Deref for PathArgs {
    type Target = Vec<(Arc<str>, String)>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<matchit::Params<'_, '_>> for PathArgs {
    fn from(params: matchit::Params) -> PathArgs {
        let params: Vec<(Arc<str>, String)> = params
            .iter()
            .map(|(k, v)| (Arc::from(k), String::from(v)))
            .collect();

        PathArgs(params)
    }
}

impl<K: AsRef<str>, V: Into<String>> From<Vec<(K, V)>> for PathArgs {
    fn from(args: Vec<(K, V)>) -> Self {
        PathArgs(
            args.into_iter()
                .map(|(k, v)| (Arc::from(k.as_ref()), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_replaces_existing_key_with_insert() {
        let mut args = PathArgs::default();
        args.insert("one", "a");
        args.insert("two", "b");

        let old = args.insert("one", "c");
        assert_eq!(old, Some("a".to_string()));
        assert_eq!(args, PathArgs::from(vec![("one", "c"), ("two", "b")]));
    }

    #[test]
    fn it_displays_args_as_a_map() {
        let args = PathArgs::from(vec![("flobbit_id", "1")]);
        assert_eq!(args.to_string(), "{\"flobbit_id\": \"1\"}");
        assert_eq!(args.get("flobbit_id"), Some("1"));
        assert!(!args.contains_key("other"));
    }
}
