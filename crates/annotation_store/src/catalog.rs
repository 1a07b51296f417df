use annokit_common::ClassList;

/// Name given to the first class when none exist.
pub const DEFAULT_CLASS: &str = "object";

/// Class list plus the class new annotations are drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCatalog {
    classes: ClassList,
    active: Option<String>,
}

impl ClassCatalog {
    /// A catalog holding [`DEFAULT_CLASS`], which is also active.
    pub fn new() -> Self {
        Self::from_names([DEFAULT_CLASS])
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes = ClassList::from_names(names);
        let active = classes.get(0).map(str::to_string);
        Self { classes, active }
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Add a class (if new) and make it active. Blank names are ignored.
    pub fn add(&mut self, name: &str) -> Option<usize> {
        let index = self.classes.add(name)?;
        self.active = self.classes.get(index).map(str::to_string);
        Some(index)
    }

    /// Activate an existing class; unknown names are ignored.
    pub fn select(&mut self, name: &str) -> bool {
        if !self.classes.contains(name) {
            return false;
        }
        self.active = Some(name.to_string());
        true
    }

    /// Remove by index. Removing the active class activates the first one left.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        let removed = self.classes.remove(index)?;
        if self.active.as_deref() == Some(removed.as_str()) {
            self.active = self.classes.get(0).map(str::to_string);
        }
        Some(removed)
    }

    /// Append labels found in stored annotations, keeping the active class.
    pub fn merge_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            self.classes.add(label.as_ref());
        }
        if self.active.is_none() {
            self.active = self.classes.get(0).map(str::to_string);
        }
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_object_class() {
        let catalog = ClassCatalog::new();
        assert_eq!(catalog.classes().names(), &["object".to_string()]);
        assert_eq!(catalog.active(), Some("object"));
    }

    #[test]
    fn test_add_selects_class() {
        let mut catalog = ClassCatalog::new();
        assert_eq!(catalog.add(" car "), Some(1));
        assert_eq!(catalog.active(), Some("car"));
        assert_eq!(catalog.add(""), None);
        assert_eq!(catalog.active(), Some("car"));
    }

    #[test]
    fn test_removing_active_falls_back_to_first() {
        let mut catalog = ClassCatalog::from_names(["a", "b", "c"]);
        catalog.select("c");
        assert_eq!(catalog.remove(2).as_deref(), Some("c"));
        assert_eq!(catalog.active(), Some("a"));

        catalog.remove(0);
        catalog.remove(0);
        assert_eq!(catalog.active(), None);
    }

    #[test]
    fn test_merge_labels_appends_unknown() {
        let mut catalog = ClassCatalog::from_names(["cat"]);
        catalog.merge_labels(["dog", "cat", "bird"]);
        assert_eq!(catalog.classes().class_id("bird"), 2);
        assert_eq!(catalog.active(), Some("cat"));
    }
}
