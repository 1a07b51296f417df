use serde::Serialize;

/// Palette cycled by class index.
pub const CLASS_COLORS: [[u8; 3]; 12] = [
    [0xFF, 0x6B, 0x6B],
    [0x4E, 0xCD, 0xC4],
    [0x45, 0xB7, 0xD1],
    [0x96, 0xCE, 0xB4],
    [0xFF, 0xEA, 0xA7],
    [0xDD, 0xA0, 0xDD],
    [0x98, 0xD8, 0xC8],
    [0xF7, 0xDC, 0x6F],
    [0xBB, 0x8F, 0xCE],
    [0x85, 0xC1, 0xE9],
    [0xF8, 0xB5, 0x00],
    [0x00, 0xCE, 0xD1],
];

/// Ordered, duplicate-free class names. The position of a name is its class id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ClassList {
    names: Vec<String>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from names in order, dropping blanks and repeats.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.add(name.as_ref());
        }
        list
    }

    /// Append a trimmed name. Returns its index, or `None` for a blank name.
    pub fn add(&mut self, name: &str) -> Option<usize> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(index) = self.index_of(name) {
            return Some(index);
        }
        self.names.push(name.to_string());
        Some(self.names.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.names.len()).then(|| self.names.remove(index))
    }

    /// Position of `label`, ignoring surrounding whitespace.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.names.iter().position(|name| name == label)
    }

    /// Class id for export; labels missing from the list map to 0.
    pub fn class_id(&self, label: &str) -> usize {
        self.index_of(label).unwrap_or(0)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index_of(label).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Palette colour for the class at `index`.
    pub fn color(index: usize) -> [u8; 3] {
        CLASS_COLORS[index % CLASS_COLORS.len()]
    }

    /// Palette colour for `label`, using class 0's colour for unknown labels.
    pub fn color_for(&self, label: &str) -> [u8; 3] {
        Self::color(self.class_id(label))
    }
}
