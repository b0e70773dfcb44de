//! Schema-free representation of a parsed cluster configuration document.

/// One node of a parsed cluster configuration.
///
/// The cluster configuration schema is open-ended, so nothing here assumes a
/// fixed layout. Consumers dispatch on the variant instead of reading named
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    /// A null or missing value.
    Absent,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Integer(i64),
    /// A floating-point scalar (also used for integers outside `i64`).
    Float(f64),
    /// A string scalar.
    String(String),
    /// An ordered sequence.
    Sequence(Vec<Self>),
    /// A mapping, in document order.
    Mapping(Vec<(Self, Self)>),
    /// A wrapped value, such as a YAML `!tag value`.
    Boxed(Box<Self>),
}

impl ConfigNode {
    /// Build a mapping node from string keys.
    #[must_use]
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| (Self::String(key.into()), value))
                .collect(),
        )
    }

    /// Build a string scalar.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Strip any number of `Boxed` wrappers.
    #[must_use]
    pub fn unwrapped(&self) -> &Self {
        let mut current = self;
        while let Self::Boxed(inner) = current {
            current = inner;
        }
        current
    }

    /// Return the string value when this node is a (possibly boxed) string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.unwrapped() {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Look up a direct child by one path segment.
    ///
    /// Mappings match string keys; sequences match a decimal index.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&Self> {
        match self.unwrapped() {
            Self::Mapping(entries) => entries
                .iter()
                .find(|(key, _)| key.as_str() == Some(segment))
                .map(|(_, value)| value),
            Self::Sequence(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        }
    }

    /// Look up a node by dotted path such as `deployment.clusters.0.name`.
    ///
    /// Returns `None` when any segment is missing or the resolved value is
    /// [`ConfigNode::Absent`].
    #[must_use]
    pub fn lookup(&self, dotted_path: &str) -> Option<&Self> {
        let found = dotted_path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))?;

        match found.unwrapped() {
            Self::Absent => None,
            _ => Some(found),
        }
    }
}

impl From<serde_yaml::Value> for ConfigNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => Self::Absent,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => number.as_i64().map_or_else(
                || number.as_f64().map_or(Self::Absent, Self::Float),
                Self::Integer,
            ),
            Value::String(text) => Self::String(text),
            Value::Sequence(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Mapping(entries) => Self::Mapping(
                entries
                    .into_iter()
                    .map(|(key, entry)| (Self::from(key), Self::from(entry)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::Boxed(Box::new(Self::from(tagged.value))),
        }
    }
}
