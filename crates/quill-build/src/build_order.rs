//! Namespace indexing and dependency ordering
use crate::artifact::Artifact;
use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;

/// Static metadata about one runtime-library file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyDescriptor {
    /// Path relative to the runtime library root
    pub file_path: String,
    /// Namespaces defined by the file
    pub provides: Vec<String>,
    /// Namespaces the file depends on
    pub requires: Vec<String>,
}

impl DependencyDescriptor {
    /// Create a new descriptor with no namespaces
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            provides: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn with_provides(mut self, provides: Vec<String>) -> Self {
        self.provides = provides;
        self
    }

    pub fn with_requires(mut self, requires: Vec<String>) -> Self {
        self.requires = requires;
        self
    }
}

/// Anything that declares provided and required namespaces
pub trait DependencyInfo {
    fn provides(&self) -> &[String];
    fn requires(&self) -> &[String];
    /// File identity the item can also be looked up by
    fn file_key(&self) -> Option<String>;
}

impl DependencyInfo for DependencyDescriptor {
    fn provides(&self) -> &[String] {
        &self.provides
    }

    fn requires(&self) -> &[String] {
        &self.requires
    }

    fn file_key(&self) -> Option<String> {
        Some(self.file_path.clone())
    }
}

impl DependencyInfo for Artifact {
    fn provides(&self) -> &[String] {
        &self.provides
    }

    fn requires(&self) -> &[String] {
        &self.requires
    }

    fn file_key(&self) -> Option<String> {
        self.location.as_ref().map(|l| l.to_string())
    }
}

/// Map every provided namespace and every file key to the position of its item.
///
/// Later items overwrite earlier ones on collision.
pub fn build_index<T: DependencyInfo>(items: &[T]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (position, item) in items.iter().enumerate() {
        for name in item.provides() {
            index.insert(name.clone(), position);
        }
        if let Some(key) = item.file_key() {
            index.insert(key, position);
        }
    }
    index
}

/// Lookup table from namespace name or file path to descriptor
#[derive(Debug, Clone, Default)]
pub struct NamespaceIndex {
    descriptors: Vec<DependencyDescriptor>,
    by_name: HashMap<String, usize>,
}

impl NamespaceIndex {
    pub fn new(descriptors: Vec<DependencyDescriptor>) -> Self {
        let by_name = build_index(&descriptors);
        Self {
            descriptors,
            by_name,
        }
    }

    /// Look up a descriptor by namespace or file path
    pub fn get(&self, name: &str) -> Option<&DependencyDescriptor> {
        self.by_name.get(name).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn descriptors(&self) -> &[DependencyDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order `items` so that every item follows the items it requires.
///
/// Duplicates are dropped. Requires with no matching item are skipped, since
/// they usually name namespaces outside this collection. Items that are not
/// constrained keep their input order. A cycle fails with
/// [`BuildError::CyclicDependency`].
pub fn topological_order<T>(items: Vec<T>) -> BuildResult<Vec<T>>
where
    T: DependencyInfo + PartialEq,
{
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }

    let index = build_index(&unique);
    let mut marks = vec![Mark::Unvisited; unique.len()];
    let mut order = Vec::with_capacity(unique.len());

    for position in 0..unique.len() {
        visit(&unique, &index, position, &mut marks, &mut order)?;
    }

    let mut slots: Vec<Option<T>> = unique.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|position: usize| slots[position].take())
        .collect())
}

/// Depth-first walk from `root` on an explicit stack of
/// `(item, next require to examine)` frames.
fn visit<T: DependencyInfo>(
    items: &[T],
    index: &HashMap<String, usize>,
    root: usize,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) -> BuildResult<()> {
    if marks[root] != Mark::Unvisited {
        return Ok(());
    }

    marks[root] = Mark::InProgress;
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
        let (position, next) = *frame;
        let requires = items[position].requires();

        if next == requires.len() {
            stack.pop();
            marks[position] = Mark::Done;
            order.push(position);
            continue;
        }
        frame.1 += 1;

        let required = &requires[next];
        match index.get(required) {
            Some(&dep) if dep != position => match marks[dep] {
                Mark::Done => {}
                Mark::InProgress => return Err(cycle_error(items, &stack, dep)),
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push((dep, 0));
                }
            },
            Some(_) => {}
            None => tracing::trace!(namespace = %required, "no item provides namespace"),
        }
    }

    Ok(())
}

/// The cycle closed by reaching `repeated` again from the top of `stack`
fn cycle_error<T: DependencyInfo>(
    items: &[T],
    stack: &[(usize, usize)],
    repeated: usize,
) -> BuildError {
    let start = stack
        .iter()
        .position(|&(position, _)| position == repeated)
        .unwrap_or(0);
    let mut cycle: Vec<String> = stack[start..]
        .iter()
        .map(|&(position, _)| display_name(&items[position]))
        .collect();
    cycle.push(display_name(&items[repeated]));
    BuildError::CyclicDependency { cycle }
}

fn display_name<T: DependencyInfo>(item: &T) -> String {
    item.provides()
        .first()
        .cloned()
        .or_else(|| item.file_key())
        .unwrap_or_else(|| "<inline>".to_string())
}
