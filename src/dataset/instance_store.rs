use std::ops::Index;
use std::slice;

/// A labeled instance: an identifier, an input of arbitrary representation and a vector of
/// real-valued outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance<I> {
    pub id: String,
    pub input: I,
    pub output: Vec<f64>,
}

impl<I> Instance<I> {
    pub fn new<S: Into<String>>(id: S, input: I, output: Vec<f64>) -> Self {
        Instance {
            id: id.into(),
            input,
            output,
        }
    }
}

/// Insertion-ordered storage that exclusively owns its instances.
#[derive(Debug, Clone)]
pub struct InstanceStore<I> {
    instances: Vec<Instance<I>>,
}

impl<I> InstanceStore<I> {
    pub fn new() -> Self {
        InstanceStore {
            instances: Vec::new(),
        }
    }

    pub fn push_back(&mut self, instance: Instance<I>) {
        self.instances.push(instance)
    }

    /// Instance at storage position `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn at(&self, i: usize) -> &Instance<I> {
        assert!(
            i < self.instances.len(),
            "instance index {} out of range (size {})",
            i,
            self.instances.len()
        );
        &self.instances[i]
    }

    pub fn get(&self, i: usize) -> Option<&Instance<I>> {
        self.instances.get(i)
    }

    /// Replace the instance at storage position `i`, returning the old one.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn replace(&mut self, i: usize, instance: Instance<I>) -> Instance<I> {
        assert!(
            i < self.instances.len(),
            "instance index {} out of range (size {})",
            i,
            self.instances.len()
        );
        std::mem::replace(&mut self.instances[i], instance)
    }

    pub fn size(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear()
    }

    pub fn iter(&self) -> slice::Iter<'_, Instance<I>> {
        self.instances.iter()
    }
}

impl<I> Default for InstanceStore<I> {
    fn default() -> Self {
        InstanceStore::new()
    }
}

impl<I> Index<usize> for InstanceStore<I> {
    type Output = Instance<I>;

    #[inline(always)]
    fn index(&self, i: usize) -> &Instance<I> {
        self.at(i)
    }
}

impl<I> Extend<Instance<I>> for InstanceStore<I> {
    fn extend<T: IntoIterator<Item = Instance<I>>>(&mut self, iter: T) {
        self.instances.extend(iter)
    }
}
