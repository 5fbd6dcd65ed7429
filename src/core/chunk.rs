/// Bounded buffer of processed items waiting to be written as one batch.
///
/// A chunk lives for a single step execution and is cleared after every
/// successful flush.
pub struct Chunk<O> {
    items: Vec<O>,
    capacity: usize,
}

impl<O> Chunk<O> {
    pub fn new(capacity: usize) -> Chunk<O> {
        Chunk {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: O) {
        debug_assert!(!self.is_full(), "chunk pushed beyond its capacity");
        self.items.push(item);
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[O] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
