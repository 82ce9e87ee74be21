use crate::error::ZrError;

/// A vec with a fixed capacity, allocated once and never grown.
///
/// Mirrors the teacher's `MAX_NODES`-capped shared-buffer arrays, generalized
/// to any element type: pushing past `cap` is a caller-visible `LIMIT` error
/// rather than a silent reallocation, which is what keeps the engine's
/// per-frame allocation profile flat.
pub struct FixedVec<T> {
    items: Vec<T>,
    cap: usize,
    limit_name: &'static str,
}

impl<T> FixedVec<T> {
    pub fn with_capacity(cap: usize, limit_name: &'static str) -> Self {
        Self { items: Vec::with_capacity(cap), cap, limit_name }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, item: T) -> Result<usize, ZrError> {
        if self.items.len() >= self.cap {
            return Err(ZrError::limit(
                self.limit_name,
                format!("capacity {} exceeded", self.cap),
            ));
        }
        let idx = self.items.len();
        self.items.push(item);
        Ok(idx)
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.items.get_mut(idx)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity_succeeds() {
        let mut v: FixedVec<u32> = FixedVec::with_capacity(2, "test_cap");
        assert_eq!(v.push(1).unwrap(), 0);
        assert_eq!(v.push(2).unwrap(), 1);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn push_past_capacity_errors_without_growing() {
        let mut v: FixedVec<u32> = FixedVec::with_capacity(1, "test_cap");
        v.push(1).unwrap();
        let err = v.push(2).unwrap_err();
        assert_eq!(err.kind(), "LIMIT");
        assert_eq!(v.len(), 1);
    }
}
