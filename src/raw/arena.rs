use core::mem;

use super::handle::Handle;
use crate::error::{Error, Result};
use crate::memory::{Allocator, Global};
use crate::vector::Vector;

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<Handle> },
}

/// Slot storage addressed by [`Handle`].
///
/// Freed slots are threaded onto an intrusive free list and reused LIFO.
/// Every slot carries a generation that is bumped when it is freed, so a
/// `(handle, generation)` pair taken earlier can be recognized as stale.
pub(crate) struct Arena<T, A: Allocator = Global> {
    slots: Vector<Slot<T>, A>,
    free_head: Option<Handle>,
    len: usize,
}

impl<T, A: Allocator> Arena<T, A> {
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            slots: Vector::new_in(alloc),
            free_head: None,
            len: 0,
        }
    }

    pub(crate) fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self> {
        Ok(Self {
            slots: Vector::with_capacity_in(capacity, alloc)?,
            free_head: None,
            len: 0,
        })
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn allocator(&self) -> &A {
        self.slots.allocator()
    }

    /// Stores `element` and returns its handle.
    ///
    /// On error the arena is unchanged and `element` is dropped.
    pub(crate) fn alloc(&mut self, container: &'static str, element: T) -> Result<Handle> {
        if let Some(handle) = self.free_head {
            let slot = &mut self.slots[handle.to_index()];
            let Slot::Vacant { generation, next_free } = *slot else {
                unreachable!("`Arena::alloc()` - free list points at an occupied slot!");
            };
            *slot = Slot::Occupied { generation, value: element };
            self.free_head = next_free;
            self.len += 1;
            return Ok(handle);
        }

        let index = self.slots.len();
        if index >= Handle::SLOTS {
            return Err(Error::length(container, index + 1, Handle::SLOTS));
        }
        self.slots.push_back(Slot::Occupied { generation: 0, value: element })?;
        self.len += 1;
        Ok(Handle::from_index(index))
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        match &self.slots[handle.to_index()] {
            Slot::Occupied { value, .. } => value,
            Slot::Vacant { .. } => panic!("`Arena::get()` - `handle` is invalid!"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        match &mut self.slots[handle.to_index()] {
            Slot::Occupied { value, .. } => value,
            Slot::Vacant { .. } => panic!("`Arena::get_mut()` - `handle` is invalid!"),
        }
    }

    /// Returns a mutable reference to an element by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid `Arena<T, A>` that is not otherwise borrowed
    ///   except through references previously returned by this function.
    /// - No other live reference may point at the element behind `handle`.
    #[inline]
    pub(crate) unsafe fn get_mut_ptr<'a>(ptr: *mut Self, handle: Handle) -> &'a mut T {
        // SAFETY: only the `Vector` header is borrowed here; the element is reached
        // through a raw pointer so references to other slots stay valid.
        unsafe {
            let slots = &mut (*ptr).slots;
            let index = handle.to_index();
            assert!(index < slots.len(), "`Arena::get_mut_ptr()` - `handle` is invalid!");
            match &mut *slots.as_mut_ptr().add(index) {
                Slot::Occupied { value, .. } => value,
                Slot::Vacant { .. } => panic!("`Arena::get_mut_ptr()` - `handle` is invalid!"),
            }
        }
    }

    /// Returns the current generation of an occupied slot.
    #[inline]
    pub(crate) fn generation(&self, handle: Handle) -> u32 {
        match &self.slots[handle.to_index()] {
            Slot::Occupied { generation, .. } => *generation,
            Slot::Vacant { .. } => panic!("`Arena::generation()` - `handle` is invalid!"),
        }
    }

    /// Returns `true` if `handle` is occupied and has not been freed since `generation` was read.
    #[inline]
    pub(crate) fn is_live(&self, handle: Handle, generation: u32) -> bool {
        matches!(
            self.slots.get(handle.to_index()),
            Some(Slot::Occupied { generation: current, .. }) if *current == generation
        )
    }

    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let slot = &mut self.slots[handle.to_index()];
        let generation = match slot {
            Slot::Occupied { generation, .. } => generation.wrapping_add(1),
            Slot::Vacant { .. } => panic!("`Arena::take()` - `handle` is invalid!"),
        };
        let old = mem::replace(slot, Slot::Vacant { generation, next_free: self.free_head });
        self.free_head = Some(handle);
        self.len -= 1;
        match old {
            Slot::Occupied { value, .. } => value,
            Slot::Vacant { .. } => unreachable!(),
        }
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    /// Frees every occupied slot, bumping its generation.
    ///
    /// `len` is zeroed before any value is dropped. If a destructor panics the
    /// remaining slots are still freed while unwinding.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
        let mut sweep = Sweep { arena: self, next: 0 };
        sweep.run();
    }

    /// Turns the slot at `index` vacant and returns its value, if it had one.
    fn vacate(&mut self, index: usize) -> Option<T> {
        let slot = &mut self.slots[index];
        let Slot::Occupied { generation, .. } = *slot else {
            return None;
        };
        let vacant = Slot::Vacant {
            generation: generation.wrapping_add(1),
            next_free: self.free_head,
        };
        self.free_head = Some(Handle::from_index(index));
        match mem::replace(slot, vacant) {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => unreachable!(),
        }
    }
}

/// Cursor over the slots being freed by [`Arena::clear`].
struct Sweep<'a, T, A: Allocator> {
    arena: &'a mut Arena<T, A>,
    next: usize,
}

impl<T, A: Allocator> Sweep<'_, T, A> {
    fn run(&mut self) {
        while self.next < self.arena.slots.len() {
            let index = self.next;
            self.next += 1;
            drop(self.arena.vacate(index));
        }
    }
}

impl<T, A: Allocator> Drop for Sweep<'_, T, A> {
    fn drop(&mut self) {
        self.run();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::memory::CountingAllocator;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    #[test]
    fn arena_capacity() {
        let arena: Arena<u32> = Arena::with_capacity_in(10, Global).unwrap();
        assert_eq!(arena.slots.capacity(), 10);
        assert!(arena.is_empty());
    }

    #[test]
    fn freed_slots_are_reused_with_new_generation() {
        let mut arena = Arena::new_in(Global);
        let a = arena.alloc("test", 'a').unwrap();
        let generation = arena.generation(a);
        assert_eq!(arena.take(a), 'a');
        assert!(!arena.is_live(a, generation));

        let b = arena.alloc("test", 'b').unwrap();
        assert_eq!(a, b);
        assert!(!arena.is_live(b, generation));
        assert!(arena.is_live(b, arena.generation(b)));
    }

    #[test]
    fn full_arena_is_length_error() {
        let mut arena = Arena::new_in(Global);
        for _ in 0..Handle::SLOTS {
            arena.alloc("test", ()).unwrap();
        }
        assert_eq!(
            arena.alloc("test", ()),
            Err(Error::length("test", Handle::SLOTS + 1, Handle::SLOTS))
        );
        assert_eq!(arena.len(), Handle::SLOTS);
    }

    #[test]
    fn failed_growth_leaves_arena_unchanged() {
        let alloc = CountingAllocator::new();
        let mut arena = Arena::new_in(&alloc);
        let a = arena.alloc("test", 1u64).unwrap();
        alloc.set_budget(Some(0));
        assert!(matches!(arena.alloc("test", 2), Err(Error::AllocError { .. })));
        assert_eq!(arena.len(), 1);
        assert_eq!(*arena.get(a), 1);

        // A free slot needs no allocation.
        arena.free(a);
        let b = arena.alloc("test", 3).unwrap();
        assert_eq!(*arena.get(b), 3);
    }

    #[test]
    fn clear_survives_a_panicking_destructor() {
        struct Loud(bool);

        impl Drop for Loud {
            fn drop(&mut self) {
                assert!(!self.0, "loud drop");
            }
        }

        let mut arena = Arena::new_in(Global);
        let handles: Vec<_> = (0..6).map(|i| arena.alloc("test", Loud(i == 2)).unwrap()).collect();
        let generation = arena.generation(handles[4]);
        let result = std::panic::catch_unwind(core::panic::AssertUnwindSafe(|| arena.clear()));
        assert!(result.is_err());
        assert!(arena.is_empty());
        assert!(handles.iter().all(|&h| !arena.is_live(h, generation)));

        // Every slot is back on the free list.
        for _ in 0..6 {
            arena.alloc("test", Loud(false)).unwrap();
        }
        assert_eq!(arena.slots.len(), 6);
    }

    #[test]
    #[should_panic(expected = "`Arena::get()` - `handle` is invalid!")]
    fn get_after_free_panics() {
        let mut arena = Arena::new_in(Global);
        let a = arena.alloc("test", 1).unwrap();
        arena.free(a);
        let _ = arena.get(a);
    }

    proptest! {
        #[test]
        fn arena_behaves_like_vec(operations in prop::collection::vec(strategy(), 0..256)) {
            let mut model: Vec<(Handle, u32, u32)> = Vec::new();
            let mut retired: Vec<(Handle, u32)> = Vec::new();
            let mut arena: Arena<u32> = Arena::new_in(Global);

            for operation in operations {
                match operation {
                    Operation::Alloc(value) => {
                        let handle = arena.alloc("test", value).unwrap();
                        model.push((handle, arena.generation(handle), value));
                    }
                    Operation::Get(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        prop_assert_eq!(*arena.get(handle), model[index].2);
                    }
                    Operation::GetMut(which, value) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        *arena.get_mut(handle) = value;
                        model[index].2 = value;
                    }
                    Operation::Take(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        let value1 = arena.take(handle);
                        let (_, generation, value2) = model.swap_remove(index);
                        prop_assert_eq!(value1, value2);
                        retired.push((handle, generation));
                    }
                    Operation::Free(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let handle = model[index].0;
                        arena.free(handle);
                        let (_, generation, _) = model.swap_remove(index);
                        retired.push((handle, generation));
                    }
                }

                prop_assert_eq!(arena.len(), model.len());
                prop_assert_eq!(arena.is_empty(), model.is_empty());

                for &(handle, generation, value) in &model {
                    prop_assert!(arena.is_live(handle, generation));
                    prop_assert_eq!(*arena.get(handle), value);
                }
                for &(handle, generation) in &retired {
                    prop_assert!(!arena.is_live(handle, generation));
                }
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Alloc(u32),
        Get(usize),
        GetMut(usize, u32),
        Take(usize),
        Free(usize),
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => any::<u32>().prop_map(Operation::Alloc),
            5 => any::<usize>().prop_map(Operation::Get),
            5 => (any::<usize>(), any::<u32>()).prop_map(|(which, value)| Operation::GetMut(which, value)),
            5 => any::<usize>().prop_map(Operation::Take),
            5 => any::<usize>().prop_map(Operation::Free),
        ]
    }
}
