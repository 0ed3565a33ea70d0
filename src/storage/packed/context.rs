use super::bits::{ceil_log2, slot_bit, slot_count, slot_offset};
use std::convert::TryFrom;
use std::mem;
use tracing::debug;

/// Number of byte planes in a 64-bit count.
pub(crate) const PLANES: usize = 8;

/// Shift of the lowest non-leaf level. Each leaf holds 8 bytes, one per index in `index & 7`.
pub(crate) const LEAF_LEVEL_SHIFT: u32 = 3;

/// Index bits consumed per non-leaf level.
const LEVEL_SHIFT_STEP: u32 = 4;

const LEAF_SLOT_MASK: usize = (1 << LEAF_LEVEL_SHIFT) - 1;

/// Arena position 0 of both `entries` and `leaves` is reserved so that 0 can mean "absent".
const NULL: u32 = 0;

/// Where the pointer to an entry lives, so expansion can repoint it.
#[derive(Clone, Copy)]
enum Parent {
    Root(usize),
    Slot(usize),
}

/// A virtual array of `u64` counts stored as 8 sparse set trees, one per byte plane.
///
/// Each tree is a radix trie over the virtual index, 4 bits per level, from `top_level_shift` down
/// to `LEAF_LEVEL_SHIFT`. A non-leaf entry is a run of `u32`s in `entries`: the first word holds a
/// 16-bit presence bitmap, followed by one child pointer per set bit, in bit order. Children of the
/// lowest level point into `leaves`, each holding the plane's byte for 8 consecutive indices.
///
/// Entries are never freed individually; expansion appends a larger copy and repoints the parent.
#[derive(Clone, Debug)]
pub(crate) struct PackedArrayContext {
    entries: Vec<u32>,
    leaves: Vec<[u8; 8]>,
    roots: [u32; PLANES],
    virtual_length: usize,
    top_level_shift: u32,
}

impl PackedArrayContext {
    pub(crate) fn new(virtual_length: usize) -> PackedArrayContext {
        PackedArrayContext {
            entries: vec![0],
            leaves: vec![[0; 8]],
            roots: [NULL; PLANES],
            virtual_length,
            top_level_shift: top_level_shift_for(virtual_length),
        }
    }

    #[inline]
    pub(crate) fn virtual_length(&self) -> usize {
        self.virtual_length
    }

    #[inline]
    pub(crate) fn top_level_shift(&self) -> u32 {
        self.top_level_shift
    }

    /// Number of non-leaf arena words in use, including superseded entries.
    #[cfg(test)]
    pub(crate) fn entry_words(&self) -> usize {
        self.entries.len() - 1
    }

    /// Number of leaves in use.
    pub(crate) fn leaf_count(&self) -> usize {
        self.leaves.len() - 1
    }

    pub(crate) fn estimated_footprint_bytes(&self) -> usize {
        self.entries.capacity() * mem::size_of::<u32>()
            + self.leaves.capacity() * mem::size_of::<[u8; 8]>()
    }

    /// Assemble the full count at `index` from its 8 planes. Absent planes contribute zero.
    pub(crate) fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.virtual_length);
        let slot = index & LEAF_SLOT_MASK;
        let mut value = 0;
        for plane in 0..PLANES {
            if let Some(leaf) = self.find_leaf(plane, index) {
                value |= u64::from(self.leaves[leaf][slot]) << (plane * 8);
            }
        }
        value
    }

    /// Overwrite the count at `index`. Each plane's byte is written exactly once.
    pub(crate) fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.virtual_length);
        for plane in 0..PLANES {
            self.write_byte(plane, index, (value >> (plane * 8)) as u8);
        }
    }

    /// Add `delta` to the count at `index`, carrying byte by byte from the least significant
    /// plane. Planes above the last carry are not touched. The caller guarantees no overflow.
    pub(crate) fn add(&mut self, index: usize, delta: u64) {
        debug_assert!(index < self.virtual_length);
        let slot = index & LEAF_SLOT_MASK;
        let mut remaining = delta;
        let mut carry = 0u16;
        for plane in 0..PLANES {
            if remaining == 0 && carry == 0 {
                break;
            }
            let increment = (remaining & 0xFF) as u16 + carry;
            remaining >>= 8;
            if increment == 0 {
                continue;
            }

            let current = self
                .find_leaf(plane, index)
                .map_or(0, |leaf| self.leaves[leaf][slot]);
            let sum = u16::from(current) + increment;
            carry = sum >> 8;
            self.write_byte(plane, index, sum as u8);
        }
        debug_assert_eq!(0, carry, "packed add overflowed a 64-bit count");
    }

    /// Drop every entry and leaf while keeping the arenas' capacity.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.entries.push(0);
        self.leaves.clear();
        self.leaves.push([0; 8]);
        self.roots = [NULL; PLANES];
    }

    /// Grow the virtual length. When the current depth cannot address the new length, the trees
    /// are rebuilt one level or more deeper with `copy_and_increase_size`.
    pub(crate) fn set_virtual_length(&mut self, new_length: usize) {
        if new_length <= self.virtual_length {
            return;
        }
        if top_level_shift_for(new_length) == self.top_level_shift {
            self.virtual_length = new_length;
        } else {
            *self = self.copy_and_increase_size(new_length);
        }
    }

    /// Build a context of `new_length` whose trees are deep enough for it and hold every
    /// non-zero count of `self` at the same index.
    ///
    /// The new root of each plane starts a chain of single-slot entries (slot 0, since every
    /// existing index has zeros in the new high nibbles) down to the old top level, where a
    /// compacted copy of the old tree is attached.
    pub(crate) fn copy_and_increase_size(&self, new_length: usize) -> PackedArrayContext {
        let mut grown = PackedArrayContext::new(new_length.max(self.virtual_length));
        debug_assert!(grown.top_level_shift >= self.top_level_shift);

        for plane in 0..PLANES {
            let old_root = self.roots[plane];
            if old_root == NULL {
                continue;
            }

            let mut parent = Parent::Root(plane);
            let mut shift = grown.top_level_shift;
            while shift > self.top_level_shift {
                let entry = grown.push_entry(&[1, NULL]);
                grown.link(parent, entry);
                parent = Parent::Slot(entry as usize + 1);
                shift -= LEVEL_SHIFT_STEP;
            }

            let copied = grown.copy_entry_from(self, old_root, self.top_level_shift);
            grown.link(parent, copied);
        }

        debug!(
            from_length = self.virtual_length,
            to_length = grown.virtual_length,
            from_shift = self.top_level_shift,
            to_shift = grown.top_level_shift,
            "deepened packed array"
        );

        grown
    }

    fn copy_entry_from(&mut self, source: &PackedArrayContext, entry: u32, shift: u32) -> u32 {
        let header = source.entries[entry as usize];
        let children = slot_count(header as u16);
        let first_child = entry as usize + 1;

        let copy = self.entries.len();
        self.entries.push(header);
        self.entries.resize(copy + 1 + children, NULL);

        for i in 0..children {
            let child = source.entries[first_child + i];
            assert_ne!(NULL, child, "packed array slot bit set without a child");
            let copied_child = if shift == LEAF_LEVEL_SHIFT {
                self.push_leaf(source.leaves[child as usize])
            } else {
                self.copy_entry_from(source, child, shift - LEVEL_SHIFT_STEP)
            };
            self.entries[copy + 1 + i] = copied_child;
        }

        arena_index(copy)
    }

    fn write_byte(&mut self, plane: usize, index: usize, byte: u8) {
        let slot = index & LEAF_SLOT_MASK;
        if byte == 0 {
            // never allocate just to store a zero
            if let Some(leaf) = self.find_leaf(plane, index) {
                self.leaves[leaf][slot] = 0;
            }
        } else {
            let leaf = self.find_or_insert_leaf(plane, index);
            self.leaves[leaf][slot] = byte;
        }
    }

    /// Walk `plane`'s tree to the leaf holding `index`, if every level along the way is present.
    fn find_leaf(&self, plane: usize, index: usize) -> Option<usize> {
        let mut entry = self.roots[plane];
        if entry == NULL {
            return None;
        }
        let mut shift = self.top_level_shift;
        loop {
            let child = self.child_of(entry, slot_bit(index, shift))?;
            if shift == LEAF_LEVEL_SHIFT {
                return Some(child as usize);
            }
            entry = child;
            shift -= LEVEL_SHIFT_STEP;
        }
    }

    /// Like `find_leaf`, but builds every missing level on the way down.
    fn find_or_insert_leaf(&mut self, plane: usize, index: usize) -> usize {
        if self.roots[plane] == NULL {
            let (root, leaf) = self.push_path(index, self.top_level_shift);
            self.roots[plane] = root;
            return leaf as usize;
        }

        let mut parent = Parent::Root(plane);
        let mut entry = self.roots[plane];
        let mut shift = self.top_level_shift;
        loop {
            let bit = slot_bit(index, shift);
            let child = match self.child_of(entry, bit) {
                Some(child) => child,
                None if shift == LEAF_LEVEL_SHIFT => {
                    let leaf = self.push_leaf([0; 8]);
                    self.expand_entry(parent, entry, bit, leaf);
                    return leaf as usize;
                }
                None => {
                    let (subtree, leaf) = self.push_path(index, shift - LEVEL_SHIFT_STEP);
                    self.expand_entry(parent, entry, bit, subtree);
                    return leaf as usize;
                }
            };
            if shift == LEAF_LEVEL_SHIFT {
                return child as usize;
            }

            let bitmap = self.entries[entry as usize] as u16;
            parent = Parent::Slot(entry as usize + 1 + slot_offset(bitmap, bit));
            entry = child;
            shift -= LEVEL_SHIFT_STEP;
        }
    }

    /// Append a fresh leaf for `index` and a chain of single-slot entries above it, from the leaf
    /// level up to `shift`. Returns the entry at `shift` and the leaf.
    fn push_path(&mut self, index: usize, shift: u32) -> (u32, u32) {
        let leaf = self.push_leaf([0; 8]);
        let mut node = leaf;
        let mut level = LEAF_LEVEL_SHIFT;
        loop {
            node = self.push_entry(&[u32::from(slot_bit(index, level)), node]);
            if level == shift {
                return (node, leaf);
            }
            level += LEVEL_SHIFT_STEP;
        }
    }

    fn child_of(&self, entry: u32, bit: u16) -> Option<u32> {
        let bitmap = self.entries[entry as usize] as u16;
        if bitmap & bit == 0 {
            return None;
        }
        let child = self.entries[entry as usize + 1 + slot_offset(bitmap, bit)];
        // a set bit without a child means the arena is corrupt; nothing sensible to return
        assert_ne!(NULL, child, "packed array slot bit set without a child");
        Some(child)
    }

    /// Append a copy of `entry` with `bit` added and `child` placed at its slot, then point
    /// `parent` at the copy. The old entry is left in the arena unreferenced.
    fn expand_entry(&mut self, parent: Parent, entry: u32, bit: u16, child: u32) -> u32 {
        let old_bitmap = self.entries[entry as usize] as u16;
        debug_assert_eq!(0, old_bitmap & bit);
        let new_bitmap = old_bitmap | bit;
        let insert_at = slot_offset(old_bitmap, bit);
        let old_children = slot_count(old_bitmap);
        let first_child = entry as usize + 1;

        let expanded = self.entries.len();
        self.entries.push(u32::from(new_bitmap));
        for i in 0..old_children {
            if i == insert_at {
                self.entries.push(child);
            }
            let existing = self.entries[first_child + i];
            self.entries.push(existing);
        }
        if insert_at == old_children {
            self.entries.push(child);
        }

        let expanded = arena_index(expanded);
        self.link(parent, expanded);
        expanded
    }

    fn link(&mut self, parent: Parent, entry: u32) {
        match parent {
            Parent::Root(plane) => self.roots[plane] = entry,
            Parent::Slot(position) => self.entries[position] = entry,
        }
    }

    fn push_entry(&mut self, words: &[u32]) -> u32 {
        let position = self.entries.len();
        self.entries.extend_from_slice(words);
        arena_index(position)
    }

    fn push_leaf(&mut self, leaf: [u8; 8]) -> u32 {
        let position = self.leaves.len();
        self.leaves.push(leaf);
        arena_index(position)
    }
}

#[inline]
fn arena_index(position: usize) -> u32 {
    u32::try_from(position).expect("packed array arena exceeds u32 positions")
}

/// The shift of the top level needed to address `virtual_length` indices. Always of the form
/// `3 + 4k`, and at least 7 so that a tree has one non-leaf level above the leaf level.
pub(crate) fn top_level_shift_for(virtual_length: usize) -> u32 {
    let size_magnitude = ceil_log2(virtual_length);
    let nibbles_above_leaf = (size_magnitude.saturating_sub(LEAF_LEVEL_SHIFT) + 3) / 4;
    let bits = (nibbles_above_leaf * LEVEL_SHIFT_STEP).max(8);
    bits - 1
}
