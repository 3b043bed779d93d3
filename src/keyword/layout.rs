//! Block layout
//!
//! How many elements of each type go into one physical record.

use super::ElementType;

/// Elements-per-record caps, one per element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    caps: [usize; 6],
}

impl Default for BlockLayout {
    fn default() -> Self {
        let mut caps = [0; 6];
        for element_type in ElementType::ALL {
            caps[element_type.ordinal()] = element_type.default_block_cap();
        }
        Self { caps }
    }
}

impl BlockLayout {
    /// Cap for one element type
    pub fn cap(&self, element_type: ElementType) -> usize {
        self.caps[element_type.ordinal()]
    }

    /// Copy of this layout with one cap replaced (a cap of 0 is raised to 1)
    pub fn with_cap(mut self, element_type: ElementType, cap: usize) -> Self {
        self.caps[element_type.ordinal()] = cap.max(1);
        self
    }

    /// Number of physical data records for `count` elements
    pub fn block_count(&self, element_type: ElementType, count: usize) -> usize {
        if count == 0 || element_type.width() == 0 {
            return 0;
        }
        let cap = self.cap(element_type);
        count / cap + usize::from(count % cap != 0)
    }

    /// Element count of each physical record, in order
    pub fn blocks(&self, element_type: ElementType, count: usize) -> impl Iterator<Item = usize> {
        let cap = self.cap(element_type);
        let blocks = self.block_count(element_type, count);
        (0..blocks).map(move |b| (count - b * cap).min(cap))
    }

    /// Bytes the data records of an array occupy on disk, framing included
    pub fn data_size_on_disk(&self, element_type: ElementType, count: usize) -> u64 {
        let framing = self.block_count(element_type, count) as u64 * crate::record::RECORD_OVERHEAD;
        framing + count as u64 * element_type.width() as u64
    }

    /// Offset of element `index` relative to the start of the first data
    /// record: the block that holds it, the block's head offset, and the
    /// element's offset inside that block's payload
    pub fn locate(&self, element_type: ElementType, index: usize) -> (usize, u64, u32) {
        let cap = self.cap(element_type);
        let width = element_type.width();
        let block = index / cap;
        let block_start = block as u64 * (cap * width) as u64 + block as u64 * crate::record::RECORD_OVERHEAD;
        let within = ((index % cap) * width) as u32;
        (block, block_start, within)
    }
}
