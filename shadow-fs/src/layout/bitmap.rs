/// 位图的比特组
type BitGroup = u64;

const GROUP_BITS: usize = BitGroup::BITS as usize;

/// 位图，记录其指示区域内各槽位的分配情况：置位即已使用
#[derive(Debug, Clone)]
pub struct Bitmap {
    groups: Box<[BitGroup]>,
    /// 位图所指示区域的槽位数
    capacity: usize,
}

impl Bitmap {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: vec![0; capacity.div_ceil(GROUP_BITS)].into_boxed_slice(),
            capacity,
        }
    }

    /// 分配编号最小的空闲槽位并返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<usize> {
        // 前面的组都满了，组内最低的0位就是编号最小的空位
        let (group_index, ingroup_index) =
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != BitGroup::MAX).then_some((group_index, bits.trailing_ones() as usize))
                })?;

        let index = encode(group_index, ingroup_index);
        // 末组高位没有对应的槽位
        if index >= self.capacity {
            return None;
        }

        self.groups[group_index] |= 1 << ingroup_index;
        Some(index)
    }

    pub fn dealloc(&mut self, index: usize) {
        let (group_index, ingroup_index) = decode(index);

        // 编号一定得有对应的位
        assert_ne!(
            self.groups[group_index] & (1 << ingroup_index),
            0,
            "slot {index} is not allocated"
        );

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    #[inline]
    pub fn is_used(&self, index: usize) -> bool {
        let (group_index, ingroup_index) = decode(index);
        index < self.capacity && self.groups[group_index] & (1 << ingroup_index) != 0
    }

    pub fn count_used(&self) -> usize {
        self.groups
            .iter()
            .map(|bits| bits.count_ones() as usize)
            .sum()
    }

    #[inline]
    pub fn count_free(&self) -> usize {
        self.capacity - self.count_used()
    }

    /// 按编号顺序给出每个槽位是否已使用
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.capacity).map(|index| self.is_used(index))
    }
}

#[inline]
fn encode(group_index: usize, ingroup_index: usize) -> usize {
    group_index * GROUP_BITS + ingroup_index
}

#[inline]
fn decode(index: usize) -> (usize, usize) {
    (index / GROUP_BITS, index % GROUP_BITS)
}
