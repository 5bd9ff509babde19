use gpucmd_core::QueuePriority;

/// Distribution of a family's queues over the priority tiers.
///
/// Each tier owns `per_tier` consecutive queues starting at `tier * per_tier`.
/// With fewer queues than tiers one queue is shared by every tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityTiers {
    per_tier: u32,
    next: [u32; QueuePriority::COUNT],
}

impl PriorityTiers {
    /// Split `count` queues.
    /// With `reserve_spare` one queue per tier stays unused when a tier would get more than one.
    pub fn new(count: u32, reserve_spare: bool) -> Self {
        let mut per_tier = count / QueuePriority::COUNT as u32;
        if per_tier > 1 && reserve_spare {
            per_tier -= 1;
        }
        PriorityTiers {
            per_tier,
            next: [0; QueuePriority::COUNT],
        }
    }

    /// Number of queues each tier owns.
    /// Zero means all tiers share queue 0.
    pub fn per_tier(&self) -> u32 {
        self.per_tier
    }

    /// Number of queues used over all tiers.
    pub fn used_queues(&self) -> u32 {
        if self.per_tier == 0 {
            1
        } else {
            self.per_tier * QueuePriority::COUNT as u32
        }
    }

    /// Index of the queue to serve next request of the tier.
    /// Requests rotate over the tier's queues.
    pub fn next_index(&mut self, priority: QueuePriority) -> u32 {
        if self.per_tier == 0 {
            return 0;
        }
        let tier = priority.index();
        let base = tier as u32 * self.per_tier;
        let index = base + self.next[tier] % self.per_tier;
        self.next[tier] = self.next[tier].wrapping_add(1);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_queues_than_tiers_share_one() {
        let mut tiers = PriorityTiers::new(2, true);
        assert_eq!(tiers.per_tier(), 0);
        assert_eq!(tiers.used_queues(), 1);
        for &priority in &QueuePriority::ALL {
            assert_eq!(tiers.next_index(priority), 0);
        }
    }

    #[test]
    fn spare_queue_reserved() {
        assert_eq!(PriorityTiers::new(8, true).per_tier(), 1);
        assert_eq!(PriorityTiers::new(8, false).per_tier(), 2);
        // One queue per tier is never reduced.
        assert_eq!(PriorityTiers::new(4, true).per_tier(), 1);
        assert_eq!(PriorityTiers::new(16, true).used_queues(), 12);
    }

    #[test]
    fn round_robin_inside_tier() {
        let mut tiers = PriorityTiers::new(12, true);
        assert_eq!(tiers.per_tier(), 2);
        assert_eq!(tiers.next_index(QueuePriority::High), 4);
        assert_eq!(tiers.next_index(QueuePriority::High), 5);
        assert_eq!(tiers.next_index(QueuePriority::High), 4);
        assert_eq!(tiers.next_index(QueuePriority::Low), 0);
        assert_eq!(tiers.next_index(QueuePriority::SuperHigh), 6);
    }
}
