//! Per-pass collection reports

use crate::address::Address;
use crate::segment::SegmentKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one completed collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    /// Roots gathered (duplicates included)
    pub roots: usize,

    /// Distinct raw addresses visited while marking
    pub marked: usize,

    /// Distinct canonical addresses found reachable
    pub reachable: usize,

    /// Objects freed, by segment kind
    pub freed: BTreeMap<SegmentKind, usize>,
}

impl GcReport {
    /// Count one freed object
    pub(crate) fn record_free(&mut self, kind: SegmentKind) {
        *self.freed.entry(kind).or_insert(0) += 1;
    }

    /// Objects of one kind freed in this pass
    pub fn freed_of(&self, kind: SegmentKind) -> usize {
        self.freed.get(&kind).copied().unwrap_or(0)
    }

    /// Objects freed in this pass
    pub fn total_freed(&self) -> usize {
        self.freed.values().sum()
    }
}

impl fmt::Display for GcReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} roots, {} marked, {} reachable, {} freed",
            self.roots,
            self.marked,
            self.reachable,
            self.total_freed()
        )?;
        for (kind, count) in &self.freed {
            write!(f, "\n  {:<8} {}", kind, count)?;
        }
        Ok(())
    }
}

/// An object a sweep would free
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreedObject {
    /// Kind of the owning segment
    pub kind: SegmentKind,
    /// Canonical address
    pub address: Address,
}

/// Result of a dry run: what a pass would keep and free
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcPlan {
    /// Roots gathered (duplicates included)
    pub roots: usize,

    /// Distinct raw addresses visited while marking
    pub marked: usize,

    /// Canonical reachable addresses, sorted
    pub reachable: Vec<Address>,

    /// Objects the sweep would free, in segment order
    pub unreachable: Vec<FreedObject>,
}

impl GcPlan {
    /// Per-kind counts the sweep would report
    pub fn freed_by_kind(&self) -> BTreeMap<SegmentKind, usize> {
        let mut counts = BTreeMap::new();
        for obj in &self.unreachable {
            *counts.entry(obj.kind).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SegmentId;

    #[test]
    fn test_report_counts() {
        let mut report = GcReport::default();
        report.record_free(SegmentKind::Clones);
        report.record_free(SegmentKind::Clones);
        report.record_free(SegmentKind::Strings);

        assert_eq!(report.freed_of(SegmentKind::Clones), 2);
        assert_eq!(report.freed_of(SegmentKind::Lists), 0);
        assert_eq!(report.total_freed(), 3);
    }

    #[test]
    fn test_report_display_lists_kinds() {
        let mut report = GcReport::default();
        report.record_free(SegmentKind::Script);
        let text = report.to_string();
        assert!(text.contains("1 freed"));
        assert!(text.contains("script"));
    }

    #[test]
    fn test_plan_counts_by_kind() {
        let plan = GcPlan {
            unreachable: vec![
                FreedObject {
                    kind: SegmentKind::Lists,
                    address: Address::new(SegmentId(2), 0),
                },
                FreedObject {
                    kind: SegmentKind::Lists,
                    address: Address::new(SegmentId(2), 4),
                },
            ],
            ..GcPlan::default()
        };
        assert_eq!(plan.freed_by_kind().get(&SegmentKind::Lists), Some(&2));
    }

    #[test]
    fn test_report_serializes_kind_names() {
        let mut report = GcReport::default();
        report.record_free(SegmentKind::Strings);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["freed"]["strings"], 1);
    }
}
