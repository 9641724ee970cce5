use std::collections::{BTreeMap, HashMap};
use std::rc::Weak;

use super::instance::{InstanceId, InstanceInner};

/// Instances waiting for the next batch.
///
/// Membership is keyed by instance id. A sequence number per insertion keeps
/// drain order equal to request order.
#[derive(Default)]
pub(crate) struct PendingSet {
    next_seq: u64,
    order: BTreeMap<u64, InstanceId>,
    members: HashMap<InstanceId, (u64, Weak<InstanceInner>)>,
}

impl PendingSet {
    /// Returns `false` if the instance was already pending.
    pub fn insert(&mut self, id: InstanceId, instance: Weak<InstanceInner>) -> bool {
        if self.members.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id);
        self.members.insert(id, (seq, instance));
        true
    }

    pub fn remove(&mut self, id: InstanceId) -> bool {
        match self.members.remove(&id) {
            Some((seq, _)) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Take every member in insertion order, leaving the set empty.
    pub fn drain(&mut self) -> Vec<Weak<InstanceInner>> {
        let order = std::mem::take(&mut self.order);
        let mut members = std::mem::take(&mut self.members);
        order
            .into_values()
            .filter_map(|id| members.remove(&id).map(|(_, instance)| instance))
            .collect()
    }
}
