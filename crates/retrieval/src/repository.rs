//! Immutable corpus snapshot
//!
//! Holds the pedido/recurso tables loaded at startup plus the lookup
//! structures the router and assembler need: by-protocol and by-id maps, the
//! known appeal-id set, and the protocol → recursos cross-reference index.
//! The cross-reference is a pure function of the loaded appeal table; a table
//! reload means constructing a fresh repository, never mutating this one.

use lai_common::models::{AppealRecord, RequestRecord};
use std::collections::HashMap;
use tracing::info;

pub struct CorpusRepository {
    requests: Vec<RequestRecord>,
    appeals: Vec<AppealRecord>,

    request_by_protocol: HashMap<String, usize>,
    request_by_point: HashMap<u64, usize>,
    appeal_by_id: HashMap<u64, usize>,

    /// protocol → indices into `appeals`, in table load order
    cross_reference: HashMap<String, Vec<usize>>,
}

impl CorpusRepository {
    /// Build the snapshot. Runs once at process start; the result is shared
    /// read-only afterwards.
    pub fn new(requests: Vec<RequestRecord>, appeals: Vec<AppealRecord>) -> Self {
        let mut request_by_protocol = HashMap::with_capacity(requests.len());
        let mut request_by_point = HashMap::with_capacity(requests.len());
        for (idx, req) in requests.iter().enumerate() {
            request_by_protocol.insert(req.protocol.clone(), idx);
            request_by_point.insert(req.request_id, idx);
        }

        let mut appeal_by_id = HashMap::with_capacity(appeals.len());
        let mut cross_reference: HashMap<String, Vec<usize>> = HashMap::new();
        let mut orphans = 0usize;
        for (idx, appeal) in appeals.iter().enumerate() {
            appeal_by_id.insert(appeal.appeal_id, idx);
            match &appeal.protocol {
                Some(protocol) => cross_reference
                    .entry(protocol.clone())
                    .or_default()
                    .push(idx),
                None => orphans += 1,
            }
        }

        info!(
            requests = requests.len(),
            appeals = appeals.len(),
            linked_protocols = cross_reference.len(),
            orphan_appeals = orphans,
            "Corpus repository built"
        );

        Self {
            requests,
            appeals,
            request_by_protocol,
            request_by_point,
            appeal_by_id,
            cross_reference,
        }
    }

    pub fn request_by_protocol(&self, protocol: &str) -> Option<&RequestRecord> {
        self.request_by_protocol
            .get(protocol)
            .map(|&idx| &self.requests[idx])
    }

    /// Resolve a vector point id back to its pedido
    pub fn request_by_point(&self, point_id: u64) -> Option<&RequestRecord> {
        self.request_by_point
            .get(&point_id)
            .map(|&idx| &self.requests[idx])
    }

    pub fn appeal_by_id(&self, appeal_id: u64) -> Option<&AppealRecord> {
        self.appeal_by_id
            .get(&appeal_id)
            .map(|&idx| &self.appeals[idx])
    }

    /// Membership test backing the exact appeal-id route
    pub fn known_appeal_id(&self, appeal_id: u64) -> bool {
        self.appeal_by_id.contains_key(&appeal_id)
    }

    /// Linked recursos for a protocol, in table load order; empty for
    /// unlinked protocols and orphans
    pub fn appeals_for_protocol(&self, protocol: &str) -> Vec<&AppealRecord> {
        self.cross_reference
            .get(protocol)
            .map(|indices| indices.iter().map(|&idx| &self.appeals[idx]).collect())
            .unwrap_or_default()
    }

    /// True when the protocol has at least one linked recurso
    pub fn has_appeals(&self, protocol: &str) -> bool {
        self.cross_reference.contains_key(protocol)
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn appeal_count(&self) -> usize {
        self.appeals.len()
    }

    /// Protocols known to the cross-reference (test/stats helper)
    pub fn linked_protocol_count(&self) -> usize {
        self.cross_reference.len()
    }
}
