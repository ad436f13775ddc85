/*
BSD 2-Clause License

Copyright (c) 2022, Diagnosis and Control of Clouds Laboratory
All rights reserved.

Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

1. Redistributions of source code must retain the above copyright notice, this
   list of conditions and the following disclaimer.

2. Redistributions in binary form must reproduce the above copyright notice,
   this list of conditions and the following disclaimer in the documentation
   and/or other materials provided with the distribution.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

*/

//! C5 — Dynamic log-entity graph (spec.md §4.6).
//!
//! Grounded in the teacher's own graph module (`trace.rs`'s
//! `StableGraph<Event, DAGEdge>` plus a `BiMap` from external id to
//! `NodeIndex`): resident logs and entities live as nodes of a single
//! `petgraph::stable_graph::StableGraph`, with `NodeIndex` standing in for
//! the "dense integer slot" the design note calls for and `StableGraph`'s
//! index-stability under removal giving that slot for free. The temporal
//! `prev`/`next` chain is a path of `Temporal` edges rather than a
//! hand-rolled linked list; log/entity incidence is a second edge kind on
//! the same graph.

use std::collections::HashSet;

use bimap::BiMap;
use log::debug;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;

use crate::entity::{classify, EntityType};
use crate::filters::EntityBlacklist;
use crate::settings::RecallConfig;

const ENTITY_SWEEP_INTERVAL: i64 = 256;

#[derive(Debug, Clone)]
pub struct LogNode {
    pub log_id: i64,
    pub ts_sec: i64,
    pub message: String,
    pub severity: u8,
    entities: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct EntityNode {
    pub value: String,
    pub etype: EntityType,
    activity: f64,
    last_step: i64,
    last_seen_ts: i64,
    /// Insertion order, which equals temporal order since logs arrive sorted.
    logs: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphEdge {
    Incidence,
    Temporal,
}

#[derive(Debug, Clone)]
enum GraphNode {
    Log(LogNode),
    Entity(EntityNode),
}

pub struct LogEntityGraph {
    g: StableGraph<GraphNode, GraphEdge>,
    log_index: BiMap<i64, NodeIndex>,
    entity_index: BiMap<String, NodeIndex>,
    head: Option<NodeIndex>,
    tail: Option<NodeIndex>,
    step: i64,
    last_sweep_step: i64,

    window_t_sec: i64,
    lambda: f64,
    theta_w: f64,
    age_limit: i64,
    activity_beta: f64,
    activity_alpha: f64,
    activity_epsilon: f64,

    blacklist: EntityBlacklist,
}

impl LogEntityGraph {
    pub fn new(cfg: &RecallConfig) -> Self {
        let lambda = match cfg.decay_lambda {
            Some(l) => l,
            None => {
                if cfg.graph_window_t_sec <= 0 || cfg.theta_w <= 0.0 {
                    0.0
                } else {
                    -cfg.theta_w.ln() / (cfg.graph_window_t_sec as f64)
                }
            }
        };
        let age_limit = if lambda <= 0.0 || cfg.theta_w <= 0.0 {
            i64::MAX
        } else {
            let computed = (cfg.theta_w.ln() / -lambda).ceil() as i64;
            if computed <= 0 {
                i64::MAX
            } else {
                computed
            }
        };

        LogEntityGraph {
            g: StableGraph::new(),
            log_index: BiMap::new(),
            entity_index: BiMap::new(),
            head: None,
            tail: None,
            step: 0,
            last_sweep_step: 0,
            window_t_sec: cfg.graph_window_t_sec,
            lambda,
            theta_w: cfg.theta_w,
            age_limit,
            activity_beta: cfg.activity_beta,
            activity_alpha: cfg.activity_alpha,
            activity_epsilon: cfg.activity_epsilon,
            blacklist: EntityBlacklist::from_config(cfg),
        }
    }

    /// `w(t_edge, t_now) = exp(-lambda * max(0, t_now - t_edge))`.
    pub fn decay_weight(&self, t_edge: i64, t_now: i64) -> f64 {
        let dt = (t_now - t_edge).max(0) as f64;
        (-self.lambda * dt).exp()
    }

    // ---- node accessors -------------------------------------------------

    fn log_node(&self, nidx: NodeIndex) -> &LogNode {
        match &self.g[nidx] {
            GraphNode::Log(l) => l,
            GraphNode::Entity(_) => panic!("expected log node"),
        }
    }

    fn log_node_mut(&mut self, nidx: NodeIndex) -> &mut LogNode {
        match &mut self.g[nidx] {
            GraphNode::Log(l) => l,
            GraphNode::Entity(_) => panic!("expected log node"),
        }
    }

    fn entity_node(&self, nidx: NodeIndex) -> &EntityNode {
        match &self.g[nidx] {
            GraphNode::Entity(e) => e,
            GraphNode::Log(_) => panic!("expected entity node"),
        }
    }

    pub fn get_log(&self, log_id: i64) -> Option<(i64, &str, u8)> {
        let nidx = *self.log_index.get_by_left(&log_id)?;
        let l = self.log_node(nidx);
        Some((l.ts_sec, l.message.as_str(), l.severity))
    }

    pub fn is_resident(&self, log_id: i64) -> bool {
        self.log_index.get_by_left(&log_id).is_some()
    }

    pub fn log_entities(&self, log_id: i64) -> Vec<String> {
        match self.log_index.get_by_left(&log_id) {
            Some(&nidx) => self.log_node(nidx).entities.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn get_logs_for_entity(&self, value: &str) -> Vec<i64> {
        match self.entity_index.get_by_left(value) {
            Some(&nidx) => self.entity_node(nidx).logs.clone(),
            None => Vec::new(),
        }
    }

    pub fn entity_degree(&self, value: &str) -> usize {
        match self.entity_index.get_by_left(value) {
            Some(&nidx) => self.entity_node(nidx).logs.len(),
            None => 0,
        }
    }

    pub fn entity_type(&self, value: &str) -> Option<EntityType> {
        self.entity_index
            .get_by_left(value)
            .map(|&nidx| self.entity_node(nidx).etype)
    }

    /// Current decayed activity, computed on read rather than scanned
    /// periodically (design note §9).
    pub fn entity_activity(&self, value: &str) -> Option<f64> {
        self.entity_index.get_by_left(value).map(|&nidx| {
            let e = self.entity_node(nidx);
            let k = (self.step - e.last_step).max(0);
            e.activity * self.activity_beta.powi(k as i32)
        })
    }

    fn next_of(&self, nidx: NodeIndex) -> Option<NodeIndex> {
        self.g
            .edges_directed(nidx, Direction::Outgoing)
            .find(|e| *e.weight() == GraphEdge::Temporal)
            .map(|e| e.target())
    }

    fn prev_of(&self, nidx: NodeIndex) -> Option<NodeIndex> {
        self.g
            .edges_directed(nidx, Direction::Incoming)
            .find(|e| *e.weight() == GraphEdge::Temporal)
            .map(|e| e.source())
    }

    pub fn next_log_id(&self, log_id: i64) -> Option<i64> {
        let nidx = *self.log_index.get_by_left(&log_id)?;
        self.next_of(nidx)
            .and_then(|n| self.log_index.get_by_right(&n).copied())
    }

    pub fn prev_log_id(&self, log_id: i64) -> Option<i64> {
        let nidx = *self.log_index.get_by_left(&log_id)?;
        self.prev_of(nidx)
            .and_then(|n| self.log_index.get_by_right(&n).copied())
    }

    /// Walks `k` hops in `direction` (true = next, false = prev) from
    /// `log_id`, returning `(log_id, hops)` pairs.
    pub fn walk_temporal(&self, log_id: i64, k: usize, forward: bool) -> Vec<(i64, usize)> {
        let mut out = Vec::new();
        let mut cur = match self.log_index.get_by_left(&log_id) {
            Some(&n) => n,
            None => return out,
        };
        for hop in 1..=k {
            let next = if forward {
                self.next_of(cur)
            } else {
                self.prev_of(cur)
            };
            match next {
                Some(n) => {
                    let lid = *self.log_index.get_by_right(&n).unwrap();
                    out.push((lid, hop));
                    cur = n;
                }
                None => break,
            }
        }
        out
    }

    /// Minimum decayed weight along the shortest `prev`- then `next`-chain
    /// from `from_log_id` to `to_log_id`, capped at 2048 hops each
    /// direction; `0.0` if unreachable within that cap either way.
    pub fn chain_weight(&self, from_log_id: i64, to_log_id: i64, now: i64) -> f64 {
        if let Some(w) = self.walk_chain_weight(from_log_id, to_log_id, now, false, 2048) {
            return w;
        }
        if let Some(w) = self.walk_chain_weight(from_log_id, to_log_id, now, true, 2048) {
            return w;
        }
        0.0
    }

    fn walk_chain_weight(
        &self,
        from_log_id: i64,
        to_log_id: i64,
        now: i64,
        forward: bool,
        max_hops: usize,
    ) -> Option<f64> {
        let mut cur = *self.log_index.get_by_left(&from_log_id)?;
        let mut min_w = f64::INFINITY;
        for _ in 0..max_hops {
            let next = if forward {
                self.next_of(cur)
            } else {
                self.prev_of(cur)
            };
            let next = next?;
            let next_ts = self.log_node(next).ts_sec;
            let w = self.decay_weight(next_ts, now);
            if w < min_w {
                min_w = w;
            }
            let next_log_id = *self.log_index.get_by_right(&next)?;
            if next_log_id == to_log_id {
                return Some(min_w);
            }
            cur = next;
        }
        None
    }

    /// `structural_edge_weight(log_id, _, now) = w(log.ts, now)` — the
    /// entity argument is intentionally unused (spec.md §4.6).
    pub fn structural_edge_weight(&self, log_id: i64, _entity: &str, now: i64) -> Option<f64> {
        self.get_log(log_id).map(|(ts, _, _)| self.decay_weight(ts, now))
    }

    /// `temporal_edge_weight(src, dst, now) = w(dst.ts, now)`.
    pub fn temporal_edge_weight(&self, _src_log_id: i64, dst_log_id: i64, now: i64) -> Option<f64> {
        self.get_log(dst_log_id).map(|(ts, _, _)| self.decay_weight(ts, now))
    }

    // ---- mutation ---------------------------------------------------------

    pub fn add_log(&mut self, log_id: i64, ts: i64, message: &str, entities: &[String], severity: u8) {
        self.step += 1;

        let node = LogNode {
            log_id,
            ts_sec: ts,
            message: message.to_string(),
            severity,
            entities: HashSet::new(),
        };
        let nidx = self.g.add_node(GraphNode::Log(node));
        self.log_index.insert(log_id, nidx);

        if let Some(tail) = self.tail {
            self.g.add_edge(tail, nidx, GraphEdge::Temporal);
        }
        self.tail = Some(nidx);
        if self.head.is_none() {
            self.head = Some(nidx);
        }

        let unique: HashSet<&String> = entities.iter().collect();
        for value in unique {
            if self.blacklist.is_blacklisted(value) {
                continue;
            }
            let enidx = self.get_or_create_entity(value, ts);
            self.activate(enidx, ts);
            self.g.add_edge(nidx, enidx, GraphEdge::Incidence);
            self.log_node_mut(nidx).entities.insert(value.clone());
            if let GraphNode::Entity(e) = &mut self.g[enidx] {
                e.logs.push(log_id);
            }
        }
    }

    fn get_or_create_entity(&mut self, value: &str, ts: i64) -> NodeIndex {
        if let Some(&nidx) = self.entity_index.get_by_left(value) {
            return nidx;
        }
        let node = EntityNode {
            value: value.to_string(),
            etype: classify(value),
            activity: 0.0,
            last_step: self.step,
            last_seen_ts: ts,
            logs: Vec::new(),
        };
        let nidx = self.g.add_node(GraphNode::Entity(node));
        self.entity_index.insert(value.to_string(), nidx);
        nidx
    }

    fn activate(&mut self, nidx: NodeIndex, ts: i64) {
        if let GraphNode::Entity(e) = &mut self.g[nidx] {
            let k = (self.step - e.last_step).max(0);
            let decay = self.activity_beta.powi(k as i32);
            e.activity = e.activity * decay + self.activity_alpha;
            e.last_step = self.step;
            e.last_seen_ts = ts;
        }
    }

    /// Advances the window: evicts expired logs, prunes stale incidences,
    /// and — every 256 steps — sweeps decayed-out entities. Idempotent for
    /// repeated calls with the same `now` (spec.md §8).
    pub fn tick(&mut self, now: i64) {
        self.evict_window(now);
        self.prune_edges(now);
        if self.step - self.last_sweep_step >= ENTITY_SWEEP_INTERVAL {
            self.sweep_entities();
            self.last_sweep_step = self.step;
        }
    }

    fn evict_window(&mut self, now: i64) {
        let cutoff = now - self.window_t_sec;
        while let Some(nidx) = self.head {
            if self.log_node(nidx).ts_sec >= cutoff {
                break;
            }
            let next = self.next_of(nidx);
            self.wipe_incidences(nidx);
            let log_id = self.log_node(nidx).log_id;
            debug!("evicting log {} (ts < cutoff {})", log_id, cutoff);
            self.log_index.remove_by_left(&log_id);
            self.g.remove_node(nidx);
            self.head = next;
            if self.head.is_none() {
                self.tail = None;
            }
        }
    }

    /// `_prune_edges`: wipes a stale log's entity incidences but — per the
    /// preserved open question in spec.md §9 — leaves it resident in the
    /// chain until ordinary window eviction removes it.
    fn prune_edges(&mut self, now: i64) {
        let threshold = now - self.age_limit;
        let mut cur = self.head;
        while let Some(nidx) = cur {
            let ts = self.log_node(nidx).ts_sec;
            if ts >= threshold {
                break;
            }
            self.wipe_incidences(nidx);
            cur = self.next_of(nidx);
        }
    }

    fn wipe_incidences(&mut self, nidx: NodeIndex) {
        let log_id = self.log_node(nidx).log_id;
        let values: Vec<String> = self.log_node_mut(nidx).entities.drain().collect();
        for value in values {
            let enidx = match self.entity_index.get_by_left(&value) {
                Some(&n) => n,
                None => continue,
            };
            if let Some(eid) = self
                .g
                .find_edge(nidx, enidx)
                .or_else(|| self.g.find_edge(enidx, nidx))
            {
                self.g.remove_edge(eid);
            }
            let now_empty = if let GraphNode::Entity(e) = &mut self.g[enidx] {
                e.logs.retain(|&id| id != log_id);
                e.logs.is_empty()
            } else {
                false
            };
            if now_empty {
                self.entity_index.remove_by_right(&enidx);
                self.g.remove_node(enidx);
            }
        }
    }

    fn sweep_entities(&mut self) {
        let mut dead = Vec::new();
        for nidx in self.g.node_indices() {
            if let GraphNode::Entity(e) = &self.g[nidx] {
                let k = (self.step - e.last_step).max(0);
                let decayed = e.activity * self.activity_beta.powi(k as i32);
                if decayed < self.activity_epsilon {
                    dead.push((nidx, e.value.clone(), e.logs.clone()));
                }
            }
        }
        if !dead.is_empty() {
            debug!("sweeping {} decayed-out entities at step {}", dead.len(), self.step);
        }
        for (enidx, value, logs) in dead {
            for log_id in logs {
                if let Some(&lnidx) = self.log_index.get_by_left(&log_id) {
                    self.log_node_mut(lnidx).entities.remove(&value);
                    if let Some(eid) = self
                        .g
                        .find_edge(lnidx, enidx)
                        .or_else(|| self.g.find_edge(enidx, lnidx))
                    {
                        self.g.remove_edge(eid);
                    }
                }
            }
            self.entity_index.remove_by_right(&enidx);
            self.g.remove_node(enidx);
        }
    }
}
