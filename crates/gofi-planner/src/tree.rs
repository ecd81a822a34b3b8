//! Arena-allocated search tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`], so a tree
//! is dropped in one piece at the end of a planning call and nothing can
//! dangle across calls.  Node 0 is the root.

use gofi_core::{AgentState, NodeId};
use gofi_motion::{MacroAction, Trajectory};

use crate::StepEvent;

/// One ego state reached by a sequence of macro-actions from the root.
#[derive(Clone, Debug)]
pub struct TreeNode {
    pub parent:      Option<NodeId>,
    /// Action that led here; `None` at the root.
    pub action:      Option<MacroAction>,
    pub depth:       usize,
    /// Ego state at the end of `action`.
    pub state:       AgentState,
    /// Seconds since the start of the planning call.
    pub time:        f64,
    /// Ego motion of `action`, starting at the parent's state.
    pub trajectory:  Trajectory,
    /// Reward of `action` alone, events included.
    pub reward:      f64,
    /// Sum of `reward` from the root down to this node.
    pub path_reward: f64,
    pub event:       Option<StepEvent>,
    pub children:    Vec<NodeId>,
    /// Feasible actions not yet tried, with their expansion from `state`,
    /// in candidate order.
    pub untried:     Vec<(MacroAction, Trajectory)>,
    pub visits:      u32,
    /// Visits claimed by leaves selected in the current batch.
    pub virtual_visits: u32,
    /// Running mean of backed-up simulation rewards.
    pub mean_reward: f64,
}

impl TreeNode {
    /// Whether the simulation ends here regardless of depth.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.event.is_some()
    }

    fn record(&mut self, reward: f64) {
        self.visits += 1;
        self.mean_reward += (reward - self.mean_reward) / self.visits as f64;
    }
}

/// The tree of one planning call.
#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<TreeNode>,
}

impl SearchTree {
    pub fn new(root: AgentState, feasible: Vec<(MacroAction, Trajectory)>) -> Self {
        Self {
            nodes: vec![TreeNode {
                parent:         None,
                action:         None,
                depth:          0,
                state:          root,
                time:           0.0,
                trajectory:     Trajectory::at_rest(&root),
                reward:         0.0,
                path_reward:    0.0,
                event:          None,
                children:       Vec::new(),
                untried:        feasible,
                visits:         0,
                virtual_visits: 0,
                mean_reward:    0.0,
            }],
        }
    }

    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    pub fn root(&self) -> &TreeNode {
        self.node(Self::ROOT)
    }

    /// Add a child reached by `action`.
    pub fn add_child(
        &mut self,
        parent:     NodeId,
        action:     MacroAction,
        trajectory: Trajectory,
        reward:     f64,
        event:      Option<StepEvent>,
        untried:    Vec<(MacroAction, Trajectory)>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let p = self.node(parent);
        let state = trajectory.final_state().unwrap_or(p.state);
        let node = TreeNode {
            parent:         Some(parent),
            action:         Some(action),
            depth:          p.depth + 1,
            state,
            time:           p.time + trajectory.duration(),
            trajectory,
            reward,
            path_reward:    p.path_reward + reward,
            event,
            children:       Vec::new(),
            untried,
            visits:         0,
            virtual_visits: 0,
            mean_reward:    0.0,
        };
        self.nodes.push(node);
        self.node_mut(parent).children.push(id);
        id
    }

    /// UCB1 child of `id`, counting virtual visits.  Ties go to the lowest
    /// node index.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.node(id);
        let parent_visits = (node.visits + node.virtual_visits).max(1) as f64;
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &node.children {
            let c = self.node(child);
            let n = c.visits + c.virtual_visits;
            let score = if n == 0 {
                f64::INFINITY
            } else {
                c.mean_reward + exploration * (parent_visits.ln() / n as f64).sqrt()
            };
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((child, score));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Nodes from the root to `leaf`, inclusive.
    pub fn path_to(&self, leaf: NodeId) -> Vec<NodeId> {
        let mut path = vec![leaf];
        let mut cur = leaf;
        while let Some(p) = self.node(cur).parent {
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }

    /// Claim a virtual visit on every node from the root to `leaf`.
    pub fn add_virtual_visit(&mut self, leaf: NodeId) {
        for id in self.path_to(leaf) {
            self.node_mut(id).virtual_visits += 1;
        }
    }

    /// Back `reward` up from `leaf` to the root, releasing one virtual visit
    /// per node.
    pub fn backup(&mut self, leaf: NodeId, reward: f64) {
        for id in self.path_to(leaf) {
            let node = self.node_mut(id);
            node.virtual_visits = node.virtual_visits.saturating_sub(1);
            node.record(reward);
        }
    }

    /// Root child with the highest mean reward among visited children.
    /// Ties go to the lowest node index.
    pub fn best_root_child(&self) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self.root().children {
            let c = self.node(child);
            if c.visits == 0 {
                continue;
            }
            if best.is_none_or(|(_, m)| c.mean_reward > m) {
                best = Some((child, c.mean_reward));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Actions from the root to `id`.
    pub fn actions_to(&self, id: NodeId) -> Vec<MacroAction> {
        self.path_to(id).into_iter().filter_map(|n| self.node(n).action.clone()).collect()
    }
}
